use mongodb::{bson::doc, options::ClientOptions, Client, Collection, Database as MongoDatabase};
use tracing::info;

use crate::models::{file::FileRecord, user::User};

pub const USERS_COLLECTION: &str = "users";
pub const FILES_COLLECTION: &str = "files";

/// Database connection wrapper for MongoDB
///
/// Wraps both the MongoDB client and the application database, and hands out
/// the typed collections the repositories work on.
#[derive(Clone)]
pub struct Database {
    /// MongoDB client instance for connection management
    pub client: Client,
    /// Specific database instance for this application
    pub database: MongoDatabase,
}

impl Database {
    /// Create a new database connection to MongoDB
    ///
    /// Parses the connection URL, tags the client with an application name
    /// and pings the server so a bad URL fails at startup.
    ///
    /// # Example
    /// ```ignore
    /// let db = Database::new("mongodb://localhost:27017", "media_vault").await?;
    /// ```
    pub async fn new(database_url: &str, db_name: &str) -> Result<Self, mongodb::error::Error> {
        info!("Connecting to MongoDB: {}", database_url);

        let mut client_options = ClientOptions::parse(database_url).await?;
        client_options.app_name = Some("media-vault-server".to_string());

        let client = Client::with_options(client_options)?;
        let database = client.database(db_name);

        database.run_command(doc! { "ping": 1 }, None).await?;

        info!("MongoDB connection established successfully");

        Ok(Self { client, database })
    }

    pub fn users(&self) -> Collection<User> {
        self.database.collection(USERS_COLLECTION)
    }

    pub fn files(&self) -> Collection<FileRecord> {
        self.database.collection(FILES_COLLECTION)
    }
}
