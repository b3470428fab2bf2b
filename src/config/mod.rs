use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Application configuration structure
///
/// Features:
/// - AppConfig
/// - ServerConfig (CORS origin, body ceilings, static and temp directories)
/// - DatabaseConfig
/// - AuthConfig (token secrets and lifetimes)
/// - CloudinaryConfig

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cloudinary: CloudinaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
    pub debug: bool,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; `*` mirrors the request origin.
    pub cors_origin: String,
    /// Ceiling for JSON and form bodies, in bytes.
    pub json_body_limit: usize,
    /// Ceiling for multipart upload bodies, in bytes.
    pub upload_body_limit: usize,
    pub static_dir: String,
    /// Uploads are spooled here before being forwarded to the media host.
    pub temp_dir: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub name: String,
    /// Use the process-local repositories instead of MongoDB.
    pub in_memory: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_secret: String,
    pub refresh_token_ttl_days: i64,
    pub bcrypt_cost: u32,
    pub secure_cookies: bool,
}

/// Media host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// How often records left by failed remote deletes are retried.
    pub purge_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "media-vault".to_string(),
                version: "1.0.0".to_string(),
                debug: true,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origin: "*".to_string(),
                json_body_limit: 16 * 1024,
                upload_body_limit: 50 * 1024 * 1024,
                static_dir: "public".to_string(),
                temp_dir: "public/temp".to_string(),
            },
            database: DatabaseConfig {
                url: "mongodb://localhost:27017".to_string(),
                name: "media_vault".to_string(),
                in_memory: false,
            },
            auth: AuthConfig {
                access_token_secret: "change-me-access".to_string(),
                access_token_ttl_minutes: 60 * 24,
                refresh_token_secret: "change-me-refresh".to_string(),
                refresh_token_ttl_days: 10,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                secure_cookies: true,
            },
            cloudinary: CloudinaryConfig {
                base_url: "https://api.cloudinary.com".to_string(),
                cloud_name: String::new(),
                api_key: String::new(),
                api_secret: String::new(),
                folder: None,
                timeout_secs: 600,
                connect_timeout_secs: 30,
                purge_interval_secs: 300,
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        info!("Loading application configuration...");

        let config: AppConfig = Self::figment().extract()?;

        info!("Configuration loaded successfully");
        info!("name: {:?}", config.app.name);
        info!("Database: {} (in_memory: {})", config.database.name, config.database.in_memory);
        info!("Media host: {} / {}", config.cloudinary.base_url, config.cloudinary.cloud_name);

        Ok(config)
    }

    pub fn figment() -> Figment {
        Figment::new()
            // Start with default values
            .merge(Serialized::defaults(Self::default()))
            // Override with config file if present
            .merge(Yaml::file("config.yaml"))
            // Override with environment variables, e.g. APP_SERVER__PORT
            .merge(Env::prefixed("APP_").split("__"))
    }
}
