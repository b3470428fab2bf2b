use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{signal, time::MissedTickBehavior};

use media_vault::{
    config::AppConfig,
    create_router,
    repositories::{
        FileRepository, InMemoryFileRepository, InMemoryUserRepository, MongoFileRepository,
        MongoUserRepository, UserRepository,
    },
    services::{database::Database, media::CloudinaryClient},
    utils, AppState,
};

/// Graceful shutdown signal handler
///
/// Handles shutdown signals gracefully, allowing in-flight requests to complete
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn repositories(
    config: &AppConfig,
) -> Result<(Arc<dyn UserRepository>, Arc<dyn FileRepository>)> {
    if config.database.in_memory {
        tracing::warn!("Using in-memory storage; data is lost on shutdown");
        return Ok((
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryFileRepository::new()),
        ));
    }

    let database = Database::new(&config.database.url, &config.database.name).await?;

    let users = MongoUserRepository::new(&database);
    users.ensure_indexes().await?;
    let files = MongoFileRepository::new(&database);
    files.ensure_indexes().await?;

    Ok((Arc::new(users), Arc::new(files)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    utils::logging::init_logging()?;

    let config = Arc::new(AppConfig::load()?);
    tokio::fs::create_dir_all(&config.server.temp_dir).await?;

    let (users, files) = repositories(&config).await?;
    let media = Arc::new(CloudinaryClient::new(&config.cloudinary)?);

    let state = AppState::new(config.clone(), users, files, media);

    // First tick fires immediately, so the sweep also runs at startup.
    let file_service = state.file_service.clone();
    let purge_every = Duration::from_secs(config.cloudinary.purge_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(purge_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = file_service.purge_pending_deletes().await {
                tracing::warn!("Pending delete sweep failed: {:#}", e);
            }
        }
    });

    let app = create_router(state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    tracing::info!("Starting {} on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
