use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset or does not parse.
pub const DEFAULT_DIRECTIVES: &str = "media_vault=debug,media_vault_server=debug,tower_http=debug";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber. Colour is off when `NO_COLOR` is set.
pub fn init_logging() -> anyhow::Result<()> {
    let ansi = std::env::var_os("NO_COLOR").is_none();
    let filter = env_filter();
    let directives = filter.to_string();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(ansi)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()?;

    tracing::debug!("Logging initialised with filter {}", directives);
    Ok(())
}
