//! reelgate proxy server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use reelgate_core::SystemClock;
use reelgate_core::config::AppConfig;
use reelgate_server::{AppState, create_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// reelgate - signed-URL range proxy for object storage
#[derive(Parser, Debug)]
#[command(name = "reelgated")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "REELGATE_CONFIG",
        default_value = "config/reelgate.toml"
    )]
    config: String,
}

/// Load configuration: optional TOML file, then `REELGATE_*` overrides.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!(
            config_path = %path,
            "No config file found, using defaults and environment variables"
        );
    }

    figment
        .merge(Env::prefixed("REELGATE_").split("__"))
        .extract()
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("reelgate v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    if config.server.metrics_enabled {
        reelgate_server::metrics::register_metrics();
        tracing::info!("Prometheus metrics registered");
    }

    let storage = reelgate_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend initialized");

    // Refuse to start against unreachable storage.
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!("Storage backend connectivity verified");

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    let state = AppState::new(config, storage, Arc::new(SystemClock))
        .context("failed to build access pipeline")?;
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgate_core::config::StorageConfig;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = load_config("/nonexistent/reelgate.toml").unwrap();
        assert_eq!(config.server.service_name, "reelgate");
        assert!(matches!(config.storage, StorageConfig::Filesystem { .. }));
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reelgate.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9000"
metrics_enabled = true

[access]
allowed_referers = "example.com, Other.org"
"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert!(config.server.metrics_enabled);
        assert_eq!(
            config.access.referer_allow_list(),
            vec!["example.com".to_string(), "other.org".to_string()]
        );
    }
}
