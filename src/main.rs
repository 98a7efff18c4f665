//! Gearman Exporter Binary Entry Point
//!
//! Loads configuration, then serves `/metrics` until Ctrl+C or SIGTERM.

use anyhow::Context;
use clap::Parser;
use gearman_exporter::{
    AppConfig, AppState, GearmanClient, GearmanCollector,
    config::{ConfigError, LogConfig},
    server,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gearman Exporter - Prometheus metrics for the gearman job server
#[derive(Parser, Debug)]
#[command(name = "gearman-exporter", version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file (defaults are used when omitted)
    #[arg(short, long, env = "GEARMAN_EXPORTER_CONFIG")]
    config: Option<String>,

    /// Listen address for the metrics server (overrides config file)
    #[arg(long, env = "GEARMAN_EXPORTER_LISTEN")]
    listen: Option<String>,

    /// Gearman admin address, host:port (overrides config file)
    #[arg(long, env = "GEARMAN_EXPORTER_GEARMAN_ADDRESS")]
    gearman_address: Option<String>,

    /// Log filter, e.g. `info` or `debug` (overrides config file)
    #[arg(long, env = "GEARMAN_EXPORTER_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Load the config file (if any) and apply overrides (CLI > ENV > file).
    fn into_config(self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.server.listen = listen;
        }
        if let Some(address) = self.gearman_address {
            config.gearman.address = address;
        }
        if let Some(level) = self.log_level {
            config.log = LogConfig { level };
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(log: &LogConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let config = cli
        .into_config()
        .with_context(|| match config_path {
            Some(path) => format!("invalid configuration ({path})"),
            None => "invalid configuration".to_string(),
        })?;

    init_tracing(&config.log);
    tracing::info!("Gearman Exporter {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Gearman: {}, connect timeout {:?}, read timeout {:?}",
        config.gearman.address,
        config.gearman.connect_timeout,
        config.gearman.read_timeout,
    );

    let collector = GearmanCollector::new(GearmanClient::new(config.gearman.clone()));

    let addr = config.listen_addr()?;
    let listener = server::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Metrics server listening on: {}{}", addr, server::METRICS_PATH);
    tracing::info!("Press Ctrl+C to shutdown");

    listener
        .serve(
            AppState::new(collector),
            shutdown_signal(),
            config.server.shutdown_timeout,
        )
        .await
        .context("failed to run server")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("gearman-exporter").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli {
            config: None,
            listen: None,
            gearman_address: None,
            log_level: None,
        };
        assert_eq!(cli.into_config().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = parse(&[
            "--listen",
            "0.0.0.0:9999",
            "--gearman-address",
            "gearman:4730",
            "--log-level",
            "debug",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9999");
        assert_eq!(config.gearman.address, "gearman:4730");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_cli_unix_listen() {
        let cli = parse(&["--listen", "unix:/tmp/gearman-exporter.sock"]);
        let config = cli.into_config().unwrap();
        assert_eq!(
            config.listen_addr().unwrap(),
            gearman_exporter::config::ListenAddr::Unix("/tmp/gearman-exporter.sock".into())
        );
    }

    #[test]
    fn test_cli_override_is_validated() {
        let cli = parse(&["--gearman-address", "no-port"]);
        assert!(cli.into_config().is_err());
    }
}
