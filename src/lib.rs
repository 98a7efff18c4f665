//! Gearman Exporter
//!
//! Polls a gearman job server's admin protocol and republishes queue and
//! worker state as Prometheus gauges. Polling happens synchronously on each
//! scrape; nothing is cached between scrapes.
//!
//! # Architecture
//!
//! - **Gearman client**: one-shot `version` / `status` exchanges with the job server
//! - **Collector**: translates responses into gauges, turning failures into
//!   `up = 0` or absent series instead of scrape errors
//! - **Server**: Axum router exposing `/metrics`, `/healthz` and `/` over TCP
//!   or a Unix domain socket
//!
//! # Example
//!
//! ```rust,no_run
//! use gearman_exporter::{AppConfig, AppState, GearmanClient, GearmanCollector};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let collector = GearmanCollector::new(GearmanClient::new(config.gearman.clone()));
//!
//!     let listener = gearman_exporter::server::bind(&config.listen_addr()?).await?;
//!     listener
//!         .serve(
//!             AppState::new(collector),
//!             std::future::pending::<()>(),
//!             config.server.shutdown_timeout,
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod gearman;
pub mod server;

pub use collector::{Collector, GearmanCollector, MetricDesc, MetricSample, MetricSink};
pub use config::{AppConfig, ConfigError};
pub use gearman::{FunctionStatus, GearmanClient, GearmanConfig, GearmanError, StatusSnapshot};
pub use server::{AppState, ServerError, create_router};
