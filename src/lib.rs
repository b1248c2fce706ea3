//! UptimeRobot Prometheus Exporter
//!
//! Republishes UptimeRobot monitor state as Prometheus metrics.
//!
//! # Overview
//!
//! A background task periodically pages through the UptimeRobot `getMonitors`
//! API, normalizes every monitor into a fixed label schema and publishes the
//! result as an immutable snapshot. Scrapes render the current snapshot and never
//! wait on UptimeRobot, which keeps the exporter inside the account's API rate
//! limit no matter how often Prometheus scrapes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   POST getMonitors   ┌───────────────────────────┐
//! │ UptimeRobot │ ◄──────────────────  │  Scheduler                │
//! │   API v2    │   paginated JSON     │   ├─ Client               │
//! └─────────────┘                      │   ├─ Normalizer           │
//!                                      │   └─ Snapshot publisher   │
//!                                      │            │ watch        │     HTTP     ┌────────────┐
//!                                      │  Snapshot reader ─ render │ ◄──────────► │ Prometheus │
//!                                      └───────────────────────────┘   /metrics   └────────────┘
//! ```
//!
//! # Modules
//!
//! - [`uptimerobot`] - HTTP client and API type definitions
//! - [`monitor`] - Normalization of raw monitor records
//! - [`snapshot`] - Single-writer snapshot cache
//! - [`exposition`] - Prometheus text rendering of a snapshot
//! - [`scheduler`] - Collection cycles, backoff and on-demand triggers
//! - [`metrics`] - The exporter's own operational metrics
//! - [`server`] - HTTP server
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use uptimerobot_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     config.validate()?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exposition;
pub mod metrics;
pub mod monitor;
pub mod scheduler;
pub mod server;
pub mod snapshot;
pub mod uptimerobot;
