//! HTTP Server and Collection Startup
//!
//! Wires the API client, snapshot cache and scheduler together and serves them
//! over HTTP.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET {metrics_path}` - Monitor metrics in Prometheus text format
//! - `GET /health` - Liveness check, 200 whenever the process can serve
//!
//! # Metrics Responses
//!
//! Scrapes never call UptimeRobot. They render whatever snapshot is current:
//! - 503 before the first collection cycle has finished
//! - 503 with only the failure metrics while no cycle has ever succeeded
//! - 200 otherwise, including when the latest cycle failed and older data is served
//!
//! A scrape that finds the snapshot older than `max_age` asks the scheduler for
//! an early refresh and returns immediately with the data it has.

use crate::config::Config;
use crate::exposition::{self, CONTENT_TYPE};
use crate::metrics::ExporterMetrics;
use crate::scheduler::{CollectionTrigger, Scheduler};
use crate::snapshot::{self, SnapshotReader};
use crate::uptimerobot::UptimeRobotClient;
use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct AppState {
    pub snapshots: SnapshotReader,
    pub trigger: CollectionTrigger,
    pub metrics: ExporterMetrics,
    pub max_age: Duration,
    pub metrics_path: String,
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let client = Arc::new(
        UptimeRobotClient::new(&config.uptimerobot).context("Failed to create API client")?,
    );
    let metrics = ExporterMetrics::new()?;
    let (publisher, snapshots) = snapshot::cache();
    let (scheduler, trigger) =
        Scheduler::new(client, publisher, metrics.clone(), config.collection);

    // Start background collection
    tokio::spawn(scheduler.run());

    let state = AppState {
        snapshots,
        trigger,
        metrics,
        max_age: config.collection.max_age,
        metrics_path: config.server.metrics_path.clone(),
    };
    let app = create_router(state);

    // Start the server
    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Metrics server listening on {}", addr);
    info!(
        "Metrics available at http://{}{}",
        addr, config.server.metrics_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route(&state.metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn root_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>UptimeRobot Exporter</title></head>
<body>
<h1>UptimeRobot Prometheus Exporter</h1>
<p><a href="{}">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
        state.metrics_path
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let Some(snapshot) = state.snapshots.current() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            "# No collection cycle has completed yet\n",
        )
            .into_response();
    };

    if snapshot.age(Utc::now()) > state.max_age && state.trigger.request() {
        debug!(
            generation = snapshot.generation,
            "Snapshot is stale, requested a refresh"
        );
    }

    let mut body = exposition::render(&snapshot);
    match state.metrics.render() {
        Ok(own) => body.push_str(&own),
        Err(e) => error!("Failed to render exporter metrics: {}", e),
    }

    let status = if snapshot.has_data() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK\n")
}
