//! Shared test helpers: a scripted stand-in for the UptimeRobot API and a
//! running exporter wired to it.

#![allow(dead_code)]

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use uptimerobot_exporter::config::{CollectionConfig, UptimeRobotConfig};
use uptimerobot_exporter::metrics::ExporterMetrics;
use uptimerobot_exporter::scheduler::Scheduler;
use uptimerobot_exporter::server::{create_router, AppState};
use uptimerobot_exporter::snapshot::{self, Snapshot, SnapshotReader};
use uptimerobot_exporter::uptimerobot::UptimeRobotClient;

pub const TEST_API_KEY: &str = "ur12345-abcdef123456789";

/// Form fields of one request received by the mock.
pub type FormFields = HashMap<String, String>;

/// What the mock answers to one request.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
    pub headers: Vec<(&'static str, String)>,
}

impl MockReply {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
            headers: Vec::new(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
            headers: Vec::new(),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

type Handler = dyn Fn(usize, &FormFields) -> MockReply + Send + Sync;

#[derive(Clone)]
struct MockState {
    requests: Arc<AtomicUsize>,
    forms: Arc<Mutex<Vec<FormFields>>>,
    handler: Arc<Handler>,
}

pub struct MockUpstream {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
    forms: Arc<Mutex<Vec<FormFields>>>,
}

impl MockUpstream {
    /// Number of `getMonitors` requests received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn forms(&self) -> Vec<FormFields> {
        self.forms.lock().unwrap().clone()
    }
}

/// Start a mock API. `handler` receives the 1-based request number and the form.
pub async fn start_upstream<F>(handler: F) -> MockUpstream
where
    F: Fn(usize, &FormFields) -> MockReply + Send + Sync + 'static,
{
    let requests = Arc::new(AtomicUsize::new(0));
    let forms = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        requests: requests.clone(),
        forms: forms.clone(),
        handler: Arc::new(handler),
    };

    let router = Router::new()
        .route("/v2/getMonitors", post(get_monitors))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockUpstream {
        base_url: format!("http://{}/v2", addr),
        requests,
        forms,
    }
}

async fn get_monitors(State(state): State<MockState>, Form(form): Form<FormFields>) -> Response {
    let n = state.requests.fetch_add(1, Ordering::SeqCst) + 1;
    state.forms.lock().unwrap().push(form.clone());
    let reply = (state.handler)(n, &form);

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut response = (
        StatusCode::from_u16(reply.status).unwrap(),
        [("content-type", "application/json")],
        reply.body,
    )
        .into_response();
    for (name, value) in reply.headers {
        response
            .headers_mut()
            .insert(name, value.parse().unwrap());
    }
    response
}

/// A raw monitor record as UptimeRobot returns it.
pub fn monitor_json(id: u64, name: &str, monitor_type: u64, status: u64, url: &str) -> Value {
    json!({
        "id": id,
        "friendly_name": name,
        "url": url,
        "type": monitor_type,
        "sub_type": "",
        "keyword_type": null,
        "port": "",
        "interval": 300,
        "status": status,
        "create_datetime": 1_600_000_000u64,
    })
}

pub fn page_json(monitors: Vec<Value>, offset: usize, limit: usize, total: usize) -> Value {
    json!({
        "stat": "ok",
        "pagination": {"offset": offset, "limit": limit, "total": total},
        "monitors": monitors,
    })
}

/// Handler serving `total` generated monitors, honouring offset and limit.
pub fn paginated(
    total: usize,
) -> impl Fn(usize, &FormFields) -> MockReply + Send + Sync + 'static {
    move |_, form| {
        let offset: usize = form.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
        let limit: usize = form.get("limit").and_then(|v| v.parse().ok()).unwrap_or(50);
        let end = (offset + limit).min(total);
        let monitors = (offset..end)
            .map(|i| {
                monitor_json(
                    i as u64 + 1,
                    &format!("monitor-{}", i + 1),
                    1,
                    2,
                    &format!("https://m{}.example.com", i + 1),
                )
            })
            .collect();
        MockReply::json(page_json(monitors, offset, limit, total))
    }
}

pub fn api_config(base_url: &str, page_size: u32, timeout: Duration) -> UptimeRobotConfig {
    UptimeRobotConfig {
        api_key: SecretString::from(TEST_API_KEY),
        base_url: base_url.to_string(),
        page_size,
        timeout,
    }
}

pub fn client(base_url: &str) -> UptimeRobotClient {
    UptimeRobotClient::new(&api_config(base_url, 50, Duration::from_secs(5)))
        .expect("Failed to build client")
}

/// Poll `reader` until a snapshot newer than generation `after` appears.
pub async fn next_snapshot(
    reader: &SnapshotReader,
    after: u64,
    within: Duration,
) -> Option<Arc<Snapshot>> {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if let Some(snapshot) = reader.current().filter(|s| s.generation > after) {
            return Some(snapshot);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Schedule with millisecond-scale timings for tests.
pub fn fast_schedule() -> CollectionConfig {
    CollectionConfig {
        interval: Duration::from_secs(3600),
        min_interval: Duration::ZERO,
        max_age: Duration::from_secs(3600),
        backoff_initial: Duration::from_millis(50),
        backoff_max: Duration::from_millis(200),
    }
}

/// Start the scheduler and HTTP server against `upstream`; returns the exporter base URL.
pub async fn start_exporter(
    upstream: &MockUpstream,
    schedule: CollectionConfig,
    timeout: Duration,
) -> String {
    let client = Arc::new(
        UptimeRobotClient::new(&api_config(&upstream.base_url, 50, timeout))
            .expect("Failed to build client"),
    );
    let metrics = ExporterMetrics::new().expect("Failed to create metrics");
    let (publisher, snapshots) = snapshot::cache();
    let (scheduler, trigger) = Scheduler::new(client, publisher, metrics.clone(), schedule);
    tokio::spawn(scheduler.run());

    let state = AppState {
        snapshots,
        trigger,
        metrics,
        max_age: schedule.max_age,
        metrics_path: "/metrics".to_string(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}
