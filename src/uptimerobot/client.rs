//! UptimeRobot HTTP API Client
//!
//! Talks to the v2 `getMonitors` endpoint, which is a form-encoded `POST` that
//! returns at most 50 monitors per call together with the account's total count.
//!
//! # Pagination
//!
//! Pages are requested one after another (never concurrently) with an offset equal
//! to the number of records received so far, until that number reaches the total
//! reported by upstream. An upstream that never reaches its own total is cut off
//! after `ceil(total / page_size) + 1` requests.
//! A page whose echoed offset differs from the one requested, or that repeats a
//! monitor id already received, fails the whole fetch.
//!
//! # Rate Limits
//!
//! The account API allows roughly 10 requests per minute. The client does not
//! throttle itself; keeping call volume low is the scheduler's job.
//!
//! # Example
//!
//! ```no_run
//! use uptimerobot_exporter::config::UptimeRobotConfig;
//! use uptimerobot_exporter::uptimerobot::UptimeRobotClient;
//! use secrecy::SecretString;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UptimeRobotConfig {
//!     api_key: SecretString::from("ur123456-abcdef"),
//!     base_url: "https://api.uptimerobot.com/v2".to_string(),
//!     page_size: 50,
//!     timeout: Duration::from_secs(10),
//! };
//!
//! let client = UptimeRobotClient::new(&config)?;
//! let monitors = client.fetch_all_monitors().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::UptimeRobotConfig;
use crate::error::{ApiError, ExporterError, Result};
use crate::uptimerobot::types::{MonitorsPage, RawMonitor};
use chrono::{DateTime, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Longest slice of an error body carried into an error message.
const BODY_EXCERPT_LEN: usize = 200;

/// Client for the UptimeRobot v2 API.
///
/// Cheap to share behind an `Arc`; the underlying `reqwest::Client` pools connections.
pub struct UptimeRobotClient {
    http: Client,
    endpoint: String,
    api_key: SecretString,
    page_size: u32,
}

impl UptimeRobotClient {
    pub fn new(config: &UptimeRobotConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("uptimerobot-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ExporterError::HttpClient)?;

        Ok(Self {
            http,
            endpoint: format!("{}/getMonitors", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
        })
    }

    /// Fetch every monitor on the account, following pagination to the end.
    pub async fn fetch_all_monitors(&self) -> std::result::Result<Vec<RawMonitor>, ApiError> {
        let page_size = u64::from(self.page_size.max(1));
        let mut monitors: Vec<RawMonitor> = Vec::new();
        let mut requests: u64 = 0;
        let mut max_requests: Option<u64> = None;
        let mut seen_ids: HashSet<String> = HashSet::new();

        loop {
            if let Some(cap) = max_requests {
                if requests >= cap {
                    return Err(ApiError::Upstream(format!(
                        "pagination did not converge: received {} monitors after {} requests",
                        monitors.len(),
                        requests
                    )));
                }
            }

            let offset = monitors.len() as u64;
            let page = self.fetch_page(offset).await?;
            requests += 1;

            let received = page.monitors.len();
            let Some(pagination) = page.pagination else {
                append_unique(&mut monitors, &mut seen_ids, page.monitors)?;
                break;
            };

            if let Some(served) = pagination.offset.filter(|served| *served != offset) {
                return Err(ApiError::Upstream(format!(
                    "pagination inconsistent: requested offset {} but received offset {}",
                    offset, served
                )));
            }

            let total = pagination.total;
            max_requests.get_or_insert(total.div_ceil(page_size) + 1);
            append_unique(&mut monitors, &mut seen_ids, page.monitors)?;

            debug!(
                offset,
                received,
                total,
                cumulative = monitors.len(),
                "Fetched monitors page"
            );

            if monitors.len() as u64 >= total {
                break;
            }
        }

        info!(
            "Fetched {} monitors in {} request(s)",
            monitors.len(),
            requests
        );
        Ok(monitors)
    }

    async fn fetch_page(&self, offset: u64) -> std::result::Result<MonitorsPage, ApiError> {
        let offset = offset.to_string();
        let limit = self.page_size.to_string();
        let form = [
            ("api_key", self.api_key.expose_secret().trim()),
            ("format", "json"),
            ("offset", offset.as_str()),
            ("limit", limit.as_str()),
            ("ssl", "1"),
            ("response_times", "1"),
            ("response_times_limit", "1"),
        ];

        let response = self.http.post(&self.endpoint).form(&form).send().await?;
        let response = check_status(response).await?;
        let page: MonitorsPage = response.json().await?;

        if page.stat != "ok" {
            let error = page.error.unwrap_or_default();
            let message = error.describe();
            return Err(if error.is_auth_failure() {
                ApiError::Auth(message)
            } else if error.is_rate_limit() {
                ApiError::RateLimited {
                    message,
                    retry_after: None,
                }
            } else {
                ApiError::Upstream(message)
            });
        }

        Ok(page)
    }
}

/// Append a page, failing if a monitor id was already received.
fn append_unique(
    monitors: &mut Vec<RawMonitor>,
    seen_ids: &mut HashSet<String>,
    page: Vec<RawMonitor>,
) -> std::result::Result<(), ApiError> {
    for monitor in page {
        if let Some(id) = monitor.id.as_ref().filter(|id| !id.is_null()) {
            if !seen_ids.insert(id.to_string()) {
                return Err(ApiError::Upstream(format!(
                    "pagination inconsistent: monitor id {} returned twice",
                    id
                )));
            }
        }
        monitors.push(monitor);
    }
    Ok(())
}

/// Parse a `Retry-After` value: delay in seconds or an HTTP date.
///
/// Dates in the past yield a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or_default())
}

/// Map non-success HTTP statuses onto the error taxonomy.
async fn check_status(response: Response) -> std::result::Result<Response, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Auth(format!("API key rejected (HTTP {})", status)));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        return Err(ApiError::RateLimited {
            message: format!("HTTP {}", status),
            retry_after,
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(BODY_EXCERPT_LEN).collect();
        return Err(ApiError::Upstream(format!(
            "HTTP {}: {}",
            status,
            excerpt.trim()
        )));
    }

    Ok(response)
}
