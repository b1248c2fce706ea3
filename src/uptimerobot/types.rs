//! UptimeRobot API Type Definitions
//!
//! Wire types for the v2 `getMonitors` endpoint.
//!
//! # Design Notes
//!
//! - **Loose typing**: monitor fields arrive as numbers, numeric strings, nulls or
//!   are missing entirely depending on account age and monitor type. [`RawMonitor`]
//!   keeps every field as an optional [`serde_json::Value`] and leaves coercion to
//!   [`crate::monitor::normalize`].
//! - **Per-record leniency**: a record that is not even a JSON object decodes as an
//!   empty [`RawMonitor`] instead of failing the whole page.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One page of `getMonitors` output.
#[derive(Debug, Deserialize)]
pub struct MonitorsPage {
    pub stat: String,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default, deserialize_with = "lenient_monitors")]
    pub monitors: Vec<RawMonitor>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pagination {
    /// Offset upstream says it served; absent on some responses.
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: u64,
    pub total: u64,
}

/// Error object returned alongside `"stat": "fail"`.
#[derive(Debug, Deserialize, Default)]
pub struct ApiErrorBody {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub parameter_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn describe(&self) -> String {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => format!("{}: {}", kind, message),
            (None, Some(message)) => message.clone(),
            (Some(kind), None) => kind.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }

    /// Whether upstream is complaining about the API key itself.
    pub fn is_auth_failure(&self) -> bool {
        if self.parameter_name.as_deref() == Some("api_key") {
            return true;
        }
        let kind = self.kind.as_deref().unwrap_or_default().to_ascii_lowercase();
        if kind.contains("unauthorized") || kind.contains("not_authorized") {
            return true;
        }
        self.message
            .as_deref()
            .map(|m| m.to_ascii_lowercase().contains("api_key"))
            .unwrap_or(false)
    }

    pub fn is_rate_limit(&self) -> bool {
        self.kind
            .as_deref()
            .map(|k| k.to_ascii_lowercase().contains("rate"))
            .unwrap_or(false)
    }
}

/// A monitor exactly as upstream sent it.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct RawMonitor {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub friendly_name: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default, rename = "type")]
    pub monitor_type: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub ssl: Option<Value>,
    #[serde(default)]
    pub attributes: Option<Value>,
    #[serde(default)]
    pub response_times: Option<Value>,
}

fn lenient_monitors<'de, D>(deserializer: D) -> Result<Vec<RawMonitor>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap_or_default())
        .collect())
}
