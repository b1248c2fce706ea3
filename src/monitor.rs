//! Monitor Normalization
//!
//! Turns loosely typed [`RawMonitor`] records into [`Monitor`] values with a stable
//! label schema. [`normalize`] is total: malformed fields fall back to defaults so
//! one bad record never aborts a collection cycle.
//!
//! # Upstream Codes
//!
//! | type | label          |   | status | meaning        |
//! |------|----------------|---|--------|----------------|
//! | 1    | `http`         |   | 0      | paused         |
//! | 2    | `http keyword` |   | 1      | not checked yet|
//! | 3    | `ping`         |   | 2      | up             |
//! | 4    | `port`         |   | 8      | seems down     |
//! | *    | `unknown`      |   | 9      | down           |

use crate::uptimerobot::RawMonitor;
use serde_json::Value;
use std::fmt;

/// Status reported for monitors that have not been checked yet.
pub const STATUS_NOT_CHECKED: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorType {
    Http,
    HttpKeyword,
    Ping,
    Port,
    Unknown,
}

impl MonitorType {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => MonitorType::Http,
            2 => MonitorType::HttpKeyword,
            3 => MonitorType::Ping,
            4 => MonitorType::Port,
            _ => MonitorType::Unknown,
        }
    }

    /// Label value used in the `monitor_type` label.
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorType::Http => "http",
            MonitorType::HttpKeyword => "http keyword",
            MonitorType::Ping => "ping",
            MonitorType::Port => "port",
            MonitorType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MonitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse interpretation of the numeric status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Up,
    Down,
    Paused,
    Pending,
}

impl StatusClass {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => StatusClass::Paused,
            2 => StatusClass::Up,
            8 | 9 => StatusClass::Down,
            _ => StatusClass::Pending,
        }
    }
}

/// A normalized monitor. Immutable once built; lives inside one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    pub id: String,
    pub name: String,
    pub monitor_type: MonitorType,
    pub url: String,
    pub paused: bool,
    /// Upstream status code, verbatim.
    pub status: i64,
    pub up: bool,
    /// Unix timestamp of certificate expiry.
    pub ssl_expire: Option<i64>,
    /// Most recent response time in milliseconds.
    pub response_time_ms: Option<f64>,
}

pub fn normalize(raw: &RawMonitor) -> Monitor {
    let id = raw.id.as_ref().map(id_string).unwrap_or_default();
    let status = raw
        .status
        .as_ref()
        .and_then(as_i64)
        .unwrap_or(STATUS_NOT_CHECKED);
    let class = StatusClass::from_code(status);

    Monitor {
        name: display_name(raw.friendly_name.as_ref(), &id),
        id,
        monitor_type: raw
            .monitor_type
            .as_ref()
            .and_then(as_i64)
            .map(MonitorType::from_code)
            .unwrap_or(MonitorType::Unknown),
        url: raw
            .url
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        paused: class == StatusClass::Paused,
        status,
        up: class == StatusClass::Up,
        ssl_expire: ssl_expiry(raw),
        response_time_ms: latest_response_time(raw.response_times.as_ref()),
    }
}

fn display_name(value: Option<&Value>, id: &str) -> String {
    let name = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    if !name.is_empty() {
        name
    } else if !id.is_empty() {
        format!("monitor {}", id)
    } else {
        "unnamed monitor".to_string()
    }
}

fn id_string(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// Certificate expiry, preferring the `ssl` block over legacy `attributes`.
fn ssl_expiry(raw: &RawMonitor) -> Option<i64> {
    let from_ssl = raw.ssl.as_ref().and_then(|ssl| ssl.get("expires"));
    let from_attributes = raw
        .attributes
        .as_ref()
        .and_then(|attrs| attrs.get("ssl_status_expiration_date_int"));

    from_ssl
        .and_then(as_i64)
        .filter(|ts| *ts > 0)
        .or_else(|| from_attributes.and_then(as_i64).filter(|ts| *ts > 0))
}

fn latest_response_time(value: Option<&Value>) -> Option<f64> {
    value?
        .as_array()?
        .first()?
        .get("value")
        .and_then(as_f64)
}

/// Integer from a JSON number or numeric string.
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    let parsed: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}
