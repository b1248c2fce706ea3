//! Prometheus Text Exposition
//!
//! Serializes a [`Snapshot`] into the Prometheus text format.
//!
//! # Metrics Produced
//! - `uptimerobot_up` - 1 if the monitor is up, else 0
//! - `uptimerobot_status` - Upstream status code
//! - `uptimerobot_ssl_expire` - Certificate expiry as a Unix timestamp (SSL monitors only)
//! - `uptimerobot_responsetime` - Most recent response time in milliseconds
//! - `uptimerobot_scrape_duration_seconds` - Duration of the collection cycle
//! - `uptimerobot_scrape_failed` - 1 if the last collection cycle failed
//!
//! Per-monitor metrics carry the labels `monitor_name`, `monitor_type`,
//! `monitor_paused` and `monitor_url`, always in that order.
//!
//! Output is a pure function of the snapshot: monitors appear in snapshot order,
//! so rendering the same snapshot twice yields identical bytes. The
//! `prometheus` crate's encoder sorts labels and series, which is why this
//! module writes the format directly.

use crate::monitor::Monitor;
use crate::snapshot::Snapshot;
use std::fmt::Write;

pub const NAMESPACE: &str = "uptimerobot";

/// Content type for the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

struct Family {
    name: &'static str,
    help: &'static str,
}

const UP: Family = Family {
    name: "up",
    help: "Is the monitor up?",
};
const STATUS: Family = Family {
    name: "status",
    help: "Numeric status of the monitor",
};
const SSL_EXPIRE: Family = Family {
    name: "ssl_expire",
    help: "Date of cert expiration",
};
const RESPONSE_TIME: Family = Family {
    name: "responsetime",
    help: "Most recent monitor responsetime",
};
const SCRAPE_DURATION: Family = Family {
    name: "scrape_duration_seconds",
    help: "Duration of uptimerobot.com scrape",
};
const SCRAPE_FAILED: Family = Family {
    name: "scrape_failed",
    help: "Whether the last uptimerobot.com scrape failed (1=failed)",
};

pub fn render(snapshot: &Snapshot) -> String {
    let monitors = snapshot.monitors();
    let mut out = String::with_capacity(256 + monitors.len() * 512);

    if snapshot.has_data() {
        write_family(&mut out, &UP, monitors, |m| Some(bool_value(m.up)));
        write_family(&mut out, &STATUS, monitors, |m| Some(m.status.to_string()));
        write_family(&mut out, &SSL_EXPIRE, monitors, |m| {
            m.ssl_expire.map(|ts| ts.to_string())
        });
        write_family(&mut out, &RESPONSE_TIME, monitors, |m| {
            m.response_time_ms.map(format_float)
        });
    }

    write_header(&mut out, &SCRAPE_DURATION);
    write_sample(&mut out, SCRAPE_DURATION.name, None, &format_float(snapshot.duration_seconds));

    write_header(&mut out, &SCRAPE_FAILED);
    write_sample(
        &mut out,
        SCRAPE_FAILED.name,
        None,
        bool_value(snapshot.error.is_some()).as_str(),
    );

    out
}

/// Escape a label value: backslash, double quote and newline.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn write_family<F>(out: &mut String, family: &Family, monitors: &[Monitor], value: F)
where
    F: Fn(&Monitor) -> Option<String>,
{
    let samples: Vec<(&Monitor, String)> = monitors
        .iter()
        .filter_map(|m| value(m).map(|v| (m, v)))
        .collect();
    if samples.is_empty() {
        return;
    }

    write_header(out, family);
    for (monitor, value) in samples {
        write_sample(out, family.name, Some(labels(monitor).as_str()), &value);
    }
}

fn write_header(out: &mut String, family: &Family) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "# HELP {}_{} {}", NAMESPACE, family.name, family.help);
    let _ = writeln!(out, "# TYPE {}_{} gauge", NAMESPACE, family.name);
}

fn write_sample(out: &mut String, name: &str, labels: Option<&str>, value: &str) {
    let _ = writeln!(
        out,
        "{}_{}{} {}",
        NAMESPACE,
        name,
        labels.unwrap_or_default(),
        value
    );
}

fn labels(monitor: &Monitor) -> String {
    format!(
        "{{monitor_name=\"{}\",monitor_type=\"{}\",monitor_paused=\"{}\",monitor_url=\"{}\"}}",
        escape_label_value(&monitor.name),
        escape_label_value(monitor.monitor_type.as_str()),
        monitor.paused,
        escape_label_value(&monitor.url),
    )
}

fn bool_value(value: bool) -> String {
    let text = if value { "1" } else { "0" };
    text.to_string()
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "+Inf" } else { "-Inf" };
        text.to_string()
    } else {
        value.to_string()
    }
}
