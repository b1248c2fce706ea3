pub mod client;
pub mod types;

pub use client::UptimeRobotClient;
pub use types::RawMonitor;
