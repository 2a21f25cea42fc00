//! Pipeline metrics.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Metric name constants.
pub mod names {
    /// Messages handled, by final outcome.
    pub const MESSAGES_TOTAL: &str = "sticker_messages_total";
    /// Transform chain runs by media kind and result.
    pub const TRANSFORM_TOTAL: &str = "sticker_transform_total";
    /// Transform chain duration by media kind.
    pub const TRANSFORM_SECONDS: &str = "sticker_transform_seconds";
    /// Acquisition attempts by strategy and result.
    pub const ACQUIRE_TOTAL: &str = "sticker_acquire_total";
}

pub fn record_message(outcome: &'static str) {
    counter!(names::MESSAGES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_transform(kind: &'static str, result: &'static str, elapsed: Duration) {
    counter!(names::TRANSFORM_TOTAL, "kind" => kind, "result" => result).increment(1);
    histogram!(names::TRANSFORM_SECONDS, "kind" => kind).record(elapsed.as_secs_f64());
}

pub fn record_acquire(strategy: &'static str, result: &'static str) {
    counter!(names::ACQUIRE_TOTAL, "strategy" => strategy, "result" => result).increment(1);
}

/// Install the Prometheus recorder with an HTTP scrape listener on `port`.
pub fn init_prometheus(port: u16) -> Result<(), String> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| e.to_string())
}
