//! Settings-store metrics, exported through whatever recorder the binary installs.

use std::time::Duration;

use metrics::{counter, histogram};

pub const SETTINGS_REQUESTS: &str = "sticker_settings_requests_total";
pub const SETTINGS_RETRIES: &str = "sticker_settings_retries_total";
pub const SETTINGS_LATENCY: &str = "sticker_settings_request_seconds";

/// One finished Firestore call. `status` is the HTTP status, or 500 for
/// transport failures.
pub fn record_request(operation: &str, collection: &str, status: u16, elapsed: Duration) {
    counter!(
        SETTINGS_REQUESTS,
        "operation" => operation.to_string(),
        "collection" => collection.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(SETTINGS_LATENCY, "operation" => operation.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_retry(operation: &str) {
    counter!(SETTINGS_RETRIES, "operation" => operation.to_string()).increment(1);
}
