//! Metrics for the conversion pipeline.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const GIF_CONVERSIONS_TOTAL: &str = "stanbot_gif_conversions_total";
    pub const GIF_COMPRESSION_ATTEMPTS: &str = "stanbot_gif_compression_attempts";
    pub const GIF_OUTPUT_BYTES: &str = "stanbot_gif_output_bytes";
}

/// Record a finished conversion. `outcome` is `fit`, `oversized`, or `error`.
pub fn record_conversion(kind: &str, outcome: &str) {
    let labels = [
        ("kind", kind.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::GIF_CONVERSIONS_TOTAL, &labels).increment(1);
}

/// Record how many encode attempts a conversion used.
pub fn record_attempts(kind: &str, attempts: u64) {
    let labels = [("kind", kind.to_string())];
    histogram!(names::GIF_COMPRESSION_ATTEMPTS, &labels).record(attempts as f64);
}

/// Record the final artifact size in bytes.
pub fn record_output_bytes(kind: &str, bytes: u64) {
    let labels = [("kind", kind.to_string())];
    histogram!(names::GIF_OUTPUT_BYTES, &labels).record(bytes as f64);
}
