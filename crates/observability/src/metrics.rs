//! Publish-side metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use metrics::{counter, gauge, histogram};

/// Record one upstream publish call carrying `items` messages
pub fn record_publish(endpoint: &str, items: usize, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "pubcontrol_publish_calls_total",
        "endpoint" => endpoint.to_string(),
        "status" => status
    )
    .increment(1);

    counter!(
        "pubcontrol_items_published_total",
        "endpoint" => endpoint.to_string(),
        "status" => status
    )
    .increment(items as u64);
}

/// Record the size of a batch drained by an endpoint worker
pub fn record_batch(endpoint: &str, size: usize) {
    histogram!(
        "pubcontrol_batch_size",
        "endpoint" => endpoint.to_string()
    )
    .record(size as f64);
}

/// Record the current asynchronous queue depth of an endpoint
pub fn record_queue_depth(endpoint: &str, depth: usize) {
    gauge!(
        "pubcontrol_queue_depth",
        "endpoint" => endpoint.to_string()
    )
    .set(depth as f64);
}

/// Record the outcome of a parallel fan-out
pub fn record_fanout(failed: usize, total: usize) {
    counter!("pubcontrol_fanout_total").increment(1);
    histogram!("pubcontrol_fanout_endpoints").record(total as f64);

    if failed > 0 {
        counter!("pubcontrol_fanout_failed_endpoints_total").increment(failed as u64);
    }
}
