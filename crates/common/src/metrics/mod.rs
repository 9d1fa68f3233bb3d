//! Metrics and observability utilities
//!
//! Metric names are registered once at startup. Without an installed
//! recorder every helper here is a no-op, so library code can record
//! unconditionally.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all citedin metrics
pub const METRICS_PREFIX: &str = "citedin";

/// Buckets for citation request latency (in seconds)
pub const FETCH_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Buckets for CPU-bound settling work (layout, statistics)
pub const SETTLE_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.010,  // 10ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.500,  // 500ms
    1.000,  // 1s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_fetch_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total citation API requests"
    );

    describe_histogram!(
        format!("{}_fetch_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Citation API request latency in seconds"
    );

    describe_counter!(
        format!("{}_fetch_ids_total", METRICS_PREFIX),
        Unit::Count,
        "Total paper ids sent to the citation API"
    );

    describe_gauge!(
        format!("{}_graph_nodes", METRICS_PREFIX),
        Unit::Count,
        "Nodes in the currently displayed graph"
    );

    describe_counter!(
        format!("{}_cache_replays_total", METRICS_PREFIX),
        Unit::Count,
        "Depth changes served from already fetched data"
    );

    describe_histogram!(
        format!("{}_layout_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Layout simulation time in seconds"
    );

    describe_histogram!(
        format!("{}_stats_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Network statistics computation time in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record one citation API request
pub fn record_fetch(duration_secs: f64, method: &str, id_count: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_fetch_requests_total", METRICS_PREFIX),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    counter!(format!("{}_fetch_ids_total", METRICS_PREFIX)).increment(id_count as u64);

    histogram!(
        format!("{}_fetch_duration_seconds", METRICS_PREFIX),
        "method" => method.to_string()
    )
    .record(duration_secs);
}

/// Helper to record the size of the displayed graph
pub fn record_graph(depth: usize, nodes: usize) {
    gauge!(
        format!("{}_graph_nodes", METRICS_PREFIX),
        "depth" => depth.to_string()
    )
    .set(nodes as f64);
}

/// Helper to record a depth change that needed no network access
pub fn record_cache_replay(direction: &str) {
    counter!(
        format!("{}_cache_replays_total", METRICS_PREFIX),
        "direction" => direction.to_string()
    )
    .increment(1);
}

/// Helper to record settling work
pub fn record_settle(kind: &str, duration_secs: f64) {
    histogram!(format!("{}_{}_duration_seconds", METRICS_PREFIX, kind)).record(duration_secs);
}
