// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the service.
//
// Besides the usual HTTP/DB/Redis latencies, every classification endpoint
// publishes the distribution it just computed (how many products are low on
// stock, how many materials are critical...) so dashboards can alert on them
// without re-implementing the rules.
// =============================================================================

use std::collections::HashMap;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::classify::Severity;
use crate::models::ProductStatus;

// =============================================================================
// METRIC NAMES
// =============================================================================

/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Labels: operation (select/update)
pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";

/// Labels: operation (get/set/delete)
pub const REDIS_OPERATION_DURATION_SECONDS: &str = "redis_operation_duration_seconds";

/// Products per derived stock status. Labels: status
pub const PRODUCT_STOCK_STATUS_ITEMS: &str = "product_stock_status_items";

/// Materials per health severity. Labels: severity
pub const MATERIAL_HEALTH_ITEMS: &str = "material_health_items";

/// Unread notifications visible to the last admin request
pub const NOTIFICATIONS_UNREAD: &str = "notifications_unread";

/// Labels: classifier (stock/material/stage/notifications/activity)
pub const CLASSIFICATIONS_TOTAL: &str = "classifications_total";

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Install the global Prometheus recorder and return its render handle.
pub fn setup_metrics() -> Result<PrometheusHandle> {
    // 1ms .. 10s
    let latency_buckets = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(DB_QUERY_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(REDIS_OPERATION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_histogram!(DB_QUERY_DURATION_SECONDS, "Database query latency in seconds");
    describe_histogram!(REDIS_OPERATION_DURATION_SECONDS, "Redis operation latency in seconds");
    describe_gauge!(PRODUCT_STOCK_STATUS_ITEMS, "Number of products per derived stock status");
    describe_gauge!(MATERIAL_HEALTH_ITEMS, "Number of raw materials per health severity");
    describe_gauge!(NOTIFICATIONS_UNREAD, "Unread notifications across all modules");
    describe_counter!(CLASSIFICATIONS_TOTAL, "Number of records classified, per classifier");

    Ok(handle)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

pub fn record_db_query(operation: &str, duration_secs: f64) {
    histogram!(
        DB_QUERY_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

pub fn record_redis_operation(operation: &str, duration_secs: f64) {
    histogram!(
        REDIS_OPERATION_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Count `records` classified by `classifier`
pub fn record_classifications(classifier: &'static str, records: usize) {
    counter!(CLASSIFICATIONS_TOTAL, "classifier" => classifier).increment(records as u64);
}

/// Publish the full stock-status distribution. Statuses absent from
/// `statuses` are set to zero so stale values don't linger.
pub fn set_stock_status_counts(statuses: &[ProductStatus]) {
    let counts = tally(statuses);
    for status in ProductStatus::ALL {
        let count = counts.get(&status).copied().unwrap_or(0);
        gauge!(PRODUCT_STOCK_STATUS_ITEMS, "status" => status.as_str()).set(count as f64);
    }
}

/// Publish the full material-health distribution.
pub fn set_material_health_counts(severities: &[Severity]) {
    let counts = tally(severities);
    for severity in Severity::ALL {
        let count = counts.get(&severity).copied().unwrap_or(0);
        gauge!(MATERIAL_HEALTH_ITEMS, "severity" => severity.as_str()).set(count as f64);
    }
}

pub fn set_unread_notifications(count: i64) {
    gauge!(NOTIFICATIONS_UNREAD).set(count as f64);
}

fn tally<T: Copy + Eq + std::hash::Hash>(values: &[T]) -> HashMap<T, usize> {
    let mut counts = HashMap::new();
    for value in values {
        *counts.entry(*value).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally() {
        let counts = tally(&[Severity::Ok, Severity::Critical, Severity::Ok]);

        assert_eq!(counts.get(&Severity::Ok), Some(&2));
        assert_eq!(counts.get(&Severity::Critical), Some(&1));
        assert_eq!(counts.get(&Severity::Info), None);
    }
}
