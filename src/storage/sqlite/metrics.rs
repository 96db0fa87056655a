//! Gateway operation metrics.

use std::time::Instant;

/// Records operation metrics for gateway operations.
///
/// This function records two metrics for each operation:
/// 1. `gateway_operations_total` - Counter for operation count by status
/// 2. `gateway_operation_duration_ms` - Histogram for operation latency
///
/// # Arguments
///
/// * `lane` - Execution lane name ("foreground" or "background")
/// * `operation` - Operation name (e.g., "execute", "query", "execute_batch")
/// * `start` - Operation start time from `Instant::now()`
/// * `status` - Operation status ("success" or "error")
///
/// # Examples
///
/// ```ignore
/// use std::time::Instant;
/// use sqlaccess::storage::sqlite::record_operation_metrics;
///
/// let start = Instant::now();
/// // ... perform operation ...
/// record_operation_metrics("foreground", "query", start, "success");
/// ```
pub fn record_operation_metrics(
    lane: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "gateway_operations_total",
        "lane" => lane,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "gateway_operation_duration_ms",
        "lane" => lane,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_operation_metrics_without_recorder() {
        // No recorder is installed in unit tests; recording must be a no-op.
        record_operation_metrics("foreground", "execute", Instant::now(), "success");
        record_operation_metrics("background", "query", Instant::now(), "error");
    }
}
