//! Service middleware for metrics and request tracking.
//!
//! ## Metrics Exposed
//!
//! - `request` - request count and latency by path, method, status
//! - `reconcile` - segments, overlaps and unrouted drives per committed pass
//! - `edit` - edit outcomes by operation

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use regex_lite::Regex;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

use crate::pipeline::ReconcileOutcome;

/// Metrics middleware that records request counts and latency.
///
/// Uses tracing events; aggregate them from the logs.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "trip_timeline::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Replaces segment UUIDs with a placeholder.
fn normalize_path(path: &str) -> String {
    static UUID: OnceLock<Option<Regex>> = OnceLock::new();
    let uuid = UUID.get_or_init(|| {
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
    });

    match uuid {
        Some(re) => re.replace_all(path, ":id").to_string(),
        None => path.to_string(),
    }
}

/// Record metrics for a committed reconciliation pass.
pub fn record_reconcile_metrics(outcome: &ReconcileOutcome, latency_ms: u64) {
    info!(
        target: "trip_timeline::metrics",
        metric_type = "reconcile",
        segments = outcome.timeline.len(),
        overlaps = outcome.overlap_count(),
        unrouted = outcome.unrouted.len(),
        warnings = outcome.warnings.len(),
        latency_ms = latency_ms,
        "reconcile_metric"
    );
}

/// Record the outcome of one edit.
pub fn record_edit(op: &str, status: &str) {
    info!(
        target: "trip_timeline::metrics",
        metric_type = "edit",
        op = op,
        status = status,
        "edit_metric"
    );
}
