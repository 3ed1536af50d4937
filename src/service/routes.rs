//! Axum routes for the trip planner service.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::edit::{EditError, TimelineEdit};
use crate::pipeline::{PipelineStage, ReconcileOutcome};
use crate::planner::PlannerError;
use crate::resolution::{resolution_options, OverlapResolution, ResolutionAction, ResolutionError};
use crate::routing::RouteCacheStats;
use crate::store::{JsonFileSegmentStore, SegmentStore};
use crate::TIMELINE_KERNEL_SCHEMA_VERSION;

use super::middleware::{record_edit, record_reconcile_metrics};
use super::state::ServiceState;

/// Type alias for the service state backed by the JSON file store.
pub type AppState = ServiceState<JsonFileSegmentStore>;

// ============================================================================
// Request/Response Types
// ============================================================================

/// A committed timeline with the generation it reflects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineResponse {
    /// Edit generation of the working list when the pass committed.
    pub generation: u64,
    /// The committed pass.
    pub outcome: ReconcileOutcome,
}

/// Overlaps of the committed timeline with their fixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapsResponse {
    /// One entry per overlap, in timeline order.
    pub overlaps: Vec<OverlapResolution>,
}

/// Request to apply one overlap fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// The fix.
    pub action: ResolutionAction,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub schema_version: String,
    pub policy_id: String,
    pub policy_params_hash: String,
    pub generation: u64,
    pub stage: PipelineStage,
    /// Fingerprint of the last committed timeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub route_cache: RouteCacheStats,
    pub uptime_secs: u64,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub store: bool,
    pub details: Option<String>,
}

/// Structured error response with correlation ID for tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Correlation ID for request tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            correlation_id: None,
            details: None,
        }
    }

    /// Add a correlation ID to the error.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(
            code = %self.code,
            error = %self.error,
            correlation_id = ?self.correlation_id,
            "Request error"
        );
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn planner_error(error: PlannerError) -> ApiError {
    let (status, code) = match &error {
        PlannerError::Edit(EditError::SegmentNotFound(_))
        | PlannerError::Edit(EditError::Resolution(ResolutionError::SegmentNotFound(_))) => {
            (StatusCode::NOT_FOUND, "SEGMENT_NOT_FOUND")
        }
        PlannerError::Edit(EditError::DuplicateSegment(_)) => (StatusCode::CONFLICT, "DUPLICATE_SEGMENT"),
        PlannerError::Edit(EditError::Resolution(_)) => (StatusCode::BAD_REQUEST, "RESOLUTION_REJECTED"),
        PlannerError::Edit(_) => (StatusCode::BAD_REQUEST, "INVALID_EDIT"),
        PlannerError::Superseded { .. } => (StatusCode::CONFLICT, "SUPERSEDED"),
        PlannerError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_FAILED"),
    };
    (status, Json(ErrorResponse::new(code, error.to_string())))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Return the committed timeline, reconciling once if nothing is committed yet.
async fn timeline_handler<S: SegmentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let outcome = match state.planner.current() {
        Some(outcome) => outcome,
        None => state.planner.reconcile().await.map_err(planner_error)?,
    };
    Ok(Json(TimelineResponse {
        generation: state.planner.generation(),
        outcome,
    }))
}

/// Apply one edit and reconcile.
async fn edit_handler<S: SegmentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Json(edit): Json<TimelineEdit>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let op = edit.name();
    let start = Instant::now();

    match state.planner.apply(edit).await {
        Ok(outcome) => {
            record_edit(op, "committed");
            record_reconcile_metrics(&outcome, start.elapsed().as_millis() as u64);
            Ok(Json(TimelineResponse {
                generation: state.planner.generation(),
                outcome,
            }))
        }
        Err(error) => {
            record_edit(op, if error.is_superseded() { "superseded" } else { "rejected" });
            Err(planner_error(error))
        }
    }
}

/// Re-run reconciliation on the working list.
async fn reconcile_handler<S: SegmentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let start = Instant::now();
    let outcome = state.planner.reconcile().await.map_err(planner_error)?;
    record_reconcile_metrics(&outcome, start.elapsed().as_millis() as u64);

    Ok(Json(TimelineResponse {
        generation: state.planner.generation(),
        outcome,
    }))
}

/// List the overlaps of the committed timeline and how to fix each.
async fn overlaps_handler<S: SegmentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Json<OverlapsResponse> {
    let overlaps = state
        .planner
        .current()
        .map(|outcome| resolution_options(&outcome.timeline))
        .unwrap_or_default();
    Json(OverlapsResponse { overlaps })
}

/// Apply one overlap fix.
async fn resolve_handler<S: SegmentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<TimelineResponse>, ApiError> {
    edit_handler(
        State(state),
        Json(TimelineEdit::Resolve { action: request.action }),
    )
    .await
}

/// Health check endpoint (detailed).
async fn health_handler<S: SegmentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Json<HealthResponse> {
    let policy = state.planner.pipeline().policy();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: TIMELINE_KERNEL_SCHEMA_VERSION.to_string(),
        policy_id: policy.policy_id().to_string(),
        policy_params_hash: policy.params_hash(),
        generation: state.planner.generation(),
        stage: state.planner.stage(),
        fingerprint: state.planner.current().map(|o| o.fingerprint),
        route_cache: state.route_cache.stats(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Liveness probe endpoint.
///
/// Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the store can be read, 503 otherwise.
async fn readiness_handler<S: SegmentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    match state.planner.store().load_segments().await {
        Ok(_) => Ok(Json(ReadinessResponse {
            ready: true,
            store: true,
            details: None,
        })),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store: false,
                details: Some(format!("Segment store unreadable: {}", e)),
            }),
        )),
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the trip planner service.
pub fn create_router<S: SegmentStore + 'static>(state: ServiceState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Timeline
        .route("/api/timeline", get(timeline_handler::<S>))
        .route("/api/edits", post(edit_handler::<S>))
        .route("/api/reconcile", post(reconcile_handler::<S>))
        // Overlaps
        .route("/api/overlaps", get(overlaps_handler::<S>))
        .route("/api/overlaps/resolve", post(resolve_handler::<S>))
        // Health checks
        .route("/health", get(health_handler::<S>))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ReconcilePolicy;
    use crate::routing::StraightLineRouter;
    use crate::store::InMemorySegmentStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn app() -> Router {
        let state = ServiceState::open(
            InMemorySegmentStore::new(),
            StraightLineRouter::default(),
            64,
            ReconcilePolicy::default(),
        )
        .await
        .unwrap();
        create_router(state)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_timeline_reconciles_on_first_read() {
        let response = app()
            .await
            .oneshot(Request::get("/api/timeline").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let segments = body["outcome"]["timeline"].as_array().unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1]["kind"]["type"], "drive");
    }

    #[tokio::test]
    async fn test_edit_queue_stop() {
        let request = Request::post("/api/edits")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"op":"queue_stop","name":"Diner"}"#))
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["generation"], 1);
        assert_eq!(body["outcome"]["queued"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_unknown_segment_is_not_found() {
        let body = format!(
            r#"{{"op":"delete_stop","segment_id":"{}"}}"#,
            uuid::Uuid::new_v4()
        );
        let request = Request::post("/api/edits")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "SEGMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_health_reports_policy() {
        let response = app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["policy_id"], "reconcile_policy_v1");
        assert_eq!(body["schema_version"], TIMELINE_KERNEL_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_overlaps_empty_before_first_commit() {
        let response = app()
            .await
            .oneshot(Request::get("/api/overlaps").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(json_body(response).await["overlaps"].as_array().unwrap().len(), 0);
    }
}
