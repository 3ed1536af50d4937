//! Trip Planner REST Service
//!
//! Exposes the trip planner as a REST API.
//!
//! ## Endpoints
//!
//! - `GET /api/timeline` - Last committed timeline
//! - `POST /api/edits` - Apply a timeline edit and reconcile
//! - `POST /api/reconcile` - Reconcile the working list again
//! - `GET /api/overlaps` - Overlaps with their resolution options
//! - `POST /api/overlaps/resolve` - Apply one resolution action
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_edit, record_reconcile_metrics};
pub use routes::{create_router, AppState, ErrorResponse};
pub use state::{ServiceRouter, ServiceState};
