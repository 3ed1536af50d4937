//! Trip planner REST service.
//!
//! Serves one trip, persisted as a JSON segment list, over HTTP. Every
//! request runs inside a `request` span keyed by its `X-Request-Id`, which is
//! echoed back on the response.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `TRIP_STORE_PATH`: Segment file (default: trip_segments.json)
//! - `TRIP_PRIORITY`: Emitter tie-break, "forward" or "backward" (default: forward)
//! - `ROUTE_SPEED_MPH`: Average speed for straight-line routing (default: 50)
//! - `ROUTE_CACHE_ENTRIES`: Route cache capacity (default: 1024)
//! - `ROUTE_CONCURRENCY`: Parallel route requests per pass (default: 4)
//! - `ROUTE_TIMEOUT_MS`: Per-request routing timeout (default: 10000)
//! - `PORT`: Service port (default: 8002)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter
//! - `LOG_FORMAT`: "json" or "pretty" (default: json)
//!
//! ## Usage
//!
//! ```bash
//! TRIP_STORE_PATH=./trip.json cargo run --bin trip_planner_service --features service
//! ```

use std::net::SocketAddr;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trip_timeline_kernel::service::{create_router, metrics_middleware, ServiceState};

const REQUEST_ID: &str = "x-request-id";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trip_planner_service=info,trip_timeline_kernel=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("pretty") => registry.with(fmt::layer().with_target(true)).init(),
        _ => registry
            .with(fmt::layer().json().with_current_span(true).flatten_event(true))
            .init(),
    }
}

/// Tag every request (and the planner logs it triggers) with a request id.
///
/// Status and latency are recorded by `metrics_middleware` inside the span.
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8002);
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let state = ServiceState::from_env().await.map_err(|e| {
        error!(error = %e, "failed to open trip planner");
        e
    })?;
    let working = state.planner.working();
    info!(
        store = %state.planner.store().path().display(),
        segments = working.len(),
        queued = working.iter().filter(|s| s.is_queued).count(),
        policy_id = state.planner.pipeline().policy().policy_id(),
        "trip loaded"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, version = env!("CARGO_PKG_VERSION"), "trip planner service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("trip planner service stopped");
    Ok(())
}
