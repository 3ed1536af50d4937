//! Routing providers.
//!
//! The corridor manager asks a [`RouteProvider`] for the geometry, distance
//! and driving time between two points. Providers only ever see coordinates,
//! never segments.

pub mod cache;
pub mod straight_line;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::types::Coordinates;

/// A routed leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Polyline from origin to destination.
    pub geometry: Vec<Coordinates>,
    /// Distance in miles.
    pub distance_mi: f64,
    /// Driving time in minutes.
    pub duration_min: f64,
}

/// Routing failure. Never fatal to a reconciliation pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoutingError {
    /// The provider found no route, or an endpoint has no usable coordinates.
    #[error("No route between {origin:?} and {destination:?}")]
    NoRoute {
        /// Origin point, if known.
        origin: Option<Coordinates>,
        /// Destination point, if known.
        destination: Option<Coordinates>,
    },

    /// The request did not finish in time.
    #[error("Route request timed out after {0:?}")]
    Timeout(Duration),

    /// Provider-specific failure.
    #[error("Routing provider error: {0}")]
    Provider(String),
}

/// Source of routes between two points.
///
/// Calls must be idempotent for a given pair so that failed requests can be
/// retried on the next pass.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Route from `origin` to `destination`.
    async fn get_route(&self, origin: Coordinates, destination: Coordinates) -> Result<Route, RoutingError>;
}

#[async_trait]
impl<P: RouteProvider + ?Sized> RouteProvider for Arc<P> {
    async fn get_route(&self, origin: Coordinates, destination: Coordinates) -> Result<Route, RoutingError> {
        (**self).get_route(origin, destination).await
    }
}

pub use cache::{CachedRouter, RouteCacheStats};
pub use straight_line::StraightLineRouter;
