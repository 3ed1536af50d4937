//! Offline route estimates from great-circle distance.

use async_trait::async_trait;

use super::{Route, RouteProvider, RoutingError};
use crate::types::Coordinates;

const EARTH_RADIUS_MI: f64 = 3958.8;

/// Estimates legs as a straight line scaled by a road detour factor and
/// driven at a constant average speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightLineRouter {
    /// Average driving speed in miles per hour.
    pub speed_mph: f64,
    /// Multiplier from great-circle to road distance.
    pub detour_factor: f64,
}

impl StraightLineRouter {
    /// Create a router with the given average speed and the default detour factor.
    pub fn new(speed_mph: f64) -> Self {
        Self {
            speed_mph,
            ..Self::default()
        }
    }

    /// Load speed from `ROUTE_SPEED_MPH`, falling back to defaults.
    pub fn from_env() -> Self {
        std::env::var("ROUTE_SPEED_MPH")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(Self::new)
            .unwrap_or_default()
    }
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self {
            speed_mph: 50.0,
            detour_factor: 1.25,
        }
    }
}

fn is_valid(point: &Coordinates) -> bool {
    point.lon.is_finite()
        && point.lat.is_finite()
        && (-180.0..=180.0).contains(&point.lon)
        && (-90.0..=90.0).contains(&point.lat)
}

/// Great-circle distance in miles (haversine).
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MI * h.sqrt().min(1.0).asin()
}

#[async_trait]
impl RouteProvider for StraightLineRouter {
    async fn get_route(&self, origin: Coordinates, destination: Coordinates) -> Result<Route, RoutingError> {
        if !is_valid(&origin) || !is_valid(&destination) {
            return Err(RoutingError::NoRoute {
                origin: Some(origin),
                destination: Some(destination),
            });
        }
        if self.speed_mph <= 0.0 {
            return Err(RoutingError::Provider(format!("invalid speed {} mph", self.speed_mph)));
        }

        let distance_mi = haversine_miles(origin, destination) * self.detour_factor;
        Ok(Route {
            geometry: vec![origin, destination],
            distance_mi,
            duration_min: distance_mi / self.speed_mph * 60.0,
        })
    }
}
