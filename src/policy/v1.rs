//! ReconcilePolicy v1: the application-wide knobs of a reconciliation pass.
//!
//! The `priority` tie-break is the only knob that changes scheduling
//! results. It lives here, once, and every pipeline entry point takes it from
//! the same policy value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::canonical::canonical_hash_hex;
use crate::DEFAULT_POLICY_VERSION;

/// Which side wins when two neighbouring pins have equal rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// The earlier pin fills the span (chronological planning).
    #[default]
    Forward,
    /// The later pin fills the span (deadline-driven planning).
    Backward,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(Self::Forward),
            "backward" => Ok(Self::Backward),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}

/// Reconciliation policy version 1.
///
/// ## Parameters
///
/// - `priority`: equal-rank tie-break between neighbouring pins
/// - `route_concurrency`: maximum in-flight route requests per repair pass
/// - `route_timeout_ms`: per-request routing timeout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Policy version identifier.
    pub version: String,
    /// Equal-rank tie-break.
    pub priority: Priority,
    /// Maximum concurrent route requests.
    pub route_concurrency: usize,
    /// Timeout for one route request, in milliseconds.
    pub route_timeout_ms: u64,
}

impl ReconcilePolicy {
    /// Create a policy with the given tie-break and default routing limits.
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// - `TRIP_PRIORITY`: `forward` | `backward`
    /// - `ROUTE_CONCURRENCY`: positive integer
    /// - `ROUTE_TIMEOUT_MS`: milliseconds
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            version: defaults.version,
            priority: std::env::var("TRIP_PRIORITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.priority),
            route_concurrency: std::env::var("ROUTE_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.route_concurrency),
            route_timeout_ms: std::env::var("ROUTE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.route_timeout_ms),
        }
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Route request timeout.
    pub fn route_timeout(&self) -> Duration {
        Duration::from_millis(self.route_timeout_ms)
    }

    /// Hash of the policy parameters, for provenance of a reconciled timeline.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            priority: Priority::Forward,
            route_concurrency: 4,
            route_timeout_ms: 10_000,
        }
    }
}
