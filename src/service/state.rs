//! Service state management.
//!
//! Holds the trip planner and the shared route cache.

use std::sync::Arc;
use std::time::Instant;

use crate::planner::{PlannerError, TripPlanner};
use crate::policy::ReconcilePolicy;
use crate::routing::cache::DEFAULT_ROUTE_CACHE_ENTRIES;
use crate::routing::{CachedRouter, StraightLineRouter};
use crate::store::{JsonFileSegmentStore, SegmentStore};

/// Route provider used by the service.
pub type ServiceRouter = Arc<CachedRouter<StraightLineRouter>>;

/// Shared service state.
pub struct ServiceState<S: SegmentStore + 'static> {
    /// Planner owning the timeline.
    pub planner: Arc<TripPlanner<S, ServiceRouter>>,
    /// Route cache shared with the planner, kept for statistics.
    pub route_cache: ServiceRouter,
    started_at: Instant,
}

impl<S: SegmentStore + 'static> ServiceState<S> {
    /// Open a planner over `store`, routing through a cached straight-line router.
    pub async fn open(
        store: S,
        router: StraightLineRouter,
        cache_entries: usize,
        policy: ReconcilePolicy,
    ) -> Result<Self, PlannerError> {
        let route_cache = Arc::new(CachedRouter::new(router, cache_entries));
        let planner = TripPlanner::open(store, Arc::clone(&route_cache), policy).await?;
        Ok(Self {
            planner: Arc::new(planner),
            route_cache,
            started_at: Instant::now(),
        })
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl ServiceState<JsonFileSegmentStore> {
    /// Create service state from environment variables.
    ///
    /// Reads `TRIP_STORE_PATH`, `ROUTE_SPEED_MPH`, `ROUTE_CACHE_ENTRIES`,
    /// `TRIP_PRIORITY`, `ROUTE_CONCURRENCY` and `ROUTE_TIMEOUT_MS`.
    pub async fn from_env() -> Result<Self, PlannerError> {
        let cache_entries = std::env::var("ROUTE_CACHE_ENTRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ROUTE_CACHE_ENTRIES);

        Self::open(
            JsonFileSegmentStore::from_env(),
            StraightLineRouter::from_env(),
            cache_entries,
            ReconcilePolicy::from_env(),
        )
        .await
    }
}

impl<S: SegmentStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            planner: Arc::clone(&self.planner),
            route_cache: Arc::clone(&self.route_cache),
            started_at: self.started_at,
        }
    }
}
