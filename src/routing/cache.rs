//! LRU route cache.
//!
//! Wraps any [`RouteProvider`]. Keys are the origin/destination pair
//! quantized to 1e-5 degrees (about a metre), so repeated repair passes over
//! an unchanged timeline never reach the provider. Failures are not cached.

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Route, RouteProvider, RoutingError};
use crate::types::Coordinates;

const QUANTUM: f64 = 1e5;

/// Default number of cached legs.
pub const DEFAULT_ROUTE_CACHE_ENTRIES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RouteCacheKey([i64; 4]);

impl RouteCacheKey {
    fn new(origin: Coordinates, destination: Coordinates) -> Self {
        let q = |v: f64| (v * QUANTUM).round() as i64;
        Self([q(origin.lon), q(origin.lat), q(destination.lon), q(destination.lat)])
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteCacheStats {
    /// Requests served from the cache.
    pub hits: u64,
    /// Requests forwarded to the provider.
    pub misses: u64,
    /// Legs currently cached.
    pub entries: usize,
}

/// Route provider with an LRU cache in front.
pub struct CachedRouter<P> {
    inner: P,
    cache: RwLock<LruCache<RouteCacheKey, Route>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P: RouteProvider> CachedRouter<P> {
    /// Wrap `inner` with a cache of at most `max_entries` legs.
    pub fn new(inner: P, max_entries: usize) -> Self {
        let size = NonZeroUsize::new(max_entries)
            .or(NonZeroUsize::new(DEFAULT_ROUTE_CACHE_ENTRIES))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: RwLock::new(LruCache::new(size)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Current statistics.
    pub fn stats(&self) -> RouteCacheStats {
        RouteCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.read().len(),
        }
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: RouteProvider> RouteProvider for CachedRouter<P> {
    async fn get_route(&self, origin: Coordinates, destination: Coordinates) -> Result<Route, RoutingError> {
        let key = RouteCacheKey::new(origin, destination);

        if let Some(route) = self.cache.read().peek(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(route.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let route = self.inner.get_route(origin, destination).await?;
        self.cache.write().put(key, route.clone());
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Counts calls and fails on demand.
    struct CountingRouter {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RouteProvider for CountingRouter {
        async fn get_route(&self, origin: Coordinates, destination: Coordinates) -> Result<Route, RoutingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RoutingError::Provider("down".to_string()));
            }
            Ok(Route {
                geometry: vec![origin, destination],
                distance_mi: 10.0,
                duration_min: 12.0,
            })
        }
    }

    fn counting(fail: bool) -> CachedRouter<CountingRouter> {
        CachedRouter::new(CountingRouter { calls: AtomicUsize::new(0), fail }, 8)
    }

    #[tokio::test]
    async fn test_second_request_is_a_hit() {
        let router = counting(false);
        let a = Coordinates::new(-120.0, 38.0);
        let b = Coordinates::new(-121.0, 39.0);

        router.get_route(a, b).await.unwrap();
        router.get_route(a, b).await.unwrap();

        assert_eq!(router.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(router.stats(), RouteCacheStats { hits: 1, misses: 1, entries: 1 });
    }

    #[tokio::test]
    async fn test_direction_matters() {
        let router = counting(false);
        let a = Coordinates::new(-120.0, 38.0);
        let b = Coordinates::new(-121.0, 39.0);

        router.get_route(a, b).await.unwrap();
        router.get_route(b, a).await.unwrap();
        assert_eq!(router.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let router = counting(true);
        let a = Coordinates::new(0.0, 0.0);

        assert!(router.get_route(a, a).await.is_err());
        assert!(router.get_route(a, a).await.is_err());
        assert_eq!(router.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(router.stats().entries, 0);
    }

    #[test]
    fn test_zero_capacity_falls_back_to_default() {
        let router = CachedRouter::new(crate::routing::StraightLineRouter::default(), 0);
        assert_eq!(router.cache.read().cap().get(), DEFAULT_ROUTE_CACHE_ENTRIES);
    }
}
