//! Trip planner: edits in, committed timelines out.
//!
//! ## Run discipline
//!
//! - Edits apply synchronously to the working list and bump a generation;
//!   a relocated segment's time zone is looked up before its edit is staged
//! - Reconciliation runs are serialized by a single-flight run guard
//! - A run seeded at generation `g` is discarded if the generation moved on,
//!   either before it starts or once its route requests return
//! - A run that survives saves the base list to the store first, then
//!   publishes the reconciled timeline
//!
//! The latest edit always gets a fresh run seeded from the latest list, so
//! discarding a stale run loses nothing.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::edit::{apply_edit, EditError, TimelineEdit};
use crate::pipeline::{Pipeline, PipelineStage, ReconcileOutcome};
use crate::policy::ReconcilePolicy;
use crate::routing::RouteProvider;
use crate::store::SegmentStore;
use crate::timezone::{OffsetTimezoneResolver, TimezoneResolver};
use crate::types::{Coordinates, SegmentId, Timeline};

/// Planner failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    /// The edit was refused.
    #[error(transparent)]
    Edit(#[from] EditError),

    /// The store failed to load or save.
    #[error("Store error: {0}")]
    Store(String),

    /// A newer edit overtook this run; its result was discarded.
    #[error("Run for generation {generation} superseded by a newer edit")]
    Superseded {
        /// Generation the discarded run was seeded from.
        generation: u64,
    },
}

impl PlannerError {
    /// Wrap a store backend error.
    pub fn from_store<E: std::error::Error>(error: E) -> Self {
        Self::Store(error.to_string())
    }

    /// Whether the error only means a newer run took over.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

/// An edit applied to the working list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedEdit {
    /// Generation the edit produced.
    pub generation: u64,
    /// Segment the edit created or targeted.
    pub segment_id: Option<SegmentId>,
    /// Segment whose time zone needs resolving.
    pub relocated: Option<SegmentId>,
}

/// Edit front-end over a store, a routing provider and a time zone resolver.
pub struct TripPlanner<S, R> {
    store: S,
    pipeline: Pipeline<R>,
    timezones: Arc<dyn TimezoneResolver>,
    working: Mutex<Timeline>,
    reconciled: RwLock<Option<ReconcileOutcome>>,
    generation: AtomicU64,
    run_guard: tokio::sync::Mutex<()>,
}

impl<S: SegmentStore, R: RouteProvider> TripPlanner<S, R> {
    /// Load the stored list, or start a fresh trip when the store is empty.
    pub async fn open(store: S, router: R, policy: ReconcilePolicy) -> Result<Self, PlannerError> {
        let segments = store.load_segments().await.map_err(PlannerError::from_store)?;
        let working = if segments.is_empty() {
            Timeline::new_trip()
        } else {
            Timeline::new(segments).without_derived()
        };
        tracing::info!(segments = working.len(), policy = policy.policy_id(), "trip planner opened");

        Ok(Self {
            store,
            pipeline: Pipeline::new(router, policy),
            timezones: Arc::new(OffsetTimezoneResolver),
            working: Mutex::new(working),
            reconciled: RwLock::new(None),
            generation: AtomicU64::new(0),
            run_guard: tokio::sync::Mutex::new(()),
        })
    }

    /// Replace the time zone resolver.
    pub fn with_timezone_resolver(mut self, resolver: impl TimezoneResolver + 'static) -> Self {
        self.timezones = Arc::new(resolver);
        self
    }

    /// The working base list, queued stops last.
    pub fn working(&self) -> Timeline {
        self.working.lock().clone()
    }

    /// The last committed outcome.
    pub fn current(&self) -> Option<ReconcileOutcome> {
        self.reconciled.read().clone()
    }

    /// Current edit generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Stage of the pass in flight.
    pub fn stage(&self) -> PipelineStage {
        self.pipeline.stage()
    }

    /// The store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The pipeline.
    pub fn pipeline(&self) -> &Pipeline<R> {
        &self.pipeline
    }

    /// Apply an edit to the working list without reconciling.
    ///
    /// Time zones of relocated segments are resolved by [`TripPlanner::apply`].
    pub fn stage_edit(&self, edit: &TimelineEdit) -> Result<StagedEdit, PlannerError> {
        self.stage_with_zone(edit, None)
    }

    /// Apply an edit and reconcile.
    pub async fn apply(&self, edit: TimelineEdit) -> Result<ReconcileOutcome, PlannerError> {
        let zone = match edit.new_location() {
            Some(point) => self.lookup_time_zone(point).await,
            None => None,
        };
        let staged = self.stage_with_zone(&edit, zone)?;
        self.run(staged.generation).await
    }

    /// Reconcile the working list as it stands.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, PlannerError> {
        self.run(self.generation()).await
    }

    fn stage_with_zone(&self, edit: &TimelineEdit, zone: Option<String>) -> Result<StagedEdit, PlannerError> {
        let mut working = self.working.lock();
        let mut effect = apply_edit(&working, edit)?;
        if let (Some(id), Some(zone)) = (effect.relocated, zone) {
            let mut segments = effect.timeline.into_segments();
            if let Some(segment) = segments.iter_mut().find(|s| s.id == id) {
                tracing::debug!(segment = %id, zone = %zone, "time zone resolved");
                segment.time_zone = Some(zone);
            }
            effect.timeline = Timeline::new(segments);
        }
        *working = effect.timeline;
        Ok(StagedEdit {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            segment_id: effect.segment_id,
            relocated: effect.relocated,
        })
    }

    async fn lookup_time_zone(&self, point: Coordinates) -> Option<String> {
        match self.timezones.resolve(point).await {
            Ok(zone) => Some(zone),
            Err(error) => {
                tracing::warn!(%error, "time zone left unresolved");
                None
            }
        }
    }

    async fn run(&self, generation: u64) -> Result<ReconcileOutcome, PlannerError> {
        let _guard = self.run_guard.lock().await;
        self.ensure_current(generation)?;

        let (resident, queued) = self.working.lock().split_queued();
        let repair = self.pipeline.repair(&resident).await;
        if let Err(superseded) = self.ensure_current(generation) {
            self.pipeline.reset();
            return Err(superseded);
        }

        let outcome = self.pipeline.finish(repair, queued);
        let base = outcome.base();
        self.store
            .save_segments(base.segments())
            .await
            .map_err(PlannerError::from_store)?;

        // An edit staged during the save keeps its working list; the run it
        // triggers saves again and publishes.
        {
            let mut working = self.working.lock();
            self.ensure_current(generation)?;
            *working = base;
            *self.reconciled.write() = Some(outcome.clone());
        }

        tracing::info!(
            generation,
            fingerprint = %outcome.fingerprint,
            overlaps = outcome.overlap_count(),
            unrouted = outcome.unrouted.len(),
            "timeline committed"
        );
        Ok(outcome)
    }

    fn ensure_current(&self, generation: u64) -> Result<(), PlannerError> {
        let latest = self.generation();
        if latest != generation {
            tracing::warn!(generation, latest, "reconciliation run superseded");
            return Err(PlannerError::Superseded { generation });
        }
        Ok(())
    }
}
