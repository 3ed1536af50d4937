//! Pipeline orchestration.
//!
//! One reconciliation pass:
//!
//! ```text
//! remove derived → repair corridors → soft derivation → annotate emitters
//!   → determine directions → propagate → derive slack/overlap
//! ```
//!
//! Every stage takes a [`Timeline`] by reference and returns a new one, so a
//! pass that fails or is abandoned half-way leaves its input untouched.
//! Queued stops are held aside for the whole pass and handed back unchanged.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::corridor::{CorridorManager, RepairOutcome};
use crate::derived::{compute_slack_and_overlap, remove_derived_segments};
use crate::emitter::{annotate_emitters, determine_emitter_directions};
use crate::policy::{Priority, ReconcilePolicy};
use crate::propagation::{collect_warnings, propagate_times, TimelineWarning};
use crate::routing::RouteProvider;
use crate::types::{derive_soft_field, Segment, SegmentId, Timeline};

/// Stage of a running pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// No pass running.
    #[default]
    Idle,
    /// Corridor repair and routing.
    Repairing,
    /// Soft derivation and emitter analysis.
    Annotating,
    /// Forward and backward propagation.
    Propagating,
    /// Slack/overlap derivation.
    Deriving,
}

impl PipelineStage {
    /// The stage that follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Repairing,
            Self::Repairing => Self::Annotating,
            Self::Annotating => Self::Propagating,
            Self::Propagating => Self::Deriving,
            Self::Deriving => Self::Idle,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Repairing => write!(f, "repairing"),
            Self::Annotating => write!(f, "annotating"),
            Self::Propagating => write!(f, "propagating"),
            Self::Deriving => write!(f, "deriving"),
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Reconciled resident timeline, derived entries included.
    pub timeline: Timeline,
    /// Queued stops, untouched.
    pub queued: Vec<Segment>,
    /// Drives that could not be routed.
    pub unrouted: Vec<SegmentId>,
    /// Drives deleted by the repair pass.
    pub removed_drives: Vec<SegmentId>,
    /// Drives created by the repair pass.
    pub synthesized_drives: Vec<SegmentId>,
    /// Segments still missing temporal data.
    pub warnings: Vec<TimelineWarning>,
    /// Fingerprint of `timeline`.
    pub fingerprint: String,
    /// Policy the pass ran under.
    pub policy_id: String,
    /// Hash of the policy parameters.
    pub policy_params_hash: String,
}

impl ReconcileOutcome {
    /// The list to persist: derived entries stripped, queued stops last.
    pub fn base(&self) -> Timeline {
        self.timeline.without_derived().with_queued(self.queued.clone())
    }

    /// Number of overlaps.
    pub fn overlap_count(&self) -> usize {
        self.timeline.overlaps().count()
    }
}

/// Re-derive the soft field of every stop.
pub fn derive_soft_fields(timeline: &Timeline) -> Timeline {
    Timeline::new(timeline.iter().map(derive_soft_field).collect())
}

/// The time-only part of a pass, with no corridor repair.
///
/// Pure and deterministic: the same input always yields the same output, and
/// feeding the output back in is a fixed point.
pub fn reconcile_times(timeline: &Timeline, priority: Priority) -> Timeline {
    let base = derive_soft_fields(&remove_derived_segments(timeline));
    let analysis = determine_emitter_directions(annotate_emitters(&base), priority);
    let propagated = propagate_times(&base, &analysis);
    compute_slack_and_overlap(&propagated, &analysis)
}

/// Orchestrates reconciliation passes over a routing provider.
pub struct Pipeline<R> {
    corridor: CorridorManager<R>,
    policy: ReconcilePolicy,
    stage: Mutex<PipelineStage>,
}

impl<R: RouteProvider> Pipeline<R> {
    /// Create a pipeline.
    pub fn new(router: R, policy: ReconcilePolicy) -> Self {
        Self {
            corridor: CorridorManager::new(router, &policy),
            policy,
            stage: Mutex::new(PipelineStage::Idle),
        }
    }

    /// The policy in force.
    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// The corridor manager.
    pub fn corridor(&self) -> &CorridorManager<R> {
        &self.corridor
    }

    /// Current stage.
    pub fn stage(&self) -> PipelineStage {
        *self.stage.lock()
    }

    fn enter(&self, stage: PipelineStage) {
        *self.stage.lock() = stage;
        tracing::debug!(%stage, "pipeline stage");
    }

    /// Return to `Idle` after a pass was abandoned between stages.
    pub fn reset(&self) {
        self.enter(PipelineStage::Idle);
    }

    /// Full pass.
    pub async fn run(&self, timeline: &Timeline) -> ReconcileOutcome {
        let (resident, queued) = timeline.split_queued();
        let repair = self.repair(&resident).await;
        self.finish(repair, queued)
    }

    /// Corridor stage only. The sole suspension point of a pass.
    ///
    /// `timeline` must not contain queued stops.
    pub async fn repair(&self, timeline: &Timeline) -> RepairOutcome {
        self.enter(PipelineStage::Repairing);
        let base = remove_derived_segments(timeline);
        self.corridor.validate_and_repair(&base).await
    }

    /// Everything after corridor repair. Never suspends.
    pub fn finish(&self, repair: RepairOutcome, queued: Vec<Segment>) -> ReconcileOutcome {
        self.enter(PipelineStage::Annotating);
        let base = derive_soft_fields(&repair.timeline);
        let analysis = determine_emitter_directions(annotate_emitters(&base), self.policy.priority);

        self.enter(PipelineStage::Propagating);
        let propagated = propagate_times(&base, &analysis);
        let warnings = collect_warnings(&propagated);

        self.enter(PipelineStage::Deriving);
        let timeline = compute_slack_and_overlap(&propagated, &analysis);
        let fingerprint = timeline.fingerprint();

        self.enter(PipelineStage::Idle);
        let outcome = ReconcileOutcome {
            timeline,
            queued,
            unrouted: repair.unrouted,
            removed_drives: repair.removed,
            synthesized_drives: repair.synthesized,
            warnings,
            fingerprint,
            policy_id: self.policy.policy_id().to_string(),
            policy_params_hash: self.policy.params_hash(),
        };

        tracing::debug!(
            segments = outcome.timeline.len(),
            overlaps = outcome.overlap_count(),
            unrouted = outcome.unrouted.len(),
            warnings = outcome.warnings.len(),
            fingerprint = %outcome.fingerprint,
            "reconciliation pass complete"
        );
        outcome
    }
}
