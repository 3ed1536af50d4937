//! # trip-timeline-kernel
//!
//! Lock-aware timeline reconciliation for road trip plans.
//!
//! The kernel answers one question:
//!
//! > Given an ordered list of trip segments, some of them pinned in time,
//! > what does the whole schedule look like?
//!
//! ## Core Contract
//!
//! 1. Keep exactly one drive between every pair of adjacent stops
//! 2. Fill unpinned timestamps from the strongest pinned neighbours, never
//!    overwriting a pinned value
//! 3. Mark idle gaps as `slack` and conflicts as `overlap`, naming the pins
//!    that cause each conflict
//!
//! ## Architecture
//!
//! ```text
//! TimelineEdit → apply_edit → Pipeline ─┬→ CorridorManager (RouteProvider)
//!                                       ├→ Emitter analysis
//!                                       ├→ Time propagation
//!                                       └→ Slack/overlap derivation
//!                                              ↓
//!                                        SegmentStore (JSON file or memory)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same base list + same policy + same routes → identical fingerprint
//! - Reconciling a reconciled timeline is a fixed point
//! - Derived segment ids are content-derived, never random

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod canonical;
pub mod emitter;
pub mod propagation;
pub mod corridor;
pub mod derived;
pub mod resolution;
pub mod edit;
pub mod pipeline;
pub mod planner;
pub mod routing;
pub mod timezone;
pub mod store;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    SegmentId, SegmentKind, Segment, DriveLeg, OverlapInfo, AnchorRef, Coordinates,
    EndpointField, TemporalField, LockState, Endpoint, DurationField, Timeline,
    derive_soft_field, MAX_SEGMENT_HOURS,
};
pub use policy::{ReconcilePolicy, Priority};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use emitter::{
    EmitterAnalysis, EmitterAnnotation, EndpointRef,
    annotate_emitters, determine_emitter_directions, analyze_emitters,
};
pub use propagation::{propagate_times, collect_warnings, TimelineWarning, WarningKind};
pub use corridor::{
    CorridorManager, RepairOutcome, StructuralRepair,
    repair_structure, corridor_exists, split_corridor, heal_corridor,
};
pub use derived::{remove_derived_segments, compute_slack_and_overlap};
pub use resolution::{
    ResolutionAction, ResolutionError, OverlapResolution, resolution_options, apply_resolution,
};
pub use edit::{TimelineEdit, EditError, EditEffect, FieldValue, AnchorSide, apply_edit, edit_field};
pub use pipeline::{Pipeline, PipelineStage, ReconcileOutcome, reconcile_times};
pub use planner::{TripPlanner, PlannerError, StagedEdit};
pub use routing::{
    Route, RouteProvider, RoutingError, CachedRouter, RouteCacheStats, StraightLineRouter,
};
pub use timezone::{TimezoneResolver, TimezoneError, OffsetTimezoneResolver};
pub use store::{SegmentStore, InMemorySegmentStore, JsonFileSegmentStore};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};

/// Schema version for all timeline kernel types.
/// Increment on breaking changes to any schema type.
pub const TIMELINE_KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "reconcile_policy_v1";
