//! Overlap resolution.
//!
//! Each overlap carries the pinned endpoints holding it in place. This module
//! turns them into concrete actions a UI can offer. Applying an action is
//! just another field edit; the caller re-runs the pipeline afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edit::{edit_field, FieldValue};
use crate::types::{
    hours_to_duration, AnchorRef, EndpointField, LockState, SegmentId, SegmentKind, TemporalField, Timeline,
};

/// Resolution failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    /// The action names a segment that is not in the timeline.
    #[error("Segment not found: {0}")]
    SegmentNotFound(SegmentId),

    /// Moving or unlocking requires a hard-locked endpoint.
    #[error("{field} of segment {segment_id} is not hard-locked")]
    NotHardLocked {
        /// Segment.
        segment_id: SegmentId,
        /// Endpoint.
        field: EndpointField,
    },

    /// Only stops can be shrunk.
    #[error("Segment {0} is not a stop")]
    NotAStop(SegmentId),

    /// The underlying field edit was refused.
    #[error("Resolution rejected: {0}")]
    Rejected(String),
}

/// A user-facing fix for one overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Pin a contributing stop's duration shorter.
    ShrinkStop {
        /// The stop.
        segment_id: SegmentId,
        /// New duration in hours.
        hours: f64,
    },
    /// Move the left anchor earlier by the overlap.
    MoveEarlier {
        /// Anchor segment.
        segment_id: SegmentId,
        /// Anchor endpoint.
        field: EndpointField,
        /// New time.
        to: DateTime<Utc>,
    },
    /// Move the right anchor later by the overlap.
    MoveLater {
        /// Anchor segment.
        segment_id: SegmentId,
        /// Anchor endpoint.
        field: EndpointField,
        /// New time.
        to: DateTime<Utc>,
    },
    /// Unlock an anchor so the other side's emitter can move it.
    UnlockAndMove {
        /// Anchor segment.
        segment_id: SegmentId,
        /// Anchor endpoint.
        field: EndpointField,
    },
}

impl ResolutionAction {
    /// Segment the action edits.
    pub fn segment_id(&self) -> SegmentId {
        match self {
            Self::ShrinkStop { segment_id, .. }
            | Self::MoveEarlier { segment_id, .. }
            | Self::MoveLater { segment_id, .. }
            | Self::UnlockAndMove { segment_id, .. } => *segment_id,
        }
    }
}

/// Actions available for one overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapResolution {
    /// The overlap entry.
    pub overlap_id: SegmentId,
    /// Conflict length in hours.
    pub hours: f64,
    /// Pinned endpoint pushing the earlier segment later.
    pub left_anchor: Option<AnchorRef>,
    /// Pinned endpoint holding the later segment earlier.
    pub right_anchor: Option<AnchorRef>,
    /// Real segments between the anchors.
    pub contributors: Vec<SegmentId>,
    /// Offered fixes.
    pub actions: Vec<ResolutionAction>,
}

/// List the fixes for every overlap in a reconciled timeline.
pub fn resolution_options(timeline: &Timeline) -> Vec<OverlapResolution> {
    timeline
        .iter()
        .filter_map(|segment| {
            let info = segment.overlap()?;
            let hours = segment.duration.val.unwrap_or(0.0);
            let conflict = hours_to_duration(hours);
            let shifted = |utc: Option<DateTime<Utc>>, earlier: bool| {
                let (utc, conflict) = (utc?, conflict?);
                if earlier {
                    utc.checked_sub_signed(conflict)
                } else {
                    utc.checked_add_signed(conflict)
                }
            };
            let mut actions = Vec::new();

            for stop in info
                .contributors
                .iter()
                .filter_map(|id| timeline.find(id))
                .filter(|s| matches!(s.kind, SegmentKind::Stop) && s.duration.lock != LockState::Soft)
            {
                if let Some(current) = stop.duration.val.filter(|v| *v >= hours) {
                    actions.push(ResolutionAction::ShrinkStop {
                        segment_id: stop.id,
                        hours: current - hours,
                    });
                }
            }

            let hard = |anchor: &Option<AnchorRef>| anchor.filter(|a| a.lock == LockState::Hard);
            if let Some(anchor) = hard(&info.left_anchor) {
                if let Some(to) = shifted(anchor.utc, true) {
                    actions.push(ResolutionAction::MoveEarlier {
                        segment_id: anchor.segment_id,
                        field: anchor.field,
                        to,
                    });
                }
                actions.push(ResolutionAction::UnlockAndMove {
                    segment_id: anchor.segment_id,
                    field: anchor.field,
                });
            }
            if let Some(anchor) = hard(&info.right_anchor) {
                if let Some(to) = shifted(anchor.utc, false) {
                    actions.push(ResolutionAction::MoveLater {
                        segment_id: anchor.segment_id,
                        field: anchor.field,
                        to,
                    });
                }
                actions.push(ResolutionAction::UnlockAndMove {
                    segment_id: anchor.segment_id,
                    field: anchor.field,
                });
            }

            Some(OverlapResolution {
                overlap_id: segment.id,
                hours,
                left_anchor: info.left_anchor,
                right_anchor: info.right_anchor,
                contributors: info.contributors.clone(),
                actions,
            })
        })
        .collect()
}

/// Apply one action to the base list.
pub fn apply_resolution(timeline: &Timeline, action: &ResolutionAction) -> Result<Timeline, ResolutionError> {
    let segment_id = action.segment_id();
    let segment = timeline
        .find(&segment_id)
        .ok_or(ResolutionError::SegmentNotFound(segment_id))?;

    let (field, value) = match *action {
        ResolutionAction::ShrinkStop { hours, .. } => {
            if !segment.is_stop() {
                return Err(ResolutionError::NotAStop(segment_id));
            }
            (TemporalField::Duration, FieldValue::Hours(hours))
        }
        ResolutionAction::MoveEarlier { field, to, .. } | ResolutionAction::MoveLater { field, to, .. } => {
            require_hard(segment.endpoint(field).lock, segment_id, field)?;
            (temporal(field), FieldValue::Time(to))
        }
        ResolutionAction::UnlockAndMove { field, .. } => {
            require_hard(segment.endpoint(field).lock, segment_id, field)?;
            (temporal(field), FieldValue::Unlock)
        }
    };

    edit_field(timeline, segment_id, field, value).map_err(|e| ResolutionError::Rejected(e.to_string()))
}

fn temporal(field: EndpointField) -> TemporalField {
    match field {
        EndpointField::Start => TemporalField::Start,
        EndpointField::End => TemporalField::End,
    }
}

fn require_hard(lock: LockState, segment_id: SegmentId, field: EndpointField) -> Result<(), ResolutionError> {
    if lock == LockState::Hard {
        Ok(())
    } else {
        Err(ResolutionError::NotHardLocked { segment_id, field })
    }
}
