//! Time propagation.
//!
//! Fills unpinned timestamps from the emitters chosen by the emitter
//! analysis: one forward pass (emitters in ascending order) followed by one
//! backward pass (descending). Each emitter walks outward until it meets a
//! pinned endpoint of rank ≥ its own.
//!
//! The backward pass may overwrite values the forward pass wrote; both passes
//! share the same barrier rule, so only rank-≤-`auto` fields ever change.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::emitter::{EmitterAnalysis, EmitterAnnotation};
use crate::types::{Endpoint, EndpointField, Segment, SegmentId, SegmentKind, Timeline};

/// Run both propagation passes and return the filled timeline.
///
/// `analysis` must have been computed on `timeline`.
pub fn propagate_times(timeline: &Timeline, analysis: &EmitterAnalysis) -> Timeline {
    let mut segments = timeline.segments().to_vec();

    for emitter in analysis.forward_emitters() {
        walk_forward(&mut segments, emitter);
    }
    for emitter in analysis.backward_emitters().rev() {
        walk_backward(&mut segments, emitter);
    }

    Timeline::new(segments)
}

fn span_of(segment: &Segment) -> Duration {
    segment.span().unwrap_or_else(Duration::zero)
}

/// Move `cursor` across `segment`, forwards or backwards.
///
/// `None` when the result falls outside the representable time range; the
/// walk ends there and the remaining endpoints keep their values.
fn step(cursor: DateTime<Utc>, segment: &Segment, forward: bool) -> Option<DateTime<Utc>> {
    let span = span_of(segment);
    let next = if forward {
        cursor.checked_add_signed(span)
    } else {
        cursor.checked_sub_signed(span)
    };
    if next.is_none() {
        tracing::warn!(segment_id = %segment.id, "segment duration out of range, propagation stopped");
    }
    next
}

/// Offer `candidate` to an endpoint on an emitter's walk.
///
/// Returns the cursor to continue with, or `None` when the endpoint is a
/// barrier for an emitter of `emitter_rank`.
fn advance(endpoint: &mut Endpoint, candidate: DateTime<Utc>, emitter_rank: u8) -> Option<DateTime<Utc>> {
    if endpoint.is_pinned() && endpoint.rank() >= emitter_rank {
        return None;
    }
    if endpoint.is_writable() {
        *endpoint = Endpoint::auto(candidate);
        return Some(candidate);
    }
    Some(endpoint.utc.unwrap_or(candidate))
}

fn walk_forward(segments: &mut [Segment], emitter: &EmitterAnnotation) {
    let Some(mut cursor) = emitter.utc else {
        return;
    };
    let rank = emitter.rank();
    let origin = emitter.endpoint.index;

    if emitter.endpoint.field == EndpointField::Start {
        let Some(own) = segments.get_mut(origin) else {
            return;
        };
        let Some(candidate) = step(cursor, own, true) else {
            return;
        };
        match advance(&mut own.end, candidate, rank) {
            Some(next) => cursor = next,
            None => return,
        }
    }

    for segment in segments.iter_mut().skip(origin + 1) {
        cursor = match advance(&mut segment.start, cursor, rank) {
            Some(next) => next,
            None => return,
        };
        let Some(candidate) = step(cursor, segment, true) else {
            return;
        };
        cursor = match advance(&mut segment.end, candidate, rank) {
            Some(next) => next,
            None => return,
        };
    }
}

fn walk_backward(segments: &mut [Segment], emitter: &EmitterAnnotation) {
    let Some(mut cursor) = emitter.utc else {
        return;
    };
    let rank = emitter.rank();
    let origin = emitter.endpoint.index;

    if emitter.endpoint.field == EndpointField::End {
        let Some(own) = segments.get_mut(origin) else {
            return;
        };
        let Some(candidate) = step(cursor, own, false) else {
            return;
        };
        match advance(&mut own.start, candidate, rank) {
            Some(next) => cursor = next,
            None => return,
        }
    }

    let upto = origin.min(segments.len());
    for segment in segments[..upto].iter_mut().rev() {
        cursor = match advance(&mut segment.end, cursor, rank) {
            Some(next) => next,
            None => return,
        };
        let Some(candidate) = step(cursor, segment, false) else {
            return;
        };
        cursor = match advance(&mut segment.start, candidate, rank) {
            Some(next) => next,
            None => return,
        };
    }
}

/// Kind of missing data found after propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// No start timestamp could be determined.
    MissingStart,
    /// No end timestamp could be determined.
    MissingEnd,
    /// A stop has no duration and no pair of endpoints to imply one.
    MissingDuration,
    /// A drive has no driving time, so it was treated as instantaneous.
    UnroutedDrive,
    /// A duration is too large to place on the calendar and was ignored.
    DurationOutOfRange,
}

/// Non-fatal missing-data warning for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineWarning {
    /// Affected segment.
    pub segment_id: SegmentId,
    /// What is missing.
    pub kind: WarningKind,
}

/// Report segments still missing temporal data after propagation.
pub fn collect_warnings(timeline: &Timeline) -> Vec<TimelineWarning> {
    let mut warnings = Vec::new();
    for segment in timeline.iter().filter(|s| !s.is_derived()) {
        let mut push = |kind| warnings.push(TimelineWarning { segment_id: segment.id, kind });

        match &segment.kind {
            SegmentKind::Stop => {
                if segment.duration.val.is_none()
                    && (segment.start.utc.is_none() || segment.end.utc.is_none())
                {
                    push(WarningKind::MissingDuration);
                }
            }
            SegmentKind::Drive(leg) => {
                if leg.duration_min.is_none() && segment.duration.val.is_none() {
                    push(WarningKind::UnroutedDrive);
                }
            }
            SegmentKind::TripStart | SegmentKind::TripEnd | SegmentKind::Slack | SegmentKind::Overlap(_) => {}
        }
        let has_length = segment.duration.val.is_some()
            || segment.drive().is_some_and(|leg| leg.duration_min.is_some());
        if has_length && segment.span().is_none() {
            push(WarningKind::DurationOutOfRange);
        }
        if segment.start.utc.is_none() {
            push(WarningKind::MissingStart);
        }
        if segment.end.utc.is_none() {
            push(WarningKind::MissingEnd);
        }
    }

    if !warnings.is_empty() {
        tracing::debug!(count = warnings.len(), "timeline has missing data");
    }
    warnings
}
