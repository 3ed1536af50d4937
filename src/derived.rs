//! Slack and overlap derivation.
//!
//! Pure O(n) pass over the reconciled base list. Previous slack/overlap
//! entries are always discarded and recomputed, never patched.

use crate::emitter::{EmitterAnalysis, EndpointRef};
use crate::types::{
    duration_to_hours, AnchorRef, EndpointField, OverlapInfo, Segment, SegmentKind, Timeline,
};

/// Drop every slack/overlap entry.
pub fn remove_derived_segments(timeline: &Timeline) -> Timeline {
    timeline.without_derived()
}

/// Insert slack and overlap entries between adjacent segments.
///
/// `analysis` must have been computed on the same base list (derived entries
/// excluded); it locates the pinned endpoints responsible for each overlap.
pub fn compute_slack_and_overlap(timeline: &Timeline, analysis: &EmitterAnalysis) -> Timeline {
    let base = timeline.without_derived();
    let segments = base.segments();
    let mut out = Vec::with_capacity(segments.len() * 2);
    let (mut slack_count, mut overlap_count) = (0usize, 0usize);

    for (i, cur) in segments.iter().enumerate() {
        out.push(cur.clone());
        let Some(next) = segments.get(i + 1) else {
            continue;
        };
        let (Some(cur_end), Some(next_start)) = (cur.end.utc, next.start.utc) else {
            continue;
        };

        let delta = next_start - cur_end;
        if delta > chrono::Duration::zero() {
            slack_count += 1;
            out.push(Segment::derived(
                SegmentKind::Slack,
                cur.id,
                next.id,
                Some(cur_end),
                Some(next_start),
                duration_to_hours(delta),
            ));
        } else if delta < chrono::Duration::zero() {
            overlap_count += 1;
            let info = overlap_info(&base, analysis, i);
            out.push(Segment::derived(
                SegmentKind::Overlap(info),
                cur.id,
                next.id,
                Some(next_start),
                Some(cur_end),
                duration_to_hours(-delta),
            ));
        }
    }

    tracing::debug!(slack = slack_count, overlap = overlap_count, "derived segments computed");
    Timeline::new(out)
}

/// Locate the anchors and contributors of an overlap between `left` and `left + 1`.
fn overlap_info(base: &Timeline, analysis: &EmitterAnalysis, left: usize) -> OverlapInfo {
    let right = left + 1;

    let left_positions = (0..=left)
        .rev()
        .flat_map(|i| [EndpointRef::new(i, EndpointField::End), EndpointRef::new(i, EndpointField::Start)]);
    let left_anchor = find_anchor(base, analysis, left_positions, EndpointRef::new(left, EndpointField::End), |a| {
        a.will_emit_forward
    });

    let right_positions = (right..base.len())
        .flat_map(|i| [EndpointRef::new(i, EndpointField::Start), EndpointRef::new(i, EndpointField::End)]);
    let right_anchor = find_anchor(base, analysis, right_positions, EndpointRef::new(right, EndpointField::Start), |a| {
        a.will_emit_backward
    });

    let first = left_anchor
        .and_then(|a| base.position(&a.segment_id))
        .unwrap_or(left);
    let last = right_anchor
        .and_then(|a| base.position(&a.segment_id))
        .unwrap_or(right);
    let contributors = base.segments()[first..=last].iter().map(|s| s.id).collect();

    OverlapInfo {
        left_anchor,
        right_anchor,
        contributors,
    }
}

/// First pinned endpoint along `positions` that is either the boundary
/// endpoint itself or emits toward the boundary.
fn find_anchor(
    base: &Timeline,
    analysis: &EmitterAnalysis,
    positions: impl Iterator<Item = EndpointRef>,
    boundary: EndpointRef,
    emits_toward: impl Fn(&crate::emitter::EmitterAnnotation) -> bool,
) -> Option<AnchorRef> {
    positions
        .filter_map(|position| {
            let annotation = analysis.get(position)?;
            let segment = base.get(position.index)?;
            (annotation.segment_id == segment.id).then_some((position, annotation, segment))
        })
        .find(|(position, annotation, _)| annotation.pinned && (*position == boundary || emits_toward(annotation)))
        .map(|(position, _, segment)| {
            let endpoint = segment.endpoint(position.field);
            AnchorRef {
                segment_id: segment.id,
                field: position.field,
                lock: endpoint.lock,
                utc: endpoint.utc,
            }
        })
}
