//! Emitter analysis.
//!
//! Classifies every pinned endpoint as emitting forward and/or backward
//! relative to its nearest pinned neighbours.
//!
//! ## Algorithm
//!
//! 1. Walk all endpoints in document order (segment order, `start` before `end`)
//! 2. Mark an endpoint pinned when it has a timestamp and rank ≥ `soft`
//! 3. For each pinned endpoint, compare its rank with the first pinned
//!    endpoint of a later segment (its own sibling endpoint is not a neighbour):
//!    - none downstream → emits forward
//!    - lower rank downstream → emits forward
//!    - higher rank downstream → does not
//!    - equal rank → emits forward iff `priority == forward`
//! 4. Symmetrically against the last pinned endpoint of an earlier segment for
//!    backward emission
//!
//! The result partitions the timeline into zones bounded by the strongest
//! pins; each unpinned span is filled from whichever side wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::policy::Priority;
use crate::types::{EndpointField, LockState, SegmentId, Timeline};

/// Position of an endpoint in a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    /// Segment index.
    pub index: usize,
    /// Which endpoint of the segment.
    pub field: EndpointField,
}

impl EndpointRef {
    /// Create an endpoint reference.
    pub fn new(index: usize, field: EndpointField) -> Self {
        Self { index, field }
    }

    fn slot(&self) -> usize {
        self.index * 2 + matches!(self.field, EndpointField::End) as usize
    }
}

/// Analysis result for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmitterAnnotation {
    /// Where the endpoint sits.
    pub endpoint: EndpointRef,
    /// Owning segment.
    pub segment_id: SegmentId,
    /// Timestamp at analysis time.
    pub utc: Option<DateTime<Utc>>,
    /// Lock at analysis time.
    pub lock: LockState,
    /// Has a timestamp and rank ≥ `soft`.
    pub pinned: bool,
    /// Drives values into later endpoints.
    pub will_emit_forward: bool,
    /// Drives values into earlier endpoints.
    pub will_emit_backward: bool,
}

impl EmitterAnnotation {
    /// Lock rank of the endpoint.
    pub fn rank(&self) -> u8 {
        self.lock.rank()
    }
}

/// Emitter annotations for every endpoint of a timeline, in document order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmitterAnalysis {
    annotations: Vec<EmitterAnnotation>,
}

impl EmitterAnalysis {
    /// All annotations in document order.
    pub fn annotations(&self) -> &[EmitterAnnotation] {
        &self.annotations
    }

    /// Annotation of one endpoint.
    pub fn get(&self, endpoint: EndpointRef) -> Option<&EmitterAnnotation> {
        self.annotations.get(endpoint.slot())
    }

    /// Pinned endpoints in document order.
    pub fn pinned(&self) -> impl DoubleEndedIterator<Item = &EmitterAnnotation> {
        self.annotations.iter().filter(|a| a.pinned)
    }

    /// Pinned endpoints that emit forward, in document order.
    pub fn forward_emitters(&self) -> impl DoubleEndedIterator<Item = &EmitterAnnotation> {
        self.pinned().filter(|a| a.will_emit_forward)
    }

    /// Pinned endpoints that emit backward, in document order.
    pub fn backward_emitters(&self) -> impl DoubleEndedIterator<Item = &EmitterAnnotation> {
        self.pinned().filter(|a| a.will_emit_backward)
    }
}

/// Annotate every endpoint with its pinned flag. Direction flags are left false.
pub fn annotate_emitters(timeline: &Timeline) -> EmitterAnalysis {
    let mut annotations = Vec::with_capacity(timeline.len() * 2);
    for (index, segment) in timeline.iter().enumerate() {
        for field in [EndpointField::Start, EndpointField::End] {
            let endpoint = segment.endpoint(field);
            annotations.push(EmitterAnnotation {
                endpoint: EndpointRef::new(index, field),
                segment_id: segment.id,
                utc: endpoint.utc,
                lock: endpoint.lock,
                pinned: endpoint.is_pinned(),
                will_emit_forward: false,
                will_emit_backward: false,
            });
        }
    }
    EmitterAnalysis { annotations }
}

/// Decide emission directions for every pinned endpoint.
pub fn determine_emitter_directions(mut analysis: EmitterAnalysis, priority: Priority) -> EmitterAnalysis {
    let pinned: Vec<usize> = analysis
        .annotations
        .iter()
        .enumerate()
        .filter(|(_, a)| a.pinned)
        .map(|(slot, _)| slot)
        .collect();

    for (k, &slot) in pinned.iter().enumerate() {
        let annotations = &analysis.annotations;
        let index = annotations[slot].endpoint.index;
        let own = annotations[slot].rank();
        let downstream = pinned[k + 1..]
            .iter()
            .find(|&&s| annotations[s].endpoint.index > index)
            .map(|&s| annotations[s].rank());
        let upstream = pinned[..k]
            .iter()
            .rev()
            .find(|&&s| annotations[s].endpoint.index < index)
            .map(|&s| annotations[s].rank());

        let annotation = &mut analysis.annotations[slot];
        annotation.will_emit_forward = wins(own, downstream, priority == Priority::Forward);
        annotation.will_emit_backward = wins(own, upstream, priority == Priority::Backward);
    }

    tracing::debug!(
        pinned = pinned.len(),
        forward = analysis.forward_emitters().count(),
        backward = analysis.backward_emitters().count(),
        %priority,
        "emitter directions determined"
    );

    analysis
}

/// Annotate and determine directions in one step.
pub fn analyze_emitters(timeline: &Timeline, priority: Priority) -> EmitterAnalysis {
    determine_emitter_directions(annotate_emitters(timeline), priority)
}

fn wins(own: u8, neighbour: Option<u8>, wins_ties: bool) -> bool {
    match neighbour {
        None => true,
        Some(other) => match own.cmp(&other) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => wins_ties,
        },
    }
}
