//! The ordered timeline value.

use serde::{Deserialize, Serialize};

use super::segment::{Segment, SegmentId};
use crate::canonical::canonical_hash_hex;

/// Ordered sequence of segments.
///
/// Order encodes visitation order, not necessarily contiguous timestamps.
/// Every kernel stage takes a `Timeline` by reference and returns a new one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    /// Wrap a list of segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// A fresh trip holding only its two anchors.
    pub fn new_trip() -> Self {
        Self::new(vec![Segment::trip_start("Start"), Segment::trip_end("End")])
    }

    /// Borrow the segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Take the segments.
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the timeline is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at an index.
    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Index of a segment by id.
    pub fn position(&self, id: &SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id == *id)
    }

    /// Segment by id.
    pub fn find(&self, id: &SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == *id)
    }

    /// Whether a segment with this id is present.
    pub fn contains(&self, id: &SegmentId) -> bool {
        self.position(id).is_some()
    }

    /// Nearest non-drive segment strictly before `index`.
    pub fn prev_non_drive(&self, index: usize) -> Option<usize> {
        (0..index.min(self.segments.len())).rev().find(|&i| !self.segments[i].is_drive())
    }

    /// Nearest non-drive segment strictly after `index`.
    pub fn next_non_drive(&self, index: usize) -> Option<usize> {
        (index + 1..self.segments.len()).find(|&i| !self.segments[i].is_drive())
    }

    /// Copy without slack/overlap entries.
    pub fn without_derived(&self) -> Self {
        Self::new(self.segments.iter().filter(|s| !s.is_derived()).cloned().collect())
    }

    /// Derived slack/overlap entries.
    pub fn derived(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_derived())
    }

    /// Overlap entries.
    pub fn overlaps(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.overlap().is_some())
    }

    /// Split into the resident timeline and the queued stops.
    pub fn split_queued(&self) -> (Self, Vec<Segment>) {
        let (queued, resident): (Vec<_>, Vec<_>) =
            self.segments.iter().cloned().partition(|s| s.is_queued);
        (Self::new(resident), queued)
    }

    /// Append queued stops after the resident timeline.
    pub fn with_queued(mut self, queued: Vec<Segment>) -> Self {
        self.segments.extend(queued);
        self
    }

    /// Canonical fingerprint of the whole list.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&self.segments)
    }
}

impl From<Vec<Segment>> for Timeline {
    fn from(segments: Vec<Segment>) -> Self {
        Self::new(segments)
    }
}

impl IntoIterator for Timeline {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_drive_neighbours_skip_drives() {
        let a = Segment::trip_start("A");
        let b = Segment::trip_end("B");
        let drive = Segment::drive_between(a.id, b.id);
        let timeline = Timeline::new(vec![a, drive, b]);

        assert_eq!(timeline.prev_non_drive(2), Some(0));
        assert_eq!(timeline.next_non_drive(0), Some(2));
        assert_eq!(timeline.prev_non_drive(0), None);
        assert_eq!(timeline.next_non_drive(2), None);
    }

    #[test]
    fn test_queued_round_trip_keeps_resident_order() {
        let a = Segment::trip_start("A");
        let queued = Segment::queued_stop("Later");
        let b = Segment::trip_end("B");
        let timeline = Timeline::new(vec![a.clone(), queued.clone(), b.clone()]);

        let (resident, held) = timeline.split_queued();
        assert_eq!(resident.segments(), &[a, b][..]);
        assert_eq!(held, vec![queued.clone()]);
        assert_eq!(resident.with_queued(held).get(2), Some(&queued));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let timeline = Timeline::new_trip();
        assert_eq!(timeline.fingerprint(), timeline.clone().fingerprint());

        let mut other = timeline.clone().into_segments();
        other[0].name = Some("Elsewhere".to_string());
        assert_ne!(Timeline::new(other).fingerprint(), timeline.fingerprint());
    }
}
