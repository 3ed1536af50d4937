//! Corridor management.
//!
//! Keeps exactly one drive between every pair of adjacent non-drive
//! segments and keeps each drive's route in sync with its endpoints.
//!
//! ## Repair pass
//!
//! 1. Delete every run of two or more adjacent drives (none survives)
//! 2. Delete drives whose origin/destination no longer resolve, and drives
//!    left dangling at either end of the list
//! 3. Synthesize a drive between every adjacent non-drive pair
//! 4. Re-point drives at their actual neighbours
//! 5. Route every drive concurrently; failures leave the drive unrouted
//!
//! Steps 1-4 are pure ([`repair_structure`]); step 5 is the only suspension
//! point of a reconciliation pass.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::policy::ReconcilePolicy;
use crate::routing::{Route, RouteProvider, RoutingError};
use crate::types::{Coordinates, DriveLeg, DurationField, LockState, Segment, SegmentId, SegmentKind, Timeline};

/// A system-generated drive with an id derived from its endpoints.
fn new_drive(origin: SegmentId, destination: SegmentId) -> Segment {
    let mut drive = Segment::drive_between(origin, destination);
    drive.id = SegmentId::derived("drive", origin, destination);
    drive
}

fn clear_route(segment: &mut Segment) {
    if let SegmentKind::Drive(leg) = &mut segment.kind {
        leg.route_geometry.clear();
        leg.distance_mi = None;
        leg.auto_drive = false;
        if !leg.manual_edit {
            leg.duration_min = None;
            segment.duration = DurationField::default();
        }
    }
}

fn apply_route(segment: &mut Segment, route: Route) {
    if let SegmentKind::Drive(leg) = &mut segment.kind {
        leg.route_geometry = route.geometry;
        leg.distance_mi = Some(route.distance_mi);
        leg.auto_drive = true;
        if !leg.manual_edit {
            leg.duration_min = Some(route.duration_min);
            segment.duration = DurationField::new(Some(route.duration_min / 60.0), LockState::Auto);
        }
    }
}

/// Result of the pure structural part of the repair pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralRepair {
    /// Repaired list.
    pub timeline: Timeline,
    /// Drives deleted as duplicates, orphans or dangling.
    pub removed: Vec<SegmentId>,
    /// Drives created for corridors that had none.
    pub synthesized: Vec<SegmentId>,
    /// Drives whose origin/destination were re-pointed.
    pub repointed: Vec<SegmentId>,
}

/// Restore the corridor invariant without routing.
///
/// Derived slack/overlap entries are dropped first.
pub fn repair_structure(timeline: &Timeline) -> StructuralRepair {
    let segments = timeline.without_derived().into_segments();
    let mut removed = Vec::new();

    // Duplicate runs.
    let mut kept: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut i = 0;
    while i < segments.len() {
        if segments[i].is_drive() {
            let run_end = (i..segments.len())
                .find(|&j| !segments[j].is_drive())
                .unwrap_or(segments.len());
            if run_end - i >= 2 {
                removed.extend(segments[i..run_end].iter().map(|s| s.id));
                i = run_end;
                continue;
            }
        }
        kept.push(segments[i].clone());
        i += 1;
    }

    // Orphans and dangling drives.
    let present: HashSet<SegmentId> = kept.iter().filter(|s| !s.is_drive()).map(|s| s.id).collect();
    let resolves = |id: Option<SegmentId>| id.is_some_and(|id| present.contains(&id));
    let last = kept.len().saturating_sub(1);
    let mut survivors = Vec::with_capacity(kept.len());
    for (i, segment) in kept.into_iter().enumerate() {
        if let Some(leg) = segment.drive() {
            let dangling = i == 0 || i == last;
            if dangling || !resolves(leg.origin_id) || !resolves(leg.destination_id) {
                removed.push(segment.id);
                continue;
            }
        }
        survivors.push(segment);
    }

    // Synthesis.
    let mut out: Vec<Segment> = Vec::with_capacity(survivors.len() * 2);
    let mut synthesized = Vec::new();
    for segment in survivors {
        if let Some(prev) = out.last() {
            if !prev.is_drive() && !segment.is_drive() {
                let drive = new_drive(prev.id, segment.id);
                synthesized.push(drive.id);
                out.push(drive);
            }
        }
        out.push(segment);
    }

    // Re-pointing.
    let mut repointed = Vec::new();
    for i in 1..out.len().saturating_sub(1) {
        let (origin, destination) = (out[i - 1].id, out[i + 1].id);
        let stale = matches!(
            out[i].drive(),
            Some(leg) if leg.origin_id != Some(origin) || leg.destination_id != Some(destination)
        );
        if stale {
            if let Some(leg) = out[i].drive_mut() {
                leg.origin_id = Some(origin);
                leg.destination_id = Some(destination);
            }
            clear_route(&mut out[i]);
            repointed.push(out[i].id);
        }
    }

    if !(removed.is_empty() && synthesized.is_empty() && repointed.is_empty()) {
        tracing::debug!(
            removed = removed.len(),
            synthesized = synthesized.len(),
            repointed = repointed.len(),
            "corridor structure repaired"
        );
    }

    StructuralRepair {
        timeline: Timeline::new(out),
        removed,
        synthesized,
        repointed,
    }
}

/// Whether `a` and `b` are joined by exactly one drive in `timeline`.
pub fn corridor_exists(timeline: &Timeline, a: SegmentId, b: SegmentId) -> bool {
    match (timeline.position(&a), timeline.position(&b)) {
        (Some(pa), Some(pb)) => pb == pa + 2 && timeline.get(pa + 1).is_some_and(Segment::is_drive),
        _ => false,
    }
}

/// Split the corridor a freshly inserted stop landed in.
///
/// `before` is the list as it was before the insertion. When the stop's
/// non-drive neighbours `A` and `B` were joined by a single drive there, every
/// drive between them is replaced by two unrouted drives `A→X` and `X→B`.
/// Otherwise the list is returned unchanged and the repair pass fills in
/// whatever is missing.
pub fn split_corridor(before: &Timeline, timeline: &Timeline, stop_id: SegmentId) -> Timeline {
    let Some(x) = timeline.position(&stop_id) else {
        return timeline.clone();
    };
    let (Some(a), Some(b)) = (timeline.prev_non_drive(x), timeline.next_non_drive(x)) else {
        return timeline.clone();
    };
    let segments = timeline.segments();
    let (a_id, b_id) = (segments[a].id, segments[b].id);
    if !corridor_exists(before, a_id, b_id) {
        return timeline.clone();
    }

    let mut out = Vec::with_capacity(segments.len() + 1);
    out.extend_from_slice(&segments[..=a]);
    out.push(new_drive(a_id, stop_id));
    out.push(segments[x].clone());
    out.push(new_drive(stop_id, b_id));
    out.extend_from_slice(&segments[b..]);

    tracing::debug!(stop = %stop_id, origin = %a_id, destination = %b_id, "corridor split");
    Timeline::new(out)
}

/// Heal the corridor left behind by removing a segment at `removed_index`.
///
/// `timeline` is the list after the removal. When the removed segment sat
/// between two drives they are replaced by one unrouted drive from the first
/// drive's origin to the second drive's destination.
pub fn heal_corridor(timeline: &Timeline, removed_index: usize) -> Timeline {
    let segments = timeline.segments();
    let (Some(first), Some(second)) = (
        removed_index.checked_sub(1).and_then(|i| segments.get(i)).and_then(Segment::drive),
        segments.get(removed_index).and_then(Segment::drive),
    ) else {
        return timeline.clone();
    };

    let origin = first
        .origin_id
        .or_else(|| timeline.prev_non_drive(removed_index - 1).map(|i| segments[i].id));
    let destination = second
        .destination_id
        .or_else(|| timeline.next_non_drive(removed_index).map(|i| segments[i].id));

    let mut out = Vec::with_capacity(segments.len() - 1);
    out.extend_from_slice(&segments[..removed_index - 1]);
    // Without both endpoints the repair pass synthesizes the drive instead.
    if let (Some(origin), Some(destination)) = (origin, destination) {
        let merged = new_drive(origin, destination);
        tracing::debug!(drive = %merged.id, "corridor healed");
        out.push(merged);
    }
    out.extend_from_slice(&segments[removed_index + 1..]);
    Timeline::new(out)
}

/// Result of a full repair pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairOutcome {
    /// Repaired and routed list.
    pub timeline: Timeline,
    /// Drives deleted as duplicates, orphans or dangling.
    pub removed: Vec<SegmentId>,
    /// Drives created for corridors that had none.
    pub synthesized: Vec<SegmentId>,
    /// Drives left without a route.
    pub unrouted: Vec<SegmentId>,
}

/// Runs the repair pass against a routing provider.
pub struct CorridorManager<R> {
    router: R,
    concurrency: usize,
    timeout: Duration,
}

impl<R: RouteProvider> CorridorManager<R> {
    /// Create a manager using the routing limits of `policy`.
    pub fn new(router: R, policy: &ReconcilePolicy) -> Self {
        Self {
            router,
            concurrency: policy.route_concurrency.max(1),
            timeout: policy.route_timeout(),
        }
    }

    /// The routing provider.
    pub fn router(&self) -> &R {
        &self.router
    }

    /// Full repair pass: structure first, then routing.
    pub async fn validate_and_repair(&self, timeline: &Timeline) -> RepairOutcome {
        let StructuralRepair {
            timeline,
            removed,
            synthesized,
            ..
        } = repair_structure(timeline);
        let (timeline, unrouted) = self.route_drives(timeline).await;

        RepairOutcome {
            timeline,
            removed,
            synthesized,
            unrouted,
        }
    }

    /// Route every drive, at most `route_concurrency` requests at a time.
    ///
    /// Returns the updated list and the ids of drives that could not be routed.
    pub async fn route_drives(&self, timeline: Timeline) -> (Timeline, Vec<SegmentId>) {
        let jobs: Vec<(usize, Option<Coordinates>, Option<Coordinates>)> = timeline
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| {
                let leg = segment.drive()?;
                Some((
                    index,
                    origin_point(&timeline, index, leg),
                    destination_point(&timeline, index, leg),
                ))
            })
            .collect();
        if jobs.is_empty() {
            return (timeline, Vec::new());
        }

        let router = &self.router;
        let timeout = self.timeout;
        let mut results: Vec<(usize, Result<Route, RoutingError>)> = stream::iter(jobs)
            .map(|(index, origin, destination)| async move {
                let result = match (origin, destination) {
                    (Some(o), Some(d)) => tokio::time::timeout(timeout, router.get_route(o, d))
                        .await
                        .unwrap_or(Err(RoutingError::Timeout(timeout))),
                    _ => Err(RoutingError::NoRoute { origin, destination }),
                };
                (index, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let mut segments = timeline.into_segments();
        let mut unrouted = Vec::new();
        for (index, result) in results {
            let segment = &mut segments[index];
            match result {
                Ok(route) => apply_route(segment, route),
                Err(error) => {
                    tracing::warn!(drive = %segment.id, %error, "drive left unrouted");
                    clear_route(segment);
                    unrouted.push(segment.id);
                }
            }
        }

        tracing::debug!(unrouted = unrouted.len(), "drives routed");
        (Timeline::new(segments), unrouted)
    }
}

/// Coordinates of a drive's origin, falling back to the nearest preceding
/// segment that has coordinates.
fn origin_point(timeline: &Timeline, index: usize, leg: &DriveLeg) -> Option<Coordinates> {
    leg.origin_id
        .and_then(|id| timeline.find(&id))
        .and_then(|s| s.coordinates)
        .or_else(|| timeline.segments()[..index].iter().rev().find_map(|s| s.coordinates))
}

/// Coordinates of a drive's destination, falling back to the nearest
/// following segment that has coordinates.
fn destination_point(timeline: &Timeline, index: usize, leg: &DriveLeg) -> Option<Coordinates> {
    leg.destination_id
        .and_then(|id| timeline.find(&id))
        .and_then(|s| s.coordinates)
        .or_else(|| timeline.segments()[index + 1..].iter().find_map(|s| s.coordinates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::StraightLineRouter;
    use async_trait::async_trait;

    fn place(name: &str, lon: f64) -> Segment {
        Segment::stop(name).with_coordinates(Coordinates::new(lon, 40.0))
    }

    fn drive_ids(timeline: &Timeline) -> Vec<(Option<SegmentId>, Option<SegmentId>)> {
        timeline
            .iter()
            .filter_map(Segment::drive)
            .map(|leg| (leg.origin_id, leg.destination_id))
            .collect()
    }

    struct DownRouter;

    #[async_trait]
    impl RouteProvider for DownRouter {
        async fn get_route(&self, _: Coordinates, _: Coordinates) -> Result<Route, RoutingError> {
            Err(RoutingError::Provider("unavailable".to_string()))
        }
    }

    struct SlowRouter;

    #[async_trait]
    impl RouteProvider for SlowRouter {
        async fn get_route(&self, o: Coordinates, d: Coordinates) -> Result<Route, RoutingError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StraightLineRouter::default().get_route(o, d).await
        }
    }

    #[test]
    fn test_synthesizes_missing_drives() {
        let (a, b, c) = (place("A", -100.0), place("B", -99.0), place("C", -98.0));
        let ids = (a.id, b.id, c.id);
        let repair = repair_structure(&Timeline::new(vec![a, b, c]));

        assert_eq!(repair.timeline.len(), 5);
        assert_eq!(repair.synthesized.len(), 2);
        assert_eq!(
            drive_ids(&repair.timeline),
            vec![(Some(ids.0), Some(ids.1)), (Some(ids.1), Some(ids.2))]
        );
    }

    #[test]
    fn test_duplicate_run_is_removed_entirely() {
        let (a, b) = (place("A", -100.0), place("B", -99.0));
        let first = Segment::drive_between(a.id, b.id);
        let second = Segment::drive_between(a.id, b.id);
        let dup_ids = vec![first.id, second.id];
        let repair = repair_structure(&Timeline::new(vec![a, first, second, b]));

        assert_eq!(repair.removed, dup_ids);
        assert_eq!(repair.timeline.len(), 3);
        assert!(!dup_ids.contains(&repair.timeline.get(1).unwrap().id));
    }

    #[test]
    fn test_orphan_and_dangling_drives_are_removed() {
        let (a, b) = (place("A", -100.0), place("B", -99.0));
        let orphan = Segment::drive_between(a.id, SegmentId::generate());
        let dangling = Segment::drive_between(a.id, b.id);
        let removed = vec![orphan.id, dangling.id];
        let repair = repair_structure(&Timeline::new(vec![a, orphan, b, dangling]));

        assert_eq!(repair.removed, removed);
        assert_eq!(repair.synthesized.len(), 1);
        assert_eq!(repair.timeline.len(), 3);
    }

    #[test]
    fn test_stale_drive_is_repointed() {
        let (a, b, c) = (place("A", -100.0), place("B", -99.0), place("C", -98.0));
        let stale = Segment::drive_between(a.id, c.id);
        let stale_id = stale.id;
        let (a_id, b_id) = (a.id, b.id);
        let repair = repair_structure(&Timeline::new(vec![a, stale, b, c]));

        assert_eq!(repair.repointed, vec![stale_id]);
        let leg = repair.timeline.find(&stale_id).and_then(Segment::drive).unwrap();
        assert_eq!((leg.origin_id, leg.destination_id), (Some(a_id), Some(b_id)));
    }

    #[test]
    fn test_structure_repair_is_stable() {
        let timeline = Timeline::new(vec![place("A", -100.0), place("B", -99.0), place("C", -98.0)]);
        let once = repair_structure(&timeline).timeline;
        let twice = repair_structure(&once);

        assert_eq!(twice.timeline, once);
        assert!(twice.synthesized.is_empty() && twice.removed.is_empty() && twice.repointed.is_empty());
    }

    #[test]
    fn test_split_requires_existing_corridor() {
        let (a, b, x) = (place("A", -100.0), place("B", -98.0), place("X", -99.0));
        let (a_id, b_id, x_id) = (a.id, b.id, x.id);
        let before = repair_structure(&Timeline::new(vec![a.clone(), b.clone()])).timeline;
        assert!(corridor_exists(&before, a_id, b_id));

        let mut inserted = before.clone().into_segments();
        inserted.insert(1, x.clone());
        let split = split_corridor(&before, &Timeline::new(inserted), x_id);
        assert_eq!(split.len(), 5);
        assert_eq!(drive_ids(&split), vec![(Some(a_id), Some(x_id)), (Some(x_id), Some(b_id))]);

        let bare = Timeline::new(vec![a.clone(), b.clone()]);
        let unsplit = Timeline::new(vec![a, x, b]);
        assert_eq!(split_corridor(&bare, &unsplit, x_id), unsplit);
    }

    #[test]
    fn test_heal_merges_adjacent_drives() {
        let (a, x, b) = (place("A", -100.0), place("X", -99.0), place("B", -98.0));
        let (a_id, b_id) = (a.id, b.id);
        let mut segments = repair_structure(&Timeline::new(vec![a, x, b])).timeline.into_segments();
        segments.remove(2);

        let healed = heal_corridor(&Timeline::new(segments), 2);
        assert_eq!(healed.len(), 3);
        assert_eq!(drive_ids(&healed), vec![(Some(a_id), Some(b_id))]);
    }

    #[tokio::test]
    async fn test_routes_every_drive() {
        let manager = CorridorManager::new(StraightLineRouter::default(), &ReconcilePolicy::default());
        let timeline = Timeline::new(vec![place("A", -100.0), place("B", -99.0)]);

        let outcome = manager.validate_and_repair(&timeline).await;
        assert!(outcome.unrouted.is_empty());

        let drive = outcome.timeline.get(1).unwrap();
        let leg = drive.drive().unwrap();
        assert!(leg.auto_drive && leg.is_routed());
        assert!(leg.duration_min.unwrap() > 0.0);
        assert_eq!(drive.duration.lock, LockState::Auto);
    }

    #[tokio::test]
    async fn test_routing_failure_is_reported_not_fatal() {
        let manager = CorridorManager::new(DownRouter, &ReconcilePolicy::default());
        let timeline = Timeline::new(vec![place("A", -100.0), place("B", -99.0), place("C", -98.0)]);

        let outcome = manager.validate_and_repair(&timeline).await;
        assert_eq!(outcome.timeline.len(), 5);
        assert_eq!(outcome.unrouted.len(), 2);
        assert!(outcome.timeline.iter().filter_map(Segment::drive).all(|leg| !leg.is_routed()));
    }

    #[tokio::test]
    async fn test_missing_coordinates_leave_drive_unrouted() {
        let manager = CorridorManager::new(StraightLineRouter::default(), &ReconcilePolicy::default());
        let timeline = Timeline::new(vec![Segment::trip_start("Home"), place("B", -99.0)]);

        let outcome = manager.validate_and_repair(&timeline).await;
        assert_eq!(outcome.unrouted.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let policy = ReconcilePolicy {
            route_timeout_ms: 50,
            ..ReconcilePolicy::default()
        };
        let manager = CorridorManager::new(SlowRouter, &policy);
        let timeline = Timeline::new(vec![place("A", -100.0), place("B", -99.0)]);

        let outcome = manager.validate_and_repair(&timeline).await;
        assert_eq!(outcome.unrouted.len(), 1);
    }

    #[tokio::test]
    async fn test_manual_drive_time_survives_rerouting() {
        let manager = CorridorManager::new(StraightLineRouter::default(), &ReconcilePolicy::default());
        let mut segments = repair_structure(&Timeline::new(vec![place("A", -100.0), place("B", -99.0)]))
            .timeline
            .into_segments();
        let leg = segments[1].drive_mut().unwrap();
        leg.manual_edit = true;
        leg.duration_min = Some(240.0);
        segments[1].duration = DurationField::hard(4.0);

        let outcome = manager.validate_and_repair(&Timeline::new(segments)).await;
        let drive = outcome.timeline.get(1).unwrap();
        assert_eq!(drive.drive().unwrap().duration_min, Some(240.0));
        assert_eq!(drive.duration, DurationField::hard(4.0));
        assert!(drive.drive().unwrap().is_routed());
    }
}
