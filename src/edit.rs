//! Timeline edits.
//!
//! Every structural or manual edit is a [`TimelineEdit`] value, applied by
//! the pure [`apply_edit`] to the base list (derived entries dropped). The
//! result is then reconciled by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corridor::{heal_corridor, split_corridor};
use crate::resolution::{apply_resolution, ResolutionAction, ResolutionError};
use crate::types::{
    derive_soft_field, Coordinates, DurationField, Endpoint, EndpointField, LockState, Segment,
    SegmentId, SegmentKind, TemporalField, Timeline, MAX_SEGMENT_HOURS,
};

/// Edit failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    /// The edit names a segment that is not in the timeline.
    #[error("Segment not found: {0}")]
    SegmentNotFound(SegmentId),

    /// The edit is not allowed on this timeline.
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    /// The value does not fit the field (a timestamp for `duration`, hours for an endpoint).
    #[error("Value does not match field {field}")]
    ValueMismatch {
        /// The edited field.
        field: TemporalField,
    },

    /// A segment with this id already exists.
    #[error("Duplicate segment: {0}")]
    DuplicateSegment(SegmentId),

    /// An overlap resolution could not be applied.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// New value for a user-editable temporal field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Pin an endpoint to a timestamp (hard lock).
    Time(DateTime<Utc>),
    /// Pin the duration, in hours (hard lock).
    Hours(f64),
    /// Clear the lock to `unlocked`; the value becomes overwritable.
    Unlock,
}

/// Which trip anchor an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSide {
    /// `trip_start`; its outward endpoint is `end`.
    Start,
    /// `trip_end`; its outward endpoint is `start`.
    End,
}

impl AnchorSide {
    fn outward(self) -> EndpointField {
        match self {
            Self::Start => EndpointField::End,
            Self::End => EndpointField::Start,
        }
    }

    fn matches(self, kind: &SegmentKind) -> bool {
        match self {
            Self::Start => matches!(kind, SegmentKind::TripStart),
            Self::End => matches!(kind, SegmentKind::TripEnd),
        }
    }
}

/// A user edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TimelineEdit {
    /// Create a queued stop with no location or time.
    QueueStop {
        /// Display name.
        name: String,
    },
    /// Give a queued stop a location and insert it after `after`.
    PlaceStop {
        /// The queued stop.
        segment_id: SegmentId,
        /// Where it is.
        coordinates: Coordinates,
        /// Human-readable place name.
        #[serde(default)]
        location_name: Option<String>,
        /// Non-drive segment it follows.
        after: SegmentId,
    },
    /// Insert a new stop after `after`.
    InsertStop {
        /// The stop.
        stop: Segment,
        /// Non-drive segment it follows.
        after: SegmentId,
    },
    /// Delete a stop, healing its corridor.
    DeleteStop {
        /// The stop.
        segment_id: SegmentId,
    },
    /// Move a stop to follow `after`.
    MoveStop {
        /// The stop.
        segment_id: SegmentId,
        /// Non-drive segment it will follow.
        after: SegmentId,
    },
    /// Commit or clear an anchor's outward time, optionally relocating it.
    SetAnchor {
        /// Which anchor.
        anchor: AnchorSide,
        /// New outward time; `None` clears the lock.
        #[serde(default)]
        utc: Option<DateTime<Utc>>,
        /// New position.
        #[serde(default)]
        coordinates: Option<Coordinates>,
        /// New place name.
        #[serde(default)]
        location_name: Option<String>,
    },
    /// Pin or unlock one temporal field.
    EditField {
        /// The segment.
        segment_id: SegmentId,
        /// Which field.
        field: TemporalField,
        /// New value.
        value: FieldValue,
    },
    /// Move a segment to a new location.
    Relocate {
        /// The segment.
        segment_id: SegmentId,
        /// New position.
        coordinates: Coordinates,
        /// New place name.
        #[serde(default)]
        location_name: Option<String>,
    },
    /// Apply an overlap resolution action.
    Resolve {
        /// The action.
        action: ResolutionAction,
    },
}

impl TimelineEdit {
    /// Short name of the edit.
    pub fn name(&self) -> &'static str {
        match self {
            Self::QueueStop { .. } => "queue_stop",
            Self::PlaceStop { .. } => "place_stop",
            Self::InsertStop { .. } => "insert_stop",
            Self::DeleteStop { .. } => "delete_stop",
            Self::MoveStop { .. } => "move_stop",
            Self::SetAnchor { .. } => "set_anchor",
            Self::EditField { .. } => "edit_field",
            Self::Relocate { .. } => "relocate",
            Self::Resolve { .. } => "resolve",
        }
    }

    /// Position this edit gives a segment whose time zone is unknown.
    pub fn new_location(&self) -> Option<Coordinates> {
        match self {
            Self::PlaceStop { coordinates, .. } | Self::Relocate { coordinates, .. } => Some(*coordinates),
            Self::InsertStop { stop, .. } => stop.coordinates.filter(|_| stop.time_zone.is_none()),
            Self::SetAnchor { coordinates, .. } => *coordinates,
            Self::QueueStop { .. }
            | Self::DeleteStop { .. }
            | Self::MoveStop { .. }
            | Self::EditField { .. }
            | Self::Resolve { .. } => None,
        }
    }
}

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditEffect {
    /// Edited base list, queued stops last.
    pub timeline: Timeline,
    /// The segment the edit created or targeted.
    pub segment_id: Option<SegmentId>,
    /// A segment whose location changed and needs its time zone resolved.
    pub relocated: Option<SegmentId>,
}

/// Apply one edit to the base list.
///
/// Derived entries are dropped first; queued stops are kept after the
/// resident timeline.
pub fn apply_edit(timeline: &Timeline, edit: &TimelineEdit) -> Result<EditEffect, EditError> {
    let (resident, mut queued) = timeline.without_derived().split_queued();

    let effect = match edit {
        TimelineEdit::QueueStop { name } => {
            let stop = Segment::queued_stop(name.clone());
            let id = stop.id;
            queued.push(stop);
            EditEffect {
                timeline: resident,
                segment_id: Some(id),
                relocated: None,
            }
        }

        TimelineEdit::PlaceStop {
            segment_id,
            coordinates,
            location_name,
            after,
        } => {
            let index = queued
                .iter()
                .position(|s| s.id == *segment_id)
                .ok_or_else(|| {
                    if resident.contains(segment_id) {
                        EditError::InvalidEdit(format!("segment {segment_id} is already placed"))
                    } else {
                        EditError::SegmentNotFound(*segment_id)
                    }
                })?;
            let mut stop = queued.remove(index);
            stop.is_queued = false;
            stop.coordinates = Some(*coordinates);
            if location_name.is_some() {
                stop.location_name = location_name.clone();
            }
            EditEffect {
                timeline: insert_after(&resident, stop, *after)?,
                segment_id: Some(*segment_id),
                relocated: Some(*segment_id),
            }
        }

        TimelineEdit::InsertStop { stop, after } => {
            if !stop.is_stop() {
                return Err(EditError::InvalidEdit(format!("cannot insert a {} segment", stop.kind)));
            }
            if resident.contains(&stop.id) || queued.iter().any(|s| s.id == stop.id) {
                return Err(EditError::DuplicateSegment(stop.id));
            }
            if let Some(hours) = stop.duration.val {
                check_hours(hours)?;
            }
            let mut stop = derive_soft_field(stop);
            stop.is_queued = false;
            let relocated = (stop.coordinates.is_some() && stop.time_zone.is_none()).then_some(stop.id);
            let id = stop.id;
            EditEffect {
                timeline: insert_after(&resident, stop, *after)?,
                segment_id: Some(id),
                relocated,
            }
        }

        TimelineEdit::DeleteStop { segment_id } => {
            if let Some(index) = queued.iter().position(|s| s.id == *segment_id) {
                queued.remove(index);
                EditEffect {
                    timeline: resident,
                    segment_id: Some(*segment_id),
                    relocated: None,
                }
            } else {
                require_stop(&resident, *segment_id)?;
                EditEffect {
                    timeline: remove_and_heal(&resident, *segment_id)?,
                    segment_id: Some(*segment_id),
                    relocated: None,
                }
            }
        }

        TimelineEdit::MoveStop { segment_id, after } => {
            if segment_id == after {
                return Err(EditError::InvalidEdit("a stop cannot follow itself".to_string()));
            }
            let stop = require_stop(&resident, *segment_id)?.clone();
            let healed = remove_and_heal(&resident, *segment_id)?;
            EditEffect {
                timeline: insert_after(&healed, stop, *after)?,
                segment_id: Some(*segment_id),
                relocated: None,
            }
        }

        TimelineEdit::SetAnchor {
            anchor,
            utc,
            coordinates,
            location_name,
        } => {
            let mut segments = resident.into_segments();
            let segment = segments
                .iter_mut()
                .find(|s| anchor.matches(&s.kind))
                .ok_or_else(|| EditError::InvalidEdit(format!("timeline has no trip {anchor:?} anchor")))?;
            let endpoint = segment.endpoint_mut(anchor.outward());
            match utc {
                Some(utc) => *endpoint = Endpoint::hard(*utc),
                None => endpoint.lock = LockState::Unlocked,
            }
            if let Some(coordinates) = coordinates {
                segment.coordinates = Some(*coordinates);
            }
            if location_name.is_some() {
                segment.location_name = location_name.clone();
            }
            let id = segment.id;
            EditEffect {
                timeline: Timeline::new(segments),
                segment_id: Some(id),
                relocated: coordinates.map(|_| id),
            }
        }

        TimelineEdit::EditField {
            segment_id,
            field,
            value,
        } => EditEffect {
            timeline: edit_field(&resident, *segment_id, *field, *value)?,
            segment_id: Some(*segment_id),
            relocated: None,
        },

        TimelineEdit::Relocate {
            segment_id,
            coordinates,
            location_name,
        } => {
            let mut segments = resident.into_segments();
            let segment = segments
                .iter_mut()
                .find(|s| s.id == *segment_id)
                .ok_or(EditError::SegmentNotFound(*segment_id))?;
            if segment.is_drive() {
                return Err(EditError::InvalidEdit("drives follow their endpoints".to_string()));
            }
            segment.coordinates = Some(*coordinates);
            segment.time_zone = None;
            if location_name.is_some() {
                segment.location_name = location_name.clone();
            }
            EditEffect {
                timeline: Timeline::new(segments),
                segment_id: Some(*segment_id),
                relocated: Some(*segment_id),
            }
        }

        TimelineEdit::Resolve { action } => EditEffect {
            timeline: apply_resolution(&resident, action)?,
            segment_id: Some(action.segment_id()),
            relocated: None,
        },
    };

    tracing::debug!(op = edit.name(), segment = ?effect.segment_id, "edit applied");
    Ok(EditEffect {
        timeline: effect.timeline.with_queued(queued),
        ..effect
    })
}

/// Pin or unlock one temporal field, then re-derive the segment's soft field.
///
/// A duration pinned on a drive is a manual driving-time override and
/// survives re-routing until unlocked.
pub fn edit_field(
    timeline: &Timeline,
    segment_id: SegmentId,
    field: TemporalField,
    value: FieldValue,
) -> Result<Timeline, EditError> {
    let mut segments = timeline.segments().to_vec();
    let segment = segments
        .iter_mut()
        .find(|s| s.id == segment_id)
        .ok_or(EditError::SegmentNotFound(segment_id))?;
    if segment.is_derived() {
        return Err(EditError::InvalidEdit(format!("{} segments are derived", segment.kind)));
    }

    match (field.endpoint(), value) {
        (Some(endpoint), FieldValue::Time(utc)) => *segment.endpoint_mut(endpoint) = Endpoint::hard(utc),
        (Some(endpoint), FieldValue::Unlock) => segment.endpoint_mut(endpoint).lock = LockState::Unlocked,
        (None, FieldValue::Hours(hours)) => {
            check_hours(hours)?;
            segment.duration = DurationField::hard(hours);
            if let SegmentKind::Drive(leg) = &mut segment.kind {
                leg.manual_edit = true;
                leg.duration_min = Some(hours * 60.0);
            }
        }
        (None, FieldValue::Unlock) => {
            segment.duration.lock = LockState::Unlocked;
            if let SegmentKind::Drive(leg) = &mut segment.kind {
                leg.manual_edit = false;
            }
        }
        _ => return Err(EditError::ValueMismatch { field }),
    }

    *segment = derive_soft_field(segment);
    Ok(Timeline::new(segments))
}

/// Durations entered by the user must lie in `0..=MAX_SEGMENT_HOURS`.
fn check_hours(hours: f64) -> Result<(), EditError> {
    if !(0.0..=MAX_SEGMENT_HOURS).contains(&hours) {
        return Err(EditError::InvalidEdit(format!(
            "duration must be between 0 and {MAX_SEGMENT_HOURS} hours, got {hours}"
        )));
    }
    Ok(())
}

fn require_stop(timeline: &Timeline, id: SegmentId) -> Result<&Segment, EditError> {
    let segment = timeline.find(&id).ok_or(EditError::SegmentNotFound(id))?;
    if !segment.is_stop() {
        return Err(EditError::InvalidEdit(format!("only stops can be moved or deleted, not {}", segment.kind)));
    }
    Ok(segment)
}

/// Insert `stop` right after `after`, splitting the corridor it lands in.
fn insert_after(timeline: &Timeline, stop: Segment, after: SegmentId) -> Result<Timeline, EditError> {
    let index = timeline.position(&after).ok_or(EditError::SegmentNotFound(after))?;
    let anchor = &timeline.segments()[index];
    if anchor.is_drive() || matches!(anchor.kind, SegmentKind::TripEnd) {
        return Err(EditError::InvalidEdit(format!("cannot insert after a {} segment", anchor.kind)));
    }

    let stop_id = stop.id;
    let mut segments = timeline.segments().to_vec();
    segments.insert(index + 1, stop);
    Ok(split_corridor(timeline, &Timeline::new(segments), stop_id))
}

/// Remove a segment, healing the corridor around it.
fn remove_and_heal(timeline: &Timeline, id: SegmentId) -> Result<Timeline, EditError> {
    let index = timeline.position(&id).ok_or(EditError::SegmentNotFound(id))?;
    let mut segments = timeline.segments().to_vec();
    segments.remove(index);
    Ok(heal_corridor(&Timeline::new(segments), index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corridor::repair_structure;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn place(name: &str, lon: f64) -> Segment {
        Segment::stop(name).with_coordinates(Coordinates::new(lon, 40.0))
    }

    fn repaired(segments: Vec<Segment>) -> Timeline {
        repair_structure(&Timeline::new(segments)).timeline
    }

    fn names(timeline: &Timeline) -> Vec<String> {
        timeline
            .iter()
            .map(|s| s.name.clone().unwrap_or_else(|| s.kind.name().to_string()))
            .collect()
    }

    #[test]
    fn test_insert_splits_existing_corridor() {
        let timeline = repaired(vec![Segment::trip_start("Home"), Segment::trip_end("Away")]);
        let home = timeline.get(0).unwrap().id;

        let effect = apply_edit(&timeline, &TimelineEdit::InsertStop { stop: place("Lake", -99.0), after: home }).unwrap();
        assert_eq!(names(&effect.timeline), vec!["Home", "drive", "Lake", "drive", "Away"]);
        assert_eq!(effect.relocated, effect.segment_id);
    }

    #[test]
    fn test_insert_after_trip_end_rejected() {
        let timeline = Timeline::new_trip();
        let end = timeline.get(1).unwrap().id;
        let err = apply_edit(&timeline, &TimelineEdit::InsertStop { stop: place("Lake", -99.0), after: end }).unwrap_err();
        assert!(matches!(err, EditError::InvalidEdit(_)));
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let lake = place("Lake", -99.0);
        let timeline = repaired(vec![Segment::trip_start("Home"), lake.clone(), Segment::trip_end("Away")]);
        let home = timeline.get(0).unwrap().id;
        let err = apply_edit(&timeline, &TimelineEdit::InsertStop { stop: lake.clone(), after: home }).unwrap_err();
        assert_eq!(err, EditError::DuplicateSegment(lake.id));
    }

    #[test]
    fn test_delete_heals_corridor() {
        let lake = place("Lake", -99.0);
        let timeline = repaired(vec![Segment::trip_start("Home"), lake.clone(), Segment::trip_end("Away")]);

        let effect = apply_edit(&timeline, &TimelineEdit::DeleteStop { segment_id: lake.id }).unwrap();
        assert_eq!(names(&effect.timeline), vec!["Home", "drive", "Away"]);
        let leg = effect.timeline.get(1).and_then(Segment::drive).unwrap();
        assert_eq!(leg.origin_id, Some(timeline.get(0).unwrap().id));
        assert_eq!(leg.destination_id, Some(timeline.get(4).unwrap().id));
    }

    #[test]
    fn test_anchor_cannot_be_deleted() {
        let timeline = Timeline::new_trip();
        let start = timeline.get(0).unwrap().id;
        assert!(matches!(
            apply_edit(&timeline, &TimelineEdit::DeleteStop { segment_id: start }),
            Err(EditError::InvalidEdit(_))
        ));
    }

    #[test]
    fn test_move_heals_then_splits() {
        let (a, b) = (place("A", -100.0), place("B", -99.0));
        let timeline = repaired(vec![Segment::trip_start("Home"), a.clone(), b.clone(), Segment::trip_end("Away")]);

        let effect = apply_edit(&timeline, &TimelineEdit::MoveStop { segment_id: a.id, after: b.id }).unwrap();
        assert_eq!(
            names(&effect.timeline),
            vec!["Home", "drive", "B", "drive", "A", "drive", "Away"]
        );
        assert_eq!(repair_structure(&effect.timeline).timeline, effect.timeline);
    }

    #[test]
    fn test_queue_then_place() {
        let timeline = repaired(vec![Segment::trip_start("Home"), Segment::trip_end("Away")]);
        let home = timeline.get(0).unwrap().id;

        let queued = apply_edit(&timeline, &TimelineEdit::QueueStop { name: "Diner".to_string() }).unwrap();
        let id = queued.segment_id.unwrap();
        assert!(queued.timeline.get(3).unwrap().is_queued);

        let placed = apply_edit(
            &queued.timeline,
            &TimelineEdit::PlaceStop {
                segment_id: id,
                coordinates: Coordinates::new(-99.5, 40.0),
                location_name: Some("Route 66 Diner".to_string()),
                after: home,
            },
        )
        .unwrap();
        assert_eq!(names(&placed.timeline), vec!["Home", "drive", "Diner", "drive", "Away"]);
        assert!(!placed.timeline.get(2).unwrap().is_queued);
        assert_eq!(placed.relocated, Some(id));
    }

    #[test]
    fn test_place_unknown_stop() {
        let timeline = Timeline::new_trip();
        let home = timeline.get(0).unwrap().id;
        let missing = SegmentId::generate();
        let err = apply_edit(
            &timeline,
            &TimelineEdit::PlaceStop {
                segment_id: missing,
                coordinates: Coordinates::new(0.0, 0.0),
                location_name: None,
                after: home,
            },
        )
        .unwrap_err();
        assert_eq!(err, EditError::SegmentNotFound(missing));
    }

    #[test]
    fn test_set_anchor_pins_outward_endpoint() {
        let timeline = Timeline::new_trip();
        let effect = apply_edit(
            &timeline,
            &TimelineEdit::SetAnchor {
                anchor: AnchorSide::End,
                utc: Some(t0()),
                coordinates: None,
                location_name: None,
            },
        )
        .unwrap();
        assert_eq!(effect.timeline.get(1).unwrap().start, Endpoint::hard(t0()));
        assert_eq!(effect.relocated, None);
    }

    #[test]
    fn test_edit_field_derives_soft_third() {
        let stop = Segment::stop("Museum").with_start(Endpoint::hard(t0()));
        let id = stop.id;
        let timeline = Timeline::new(vec![stop]);

        let out = edit_field(&timeline, id, TemporalField::Duration, FieldValue::Hours(2.0)).unwrap();
        let museum = out.get(0).unwrap();
        assert_eq!(museum.end, Endpoint::new(Some(t0() + Duration::hours(2)), LockState::Soft));

        let out = edit_field(&out, id, TemporalField::Start, FieldValue::Unlock).unwrap();
        assert_eq!(out.get(0).unwrap().end.lock, LockState::Unlocked);
    }

    #[test]
    fn test_edit_field_value_mismatch() {
        let stop = Segment::stop("Museum");
        let id = stop.id;
        let err = edit_field(&Timeline::new(vec![stop]), id, TemporalField::Start, FieldValue::Hours(1.0)).unwrap_err();
        assert_eq!(err, EditError::ValueMismatch { field: TemporalField::Start });
    }

    #[test]
    fn test_edit_field_rejects_oversized_hours() {
        let stop = Segment::stop("Museum").with_start(Endpoint::hard(t0()));
        let id = stop.id;
        let timeline = Timeline::new(vec![stop]);

        for hours in [1e12, MAX_SEGMENT_HOURS + 1.0, -1.0, f64::NAN] {
            let err = edit_field(&timeline, id, TemporalField::Duration, FieldValue::Hours(hours)).unwrap_err();
            assert!(matches!(err, EditError::InvalidEdit(_)), "{hours} accepted");
        }
        assert!(edit_field(&timeline, id, TemporalField::Duration, FieldValue::Hours(MAX_SEGMENT_HOURS)).is_ok());
    }

    #[test]
    fn test_insert_rejects_oversized_duration() {
        let timeline = repaired(vec![Segment::trip_start("Home"), Segment::trip_end("Away")]);
        let home = timeline.get(0).unwrap().id;
        let stop = place("Lake", -99.0)
            .with_start(Endpoint::hard(t0()))
            .with_duration(DurationField::hard(1e12));

        let err = apply_edit(&timeline, &TimelineEdit::InsertStop { stop, after: home }).unwrap_err();
        assert!(matches!(err, EditError::InvalidEdit(_)));
    }

    #[test]
    fn test_drive_duration_edit_is_manual() {
        let timeline = repaired(vec![place("A", -100.0), place("B", -99.0)]);
        let drive = timeline.get(1).unwrap().id;

        let out = edit_field(&timeline, drive, TemporalField::Duration, FieldValue::Hours(1.5)).unwrap();
        let leg = out.get(1).and_then(Segment::drive).unwrap();
        assert!(leg.manual_edit);
        assert_eq!(leg.duration_min, Some(90.0));
    }

    #[test]
    fn test_new_location_matches_relocated_segment() {
        let timeline = repaired(vec![Segment::trip_start("Home"), Segment::trip_end("Away")]);
        let home = timeline.get(0).unwrap().id;
        let lake = place("Lake", -99.0);
        let point = lake.coordinates;

        let insert = TimelineEdit::InsertStop { stop: lake, after: home };
        assert_eq!(insert.new_location(), point);
        assert!(apply_edit(&timeline, &insert).unwrap().relocated.is_some());

        let mut dam = place("Dam", -98.0);
        dam.time_zone = Some("Etc/GMT+6".to_string());
        let zoned = TimelineEdit::InsertStop { stop: dam, after: home };
        assert_eq!(zoned.new_location(), None);
        assert_eq!(apply_edit(&timeline, &zoned).unwrap().relocated, None);

        assert_eq!(TimelineEdit::QueueStop { name: "Diner".to_string() }.new_location(), None);
    }

    #[test]
    fn test_edit_serializes_with_op_tag() {
        let edit = TimelineEdit::EditField {
            segment_id: SegmentId::generate(),
            field: TemporalField::Duration,
            value: FieldValue::Hours(2.0),
        };
        let json = serde_json::to_value(&edit).unwrap();
        assert_eq!(json["op"], "edit_field");
        assert_eq!(json["value"]["kind"], "hours");
        assert_eq!(serde_json::from_value::<TimelineEdit>(json).unwrap(), edit);
    }
}
