//! Segment types for the timeline kernel.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use xxhash_rust::xxh64::xxh64;

use super::lock::{hours_to_duration, DurationField, Endpoint, LockState};

/// Unique identifier for a segment in the timeline.
///
/// Wraps a UUID and implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(Uuid);

impl SegmentId {
    /// Create a new SegmentId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a fresh random SegmentId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derive a stable id for a pseudo-segment sitting between two segments.
    ///
    /// The same `(tag, left, right)` triple always yields the same id, so
    /// regenerated slack/overlap entries do not churn between runs.
    pub fn derived(tag: &str, left: SegmentId, right: SegmentId) -> Self {
        let mut bytes = Vec::with_capacity(tag.len() + 32);
        bytes.extend_from_slice(tag.as_bytes());
        bytes.extend_from_slice(left.0.as_bytes());
        bytes.extend_from_slice(right.0.as_bytes());
        let hi = xxh64(&bytes, 0) as u128;
        let lo = xxh64(&bytes, 1) as u128;
        Self(Uuid::from_u128((hi << 64) | lo))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SegmentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Geographic point (longitude, latitude in degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lon, self.lat)
    }
}

/// One of the two time endpoints of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointField {
    /// The segment's start.
    Start,
    /// The segment's end.
    End,
}

impl fmt::Display for EndpointField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// A user-editable temporal field of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalField {
    /// `start` endpoint.
    Start,
    /// `end` endpoint.
    End,
    /// `duration` field.
    Duration,
}

impl TemporalField {
    /// The endpoint this field names, if it is one.
    pub fn endpoint(self) -> Option<EndpointField> {
        match self {
            Self::Start => Some(EndpointField::Start),
            Self::End => Some(EndpointField::End),
            Self::Duration => None,
        }
    }
}

impl fmt::Display for TemporalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
            Self::Duration => write!(f, "duration"),
        }
    }
}

/// Drive-only attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveLeg {
    /// Non-drive segment this drive leaves from.
    pub origin_id: Option<SegmentId>,
    /// Non-drive segment this drive arrives at.
    pub destination_id: Option<SegmentId>,
    /// Route polyline as a sequence of points; empty when unrouted.
    #[serde(default)]
    pub route_geometry: Vec<Coordinates>,
    /// Routed distance in miles.
    pub distance_mi: Option<f64>,
    /// Routed (or manually edited) driving time in minutes.
    pub duration_min: Option<f64>,
    /// Populated by the routing service rather than authored by the user.
    #[serde(default)]
    pub auto_drive: bool,
    /// The user overrode the driving time.
    #[serde(default)]
    pub manual_edit: bool,
}

impl DriveLeg {
    /// A fresh, unrouted leg between two segments.
    pub fn between(origin: SegmentId, destination: SegmentId) -> Self {
        Self {
            origin_id: Some(origin),
            destination_id: Some(destination),
            ..Default::default()
        }
    }

    /// Whether the leg carries route data.
    pub fn is_routed(&self) -> bool {
        !self.route_geometry.is_empty()
    }
}

/// Reference to a pinned endpoint responsible for one side of an overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRef {
    /// Segment owning the endpoint.
    pub segment_id: SegmentId,
    /// Which endpoint.
    pub field: EndpointField,
    /// Lock held by the endpoint when the overlap was derived.
    pub lock: LockState,
    /// Timestamp held by the endpoint.
    pub utc: Option<DateTime<Utc>>,
}

/// Overlap-only attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlapInfo {
    /// Nearest pinned endpoint pushing the earlier segment's end later.
    pub left_anchor: Option<AnchorRef>,
    /// Nearest pinned endpoint holding the later segment's start earlier.
    pub right_anchor: Option<AnchorRef>,
    /// Real segments between (and including) the two anchors.
    #[serde(default)]
    pub contributors: Vec<SegmentId>,
}

/// Segment variant.
///
/// `Slack` and `Overlap` are derived by the kernel on every pass and are
/// never read back as input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKind {
    /// First segment of the trip.
    TripStart,
    /// Last segment of the trip.
    TripEnd,
    /// A visit.
    Stop,
    /// Travel between two non-drive segments.
    Drive(DriveLeg),
    /// Idle time between two segments.
    Slack,
    /// Scheduling conflict between two segments.
    Overlap(OverlapInfo),
}

impl SegmentKind {
    /// Short name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TripStart => "trip_start",
            Self::TripEnd => "trip_end",
            Self::Stop => "stop",
            Self::Drive(_) => "drive",
            Self::Slack => "slack",
            Self::Overlap(_) => "overlap",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A time-bounded entry of the trip timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Stable identifier.
    pub id: SegmentId,
    /// Variant and variant-specific data.
    pub kind: SegmentKind,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable place name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    /// Geographic position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// IANA time zone of the location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// Start endpoint.
    #[serde(default)]
    pub start: Endpoint,
    /// End endpoint.
    #[serde(default)]
    pub end: Endpoint,
    /// Length in hours.
    #[serde(default)]
    pub duration: DurationField,
    /// Created but not yet placed into the ordered timeline.
    #[serde(default)]
    pub is_queued: bool,
    /// UI-only flag; never persisted.
    #[serde(default, skip_serializing)]
    pub open_editor: bool,
}

impl Segment {
    fn blank(kind: SegmentKind) -> Self {
        Self {
            id: SegmentId::generate(),
            kind,
            name: None,
            location_name: None,
            coordinates: None,
            time_zone: None,
            start: Endpoint::default(),
            end: Endpoint::default(),
            duration: DurationField::default(),
            is_queued: false,
            open_editor: false,
        }
    }

    /// A trip start anchor.
    pub fn trip_start(name: impl Into<String>) -> Self {
        Self::blank(SegmentKind::TripStart).with_name(name)
    }

    /// A trip end anchor.
    pub fn trip_end(name: impl Into<String>) -> Self {
        Self::blank(SegmentKind::TripEnd).with_name(name)
    }

    /// A stop with no location or time yet.
    pub fn stop(name: impl Into<String>) -> Self {
        Self::blank(SegmentKind::Stop).with_name(name)
    }

    /// A queued stop awaiting a location.
    pub fn queued_stop(name: impl Into<String>) -> Self {
        let mut stop = Self::stop(name);
        stop.is_queued = true;
        stop
    }

    /// A system-generated, unrouted drive between two segments.
    pub fn drive_between(origin: SegmentId, destination: SegmentId) -> Self {
        Self::blank(SegmentKind::Drive(DriveLeg::between(origin, destination)))
    }

    /// A derived slack or overlap entry with a stable id.
    pub(crate) fn derived(
        kind: SegmentKind,
        left: SegmentId,
        right: SegmentId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        hours: f64,
    ) -> Self {
        let id = SegmentId::derived(kind.name(), left, right);
        Self {
            id,
            start: Endpoint::new(start, LockState::Auto),
            end: Endpoint::new(end, LockState::Auto),
            duration: DurationField::new(Some(hours), LockState::Auto),
            ..Self::blank(kind)
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the coordinates.
    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Set the start endpoint.
    pub fn with_start(mut self, start: Endpoint) -> Self {
        self.start = start;
        self
    }

    /// Set the end endpoint.
    pub fn with_end(mut self, end: Endpoint) -> Self {
        self.end = end;
        self
    }

    /// Set the duration field.
    pub fn with_duration(mut self, duration: DurationField) -> Self {
        self.duration = duration;
        self
    }

    /// Whether this is a drive.
    pub fn is_drive(&self) -> bool {
        matches!(self.kind, SegmentKind::Drive(_))
    }

    /// Whether this is a stop.
    pub fn is_stop(&self) -> bool {
        matches!(self.kind, SegmentKind::Stop)
    }

    /// Whether this is a trip start or trip end anchor.
    pub fn is_anchor(&self) -> bool {
        matches!(self.kind, SegmentKind::TripStart | SegmentKind::TripEnd)
    }

    /// Whether this is a derived slack/overlap entry.
    pub fn is_derived(&self) -> bool {
        matches!(self.kind, SegmentKind::Slack | SegmentKind::Overlap(_))
    }

    /// Drive data, if this is a drive.
    pub fn drive(&self) -> Option<&DriveLeg> {
        match &self.kind {
            SegmentKind::Drive(leg) => Some(leg),
            _ => None,
        }
    }

    /// Mutable drive data, if this is a drive.
    pub fn drive_mut(&mut self) -> Option<&mut DriveLeg> {
        match &mut self.kind {
            SegmentKind::Drive(leg) => Some(leg),
            _ => None,
        }
    }

    /// Overlap data, if this is an overlap.
    pub fn overlap(&self) -> Option<&OverlapInfo> {
        match &self.kind {
            SegmentKind::Overlap(info) => Some(info),
            _ => None,
        }
    }

    /// Borrow an endpoint.
    pub fn endpoint(&self, field: EndpointField) -> &Endpoint {
        match field {
            EndpointField::Start => &self.start,
            EndpointField::End => &self.end,
        }
    }

    /// Mutably borrow an endpoint.
    pub fn endpoint_mut(&mut self, field: EndpointField) -> &mut Endpoint {
        match field {
            EndpointField::Start => &mut self.start,
            EndpointField::End => &mut self.end,
        }
    }

    /// Time this segment occupies, as used by propagation.
    ///
    /// Drives prefer routed/manual driving time over the `duration` field.
    /// `None` when nothing is known.
    pub fn span(&self) -> Option<Duration> {
        match &self.kind {
            SegmentKind::Drive(leg) => match leg.duration_min {
                Some(min) => hours_to_duration(min / 60.0),
                None => self.duration.val.and_then(hours_to_duration),
            },
            SegmentKind::TripStart
            | SegmentKind::TripEnd
            | SegmentKind::Stop
            | SegmentKind::Slack
            | SegmentKind::Overlap(_) => self.duration.val.and_then(hours_to_duration),
        }
    }
}
