//! Core types for the timeline kernel.

pub mod segment;
pub mod lock;
pub mod timeline;

pub use segment::{
    SegmentId, SegmentKind, Segment, DriveLeg, OverlapInfo, AnchorRef,
    Coordinates, EndpointField, TemporalField,
};
pub use lock::{
    LockState, Endpoint, DurationField, derive_soft_field,
    hours_to_duration, duration_to_hours, shift_by_hours, MAX_SEGMENT_HOURS,
};
pub use timeline::Timeline;
