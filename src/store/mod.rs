//! Segment storage backends.

pub mod json_file;
pub mod memory;

use async_trait::async_trait;

use crate::types::Segment;

/// Trait for segment storage backends.
///
/// A store holds one ordered base list (no slack/overlap entries).
/// Saves are last-write-wins; there is no transaction across calls.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Load the stored list. An empty store yields an empty list.
    async fn load_segments(&self) -> Result<Vec<Segment>, Self::Error>;

    /// Replace the stored list.
    async fn save_segments(&self, segments: &[Segment]) -> Result<(), Self::Error>;
}

pub use json_file::{JsonFileSegmentStore, JsonStoreError};
pub use memory::{InMemorySegmentStore, InMemoryError};
