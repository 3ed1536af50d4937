//! In-memory segment store for testing and embedding.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::SegmentStore;
use crate::types::Segment;

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Writes were disabled with [`InMemorySegmentStore::set_read_only`].
    #[error("Store is read-only")]
    ReadOnly,
}

/// In-memory segment store.
#[derive(Debug, Default)]
pub struct InMemorySegmentStore {
    segments: RwLock<Vec<Segment>>,
    saves: AtomicU64,
    read_only: RwLock<bool>,
}

impl InMemorySegmentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `segments`.
    pub fn with_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments: RwLock::new(segments),
            ..Self::default()
        }
    }

    /// Snapshot of the stored list.
    pub fn segments(&self) -> Vec<Segment> {
        self.segments.read().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every subsequent save fail.
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.write() = read_only;
    }
}

#[async_trait]
impl SegmentStore for InMemorySegmentStore {
    type Error = InMemoryError;

    async fn load_segments(&self) -> Result<Vec<Segment>, Self::Error> {
        Ok(self.segments())
    }

    async fn save_segments(&self, segments: &[Segment]) -> Result<(), Self::Error> {
        if *self.read_only.read() {
            return Err(InMemoryError::ReadOnly);
        }
        *self.segments.write() = segments.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemorySegmentStore::new();
        let segments = vec![Segment::trip_start("Home"), Segment::trip_end("Home")];

        store.save_segments(&segments).await.unwrap();
        assert_eq!(store.load_segments().await.unwrap(), segments);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let store = InMemorySegmentStore::with_segments(vec![Segment::stop("Kept")]);
        store.set_read_only(true);

        assert!(store.save_segments(&[]).await.is_err());
        assert_eq!(store.segments().len(), 1);
        assert_eq!(store.save_count(), 0);
    }
}
