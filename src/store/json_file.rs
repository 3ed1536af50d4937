//! JSON file segment store.
//!
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a crash mid-write never leaves a truncated list behind.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::SegmentStore;
use crate::types::Segment;

/// Error type for the JSON file store.
#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid segment list.
    #[error("Malformed segment file {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Segment store backed by one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSegmentStore {
    path: PathBuf,
}

impl JsonFileSegmentStore {
    /// Store at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load path from `TRIP_STORE_PATH`, falling back to `trip_segments.json`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("TRIP_STORE_PATH").unwrap_or_else(|_| "trip_segments.json".to_string()))
    }

    /// File backing the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> JsonStoreError {
        JsonStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl SegmentStore for JsonFileSegmentStore {
    type Error = JsonStoreError;

    async fn load_segments(&self) -> Result<Vec<Segment>, Self::Error> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| JsonStoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    async fn save_segments(&self, segments: &[Segment]) -> Result<(), Self::Error> {
        let bytes = serde_json::to_vec_pretty(segments).map_err(|source| JsonStoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await.map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), segments = segments.len(), "segments saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("trip-timeline-{}-{name}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let store = JsonFileSegmentStore::new(scratch("missing"));
        assert!(store.load_segments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let path = scratch("roundtrip");
        let store = JsonFileSegmentStore::new(&path);
        let segments = vec![Segment::trip_start("Home"), Segment::stop("Lake"), Segment::trip_end("Home")];

        store.save_segments(&segments).await.unwrap();
        assert_eq!(store.load_segments().await.unwrap(), segments);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let path = scratch("malformed");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileSegmentStore::new(&path).load_segments().await.unwrap_err();
        assert!(matches!(err, JsonStoreError::Json { .. }));

        let _ = std::fs::remove_file(path);
    }
}
