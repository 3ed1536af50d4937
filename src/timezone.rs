//! Time zone resolution for relocated segments.
//!
//! Failures are non-fatal: the caller leaves `time_zone` absent.

use async_trait::async_trait;

use crate::types::Coordinates;

/// Time zone lookup failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimezoneError {
    /// Coordinates are outside the valid range.
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(Coordinates),

    /// Resolver-specific failure.
    #[error("Time zone lookup failed: {0}")]
    Lookup(String),
}

/// Maps a point to an IANA time zone identifier.
#[async_trait]
pub trait TimezoneResolver: Send + Sync {
    /// Resolve the time zone at `point`.
    async fn resolve(&self, point: Coordinates) -> Result<String, TimezoneError>;
}

/// Nautical time zones: 15° longitude bands mapped to `Etc/GMT±N`.
///
/// Ignores political boundaries. Good enough to give every placed stop a
/// zone when no geocoder is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetTimezoneResolver;

impl OffsetTimezoneResolver {
    /// Whole-hour UTC offset of the band containing `lon`.
    pub fn offset_hours(lon: f64) -> i32 {
        ((lon / 15.0).round() as i32).clamp(-12, 12)
    }
}

#[async_trait]
impl TimezoneResolver for OffsetTimezoneResolver {
    async fn resolve(&self, point: Coordinates) -> Result<String, TimezoneError> {
        if !point.lon.is_finite() || !(-180.0..=180.0).contains(&point.lon) {
            return Err(TimezoneError::InvalidCoordinates(point));
        }
        // Etc/GMT zones use inverted signs: UTC-5 is Etc/GMT+5.
        let zone = match Self::offset_hours(point.lon) {
            0 => "Etc/GMT".to_string(),
            h if h > 0 => format!("Etc/GMT-{h}"),
            h => format!("Etc/GMT+{}", -h),
        };
        Ok(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_band_names() {
        let resolver = OffsetTimezoneResolver;
        assert_eq!(resolver.resolve(Coordinates::new(0.0, 51.5)).await.unwrap(), "Etc/GMT");
        assert_eq!(resolver.resolve(Coordinates::new(-75.0, 40.0)).await.unwrap(), "Etc/GMT+5");
        assert_eq!(resolver.resolve(Coordinates::new(139.7, 35.7)).await.unwrap(), "Etc/GMT-9");
    }

    #[tokio::test]
    async fn test_out_of_range_longitude() {
        let err = OffsetTimezoneResolver.resolve(Coordinates::new(181.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, TimezoneError::InvalidCoordinates(_)));
    }
}
