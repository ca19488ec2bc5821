use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::Coordinate;

/// Upper bound for the total duration and the buffer: one hundred years.
pub const MAX_JOURNEY_SECS: i64 = 100 * 365 * 86_400;

/// The fixed parameters of one walk.
///
/// Immutable once created. A new walk is always a new `Journey`.
#[derive(Debug, Clone, PartialEq)]
pub struct Journey {
    start_time: DateTime<Utc>,
    total_duration_secs: i64,
    buffer_secs: i64,
    return_location: Coordinate,
}

impl Journey {
    /// Create a journey.
    ///
    /// # Errors
    /// `NonPositiveDuration` when `total_duration_secs <= 0`,
    /// `NegativeBuffer` when `buffer_secs < 0`,
    /// `DurationOutOfRange` when either exceeds [`MAX_JOURNEY_SECS`].
    pub fn new(
        total_duration_secs: i64,
        buffer_secs: i64,
        return_location: Coordinate,
        start_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if total_duration_secs <= 0 {
            return Err(ValidationError::NonPositiveDuration(total_duration_secs));
        }
        if buffer_secs < 0 {
            return Err(ValidationError::NegativeBuffer(buffer_secs));
        }
        for (field, value) in [("total duration", total_duration_secs), ("buffer", buffer_secs)] {
            if value > MAX_JOURNEY_SECS {
                return Err(ValidationError::DurationOutOfRange {
                    field,
                    value,
                    max: MAX_JOURNEY_SECS,
                });
            }
        }
        Ok(Self {
            start_time,
            total_duration_secs,
            buffer_secs,
            return_location,
        })
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn total_duration_secs(&self) -> i64 {
        self.total_duration_secs
    }

    pub fn buffer_secs(&self) -> i64 {
        self.buffer_secs
    }

    pub fn return_location(&self) -> Coordinate {
        self.return_location
    }

    /// Instant by which the walker must be back.
    pub fn deadline(&self) -> DateTime<Utc> {
        self.start_time
            .checked_add_signed(chrono::Duration::seconds(self.total_duration_secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Derive the remaining-time figures at `now`. Values are signed and never clamped.
    pub fn timing_at(&self, now: DateTime<Utc>) -> Timing {
        let elapsed_secs = (now - self.start_time).num_seconds();
        let remaining_without_buffer_secs = self.total_duration_secs.saturating_sub(elapsed_secs);
        Timing {
            elapsed_secs,
            remaining_without_buffer_secs,
            remaining_secs: remaining_without_buffer_secs.saturating_sub(self.buffer_secs),
        }
    }

    pub fn to_record(&self) -> JourneyRecord {
        JourneyRecord {
            total_duration: self.total_duration_secs,
            return_location: self.return_location,
            start_time: self.start_time,
            buffer: self.buffer_secs,
        }
    }
}

/// Remaining-time figures at one instant, in signed seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub elapsed_secs: i64,
    pub remaining_without_buffer_secs: i64,
    /// Remaining time once the buffer is set aside. Negative means late.
    pub remaining_secs: i64,
}

/// Persisted shape of a journey, used for "repeat last journey".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRecord {
    /// Seconds.
    pub total_duration: i64,
    pub return_location: Coordinate,
    pub start_time: DateTime<Utc>,
    /// Seconds.
    pub buffer: i64,
}

impl TryFrom<JourneyRecord> for Journey {
    type Error = ValidationError;

    fn try_from(record: JourneyRecord) -> Result<Self, Self::Error> {
        let location = Coordinate::new(
            record.return_location.latitude,
            record.return_location.longitude,
        )?;
        Journey::new(record.total_duration, record.buffer, location, record.start_time)
    }
}

/// One estimate of walking time back to the return location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaSample {
    pub expected_travel_secs: i64,
    /// Route geometry. Empty when only an ETA was requested.
    #[serde(default)]
    pub route: Vec<Coordinate>,
    pub sampled_at: DateTime<Utc>,
}
