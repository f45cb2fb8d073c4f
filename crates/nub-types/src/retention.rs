//! Retention period requested for a snippet.

use chrono::Duration;

/// How long the worker should keep a snippet available.
///
/// All three components default to zero; an all-zero period is valid and
/// maps to a zero-length duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPeriod {
    /// Whole days.
    pub days: i64,
    /// Whole hours.
    pub hours: i64,
    /// Whole minutes.
    pub minutes: i64,
}

impl RetentionPeriod {
    /// Create a retention period from its components.
    #[must_use]
    pub fn new(days: i64, hours: i64, minutes: i64) -> Self {
        Self {
            days,
            hours,
            minutes,
        }
    }

    /// Total retention as a single duration.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::days(self.days) + Duration::hours(self.hours) + Duration::minutes(self.minutes)
    }

    /// Whether all components are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }
}
