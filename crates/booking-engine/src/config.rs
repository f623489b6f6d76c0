//! Calendar configuration: time zone, slot width, and operating hours.

use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::error::{BookingError, Result};

/// Configuration for slot materialization and wall-clock normalization.
///
/// Defaults mirror the reference deployment: America/Bogota, 60-minute
/// slots, operating hours 08:00-20:00.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
    /// IANA time zone all wall-clock inputs are interpreted in.
    pub timezone: Tz,
    /// Fixed slot width in minutes.
    pub slot_minutes: u32,
    /// First slot starts at this time of day.
    pub day_start: NaiveTime,
    /// No slot may end after this time of day.
    pub day_end: NaiveTime,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Bogota,
            slot_minutes: 60,
            day_start: NaiveTime::from_hms_opt(8, 0, 0).expect("literal time"),
            day_end: NaiveTime::from_hms_opt(20, 0, 0).expect("literal time"),
        }
    }
}

impl CalendarConfig {
    /// Build a config from an IANA time zone name, keeping the remaining
    /// defaults.
    pub fn with_timezone(name: &str) -> Result<Self> {
        let timezone: Tz = name
            .parse()
            .map_err(|_| BookingError::Validation(format!("invalid timezone: {name}")))?;
        Ok(Self {
            timezone,
            ..Self::default()
        })
    }

    /// Reject configurations that cannot produce a well-formed slot grid.
    pub fn validate(&self) -> Result<()> {
        if self.slot_minutes == 0 {
            return Err(BookingError::Validation(
                "slot duration must be positive".into(),
            ));
        }
        if self.day_start >= self.day_end {
            return Err(BookingError::Validation(
                "day start must be before day end".into(),
            ));
        }
        Ok(())
    }
}
