//! Game-day boundary shared by every once-per-day gate.
//!
//! A game day starts at `rollover_hour` local time in a fixed reference
//! offset, not at UTC midnight: 02:30 local still belongs to yesterday.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ROLLOVER_HOUR, DEFAULT_UTC_OFFSET_HOURS};

const SECONDS_PER_HOUR: i32 = 3_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBoundary {
    /// Offset of the reference time zone from UTC, in whole hours.
    pub utc_offset_hours: i32,
    /// Local hour at which a new game day begins.
    pub rollover_hour: u32,
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self {
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            rollover_hour: DEFAULT_ROLLOVER_HOUR,
        }
    }
}

impl DayBoundary {
    #[must_use]
    pub const fn new(utc_offset_hours: i32, rollover_hour: u32) -> Self {
        Self {
            utc_offset_hours,
            rollover_hour,
        }
    }

    fn offset(self) -> FixedOffset {
        let hours = self.utc_offset_hours.clamp(-23, 23);
        FixedOffset::east_opt(hours * SECONDS_PER_HOUR).unwrap_or_else(|| Utc.fix())
    }
}

/// Calendar day an instant belongs to under `boundary`.
#[must_use]
pub fn calendar_day_for(instant: DateTime<Utc>, boundary: DayBoundary) -> NaiveDate {
    let local = instant.with_timezone(&boundary.offset());
    let shifted = local - Duration::hours(i64::from(boundary.rollover_hour.min(23)));
    shifted.date_naive()
}

/// Whether two instants fall on the same game day.
#[must_use]
pub fn is_same_day(a: DateTime<Utc>, b: DateTime<Utc>, boundary: DayBoundary) -> bool {
    calendar_day_for(a, boundary) == calendar_day_for(b, boundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jst(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(9 * 3_600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn before_rollover_belongs_to_previous_day() {
        let boundary = DayBoundary::default();
        let early = jst(2024, 3, 10, 3, 59);
        let after = jst(2024, 3, 10, 4, 0);
        assert_eq!(
            calendar_day_for(early, boundary),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
        assert_eq!(
            calendar_day_for(after, boundary),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
    }

    #[test]
    fn utc_midnight_is_not_the_boundary() {
        let boundary = DayBoundary::default();
        // 23:30 and 00:30 UTC are 08:30 and 09:30 JST on the same game day.
        let a = Utc.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap();
        assert!(is_same_day(a, b, boundary));
    }

    #[test]
    fn custom_boundary_shifts_the_day() {
        let utc_midnight = DayBoundary::new(0, 0);
        let a = Utc.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap();
        assert!(!is_same_day(a, b, utc_midnight));
    }
}
