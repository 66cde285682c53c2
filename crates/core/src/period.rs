use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("Date range starts after it ends: {start} > {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

/// An inclusive range of whole calendar days.
///
/// Bounds are kept as dates, so any time of day on `start` or `end` falls
/// inside the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} to {}", self.start, self.end)
        }
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::Inverted { start, end });
        }
        Ok(DateRange { start, end })
    }

    /// A range covering exactly one calendar day.
    pub fn day(date: NaiveDate) -> Self {
        DateRange { start: date, end: date }
    }

    /// Builds a range from timestamps, discarding their time components.
    pub fn from_datetimes(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Result<Self, PeriodError> {
        let end = end.unwrap_or(start);
        DateRange::new(start.date(), end.date())
    }

    pub fn start(self) -> NaiveDate {
        self.start
    }

    pub fn end(self) -> NaiveDate {
        self.end
    }

    /// First instant covered, 00:00:00 on the start day.
    pub fn start_of_range(self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Last whole second covered, 23:59:59 on the end day.
    pub fn end_of_range(self) -> NaiveDateTime {
        self.end
            .and_hms_opt(23, 59, 59)
            .unwrap_or_else(|| self.end.and_time(NaiveTime::MIN))
    }

    pub fn contains(self, moment: NaiveDateTime) -> bool {
        self.contains_date(moment.date())
    }

    pub fn contains_date(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn contains_is_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert!(range.contains_date(date(2024, 6, 15)));
        assert!(range.contains_date(date(2024, 1, 1)));
        assert!(range.contains_date(date(2024, 12, 31)));
        assert!(!range.contains_date(date(2023, 12, 31)));
        assert!(!range.contains_date(date(2025, 1, 1)));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            PeriodError::Inverted {
                start: date(2024, 2, 1),
                end: date(2024, 1, 1)
            }
        );
    }

    #[test]
    fn single_day_covers_whole_day() {
        let range = DateRange::day(date(2024, 3, 15));
        assert!(range.contains(at(2024, 3, 15, 0, 0, 0)));
        assert!(range.contains(at(2024, 3, 15, 12, 30, 0)));
        assert!(range.contains(at(2024, 3, 15, 23, 59, 59)));
        assert!(!range.contains(at(2024, 3, 14, 23, 59, 59)));
        assert!(!range.contains(at(2024, 3, 16, 0, 0, 0)));
        assert_eq!(range.start_of_range(), at(2024, 3, 15, 0, 0, 0));
        assert_eq!(range.end_of_range(), at(2024, 3, 15, 23, 59, 59));
    }

    #[test]
    fn from_datetimes_normalizes_to_days() {
        let range = DateRange::from_datetimes(at(2024, 3, 15, 18, 0, 0), Some(at(2024, 3, 16, 1, 0, 0))).unwrap();
        assert_eq!(range.start(), date(2024, 3, 15));
        assert_eq!(range.end(), date(2024, 3, 16));
        assert!(range.contains(at(2024, 3, 15, 0, 0, 1)));
        assert!(range.contains(at(2024, 3, 16, 23, 0, 0)));
    }

    #[test]
    fn from_datetimes_collapses_missing_end() {
        let range = DateRange::from_datetimes(at(2024, 3, 15, 9, 0, 0), None).unwrap();
        assert_eq!(range, DateRange::day(date(2024, 3, 15)));
    }

    #[test]
    fn display() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(range.to_string(), "2024-01-01 to 2024-12-31");
        assert_eq!(DateRange::day(date(2024, 3, 15)).to_string(), "2024-03-15");
    }
}
