//! Calendar date and timezone helpers.
//!
//! Quest days are local calendar dates in the user's configured timezone.
//! Nothing in this module consults the host's local time zone.

use crate::{Error, Result};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// A timezone-anchored local date (no time component)
pub type CalendarDate = NaiveDate;

/// Parse an IANA timezone name such as `Europe/Berlin`
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| Error::Timezone(name.to_string()))
}

/// The local calendar date of an instant in the given timezone
pub fn local_date_of(instant: DateTime<Utc>, tz: Tz) -> CalendarDate {
    instant.with_timezone(&tz).date_naive()
}

/// Today's date in the given timezone
pub fn today_in(tz: Tz) -> CalendarDate {
    local_date_of(Utc::now(), tz)
}

/// Whether `date` is today in the given timezone
pub fn is_today(date: CalendarDate, tz: Tz) -> bool {
    date == today_in(tz)
}

/// The first instant of `date` in `tz`, expressed in UTC.
///
/// Where local midnight does not exist (a DST gap), this is the first
/// valid local instant after it.
pub fn start_of_day(date: CalendarDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let mut probe = midnight;
    // DST gaps are at most a couple of hours; step forward in 15 minute slices
    for _ in 0..16 {
        match tz.from_local_datetime(&probe) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => probe += Duration::minutes(15),
        }
    }
    tracing::warn!("No valid local midnight for {} in {}, using UTC", date, tz);
    Utc.from_utc_datetime(&midnight)
}

/// Parse `YYYY-MM-DD`, or take the date part of an RFC 3339 timestamp
pub fn parse_iso_date(input: &str) -> Result<CalendarDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .map_err(|_| Error::InvalidDate(input.to_string()))
}

/// Ascending iterator over every day in an inclusive range
#[derive(Clone, Debug)]
pub struct DateRange {
    next: Option<CalendarDate>,
    end: CalendarDate,
}

impl Iterator for DateRange {
    type Item = CalendarDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if current > self.end {
            self.next = None;
            return None;
        }
        self.next = current.succ_opt();
        Some(current)
    }
}

/// Every day in `[start, end]`, ascending
pub fn days_inclusive(start: CalendarDate, end: CalendarDate) -> Result<DateRange> {
    if start > end {
        return Err(Error::InvalidRange { start, end });
    }
    Ok(DateRange {
        next: Some(start),
        end,
    })
}

/// Clip a window so it does not extend past a template's due date.
///
/// Returns `None` when the whole window lies after the due date.
pub fn clip_to_due_date(
    start: CalendarDate,
    end: CalendarDate,
    due: Option<CalendarDate>,
) -> Option<(CalendarDate, CalendarDate)> {
    match due {
        Some(due) if due < start => None,
        Some(due) => Some((start, end.min(due))),
        None => Some((start, end)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("America/New_York").unwrap(), Tz::America__New_York);
        assert!(matches!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(Error::Timezone(_))
        ));
    }

    #[test]
    fn test_local_date_near_midnight() {
        // 03:30 UTC is still the previous evening in New York
        let instant = Utc.with_ymd_and_hms(2026, 3, 2, 3, 30, 0).unwrap();
        assert_eq!(local_date_of(instant, Tz::UTC), date(2026, 3, 2));
        assert_eq!(local_date_of(instant, Tz::America__New_York), date(2026, 3, 1));
        // and already the next morning in Tokyo
        let late = Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap();
        assert_eq!(local_date_of(late, Tz::Asia__Tokyo), date(2026, 3, 3));
    }

    #[test]
    fn test_start_of_day_offsets() {
        let start = start_of_day(date(2026, 1, 15), Tz::America__New_York);
        assert_eq!(start.hour(), 5);
        assert_eq!(start.day(), 15);

        let start = start_of_day(date(2026, 1, 15), Tz::Asia__Tokyo);
        assert_eq!(start.hour(), 15);
        assert_eq!(start.day(), 14);
    }

    #[test]
    fn test_start_of_day_in_dst_gap() {
        // Santiago springs forward at local midnight
        let start = start_of_day(date(2024, 9, 8), Tz::America__Santiago);
        let local = start.with_timezone(&Tz::America__Santiago);
        assert_eq!(local.date_naive(), date(2024, 9, 8));
        assert_eq!(local.hour(), 1);
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2026-10-18").unwrap(), date(2026, 10, 18));
        assert_eq!(
            parse_iso_date("2026-10-18T23:15:00+02:00").unwrap(),
            date(2026, 10, 18)
        );
        assert!(matches!(parse_iso_date("18/10/2026"), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_days_inclusive() {
        let days: Vec<_> = days_inclusive(date(2026, 2, 27), date(2026, 3, 2))
            .unwrap()
            .collect();
        assert_eq!(
            days,
            vec![date(2026, 2, 27), date(2026, 2, 28), date(2026, 3, 1), date(2026, 3, 2)]
        );

        let single: Vec<_> = days_inclusive(date(2026, 1, 1), date(2026, 1, 1))
            .unwrap()
            .collect();
        assert_eq!(single.len(), 1);

        assert!(matches!(
            days_inclusive(date(2026, 1, 2), date(2026, 1, 1)),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_clip_to_due_date() {
        let start = date(2026, 5, 1);
        let end = date(2026, 5, 7);
        assert_eq!(clip_to_due_date(start, end, None), Some((start, end)));
        assert_eq!(
            clip_to_due_date(start, end, Some(date(2026, 5, 4))),
            Some((start, date(2026, 5, 4)))
        );
        assert_eq!(clip_to_due_date(start, end, Some(date(2026, 4, 30))), None);
        assert_eq!(
            clip_to_due_date(start, end, Some(date(2026, 6, 1))),
            Some((start, end))
        );
    }

    #[test]
    fn test_today_is_today() {
        let today = today_in(Tz::UTC);
        assert!(is_today(today, Tz::UTC));
        assert!(!is_today(today.pred_opt().unwrap(), Tz::UTC));
    }
}
