//! Half-open `[start, end)` calendar windows anchored to an instant, in UTC.
//!
//! All boundaries are truncated to midnight. The builder and specification
//! helpers pass `Utc::now()`; tests pass a fixed instant.

use chrono::{DateTime, Datelike, Days, Months, NaiveTime, Utc};

/// Field that the `created_*` helpers filter on.
pub const CREATED_AT: &str = "created_at";

fn midnight(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// `[today 00:00, tomorrow 00:00)`
pub fn today(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = midnight(now);
    (start, start + Days::new(1))
}

/// `[Monday 00:00, next Monday 00:00)` of the ISO week containing `now`.
pub fn this_week(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let since_monday = u64::from(now.weekday().num_days_from_monday());
    let start = midnight(now) - Days::new(since_monday);
    (start, start + Days::new(7))
}

/// `[1st of month 00:00, 1st of next month 00:00)`
pub fn this_month(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = midnight(now) - Days::new(u64::from(now.day0()));
    (start, start + Months::new(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 15).unwrap()
    }

    #[test]
    fn test_today() {
        let (start, end) = today(at(2024, 3, 15, 13));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_this_week_starts_monday() {
        // 2024-03-14 is a Thursday.
        let (start, end) = this_week(at(2024, 3, 14, 9));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_this_week_on_monday() {
        let (start, _) = this_week(at(2024, 3, 11, 23));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_this_month_handles_year_end() {
        let (start, end) = this_month(at(2023, 12, 31, 22));
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_this_month_february_leap_year() {
        let (start, end) = this_month(at(2024, 2, 10, 1));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_windows_contain_now() {
        let now = at(2024, 7, 4, 12);
        for (start, end) in [today(now), this_week(now), this_month(now)] {
            assert!(start <= now && now < end);
        }
    }
}
