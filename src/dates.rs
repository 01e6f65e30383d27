// Calendar helpers shared by the timetable lookup and the quote builder

use chrono::{Duration, NaiveDate, NaiveDateTime};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

// Accepted stay boundary layouts, tried in order
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

// Format a calendar date the way timetables key their entries
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a stay boundary. A bare `YYYY-MM-DD` is taken as midnight; a date-time keeps its
/// time of day so that non-aligned spans are counted the same way the night count does.
/// Returns `None` for anything unparsable.
pub fn parse_stay_instant(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Iterator over the calendar dates of each night in `[start, end)`, stepping one day at a
/// time from `start`.
pub struct StayNights {
    current: NaiveDateTime,
    end: NaiveDateTime,
}

impl Iterator for StayNights {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        let date = self.current.date();
        self.current = self.current.checked_add_signed(Duration::days(1))?;
        Some(date)
    }
}

pub fn stay_nights(start: NaiveDateTime, end: NaiveDateTime) -> StayNights {
    StayNights {
        current: start,
        end,
    }
}

// Whole nights between two instants, rounding any partial day up
pub fn nights_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn instant(raw: &str) -> NaiveDateTime {
        parse_stay_instant(raw).unwrap()
    }

    #[test]
    fn test_iso_date_pads_month_and_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(iso_date(date), "2024-06-01");
    }

    #[test_case("2024-06-01", Some("2024-06-01T00:00:00"); "bare date is midnight")]
    #[test_case("2024-06-01T14:30", Some("2024-06-01T14:30:00"); "date time without seconds")]
    #[test_case(" 2024-06-01T14:30:15 ", Some("2024-06-01T14:30:15"); "surrounding whitespace")]
    #[test_case("", None; "empty input")]
    #[test_case("01/06/2024", None; "unsupported layout")]
    #[test_case("2024-02-30", None; "impossible date")]
    fn test_parse_stay_instant(raw: &str, expected: Option<&str>) {
        let expected = expected.map(|e| NaiveDateTime::parse_from_str(e, "%Y-%m-%dT%H:%M:%S").unwrap());
        assert_eq!(parse_stay_instant(raw), expected);
    }

    #[test]
    fn test_stay_nights_excludes_checkout() {
        let dates: Vec<String> = stay_nights(instant("2024-06-30"), instant("2024-07-02"))
            .map(iso_date)
            .collect();
        assert_eq!(dates, vec!["2024-06-30", "2024-07-01"]);
    }

    #[test]
    fn test_stay_nights_empty_for_reversed_range() {
        assert_eq!(stay_nights(instant("2024-06-03"), instant("2024-06-01")).count(), 0);
    }

    #[test_case("2024-06-01", "2024-06-03", 2; "aligned span")]
    #[test_case("2024-06-01", "2024-06-01", 0; "same instant")]
    #[test_case("2024-06-03", "2024-06-01", 0; "reversed")]
    #[test_case("2024-06-01T12:00", "2024-06-03", 2; "late checkin rounds up")]
    #[test_case("2024-06-01", "2024-06-03T06:00", 3; "late checkout rounds up")]
    #[test_case("2024-02-28", "2024-03-01", 2; "leap day")]
    fn test_nights_between(checkin: &str, checkout: &str, expected: i64) {
        assert_eq!(nights_between(instant(checkin), instant(checkout)), expected);
    }

    #[test_case("2024-06-01", "2024-06-05"; "aligned")]
    #[test_case("2024-06-01T12:00", "2024-06-03"; "half day start")]
    #[test_case("2024-06-01", "2024-06-03T06:00"; "quarter day end")]
    #[test_case("2024-06-01T23:59:59", "2024-06-02T00:00:01"; "two seconds")]
    fn test_night_count_matches_iteration(checkin: &str, checkout: &str) {
        let (start, end) = (instant(checkin), instant(checkout));
        assert_eq!(stay_nights(start, end).count() as i64, nights_between(start, end));
    }
}
