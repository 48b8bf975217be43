//! Recognition of acquisition dates embedded in file names and image labels.
//!
//! Dates are written day-first (`dd?MM?yyyy`) or year-first (`yyyy?MM?dd`),
//! optionally followed by `HH?mm` or `HH?mm?ss`, where `?` is one of
//! `_ - / .` (space and `:` are accepted before and within the time, as is
//! the ISO 8601 `T` before it). A date must not be glued to further digits
//! on either side.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:^|\D)(",
        r"(?:\d{4}[_\-/.]\d{2}[_\-/.]\d{2}|\d{2}[_\-/.]\d{2}[_\-/.]\d{4})",
        r"(?:[_\-/. T]\d{2}[_\-/.:]\d{2}(?:[_\-/.:]\d{2})?)?",
        r")(?:\D|$)",
    ))
    .expect("date pattern is a valid regex")
});

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-/.: T]").expect("separator pattern is a valid regex"));

/// Formats tried in order once separators are normalized to `_`.
const DATE_TIME_FORMATS: [&str; 4] = [
    "%d_%m_%Y_%H_%M_%S",
    "%d_%m_%Y_%H_%M",
    "%Y_%m_%d_%H_%M_%S",
    "%Y_%m_%d_%H_%M",
];

/// Date-only formats, resolved to midnight.
const DATE_FORMATS: [&str; 2] = ["%d_%m_%Y", "%Y_%m_%d"];

/// Finds the first recognizable date in `text`.
///
/// # Returns
/// `Some(NaiveDateTime)` of the first match that forms a valid calendar
/// date (and time), `None` otherwise. Date-only matches resolve to midnight.
///
/// # Example
/// ```
/// use rsmltrack::parser::date::extract_date;
///
/// let date = extract_date("ML1_Boite_00021_17_05_2021-14_30").unwrap();
/// assert_eq!(date.to_string(), "2021-05-17 14:30:00");
/// assert!(extract_date("no_date_here").is_none());
/// ```
pub fn extract_date(text: &str) -> Option<NaiveDateTime> {
    DATE_PATTERN.captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .find_map(|found| parse_normalized(found.as_str()))
}

fn parse_normalized(raw: &str) -> Option<NaiveDateTime> {
    let normalized = SEPARATORS.replace_all(raw, "_");

    DATE_TIME_FORMATS.iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .or_else(|| {
            // A trailing time that does not parse still leaves a usable date
            let date_part = date_prefix(&normalized);
            DATE_FORMATS.iter()
                .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Returns the first three `_`-separated fields, i.e. the date without time.
fn date_prefix(normalized: &str) -> &str {
    match normalized.match_indices('_').nth(2) {
        Some((position, _)) => &normalized[..position],
        None => normalized,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn test_day_first_dates() {
        assert_eq!(extract_date("plate_12-03-2020"), Some(datetime(2020, 3, 12, 0, 0, 0)));
        assert_eq!(extract_date("12/03/2020 08:15:30"), Some(datetime(2020, 3, 12, 8, 15, 30)));
        assert_eq!(extract_date("x_12.03.2020_08_15"), Some(datetime(2020, 3, 12, 8, 15, 0)));
    }

    #[test]
    fn test_year_first_dates() {
        assert_eq!(extract_date("2021_11_30"), Some(datetime(2021, 11, 30, 0, 0, 0)));
        assert_eq!(extract_date("img-2021-11-30_23-59-01.jpg"), Some(datetime(2021, 11, 30, 23, 59, 1)));
        assert_eq!(extract_date("2021-05-17T10:30:00"), Some(datetime(2021, 5, 17, 10, 30, 0)));
    }

    #[test]
    fn test_digits_around_date_are_rejected() {
        assert_eq!(extract_date("12_03_20201"), None);
        assert_eq!(extract_date("2021_11_301"), None);
        assert_eq!(extract_date("912_03_2020"), None);
        assert_eq!(extract_date("12_03_20201_plate_13_03_2020"), Some(datetime(2020, 3, 13, 0, 0, 0)));
        // An overlong time falls back to the date alone
        assert_eq!(extract_date("12_03_2020_08_159"), Some(datetime(2020, 3, 12, 0, 0, 0)));
    }

    #[test]
    fn test_invalid_calendar_values() {
        assert_eq!(extract_date("31_02_2020"), None);
        assert_eq!(extract_date("01_02_2020_25_00"), Some(datetime(2020, 2, 1, 0, 0, 0)));
    }
}
