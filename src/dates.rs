use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

const KEY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day rendered as a fixed-width `YYYY-MM-DD` key.
///
/// Ordering on `DateKey` is the same as lexicographic ordering of the rendered
/// key, so a sorted list of keys is also chronologically sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid date key '{0}', expected YYYY-MM-DD")]
pub struct ParseDateKeyError(String);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Local calendar day of a wall-clock instant.
    pub fn of_instant(instant: &DateTime<Utc>) -> Self {
        Self::of_instant_in(instant, &Local)
    }

    pub fn of_instant_in<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> Self {
        Self(instant.with_timezone(tz).date_naive())
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn add_days(self, days: i64) -> Self {
        self.0
            .checked_add_signed(Duration::days(days))
            .map(Self)
            .unwrap_or(self)
    }
}

/// Today's date key in the local timezone.
pub fn today() -> DateKey {
    DateKey(Local::now().date_naive())
}

/// Whole calendar days separating two keys. Symmetric.
pub fn days_between(a: DateKey, b: DateKey) -> u64 {
    (a.0 - b.0).num_days().unsigned_abs()
}

/// Day of week with 0 = Sunday .. 6 = Saturday.
pub fn weekday_of(date: DateKey) -> u8 {
    // num_days_from_sunday is always in 0..7
    date.0.weekday().num_days_from_sunday() as u8
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = ParseDateKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = value.as_bytes();
        let fixed_width = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(idx, byte)| idx == 4 || idx == 7 || byte.is_ascii_digit());
        if !fixed_width {
            return Err(ParseDateKeyError(value.to_string()));
        }

        NaiveDate::parse_from_str(value, KEY_FORMAT)
            .map(Self)
            .map_err(|_| ParseDateKeyError(value.to_string()))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> DateKey {
        raw.parse().unwrap()
    }

    #[test]
    fn days_between_is_symmetric_and_whole_days() {
        let a = key("2024-01-01");
        let b = key("2024-01-05");
        assert_eq!(days_between(a, b), 4);
        assert_eq!(days_between(b, a), 4);
        assert_eq!(days_between(a, a), 0);
    }

    #[test]
    fn days_between_crosses_month_and_leap_day() {
        assert_eq!(days_between(key("2024-02-28"), key("2024-03-01")), 2);
        assert_eq!(days_between(key("2023-12-31"), key("2024-01-01")), 1);
    }

    #[test]
    fn weekday_starts_on_sunday() {
        // 2024-01-07 was a Sunday
        assert_eq!(weekday_of(key("2024-01-07")), 0);
        assert_eq!(weekday_of(key("2024-01-10")), 3);
        assert_eq!(weekday_of(key("2024-01-13")), 6);
    }

    #[test]
    fn parse_requires_fixed_width() {
        assert!("2024-1-01".parse::<DateKey>().is_err());
        assert!("2024-01-1".parse::<DateKey>().is_err());
        assert!("2024-02-30".parse::<DateKey>().is_err());
        assert!("20240101".parse::<DateKey>().is_err());
        assert_eq!(key("2024-01-09").to_string(), "2024-01-09");
    }

    #[test]
    fn ordering_matches_rendered_keys() {
        let mut keys = vec![key("2024-10-02"), key("2023-12-31"), key("2024-09-30")];
        let mut rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        keys.sort();
        rendered.sort();
        let sorted: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(sorted, rendered);
    }

    #[test]
    fn serde_uses_plain_string() {
        let json = serde_json::to_string(&key("2024-03-04")).unwrap();
        assert_eq!(json, "\"2024-03-04\"");
        let back: DateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key("2024-03-04"));
    }

    #[test]
    fn instant_maps_to_calendar_day_in_zone() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        assert_eq!(DateKey::of_instant_in(&instant, &Utc), key("2024-01-01"));
        let east = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(DateKey::of_instant_in(&instant, &east), key("2024-01-02"));
    }
}
