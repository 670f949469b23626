//! Period keys identifying one instance of a flow over time.
//!
//! A settlement flow produces one chain per month; a weekly deadline flow
//! produces one chain per trigger date. The canonical string form of a
//! period key does double duty: it is the `period` field of the serialized
//! button payload *and* the human-visible marker matched when scanning
//! channel history ("does an alert for Aurora 2025-06 already exist?").

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors parsing a period key from its canonical string form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodParseError {
    #[error("invalid period key `{0}`: expected YYYY-MM or YYYY-MM-DD")]
    Malformed(String),
    #[error("period key `{0}` is out of range")]
    OutOfRange(String),
}

/// Identifies one instance of a flow.
///
/// `Month` keys settlement chains, `Date` keys weekly deadline chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKey {
    /// A calendar month, rendered `YYYY-MM`.
    Month { year: i32, month: u32 },
    /// A single date, rendered `YYYY-MM-DD`.
    Date(NaiveDate),
}

impl PeriodKey {
    /// A month period; `None` when `month` is not 1-12.
    #[must_use]
    pub fn month(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self::Month { year, month })
    }

    /// The month containing `date`.
    #[must_use]
    pub fn month_of(date: NaiveDate) -> Self {
        Self::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// A date period.
    #[must_use]
    pub const fn date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// The canonical label, used in payloads, titles, and history matching.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// For a month key, the preceding month; `Date` keys are returned
    /// unchanged.
    #[must_use]
    pub fn previous_month(&self) -> Self {
        match *self {
            Self::Month { year, month } => {
                if month == 1 {
                    Self::Month {
                        year: year - 1,
                        month: 12,
                    }
                } else {
                    Self::Month {
                        year,
                        month: month - 1,
                    }
                }
            }
            Self::Date(_) => *self,
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for PeriodKey {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [year, month] => {
                let year: i32 = year
                    .parse()
                    .map_err(|_| PeriodParseError::Malformed(s.to_string()))?;
                let month: u32 = month
                    .parse()
                    .map_err(|_| PeriodParseError::Malformed(s.to_string()))?;
                Self::month(year, month).ok_or_else(|| PeriodParseError::OutOfRange(s.to_string()))
            }
            [_, _, _] => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Self::Date)
                .map_err(|_| PeriodParseError::Malformed(s.to_string())),
            _ => Err(PeriodParseError::Malformed(s.to_string())),
        }
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_labels_are_zero_padded() {
        let key = PeriodKey::month(2025, 6).expect("valid month");
        assert_eq!(key.label(), "2025-06");
    }

    #[test]
    fn date_labels_use_full_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 19).expect("valid date");
        assert_eq!(PeriodKey::date(date).label(), "2025-06-19");
    }

    #[test]
    fn parse_round_trips_both_forms() {
        for raw in ["2025-06", "2024-12", "2025-06-19"] {
            let key: PeriodKey = raw.parse().expect("parses");
            assert_eq!(key.label(), raw);
        }
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!("2025".parse::<PeriodKey>().is_err());
        assert!("2025-13".parse::<PeriodKey>().is_err());
        assert!("2025-00".parse::<PeriodKey>().is_err());
        assert!("2025-02-30".parse::<PeriodKey>().is_err());
        assert!("junk".parse::<PeriodKey>().is_err());
    }

    #[test]
    fn previous_month_wraps_the_year() {
        let january = PeriodKey::month(2025, 1).expect("valid month");
        assert_eq!(january.previous_month().label(), "2024-12");

        let june = PeriodKey::month(2025, 6).expect("valid month");
        assert_eq!(june.previous_month().label(), "2025-05");
    }

    #[test]
    fn serde_uses_the_canonical_string_form() {
        let key = PeriodKey::month(2025, 6).expect("valid month");
        let json = serde_json::to_string(&key).expect("serializes");
        assert_eq!(json, "\"2025-06\"");

        let parsed: PeriodKey = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(parsed, key);

        assert!(serde_json::from_str::<PeriodKey>("\"not-a-period\"").is_err());
    }
}
