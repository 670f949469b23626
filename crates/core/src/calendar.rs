//! Business-day calendar built on an enumerated holiday table.
//!
//! Trigger dates and reminder windows are computed against Korean business
//! days: weekends plus the public holidays listed here. The table is a
//! finite enumeration per year; dates beyond its coverage are never
//! classified as holidays. That silent gap is a known limitation of the
//! enumerated-table approach, not something this module papers over.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, IsoWeek, NaiveDate, Weekday};

/// Direction to walk when moving a date onto a business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    /// Walk toward later dates.
    Forward,
    /// Walk toward earlier dates.
    Backward,
}

/// Calendar of non-working days.
///
/// Weekends are always non-working; everything else is driven by the
/// enumerated holiday set.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

/// Korean public holidays, 2025-2026.
///
/// Includes substitute holidays. Extend this table when the service needs to
/// schedule into a new year.
const KOREAN_PUBLIC_HOLIDAYS: &[(i32, u32, u32)] = &[
    // 2025
    (2025, 1, 1),   // New Year's Day
    (2025, 1, 28),  // Seollal holiday
    (2025, 1, 29),  // Seollal
    (2025, 1, 30),  // Seollal holiday
    (2025, 3, 3),   // Independence Movement Day (substitute)
    (2025, 5, 5),   // Children's Day / Buddha's Birthday
    (2025, 5, 6),   // Substitute holiday
    (2025, 6, 6),   // Memorial Day
    (2025, 8, 15),  // Liberation Day
    (2025, 10, 3),  // National Foundation Day
    (2025, 10, 6),  // Chuseok
    (2025, 10, 7),  // Chuseok holiday
    (2025, 10, 8),  // Substitute holiday
    (2025, 10, 9),  // Hangul Day
    (2025, 12, 25), // Christmas Day
    // 2026
    (2026, 1, 1),   // New Year's Day
    (2026, 2, 16),  // Seollal holiday
    (2026, 2, 17),  // Seollal
    (2026, 2, 18),  // Seollal holiday
    (2026, 3, 2),   // Independence Movement Day (substitute)
    (2026, 5, 5),   // Children's Day
    (2026, 5, 25),  // Buddha's Birthday (substitute)
    (2026, 6, 6),   // Memorial Day
    (2026, 8, 17),  // Liberation Day (substitute)
    (2026, 9, 24),  // Chuseok holiday
    (2026, 9, 25),  // Chuseok
    (2026, 9, 26),  // Chuseok holiday
    (2026, 10, 3),  // National Foundation Day
    (2026, 10, 9),  // Hangul Day
    (2026, 12, 25), // Christmas Day
];

impl HolidayCalendar {
    /// Build a calendar from an explicit list of holiday dates.
    pub fn from_dates<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            holidays: dates.into_iter().collect(),
        }
    }

    /// The built-in Korean public holiday table (2025-2026).
    #[must_use]
    pub fn korean_public_holidays() -> Self {
        Self::from_dates(
            KOREAN_PUBLIC_HOLIDAYS
                .iter()
                .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        )
    }

    /// Whether `date` is an enumerated public holiday (weekends excluded).
    #[must_use]
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Whether `date` is a working day: not a weekend and not a holiday.
    #[must_use]
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }

    /// Move `date` onto the nearest business day in the given direction.
    ///
    /// Returns `date` unchanged when it is already a business day. Walks one
    /// day at a time, so a long holiday run is crossed entirely.
    #[must_use]
    pub fn shift_to_business_day(&self, date: NaiveDate, direction: ShiftDirection) -> NaiveDate {
        let mut current = date;
        while !self.is_business_day(current) {
            current = step(current, direction);
        }
        current
    }

    /// Add (or subtract, for negative `n`) `n` business days to `date`.
    ///
    /// Walks day by day counting only business days; the result is a
    /// date-only value.
    #[must_use]
    pub fn add_business_days(&self, date: NaiveDate, n: i64) -> NaiveDate {
        let direction = if n >= 0 {
            ShiftDirection::Forward
        } else {
            ShiftDirection::Backward
        };
        let mut remaining = n.unsigned_abs();
        let mut current = date;
        while remaining > 0 {
            current = step(current, direction);
            if self.is_business_day(current) {
                remaining -= 1;
            }
        }
        current
    }
}

fn step(date: NaiveDate, direction: ShiftDirection) -> NaiveDate {
    let next = match direction {
        ShiftDirection::Forward => date.checked_add_days(Days::new(1)),
        ShiftDirection::Backward => date.checked_sub_days(Days::new(1)),
    };
    // chrono's representable range dwarfs any scheduling horizon; saturate
    // rather than panic at the boundary.
    next.unwrap_or(date)
}

/// Whether `date` falls on a Saturday or Sunday.
#[must_use]
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The ISO-8601 week (year + week number) containing `date`.
///
/// Used to test whether a configured exception date falls in "this week"
/// regardless of which weekday it names.
#[must_use]
pub fn iso_week(date: NaiveDate) -> IsoWeek {
    date.iso_week()
}

/// Whether two dates fall in the same ISO-8601 week.
#[must_use]
pub fn same_iso_week(a: NaiveDate, b: NaiveDate) -> bool {
    a.iso_week() == b.iso_week()
}

/// The date of `weekday` within the ISO week containing `date`.
#[must_use]
pub fn weekday_in_same_week(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let monday = date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()));
    monday + chrono::Duration::days(i64::from(weekday.num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn weekends_are_not_business_days() {
        let calendar = HolidayCalendar::korean_public_holidays();
        // 2025-06-14 is a Saturday, 2025-06-15 a Sunday.
        assert!(!calendar.is_business_day(date(2025, 6, 14)));
        assert!(!calendar.is_business_day(date(2025, 6, 15)));
        assert!(calendar.is_business_day(date(2025, 6, 16)));
    }

    #[test]
    fn enumerated_holidays_are_not_business_days() {
        let calendar = HolidayCalendar::korean_public_holidays();
        assert!(calendar.is_holiday(date(2025, 10, 9)));
        assert!(!calendar.is_business_day(date(2025, 10, 9)));
    }

    #[test]
    fn dates_outside_table_coverage_are_never_holidays() {
        let calendar = HolidayCalendar::korean_public_holidays();
        // 2030-01-01 would certainly be a holiday, but the table ends at
        // 2026 - the silent gap is deliberate.
        assert!(!calendar.is_holiday(date(2030, 1, 1)));
    }

    #[test]
    fn shift_walks_off_a_holiday_run() {
        let calendar = HolidayCalendar::korean_public_holidays();
        // Chuseok 2025: Oct 6-8 are holidays, Oct 9 is Hangul Day.
        let shifted = calendar.shift_to_business_day(date(2025, 10, 6), ShiftDirection::Forward);
        assert_eq!(shifted, date(2025, 10, 10));

        let shifted = calendar.shift_to_business_day(date(2025, 10, 6), ShiftDirection::Backward);
        // Oct 4-5 are a weekend, Oct 3 is National Foundation Day.
        assert_eq!(shifted, date(2025, 10, 2));
    }

    #[test]
    fn shift_is_identity_on_business_days() {
        let calendar = HolidayCalendar::korean_public_holidays();
        let monday = date(2025, 6, 16);
        assert_eq!(
            calendar.shift_to_business_day(monday, ShiftDirection::Forward),
            monday
        );
    }

    #[test]
    fn add_business_days_skips_weekends_in_both_directions() {
        let calendar = HolidayCalendar::korean_public_holidays();
        // Friday + 1 business day = Monday.
        assert_eq!(
            calendar.add_business_days(date(2025, 6, 13), 1),
            date(2025, 6, 16)
        );
        // Monday - 1 business day = Friday.
        assert_eq!(
            calendar.add_business_days(date(2025, 6, 16), -1),
            date(2025, 6, 13)
        );
        // Zero is the identity.
        assert_eq!(
            calendar.add_business_days(date(2025, 6, 16), 0),
            date(2025, 6, 16)
        );
    }

    #[test]
    fn iso_week_matches_across_weekdays() {
        // Monday and Sunday of the same ISO week.
        assert!(same_iso_week(date(2025, 6, 16), date(2025, 6, 22)));
        assert!(!same_iso_week(date(2025, 6, 16), date(2025, 6, 23)));
        // Year boundary: 2025-12-29 (Mon) and 2026-01-04 (Sun) share week 1
        // of ISO year 2026.
        assert!(same_iso_week(date(2025, 12, 29), date(2026, 1, 4)));
    }

    #[test]
    fn weekday_in_same_week_resolves_any_anchor() {
        let thursday = date(2025, 6, 19);
        assert_eq!(
            weekday_in_same_week(thursday, Weekday::Mon),
            date(2025, 6, 16)
        );
        assert_eq!(
            weekday_in_same_week(date(2025, 6, 16), Weekday::Thu),
            thursday
        );
        assert_eq!(
            weekday_in_same_week(date(2025, 6, 22), Weekday::Wed),
            date(2025, 6, 18)
        );
    }
}
