//! Integration tests for trigger-date rules against the real holiday table.
//!
//! The unit tests in `countersign-core` pin each rule in isolation with
//! synthetic calendars; these tests run the shipped flows against the
//! built-in Korean holiday table the way the scheduler does.

use chrono::{Datelike, NaiveDate};
use countersign_core::{
    FlowRegistry, HolidayCalendar, PeriodKey, TriggerRule, WeekException, WeeklyRule,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

fn calendar() -> HolidayCalendar {
    HolidayCalendar::korean_public_holidays()
}

// =============================================================================
// Scenario A: settlement trigger day
// =============================================================================

#[test]
fn test_scenario_a_settlement_day_triggers_with_step_zero_payload() {
    let registry = FlowRegistry::production_defaults();
    let flow = registry.get("aurora").expect("registered flow");
    let today = date(2025, 6, 11);

    assert!(flow.trigger.triggers_on(today, &calendar()));

    let period = flow.period_for_trigger(today);
    assert_eq!(period.label(), "2025-06");

    let title = flow.title_for(today.day(), &period);
    let action = countersign_core::ApprovalAction::initial(&flow.id, period, &title);
    let encoded = action.encode();
    assert!(encoded.contains("\"flow\":\"aurora\""));
    assert!(encoded.contains("\"step\":0"));
    assert!(encoded.contains("\"period\":\"2025-06\""));
}

#[test]
fn test_non_settlement_days_do_not_trigger() {
    let registry = FlowRegistry::production_defaults();
    let flow = registry.get("aurora").expect("registered flow");
    let cal = calendar();

    for day in [1, 5, 12, 24, 26, 28] {
        assert!(!flow.trigger.triggers_on(date(2025, 6, day), &cal));
    }
}

// =============================================================================
// Month attribution
// =============================================================================

#[test]
fn test_meridian_first_of_month_settles_the_previous_month() {
    let registry = FlowRegistry::production_defaults();
    let flow = registry.get("meridian").expect("registered flow");

    let first = date(2025, 7, 1);
    assert!(flow.trigger.triggers_on(first, &calendar()));
    assert_eq!(flow.period_for_trigger(first).label(), "2025-06");

    let title = flow.title_for(1, &flow.period_for_trigger(first));
    assert_eq!(title, "Meridian 2025-06 third settlement");
}

// =============================================================================
// Weekly rules against real holidays
// =============================================================================

#[test]
fn test_deadline_fires_on_plain_thursdays() {
    let registry = FlowRegistry::production_defaults();
    let flow = registry.get("lumen-labs").expect("registered flow");
    let cal = calendar();

    // 2025-06-19 is an ordinary Thursday.
    assert!(flow.trigger.triggers_on(date(2025, 6, 19), &cal));
    assert!(!flow.trigger.triggers_on(date(2025, 6, 18), &cal));
    assert!(!flow.trigger.triggers_on(date(2025, 6, 20), &cal));
}

#[test]
fn test_deadline_shifts_off_a_holiday_thursday() {
    let registry = FlowRegistry::production_defaults();
    let flow = registry.get("lumen-labs").expect("registered flow");
    let cal = calendar();

    // 2025-10-09 (Hangul Day) is a Thursday; the flow auto-shifts to the
    // fallback Wednesday of the same week.
    assert!(cal.is_holiday(date(2025, 10, 9)));
    assert!(!flow.trigger.triggers_on(date(2025, 10, 9), &cal));
    assert!(flow.trigger.triggers_on(date(2025, 10, 8), &cal));
}

#[test]
fn test_exception_table_wins_over_holiday_shift() {
    // An explicit skip must override both the default weekday and the
    // holiday auto-shift for that week.
    let mut exceptions = std::collections::BTreeMap::new();
    exceptions.insert(date(2025, 10, 6), WeekException::Skip);
    let rule = TriggerRule::Weekly(WeeklyRule {
        default_weekday: chrono::Weekday::Thu,
        fallback_weekday: chrono::Weekday::Wed,
        skip_holiday_weeks: false,
        auto_shift_on_holiday: true,
        exceptions,
    });
    let cal = calendar();

    // Neither the holiday Thursday nor the shifted Wednesday fires.
    assert!(!rule.triggers_on(date(2025, 10, 9), &cal));
    assert!(!rule.triggers_on(date(2025, 10, 8), &cal));
}

#[test]
fn test_holiday_week_auto_skip_suppresses_chuseok_week() {
    let rule = TriggerRule::Weekly(WeeklyRule {
        default_weekday: chrono::Weekday::Thu,
        fallback_weekday: chrono::Weekday::Wed,
        skip_holiday_weeks: true,
        auto_shift_on_holiday: true,
        exceptions: std::collections::BTreeMap::new(),
    });
    let cal = calendar();

    // Chuseok week 2025 (Oct 6-8 holidays): nothing fires all week.
    for day in 6..=12 {
        assert!(!rule.triggers_on(date(2025, 10, day), &cal));
    }
    // The following plain week fires normally on Thursday.
    assert!(rule.triggers_on(date(2025, 10, 16), &cal));
}

// =============================================================================
// Reminder periods
// =============================================================================

#[test]
fn test_reminder_periods_cover_backward_attributed_chains() {
    let registry = FlowRegistry::production_defaults();
    let cal = calendar();
    let today = date(2025, 7, 3);

    let meridian = registry.get("meridian").expect("registered flow");
    let periods: Vec<String> = meridian
        .reminder_periods(today, &cal)
        .iter()
        .map(PeriodKey::label)
        .collect();
    // The chain alerted on July 1 lives under 2025-06; both months are swept.
    assert_eq!(periods, vec!["2025-06", "2025-07"]);

    let aurora = registry.get("aurora").expect("registered flow");
    let periods: Vec<String> = aurora
        .reminder_periods(today, &cal)
        .iter()
        .map(PeriodKey::label)
        .collect();
    assert_eq!(periods, vec!["2025-07"]);
}
