//! Approval-flow definitions and trigger-rule evaluation.
//!
//! A [`FlowDefinition`] is the static description of one approval chain: an
//! ordered list of steps, each owned by one responsible party, plus the rule
//! deciding on which days a fresh chain starts. Definitions are immutable
//! for the process lifetime; the registry is built once at startup and
//! passed to the components that need it.
//!
//! Changing a definition's step count invalidates in-flight chains encoded
//! with the old length - payloads referencing a step index beyond the new
//! count resolve to "not found" and are skipped, never misrouted.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::{HolidayCalendar, same_iso_week, weekday_in_same_week};
use crate::period::PeriodKey;

/// Broad kind of a flow; determines the action id on its buttons and how
/// instances are keyed over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowCategory {
    /// Monthly settlement chain, keyed by month.
    Settlement,
    /// Weekly closing deadline, keyed by trigger date.
    Deadline,
}

impl FlowCategory {
    /// The action id carried by every interactive button of flows in this
    /// category. History scans match on it.
    #[must_use]
    pub const fn action_id(self) -> &'static str {
        match self {
            Self::Settlement => "settlement_approve",
            Self::Deadline => "deadline_approve",
        }
    }
}

/// One stage of an approval chain, owned by one responsible party.
#[derive(Debug, Clone)]
pub struct FlowStep {
    /// Role name, for logs and completion renderings.
    pub role: String,
    /// Slack user id of the responsible party.
    pub user_id: String,
    /// Prompt template; `{title}` is replaced with the instance title.
    pub prompt: String,
    /// Label rendered into the completed version of this step's message.
    pub completion_label: String,
    /// Users allowed to click this step's button; empty means anyone.
    pub allowed_users: Vec<String>,
}

impl FlowStep {
    fn new(role: &str, user_id: &str, prompt: &str, completion_label: &str) -> Self {
        Self {
            role: role.to_string(),
            user_id: user_id.to_string(),
            prompt: prompt.to_string(),
            completion_label: completion_label.to_string(),
            allowed_users: Vec::new(),
        }
    }

    fn restricted_to(mut self, users: &[&str]) -> Self {
        self.allowed_users = users.iter().map(ToString::to_string).collect();
        self
    }

    /// Render the step prompt for a concrete instance title.
    #[must_use]
    pub fn render_prompt(&self, title: &str) -> String {
        self.prompt.replace("{title}", title)
    }

    /// Whether `user_id` may complete this step.
    #[must_use]
    pub fn permits(&self, user_id: &str) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.iter().any(|u| u == user_id)
    }
}

/// Per-week override for a weekly trigger rule, keyed by any date within the
/// target ISO week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekException {
    /// No trigger this week.
    Skip,
    /// Trigger on a different weekday of the same week.
    MoveToWeekday(Weekday),
    /// Trigger on an explicit date.
    MoveToDate(NaiveDate),
}

/// Weekly trigger rule with holiday handling and a date-keyed exception
/// table.
#[derive(Debug, Clone)]
pub struct WeeklyRule {
    /// Weekday the trigger normally fires on.
    pub default_weekday: Weekday,
    /// Weekday to fall back to when the default lands on a holiday.
    pub fallback_weekday: Weekday,
    /// Do not trigger at all in a week containing any public holiday.
    pub skip_holiday_weeks: bool,
    /// Shift to the fallback weekday when the default weekday is a holiday.
    pub auto_shift_on_holiday: bool,
    /// Per-week overrides; the key may be any date in the target week.
    pub exceptions: BTreeMap<NaiveDate, WeekException>,
}

impl WeeklyRule {
    /// The date this rule fires on within the ISO week containing `anchor`,
    /// or `None` when the week is skipped.
    ///
    /// Evaluation order, which must be preserved exactly:
    /// 1. an exception whose key falls in the week wins and returns
    ///    immediately;
    /// 2. with `skip_holiday_weeks`, any public holiday in the week
    ///    suppresses the trigger;
    /// 3. with `auto_shift_on_holiday`, a default weekday landing on a
    ///    holiday moves the trigger to the fallback weekday (and only then
    ///    does the fallback weekday fire);
    /// 4. otherwise the default weekday fires.
    #[must_use]
    pub fn effective_date(&self, anchor: NaiveDate, calendar: &HolidayCalendar) -> Option<NaiveDate> {
        for (&key, &exception) in &self.exceptions {
            if same_iso_week(key, anchor) {
                return match exception {
                    WeekException::Skip => None,
                    WeekException::MoveToWeekday(weekday) => {
                        Some(weekday_in_same_week(anchor, weekday))
                    }
                    WeekException::MoveToDate(date) => Some(date),
                };
            }
        }

        if self.skip_holiday_weeks {
            let monday = weekday_in_same_week(anchor, Weekday::Mon);
            let any_holiday = (0..7u64)
                .filter_map(|offset| monday.checked_add_days(chrono::Days::new(offset)))
                .any(|day| calendar.is_holiday(day));
            if any_holiday {
                return None;
            }
        }

        let default_date = weekday_in_same_week(anchor, self.default_weekday);
        if self.auto_shift_on_holiday && calendar.is_holiday(default_date) {
            return Some(weekday_in_same_week(anchor, self.fallback_weekday));
        }
        Some(default_date)
    }
}

/// When a fresh chain starts.
#[derive(Debug, Clone)]
pub enum TriggerRule {
    /// Fixed day-of-month values.
    MonthDays {
        /// Days of the month the trigger fires on.
        days: Vec<u32>,
        /// Attribute a day-1 trigger to the previous month. All other
        /// trigger days attribute to the current month.
        previous_month_on_first: bool,
    },
    /// Weekly default-weekday rule with exceptions.
    Weekly(WeeklyRule),
}

impl TriggerRule {
    /// Whether the rule fires on `date`.
    #[must_use]
    pub fn triggers_on(&self, date: NaiveDate, calendar: &HolidayCalendar) -> bool {
        match self {
            Self::MonthDays { days, .. } => days.contains(&date.day()),
            Self::Weekly(rule) => rule.effective_date(date, calendar) == Some(date),
        }
    }
}

/// Static description of one approval chain.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    /// Stable identifier carried in button payloads.
    pub id: String,
    /// Human-readable name; history scans match on it.
    pub display_name: String,
    /// Category, determining the button action id.
    pub category: FlowCategory,
    /// Ordered approval steps. The length is fixed per definition version.
    pub steps: Vec<FlowStep>,
    /// When fresh chains start.
    pub trigger: TriggerRule,
    /// Settlement-day labels ("regular", "first", ...) keyed by trigger day.
    pub title_labels: BTreeMap<u32, String>,
}

impl FlowDefinition {
    /// The action id on this flow's buttons.
    #[must_use]
    pub const fn action_id(&self) -> &'static str {
        self.category.action_id()
    }

    /// The step at `index`, if in range.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&FlowStep> {
        self.steps.get(index)
    }

    /// Number of steps in the chain.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Whether completing `index` finishes the chain.
    #[must_use]
    pub fn is_last_step(&self, index: usize) -> bool {
        index + 1 >= self.steps.len()
    }

    /// The period a chain triggered on `date` belongs to.
    ///
    /// Month attribution rule: a day-1 settlement trigger belongs to the
    /// previous month when the flow says so; every other trigger day belongs
    /// to the month (or date) it fires in.
    #[must_use]
    pub fn period_for_trigger(&self, date: NaiveDate) -> PeriodKey {
        match &self.trigger {
            TriggerRule::MonthDays {
                previous_month_on_first,
                ..
            } => {
                let current = PeriodKey::month_of(date);
                if *previous_month_on_first && date.day() == 1 {
                    current.previous_month()
                } else {
                    current
                }
            }
            TriggerRule::Weekly(_) => PeriodKey::date(date),
        }
    }

    /// Periods the reminder sweep should check on a non-trigger day.
    ///
    /// Settlement flows check the current month, preceded by the previous
    /// month when the flow has a day-1 trigger (chains attributed backwards
    /// keep receiving reminders). Weekly flows check the week's effective
    /// trigger date once it has passed; skipped weeks have no instance.
    #[must_use]
    pub fn reminder_periods(&self, today: NaiveDate, calendar: &HolidayCalendar) -> Vec<PeriodKey> {
        match &self.trigger {
            TriggerRule::MonthDays {
                previous_month_on_first,
                ..
            } => {
                let current = PeriodKey::month_of(today);
                if *previous_month_on_first {
                    vec![current.previous_month(), current]
                } else {
                    vec![current]
                }
            }
            TriggerRule::Weekly(rule) => rule
                .effective_date(today, calendar)
                .filter(|&date| date <= today)
                .map(PeriodKey::date)
                .into_iter()
                .collect(),
        }
    }

    /// Human-readable instance title.
    ///
    /// Settlements render as `"{name} {period} {label} settlement"`, the
    /// label chosen by the trigger day; deadline flows render as
    /// `"{name} {period} groupware closing"`.
    #[must_use]
    pub fn title_for(&self, trigger_day: u32, period: &PeriodKey) -> String {
        match self.category {
            FlowCategory::Settlement => {
                let label = self
                    .title_labels
                    .get(&trigger_day)
                    .map_or("monthly", String::as_str);
                format!("{} {} {label} settlement", self.display_name, period.label())
            }
            FlowCategory::Deadline => {
                format!("{} {} groupware closing", self.display_name, period.label())
            }
        }
    }
}

/// Read-only map from flow id to definition, built once at startup.
#[derive(Debug, Clone)]
pub struct FlowRegistry {
    flows: Vec<FlowDefinition>,
}

impl FlowRegistry {
    /// Build a registry from explicit definitions.
    #[must_use]
    pub fn new(flows: Vec<FlowDefinition>) -> Self {
        Self { flows }
    }

    /// The flows shipped with the service: two marketplace settlement
    /// chains and two weekly groupware-closing deadlines.
    #[must_use]
    pub fn production_defaults() -> Self {
        Self::new(vec![
            settlement_flow(
                "aurora",
                "Aurora",
                "U02JEALKDAT",
                vec![11, 25],
                false,
                &[(11, "regular"), (25, "mid-month")],
            ),
            settlement_flow(
                "meridian",
                "Meridian",
                "U0499MA6EJ2",
                vec![1, 11, 21],
                true,
                &[(1, "third"), (11, "first"), (21, "second")],
            ),
            deadline_flow("lumen-labs", "Lumen Labs"),
            deadline_flow("lumen-studio", "Lumen Studio"),
        ])
    }

    /// Look up a flow by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FlowDefinition> {
        self.flows.iter().find(|flow| flow.id == id)
    }

    /// All flows, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FlowDefinition> {
        self.flows.iter()
    }

    /// Number of registered flows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// The five-step settlement chain both marketplaces share; only the
/// settlement owner differs per marketplace.
fn settlement_flow(
    id: &str,
    display_name: &str,
    owner_user_id: &str,
    days: Vec<u32>,
    previous_month_on_first: bool,
    labels: &[(u32, &str)],
) -> FlowDefinition {
    FlowDefinition {
        id: id.to_string(),
        display_name: display_name.to_string(),
        category: FlowCategory::Settlement,
        steps: vec![
            FlowStep::new(
                "settlement_owner",
                owner_user_id,
                "has the {title} draft been filed?",
                "Draft filed",
            ),
            FlowStep::new(
                "finance_lead",
                "U03ABDRF9DE",
                "requesting your approval for {title}.",
                "Approved (finance lead)",
            ),
            FlowStep::new(
                "ceo",
                "U013RC4Q719",
                "requesting your approval for {title}.",
                "Approved (CEO)",
            ),
            FlowStep::new(
                "accounting_manager",
                "U06K3RRR6QK",
                "has the {title} approval been countersigned?",
                "Countersigned",
            ),
            FlowStep::new(
                "treasury_manager",
                "U044Z1AB6CT",
                "please register the transfer for {title}.",
                "Transfer registered",
            ),
        ],
        trigger: TriggerRule::MonthDays {
            days,
            previous_month_on_first,
        },
        title_labels: labels
            .iter()
            .map(|&(day, label)| (day, label.to_string()))
            .collect(),
    }
}

/// The two-step weekly closing chain: the books are closed by one of the
/// accounting owners, then the treasury manager registers the transfer.
fn deadline_flow(id: &str, display_name: &str) -> FlowDefinition {
    FlowDefinition {
        id: id.to_string(),
        display_name: display_name.to_string(),
        category: FlowCategory::Deadline,
        steps: vec![
            FlowStep::new(
                "closing_owner",
                "U06K3RRR6QK",
                "please close the books for {title}.",
                "Books closed",
            )
            .restricted_to(&["U06K3RRR6QK", "U05R2FP0Y4X"]),
            FlowStep::new(
                "treasury_manager",
                "U044Z1AB6CT",
                "{title} is closed - please register the transfer.",
                "Transfer registered",
            ),
        ],
        trigger: TriggerRule::Weekly(WeeklyRule {
            default_weekday: Weekday::Thu,
            fallback_weekday: Weekday::Wed,
            skip_holiday_weeks: false,
            auto_shift_on_holiday: true,
            exceptions: BTreeMap::new(),
        }),
        title_labels: BTreeMap::new(),
    }
}
