//! The daily trigger scheduler.
//!
//! For each registered flow: decide whether today starts a fresh chain,
//! post the initial alert idempotently if so, and otherwise sweep the
//! channel for incomplete instances that deserve a reminder. One flow's
//! failure never aborts the others - errors are logged, counted, and the
//! run continues.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use countersign_core::{FlowDefinition, FlowRegistry, HolidayCalendar, PeriodKey};
use moka::future::Cache;
use tracing::{debug, info, instrument, warn};

use crate::services::advance::StepAdvancer;
use crate::services::reconstruct::StateReconstructor;
use crate::slack::{SlackClient, SlackError, reminder_text};

/// Format of the timestamp rendered into reminder texts.
const REMINDER_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Outcome of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Initial alerts posted.
    pub alerts_posted: usize,
    /// Reminders sent.
    pub reminders_sent: usize,
    /// Flows that failed entirely (logged and skipped).
    pub failures: usize,
}

impl ScheduleReport {
    /// Items processed, as reported to the triggering caller.
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.alerts_posted + self.reminders_sent
    }
}

/// The cron-driven scheduler.
pub struct TriggerScheduler<'a> {
    slack: &'a SlackClient,
    registry: &'a FlowRegistry,
    calendar: &'a HolidayCalendar,
    timezone: Tz,
    alert_cutoff_hour: u32,
    reminder_cooldown: Duration,
    posted_alerts: &'a Cache<String, String>,
}

impl<'a> TriggerScheduler<'a> {
    /// Create a scheduler over the shared service pieces.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        slack: &'a SlackClient,
        registry: &'a FlowRegistry,
        calendar: &'a HolidayCalendar,
        timezone: Tz,
        alert_cutoff_hour: u32,
        reminder_cooldown: Duration,
        posted_alerts: &'a Cache<String, String>,
    ) -> Self {
        Self {
            slack,
            registry,
            calendar,
            timezone,
            alert_cutoff_hour,
            reminder_cooldown,
            posted_alerts,
        }
    }

    /// Run the scheduler for `today`.
    ///
    /// `forced` marks an explicit test/manual run: the afternoon cutoff on
    /// new alerts does not apply.
    #[instrument(skip(self), fields(channel = %channel, date = %today, forced = forced))]
    pub async fn run(
        &self,
        channel: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
        forced: bool,
    ) -> ScheduleReport {
        let mut report = ScheduleReport::default();

        for flow in self.registry.iter() {
            match self.process_flow(channel, flow, today, now, forced).await {
                Ok((alerts, reminders)) => {
                    report.alerts_posted += alerts;
                    report.reminders_sent += reminders;
                }
                Err(error) => {
                    warn!(flow = %flow.id, error = %error, "Flow processing failed; continuing");
                    report.failures += 1;
                }
            }
        }

        info!(
            alerts = report.alerts_posted,
            reminders = report.reminders_sent,
            failures = report.failures,
            "Scheduler run finished"
        );
        report
    }

    /// Handle one flow: alert on trigger days, remind otherwise.
    async fn process_flow(
        &self,
        channel: &str,
        flow: &FlowDefinition,
        today: NaiveDate,
        now: DateTime<Utc>,
        forced: bool,
    ) -> Result<(usize, usize), SlackError> {
        if flow.trigger.triggers_on(today, self.calendar) {
            // Past the cutoff hour a misfiring scheduler must not produce
            // afternoon duplicate alerts; fall through to reminder-only.
            if self.past_alert_cutoff(now) && !forced {
                debug!(flow = %flow.id, "Past alert cutoff; reminder path only");
            } else {
                let alerts = self.alert_flow(channel, flow, today).await?;
                return Ok((alerts, 0));
            }
        }

        let mut reminders = 0;
        for period in flow.reminder_periods(today, self.calendar) {
            reminders += self.remind_period(channel, flow, &period, now).await?;
        }
        Ok((0, reminders))
    }

    /// Post the initial alert for today's instance unless one already
    /// exists. Idempotent against duplicate cron invocations.
    async fn alert_flow(
        &self,
        channel: &str,
        flow: &FlowDefinition,
        today: NaiveDate,
    ) -> Result<usize, SlackError> {
        let period = flow.period_for_trigger(today);
        let cache_key = alert_cache_key(flow, &period);

        // The write-through cache only short-circuits re-runs within this
        // process; the channel log remains ground truth on a miss.
        if self.posted_alerts.get(&cache_key).await.is_some() {
            debug!(flow = %flow.id, period = %period, "Alert known from cache; skipping");
            return Ok(0);
        }

        let reconstructor = StateReconstructor::new(self.slack, self.registry);
        if reconstructor
            .find_existing_initial_alert(channel, flow, &period)
            .await?
        {
            info!(flow = %flow.id, period = %period, "Initial alert already exists; skipping");
            return Ok(0);
        }

        let advancer = StepAdvancer::new(self.slack, self.registry, self.timezone);
        let ts = advancer
            .post_initial_alert(channel, flow, &period, today.day())
            .await?;
        self.posted_alerts
            .insert(cache_key, ts.unwrap_or_default())
            .await;
        Ok(1)
    }

    /// Sweep one flow+period for incomplete instances and remind their
    /// current responsible parties.
    ///
    /// Shared with the manual reminder endpoint.
    ///
    /// # Errors
    ///
    /// Returns error when the history scan fails outright; per-instance
    /// failures are logged and skipped.
    #[instrument(skip(self, flow), fields(flow = %flow.id, period = %period))]
    pub async fn remind_period(
        &self,
        channel: &str,
        flow: &FlowDefinition,
        period: &PeriodKey,
        now: DateTime<Utc>,
    ) -> Result<usize, SlackError> {
        let reconstructor = StateReconstructor::new(self.slack, self.registry);
        let roots = reconstructor
            .find_incomplete_instances(channel, flow, period)
            .await?;
        if roots.is_empty() {
            debug!("No incomplete instances");
            return Ok(0);
        }

        let mut reminded = 0;
        for root in &roots {
            if reconstructor
                .is_terminally_complete(channel, &root.ts)
                .await?
            {
                debug!(root_ts = %root.ts, "Chain already complete");
                continue;
            }

            let Some(current) = reconstructor.resolve_current_step(channel, root).await? else {
                warn!(root_ts = %root.ts, "No resolvable step; skipping instance");
                continue;
            };

            if reconstructor
                .has_recent_reminder(channel, &root.ts, now, self.reminder_cooldown)
                .await?
            {
                debug!(root_ts = %root.ts, "Reminder within cooldown; skipping");
                continue;
            }

            let sent_at = now
                .with_timezone(&self.timezone)
                .format(REMINDER_AT_FORMAT)
                .to_string();
            let text = reminder_text(&current.user_id, &current.title, &sent_at);
            self.slack.post_text(channel, Some(&root.ts), &text).await?;
            info!(root_ts = %root.ts, step = current.step, user = %current.user_id, "Reminder sent");
            reminded += 1;
        }
        Ok(reminded)
    }

    /// Whether local business time is past the new-alert cutoff hour.
    fn past_alert_cutoff(&self, now: DateTime<Utc>) -> bool {
        now.with_timezone(&self.timezone).hour() >= self.alert_cutoff_hour
    }
}

/// Cache key for the write-through "alert posted" record.
fn alert_cache_key(flow: &FlowDefinition, period: &PeriodKey) -> String {
    format!("{}_{}", flow.id, period.label())
}
