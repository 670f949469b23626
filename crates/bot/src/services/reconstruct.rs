//! State reconstruction from channel history.
//!
//! The bot keeps no database: an approval chain's current state is whichever
//! message in its thread carries the most recently posted action button, and
//! reminder/completion status is inferred from sentinel texts on thread
//! replies. This module re-derives all of it by scanning the (paginated,
//! append-mostly) channel log.
//!
//! Scan depths are bounded on purpose. An alert older than the window is
//! treated as not found - an accepted false-negative in exchange for a
//! bounded cost per check, given a handful of flows and a few messages per
//! month. The scan predicates are pure functions over message slices so the
//! matching logic is testable without a network.

use chrono::{DateTime, Duration, Utc};
use countersign_core::{ApprovalAction, FlowDefinition, FlowRegistry, PeriodKey};
use tracing::{debug, instrument, warn};

use crate::slack::{
    COMPLETED_MARK, COMPLETION_SENTINEL, HistoryMessage, REMINDER_PREFIX, SlackClient, SlackError,
};

/// History depth for the "does an alert already exist" check. The most
/// recent 50 messages comfortably cover a month of finance-channel traffic.
const ALERT_SCAN_LIMIT: usize = 50;

/// History depth for the incomplete-instance sweep.
const INSTANCE_SCAN_LIMIT: usize = 200;

/// Maximum thread replies fetched per instance.
const REPLY_SCAN_LIMIT: usize = 100;

/// The currently pending step of a reconstructed instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStep {
    /// Zero-based step index.
    pub step: usize,
    /// Responsible party's Slack user id.
    pub user_id: String,
    /// Role name, for logs.
    pub role: String,
    /// Instance title carried by the payload.
    pub title: String,
}

/// Reconstructs approval-chain state by scanning channel history.
pub struct StateReconstructor<'a> {
    slack: &'a SlackClient,
    registry: &'a FlowRegistry,
}

impl<'a> StateReconstructor<'a> {
    /// Create a reconstructor over the given client and registry.
    #[must_use]
    pub const fn new(slack: &'a SlackClient, registry: &'a FlowRegistry) -> Self {
        Self { slack, registry }
    }

    /// Whether an initial alert for `flow` and `period` already exists.
    ///
    /// Matches completed alerts too - a checkmark-prefixed message that
    /// still carries the button is still "found", so a finished chain is
    /// never re-alerted.
    ///
    /// # Errors
    ///
    /// Returns error when the history fetch fails.
    #[instrument(skip(self, flow), fields(flow = %flow.id, period = %period))]
    pub async fn find_existing_initial_alert(
        &self,
        channel: &str,
        flow: &FlowDefinition,
        period: &PeriodKey,
    ) -> Result<bool, SlackError> {
        let messages = self.slack.fetch_history(channel, ALERT_SCAN_LIMIT).await?;
        let found = messages
            .iter()
            .any(|message| matches_alert(message, flow, period));
        if found {
            debug!("Existing initial alert found");
        }
        Ok(found)
    }

    /// Root messages of instances for `flow` and `period` that have not
    /// reached their completed rendering.
    ///
    /// # Errors
    ///
    /// Returns error when the history fetch fails.
    #[instrument(skip(self, flow), fields(flow = %flow.id, period = %period))]
    pub async fn find_incomplete_instances(
        &self,
        channel: &str,
        flow: &FlowDefinition,
        period: &PeriodKey,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        let messages = self
            .slack
            .fetch_history(channel, INSTANCE_SCAN_LIMIT)
            .await?;
        Ok(messages
            .into_iter()
            .filter(|message| is_incomplete_root(message, flow, period))
            .collect())
    }

    /// The currently pending step of the instance rooted at `root`.
    ///
    /// Walks the thread newest-first (root included); the first message
    /// carrying the flow's action button is the latest active step -
    /// latest-timestamp-wins is the tie-break rule. Returns `None` when no
    /// button survives (stripped or deleted), when the payload does not
    /// parse, or when the step index is out of range for the flow - all
    /// surfaced to the caller as a skip, never a crash.
    ///
    /// # Errors
    ///
    /// Returns error when the thread fetch fails.
    #[instrument(skip(self, root), fields(root_ts = %root.ts))]
    pub async fn resolve_current_step(
        &self,
        channel: &str,
        root: &HistoryMessage,
    ) -> Result<Option<CurrentStep>, SlackError> {
        let replies = self
            .slack
            .fetch_thread_replies(channel, &root.ts, REPLY_SCAN_LIMIT)
            .await?;

        let Some(action) = latest_action_payload(&replies, self.registry) else {
            warn!("No active step button found in thread");
            return Ok(None);
        };

        let Some(flow) = self.registry.get(&action.flow) else {
            warn!(flow = %action.flow, "Payload references unknown flow");
            return Ok(None);
        };
        let Some(step) = flow.step(action.step) else {
            warn!(
                flow = %action.flow,
                step = action.step,
                "Payload references out-of-range step"
            );
            return Ok(None);
        };

        Ok(Some(CurrentStep {
            step: action.step,
            user_id: step.user_id.clone(),
            role: step.role.clone(),
            title: action.title,
        }))
    }

    /// Whether a reminder was posted into the thread within `cooldown` of
    /// `now`.
    ///
    /// # Errors
    ///
    /// Returns error when the thread fetch fails.
    #[instrument(skip(self), fields(root_ts = %root_ts))]
    pub async fn has_recent_reminder(
        &self,
        channel: &str,
        root_ts: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<bool, SlackError> {
        let replies = self
            .slack
            .fetch_thread_replies(channel, root_ts, REPLY_SCAN_LIMIT)
            .await?;
        Ok(reminder_within(&replies, now, cooldown))
    }

    /// Whether the thread contains the final completion sentinel.
    ///
    /// # Errors
    ///
    /// Returns error when the thread fetch fails.
    #[instrument(skip(self), fields(root_ts = %root_ts))]
    pub async fn is_terminally_complete(
        &self,
        channel: &str,
        root_ts: &str,
    ) -> Result<bool, SlackError> {
        let replies = self
            .slack
            .fetch_thread_replies(channel, root_ts, REPLY_SCAN_LIMIT)
            .await?;
        Ok(thread_complete(&replies))
    }
}

/// Whether `message` is an alert (completed or not) for `flow` and `period`:
/// its combined text names the flow and the period marker, and it carries
/// the flow's action button.
#[must_use]
pub fn matches_alert(
    message: &HistoryMessage,
    flow: &FlowDefinition,
    period: &PeriodKey,
) -> bool {
    let content = message.searchable_text();
    content.contains(&flow.display_name)
        && content.contains(&period.label())
        && message.has_action(flow.action_id())
}

/// Whether `message` is the root of a still-incomplete instance: an alert
/// match whose text has not been rewritten into the completed rendering.
#[must_use]
pub fn is_incomplete_root(
    message: &HistoryMessage,
    flow: &FlowDefinition,
    period: &PeriodKey,
) -> bool {
    let completed = message
        .text
        .as_deref()
        .is_some_and(|text| text.starts_with(COMPLETED_MARK));
    !completed && matches_alert(message, flow, period)
}

/// The payload of the most recently posted action button in `replies`
/// (newest-first walk; the root is part of the reply list).
///
/// Buttons carrying payloads that do not parse are skipped with a warning -
/// a malformed payload must never take the scan down.
#[must_use]
pub fn latest_action_payload(
    replies: &[HistoryMessage],
    registry: &FlowRegistry,
) -> Option<ApprovalAction> {
    for message in replies.iter().rev() {
        for flow in registry.iter() {
            let Some(raw) = message.action_value(flow.action_id()) else {
                continue;
            };
            match ApprovalAction::decode(raw) {
                Some(action) => return Some(action),
                None => {
                    warn!(ts = %message.ts, "Button payload failed to parse; skipping message");
                }
            }
        }
    }
    None
}

/// Whether any reply contains the completion sentinel.
#[must_use]
pub fn thread_complete(replies: &[HistoryMessage]) -> bool {
    replies.iter().any(|message| {
        message
            .text
            .as_deref()
            .is_some_and(|text| text.contains(COMPLETION_SENTINEL))
    })
}

/// Whether any sentinel-prefixed reminder reply was sent within `cooldown`
/// of `now`.
#[must_use]
pub fn reminder_within(replies: &[HistoryMessage], now: DateTime<Utc>, cooldown: Duration) -> bool {
    replies.iter().any(|message| {
        let is_reminder = message
            .text
            .as_deref()
            .is_some_and(|text| text.trim_start().starts_with(REMINDER_PREFIX));
        if !is_reminder {
            return false;
        }
        message
            .sent_at()
            .is_some_and(|sent_at| now.signed_duration_since(sent_at) < cooldown)
    })
}
