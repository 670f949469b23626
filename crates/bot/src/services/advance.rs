//! The approval state machine.
//!
//! An instance moves through `Step(0) -> Step(1) -> ... -> Completed`, one
//! transition per authenticated button click. The clicked message is
//! rewritten in place as completed, then either the next step's prompt or
//! the final completion sentinel is posted into the thread. The in-place
//! update happens first to keep the window where the chain is ambiguous as
//! small as possible; an update failure falls back to the interaction's
//! short-lived `response_url` and is otherwise non-fatal - the chain is
//! never blocked on a cosmetic rewrite.

use chrono::Utc;
use chrono_tz::Tz;
use countersign_core::{ApprovalAction, FlowDefinition, FlowRegistry, PeriodKey};
use tracing::{debug, info, instrument, warn};

use crate::slack::{
    InteractionPayload, MessageEvent, SlackClient, SlackError, build_completed_step,
    build_initial_alert, build_step_prompt, completion_notice, permission_notice,
};

/// Format of the completion timestamp rendered into updated messages.
const COMPLETED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Keywords in a thread reply that mark external completion of a settlement
/// step (reaction supplement).
const COMPLETION_KEYWORDS: &[&str] = &["done", "complete", "completed", "registered", "reserved"];

/// The single keyword accepted on deadline threads.
const DEADLINE_COMPLETION_KEYWORD: &str = "reserved";

/// What handling a click amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The next step's prompt was posted.
    Advanced { next_step: usize },
    /// The chain finished; the completion sentinel was posted.
    Completed,
    /// The clicker was not allowed to complete the step.
    Denied,
    /// The event did not resolve to an actionable step (foreign action id,
    /// malformed payload, unknown flow, missing container fields).
    Skipped,
}

/// Drives approval chains forward.
pub struct StepAdvancer<'a> {
    slack: &'a SlackClient,
    registry: &'a FlowRegistry,
    timezone: Tz,
}

impl<'a> StepAdvancer<'a> {
    /// Create an advancer over the given client and registry.
    #[must_use]
    pub const fn new(slack: &'a SlackClient, registry: &'a FlowRegistry, timezone: Tz) -> Self {
        Self {
            slack,
            registry,
            timezone,
        }
    }

    /// Post the step-0 alert that creates a fresh instance.
    ///
    /// Returns the new root message's timestamp.
    ///
    /// # Errors
    ///
    /// Returns error when the flow has no steps or the post fails.
    #[instrument(skip(self, flow), fields(flow = %flow.id, period = %period))]
    pub async fn post_initial_alert(
        &self,
        channel: &str,
        flow: &FlowDefinition,
        period: &PeriodKey,
        trigger_day: u32,
    ) -> Result<Option<String>, SlackError> {
        let Some(first_step) = flow.step(0) else {
            return Err(SlackError::Config(format!("flow `{}` has no steps", flow.id)));
        };

        let title = flow.title_for(trigger_day, period);
        let action = ApprovalAction::initial(&flow.id, *period, &title);
        let (text, blocks) = build_initial_alert(first_step, &action, flow.action_id());

        let response = self.slack.post_message(channel, None, blocks, &text).await?;
        info!(ts = ?response.ts, "Initial alert posted");
        Ok(response.ts)
    }

    /// Apply one button click to its chain.
    ///
    /// # Errors
    ///
    /// Returns error only for failures of the *required* posts (ephemeral
    /// denial notice, next-step prompt, completion sentinel). The in-place
    /// update of the clicked message is best-effort.
    #[instrument(skip(self, payload), fields(user = %payload.user.id))]
    pub async fn handle_block_action(
        &self,
        payload: &InteractionPayload,
    ) -> Result<AdvanceOutcome, SlackError> {
        let Some(interaction_action) = payload.actions.first() else {
            warn!("Interaction carried no actions");
            return Ok(AdvanceOutcome::Skipped);
        };

        let Some(action) = interaction_action
            .value
            .as_deref()
            .and_then(ApprovalAction::decode)
        else {
            warn!(action_id = %interaction_action.action_id, "Button payload failed to parse");
            return Ok(AdvanceOutcome::Skipped);
        };

        let Some(flow) = self.registry.get(&action.flow) else {
            warn!(flow = %action.flow, "Payload references unknown flow");
            return Ok(AdvanceOutcome::Skipped);
        };
        if interaction_action.action_id != flow.action_id() {
            warn!(action_id = %interaction_action.action_id, "Unexpected action id for flow");
            return Ok(AdvanceOutcome::Skipped);
        }
        let Some(step) = flow.step(action.step) else {
            warn!(flow = %flow.id, step = action.step, "Payload references out-of-range step");
            return Ok(AdvanceOutcome::Skipped);
        };

        let (Some(channel), Some(message_ts)) = (payload.channel_id(), payload.message_ts())
        else {
            warn!("Interaction container is missing channel or message ts");
            return Ok(AdvanceOutcome::Skipped);
        };

        if !step.permits(&payload.user.id) {
            info!(flow = %flow.id, step = action.step, "Click denied by allowed-user list");
            self.slack
                .post_ephemeral(channel, &payload.user.id, permission_notice())
                .await?;
            return Ok(AdvanceOutcome::Denied);
        }

        // Rewrite the clicked message as completed before posting anything
        // new, so two messages never both look actionable.
        self.mark_step_completed(payload, &action, step.completion_label.as_str(), channel, message_ts)
            .await;

        let thread_root = payload.thread_root_ts().unwrap_or(message_ts);

        if flow.is_last_step(action.step) {
            info!(flow = %flow.id, period = %action.period, "Chain completed");
            self.slack
                .post_text(channel, Some(thread_root), &completion_notice(&action.title))
                .await?;
            return Ok(AdvanceOutcome::Completed);
        }

        let next_action = action.next();
        let Some(next_step) = flow.step(next_action.step) else {
            // Unreachable given is_last_step above, but never panic on data
            // that came in from the wire.
            warn!(flow = %flow.id, step = next_action.step, "Next step out of range");
            return Ok(AdvanceOutcome::Skipped);
        };
        let (text, blocks) = build_step_prompt(next_step, &next_action, flow.action_id());
        self.slack
            .post_message(channel, Some(thread_root), blocks, &text)
            .await?;

        info!(flow = %flow.id, next_step = next_action.step, "Advanced to next step");
        Ok(AdvanceOutcome::Advanced {
            next_step: next_action.step,
        })
    }

    /// Replace the clicked message with its completed rendering.
    ///
    /// Best-effort: tries `chat.update`, falls back to the interaction's
    /// `response_url`, and logs (without failing the transition) when both
    /// are unavailable.
    async fn mark_step_completed(
        &self,
        payload: &InteractionPayload,
        action: &ApprovalAction,
        completion_label: &str,
        channel: &str,
        message_ts: &str,
    ) {
        let completed_at = Utc::now()
            .with_timezone(&self.timezone)
            .format(COMPLETED_AT_FORMAT)
            .to_string();
        let (text, blocks) = build_completed_step(
            &action.title,
            completion_label,
            &payload.user.id,
            payload.user.display_name(),
            &completed_at,
        );

        match self
            .slack
            .update_message(channel, message_ts, blocks.clone(), &text)
            .await
        {
            Ok(_) => {}
            Err(update_err) => {
                warn!(error = %update_err, "chat.update failed; trying response_url fallback");
                if let Some(response_url) = payload.response_url.as_deref() {
                    if let Err(fallback_err) = self
                        .slack
                        .respond_to_url(response_url, blocks, &text, true)
                        .await
                    {
                        warn!(error = %fallback_err, "response_url fallback also failed");
                    }
                } else {
                    warn!("No response_url available for fallback");
                }
            }
        }
    }

    /// React to thread replies that announce completion in prose.
    ///
    /// A human replying "done" (or, on deadline threads, the stricter
    /// "reserved") gets a checkmark reaction on the thread root. Bot
    /// messages and channel-level messages are ignored. Returns whether a
    /// reaction was added.
    ///
    /// # Errors
    ///
    /// Returns error when the thread fetch or the reaction call fails.
    #[instrument(skip(self, event))]
    pub async fn handle_message_event(&self, event: &MessageEvent) -> Result<bool, SlackError> {
        if event.is_bot_authored() || !event.is_thread_reply() {
            return Ok(false);
        }
        let (Some(channel), Some(root_ts)) = (event.channel.as_deref(), event.thread_ts.as_deref())
        else {
            return Ok(false);
        };

        let text = event.text.as_deref().unwrap_or("").to_lowercase();

        // The root decides which keyword set applies.
        let parent = self
            .slack
            .fetch_thread_replies(channel, root_ts, 1)
            .await?
            .into_iter()
            .next();
        let is_deadline_thread = parent
            .as_ref()
            .is_some_and(|root| root.has_action(countersign_core::FlowCategory::Deadline.action_id()));

        let matched = if is_deadline_thread {
            text.contains(DEADLINE_COMPLETION_KEYWORD)
        } else {
            COMPLETION_KEYWORDS
                .iter()
                .any(|keyword| text.contains(keyword))
        };
        if !matched {
            return Ok(false);
        }

        self.slack
            .add_reaction(channel, root_ts, "white_check_mark")
            .await?;
        debug!(root_ts = %root_ts, "Completion keyword reaction added");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_keywords_cover_the_settlement_set() {
        for keyword in ["done", "complete", "registered"] {
            assert!(COMPLETION_KEYWORDS.contains(&keyword));
        }
        assert!(COMPLETION_KEYWORDS.contains(&DEADLINE_COMPLETION_KEYWORD));
    }
}
