//! Slack message builders for the approval-chain flows.
//!
//! Provides factory functions for:
//! - Initial alerts and next-step prompts (section + actions button)
//! - The completed rendering that replaces a clicked step message
//! - The completion sentinel and reminder texts
//!
//! The sentinel constants are load-bearing: the state reconstructor
//! recognizes system-authored messages purely by text matching, so anything
//! these builders emit must stay recognizable by the scan predicates.

use countersign_core::{ApprovalAction, FlowStep};

use super::types::{ActionElement, Block, ContextElement, PlainText, Text};

/// Prefix on every reminder thread reply. The cooldown check matches on it.
pub const REMINDER_PREFIX: &str = "⏰ *Reminder*";

/// Sentinel contained in the final thread reply of a finished chain.
pub const COMPLETION_SENTINEL: &str = "✅ All approvals are complete";

/// Leading mark on the completed rendering of a step message. The
/// incomplete-instance scan excludes texts starting with it.
pub const COMPLETED_MARK: &str = "✅";

/// Build the message carrying one step of an approval chain.
///
/// Used both for the initial channel alert (step 0) and for every next-step
/// thread prompt. The button embeds the serialized [`ApprovalAction`]; the
/// returned fallback text mentions the responsible party and repeats the
/// templated question so history scans can match on plain text alone.
#[must_use]
pub fn build_step_prompt(
    step: &FlowStep,
    action: &ApprovalAction,
    action_id: &str,
) -> (String, Vec<Block>) {
    let text = format!("<@{}> {}", step.user_id, step.render_prompt(&action.title));
    let blocks = vec![
        Block::Section {
            text: Text::mrkdwn(text.as_str()),
        },
        Block::Actions {
            elements: vec![ActionElement::Button {
                text: PlainText::new("Done"),
                action_id: action_id.to_string(),
                value: Some(action.encode()),
            }],
        },
    ];
    (text, blocks)
}

/// Alias for the step-0 channel alert, for call-site readability.
#[must_use]
pub fn build_initial_alert(
    step: &FlowStep,
    action: &ApprovalAction,
    action_id: &str,
) -> (String, Vec<Block>) {
    build_step_prompt(step, action, action_id)
}

/// Build the completed rendering that replaces a clicked step message.
///
/// Drops the actions block (the button must disappear) and records who
/// completed the step and when, in the business timezone.
#[must_use]
pub fn build_completed_step(
    title: &str,
    completion_label: &str,
    actor_id: &str,
    actor_name: &str,
    completed_at: &str,
) -> (String, Vec<Block>) {
    let text = format!("{COMPLETED_MARK} {title} - {completion_label}");
    let blocks = vec![
        Block::Section {
            text: Text::mrkdwn(format!("{COMPLETED_MARK} *{title}*")),
        },
        Block::Context {
            elements: vec![
                ContextElement::Mrkdwn {
                    text: completion_label.to_string(),
                },
                ContextElement::Mrkdwn {
                    text: format!("Approved by <@{actor_id}> ({actor_name}) | {completed_at}"),
                },
            ],
        },
    ];
    (text, blocks)
}

/// The final thread reply of a finished chain.
#[must_use]
pub fn completion_notice(title: &str) -> String {
    format!("{COMPLETION_SENTINEL}!\n{title} - transfer registration is done.")
}

/// A reminder thread reply mentioning the currently responsible party.
#[must_use]
pub fn reminder_text(user_id: &str, title: &str, sent_at: &str) -> String {
    format!(
        "{REMINDER_PREFIX} <@{user_id}>, {title} is still waiting on you. Please take a look.\nTime: {sent_at}"
    )
}

/// Ephemeral notice shown to users who are not allowed to complete a step.
#[must_use]
pub const fn permission_notice() -> &'static str {
    "⚠️ Only the assigned owners can complete this step."
}
