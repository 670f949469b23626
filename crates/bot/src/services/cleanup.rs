//! Administrative message cleanup.
//!
//! Deletes the N most recent self-authored messages matching a category
//! filter. Used to undo misfired alerts during testing without clicking
//! through Slack by hand.

use std::str::FromStr;

use countersign_core::FlowCategory;
use tracing::{info, instrument, warn};

use crate::slack::{HistoryMessage, REMINDER_PREFIX, SlackClient, SlackError};

/// History depth scanned for deletable messages.
const CLEANUP_SCAN_LIMIT: usize = 50;

/// Which self-authored messages the cleanup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupCategory {
    /// Settlement alerts and prompts.
    Settlement,
    /// Weekly deadline alerts and prompts.
    Deadline,
    /// Reminder thread replies.
    Reminder,
    /// Any bot-authored message.
    #[default]
    All,
}

impl FromStr for CleanupCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "settlement" => Ok(Self::Settlement),
            "deadline" => Ok(Self::Deadline),
            "reminder" => Ok(Self::Reminder),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown category `{other}`; expected settlement, deadline, reminder or all"
            )),
        }
    }
}

impl CleanupCategory {
    /// Whether a (self-authored) message belongs to this category.
    ///
    /// Completed renderings lose their button, so the settlement/deadline
    /// filters also match on the title text those renderings keep.
    #[must_use]
    pub fn matches(self, message: &HistoryMessage) -> bool {
        let text = message.searchable_text();
        match self {
            Self::Settlement => {
                message.has_action(FlowCategory::Settlement.action_id())
                    || text.contains("settlement")
            }
            Self::Deadline => {
                message.has_action(FlowCategory::Deadline.action_id())
                    || text.contains("groupware closing")
            }
            Self::Reminder => text.trim_start().starts_with(REMINDER_PREFIX),
            Self::All => true,
        }
    }
}

/// Report of one cleanup invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Messages successfully deleted.
    pub deleted: usize,
    /// Messages selected for deletion.
    pub selected: usize,
}

/// Deletes recent bot-authored messages.
pub struct MessageJanitor<'a> {
    slack: &'a SlackClient,
}

impl<'a> MessageJanitor<'a> {
    /// Create a janitor over the given client.
    #[must_use]
    pub const fn new(slack: &'a SlackClient) -> Self {
        Self { slack }
    }

    /// Delete up to `count` of the most recent self-authored messages
    /// matching `category`.
    ///
    /// # Errors
    ///
    /// Returns error when the bot identity or history cannot be fetched;
    /// individual deletion failures are logged and counted as not deleted.
    #[instrument(skip(self), fields(channel = %channel, count = count))]
    pub async fn delete_recent(
        &self,
        channel: &str,
        category: CleanupCategory,
        count: usize,
    ) -> Result<CleanupReport, SlackError> {
        let bot_user_id = self.slack.auth_test().await?;
        let messages = self.slack.fetch_history(channel, CLEANUP_SCAN_LIMIT).await?;

        let targets: Vec<&HistoryMessage> = messages
            .iter()
            .filter(|message| message.user.as_deref() == Some(bot_user_id.as_str()))
            .filter(|message| category.matches(message))
            .take(count)
            .collect();

        let mut report = CleanupReport {
            deleted: 0,
            selected: targets.len(),
        };

        for message in targets {
            match self.slack.delete_message(channel, &message.ts).await {
                Ok(()) => {
                    info!(ts = %message.ts, "Deleted message");
                    report.deleted += 1;
                }
                Err(error) => {
                    warn!(ts = %message.ts, error = %error, "Failed to delete message");
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(text: &str, action_id: Option<&str>) -> HistoryMessage {
        let blocks = action_id.map_or_else(
            || json!([]),
            |id| {
                json!([{"type": "actions", "elements": [
                    {"type": "button", "action_id": id, "value": "{}",
                     "text": {"type": "plain_text", "text": "Done"}}
                ]}])
            },
        );
        serde_json::from_value(json!({
            "ts": "1718000000.000100",
            "text": text,
            "blocks": blocks,
        }))
        .expect("valid fixture")
    }

    #[test]
    fn category_parsing_accepts_known_names_only() {
        assert_eq!(
            "settlement".parse::<CleanupCategory>().expect("parses"),
            CleanupCategory::Settlement
        );
        assert_eq!(
            "all".parse::<CleanupCategory>().expect("parses"),
            CleanupCategory::All
        );
        assert!("everything".parse::<CleanupCategory>().is_err());
    }

    #[test]
    fn settlement_filter_matches_button_or_title_text() {
        let with_button = message("Aurora prompt", Some("settlement_approve"));
        assert!(CleanupCategory::Settlement.matches(&with_button));

        let completed = message("✅ Aurora 2025-06 regular settlement - Draft filed", None);
        assert!(CleanupCategory::Settlement.matches(&completed));

        let unrelated = message("lunch?", None);
        assert!(!CleanupCategory::Settlement.matches(&unrelated));
        assert!(CleanupCategory::All.matches(&unrelated));
    }

    #[test]
    fn reminder_filter_matches_the_sentinel_prefix() {
        let reminder = message("⏰ *Reminder* <@U1>, still waiting.", None);
        assert!(CleanupCategory::Reminder.matches(&reminder));
        assert!(!CleanupCategory::Reminder.matches(&message("⏰ meeting at 3", None)));
    }
}
