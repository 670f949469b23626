//! Slack integration: the messaging gateway for the approval flows.
//!
//! This module provides:
//! - [`SlackClient`] for every Web API call the bot makes (posting,
//!   updating, history and thread scans, deletions, reactions, ephemeral
//!   notices) plus webhook signature verification
//! - Block Kit builder types for outgoing messages and lenient history types
//!   for reading previously posted messages back
//! - Message builders for the approval-chain flows
//!
//! # Flow
//!
//! 1. The scheduler posts an initial alert with an embedded action payload
//! 2. The responsible party clicks the button
//! 3. The webhook handler verifies the signature and parses the payload
//! 4. The clicked message is rewritten as completed and the next step (or
//!    the completion notice) is posted into the thread
//! 5. On later cron runs the reconstructor re-reads all of the above from
//!    channel history - the thread is the only durable record

mod client;
mod error;
mod messages;
mod types;

pub use client::SlackClient;
pub use error::SlackError;
pub use messages::{
    COMPLETED_MARK, COMPLETION_SENTINEL, REMINDER_PREFIX, build_completed_step,
    build_initial_alert, build_step_prompt, completion_notice, permission_notice, reminder_text,
};
pub use types::{
    ActionElement, Block, ContextElement, HistoryMessage, InteractionAction, InteractionChannel,
    InteractionContainer, InteractionMessageRef, InteractionPayload, InteractionUser, MessageEvent,
    PlainText, PostMessageResponse, Text, UpdateMessageResponse, slack_ts_to_datetime,
};
