//! Service layer: the approval-flow logic between the HTTP surface and the
//! Slack gateway.
//!
//! - [`reconstruct`] - rebuilds chain state from channel history
//! - [`advance`] - the step state machine driven by button clicks
//! - [`schedule`] - the daily trigger/reminder sweep
//! - [`cleanup`] - administrative deletion of recent bot messages

pub mod advance;
pub mod cleanup;
pub mod reconstruct;
pub mod schedule;

pub use advance::{AdvanceOutcome, StepAdvancer};
pub use cleanup::{CleanupCategory, CleanupReport, MessageJanitor};
pub use reconstruct::{CurrentStep, StateReconstructor};
pub use schedule::{ScheduleReport, TriggerScheduler};
