//! Integration tests for Countersign.
//!
//! # Test Categories
//!
//! - `bot_slack_messages` - Block Kit message building
//! - `bot_reconstruction` - history-scan state reconstruction over fixtures
//! - `bot_approval_chain` - end-to-end chain shape (post -> find -> advance)
//! - `core_trigger_rules` - trigger-date rules against the real holiday table
//!
//! All tests are hermetic: posted blocks are serialized and read back as
//! history fixtures instead of going through a live Slack workspace.
