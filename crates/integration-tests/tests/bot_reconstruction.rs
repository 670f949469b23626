//! Integration tests for history-scan state reconstruction.
//!
//! The scan predicates are exercised over fixture histories built from the
//! bot's own message builders: blocks are serialized exactly as they would
//! be posted, then read back through the lenient history types - the same
//! round trip the live system performs against the Slack log.

use chrono::{DateTime, Duration, Utc};
use countersign_bot::services::reconstruct::{
    is_incomplete_root, latest_action_payload, matches_alert, reminder_within, thread_complete,
};
use countersign_bot::slack::{
    HistoryMessage, build_completed_step, build_initial_alert, build_step_prompt,
    completion_notice, reminder_text,
};
use countersign_core::{ApprovalAction, FlowDefinition, FlowRegistry, PeriodKey};
use serde_json::json;

fn registry() -> FlowRegistry {
    FlowRegistry::production_defaults()
}

fn period() -> PeriodKey {
    PeriodKey::month(2025, 6).expect("valid month")
}

/// Turn built blocks + fallback text into the message Slack would hand back
/// from `conversations.history`.
fn as_history_message(
    ts: &str,
    text: &str,
    blocks: &[countersign_bot::slack::Block],
) -> HistoryMessage {
    let blocks_json = serde_json::to_value(blocks).expect("blocks serialize");
    serde_json::from_value(json!({
        "ts": ts,
        "text": text,
        "user": "U0BOTUSER1",
        "blocks": blocks_json,
    }))
    .expect("round trip through history types")
}

fn initial_alert_message(flow: &FlowDefinition, ts: &str) -> HistoryMessage {
    let title = flow.title_for(11, &period());
    let action = ApprovalAction::initial(&flow.id, period(), &title);
    let step = flow.step(0).expect("first step");
    let (text, blocks) = build_initial_alert(step, &action, flow.action_id());
    as_history_message(ts, &text, &blocks)
}

fn plain_message(ts: &str, text: &str) -> HistoryMessage {
    serde_json::from_value(json!({ "ts": ts, "text": text, "user": "U0HUMAN001" }))
        .expect("valid fixture")
}

// =============================================================================
// Post-then-find round trip
// =============================================================================

#[test]
fn test_posted_alert_is_found_by_the_scan() {
    let registry = registry();
    let flow = registry.get("aurora").expect("registered flow");
    let posted = initial_alert_message(flow, "1718000000.000100");

    assert!(matches_alert(&posted, flow, &period()));
    assert!(is_incomplete_root(&posted, flow, &period()));
}

#[test]
fn test_scan_is_keyed_by_flow_and_period() {
    let registry = registry();
    let aurora = registry.get("aurora").expect("registered flow");
    let meridian = registry.get("meridian").expect("registered flow");
    let posted = initial_alert_message(aurora, "1718000000.000100");

    // Same message, wrong flow or wrong period: not found.
    assert!(!matches_alert(&posted, meridian, &period()));
    assert!(!matches_alert(
        &posted,
        aurora,
        &PeriodKey::month(2025, 7).expect("valid month")
    ));
}

#[test]
fn test_completed_alert_is_found_but_not_incomplete() {
    let registry = registry();
    let flow = registry.get("aurora").expect("registered flow");

    // The completed rendering keeps the title text but drops the button -
    // finding it depends on the root still matching by text+button, so
    // simulate the realistic state: root text rewritten, button gone.
    let title = flow.title_for(11, &period());
    let (text, blocks) = build_completed_step(&title, "Draft filed", "U1", "sumin", "now");
    let completed = as_history_message("1718000000.000100", &text, &blocks);

    // No button anymore: the alert check cannot match on it...
    assert!(!matches_alert(&completed, flow, &period()));
    // ...and the incomplete sweep must exclude it by the checkmark prefix.
    assert!(!is_incomplete_root(&completed, flow, &period()));
}

// =============================================================================
// Current-step resolution (latest-timestamp-wins)
// =============================================================================

#[test]
fn test_latest_button_wins_across_thread_replies() {
    let registry = registry();
    let flow = registry.get("aurora").expect("registered flow");
    let title = flow.title_for(11, &period());

    // Root carries step 0; two later thread prompts carry steps 1 and 2.
    let root = initial_alert_message(flow, "1718000000.000100");
    let mut replies = vec![root];
    for (index, ts) in [(1_usize, "1718003600.000100"), (2, "1718007200.000100")] {
        let action = ApprovalAction {
            flow: flow.id.clone(),
            step: index,
            period: period(),
            title: title.clone(),
        };
        let step = flow.step(index).expect("step in range");
        let (text, blocks) = build_step_prompt(step, &action, flow.action_id());
        replies.push(as_history_message(ts, &text, &blocks));
    }

    let resolved = latest_action_payload(&replies, &registry).expect("payload found");
    assert_eq!(resolved.step, 2);
    assert_eq!(resolved.flow, "aurora");
}

#[test]
fn test_scenario_d_no_button_anywhere_resolves_to_not_found() {
    // Root text matches the flow, but neither the root's blocks nor any
    // reply carries the action element (stripped/deleted). The resolver
    // must report not-found rather than crash.
    let registry = registry();
    let replies = vec![
        plain_message("1718000000.000100", "Aurora 2025-06 regular settlement"),
        plain_message("1718003600.000100", "any progress here?"),
        plain_message("1718007200.000100", "checking..."),
    ];

    assert!(latest_action_payload(&replies, &registry).is_none());
}

// =============================================================================
// Completion sentinel
// =============================================================================

#[test]
fn test_completion_notice_marks_thread_terminally_complete() {
    let registry = registry();
    let flow = registry.get("aurora").expect("registered flow");
    let title = flow.title_for(11, &period());

    let root = initial_alert_message(flow, "1718000000.000100");
    let notice = plain_message("1718010000.000100", &completion_notice(&title));

    assert!(!thread_complete(std::slice::from_ref(&root)));
    assert!(thread_complete(&[root, notice]));
}

// =============================================================================
// Reminder cooldown
// =============================================================================

#[test]
fn test_reminder_cooldown_boundaries() {
    let cooldown = Duration::hours(12);
    let now: DateTime<Utc> = DateTime::from_timestamp(1_718_100_000, 0).expect("valid time");
    let reminder_body = reminder_text("U1", "Aurora 2025-06 regular settlement", "earlier");

    // Just inside the window: suppressed.
    let fresh_ts = format!("{}.000100", 1_718_100_000 - (12 * 3600 - 1));
    let fresh = plain_message(&fresh_ts, &reminder_body);
    assert!(reminder_within(std::slice::from_ref(&fresh), now, cooldown));

    // Just outside: allowed again.
    let stale_ts = format!("{}.000100", 1_718_100_000 - (12 * 3600 + 1));
    let stale = plain_message(&stale_ts, &reminder_body);
    assert!(!reminder_within(std::slice::from_ref(&stale), now, cooldown));
}

#[test]
fn test_human_replies_do_not_count_as_reminders() {
    let cooldown = Duration::hours(12);
    let now: DateTime<Utc> = DateTime::from_timestamp(1_718_100_000, 0).expect("valid time");

    let chatter = plain_message("1718099000.000100", "on it, sorry for the delay");
    assert!(!reminder_within(&[chatter], now, cooldown));
}
