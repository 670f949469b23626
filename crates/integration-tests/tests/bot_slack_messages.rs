//! Integration tests for approval-chain Slack message building.
//!
//! These tests verify that Block Kit messages are built correctly for every
//! stage of a chain, and that what the builders emit stays recognizable by
//! the sentinel-based scan predicates.

use countersign_bot::slack::{
    Block, COMPLETION_SENTINEL, REMINDER_PREFIX, build_completed_step, build_initial_alert,
    build_step_prompt, completion_notice, reminder_text,
};
use countersign_core::{ApprovalAction, FlowRegistry, PeriodKey};

fn registry() -> FlowRegistry {
    FlowRegistry::production_defaults()
}

fn period() -> PeriodKey {
    PeriodKey::month(2025, 6).expect("valid month")
}

// =============================================================================
// Initial Alert Tests
// =============================================================================

#[test]
fn test_initial_alert_mentions_step_zero_owner() {
    let registry = registry();
    let flow = registry.get("aurora").expect("registered flow");
    let step = flow.step(0).expect("first step");
    let title = flow.title_for(11, &period());
    let action = ApprovalAction::initial(&flow.id, period(), &title);

    let (text, blocks) = build_initial_alert(step, &action, flow.action_id());

    assert!(text.contains(&format!("<@{}>", step.user_id)));
    assert!(text.contains("Aurora 2025-06 regular settlement"));
    assert_eq!(blocks.len(), 2);
}

#[test]
fn test_initial_alert_embeds_step_zero_payload() {
    let registry = registry();
    let flow = registry.get("aurora").expect("registered flow");
    let step = flow.step(0).expect("first step");
    let title = flow.title_for(11, &period());
    let action = ApprovalAction::initial(&flow.id, period(), &title);

    let (_, blocks) = build_initial_alert(step, &action, flow.action_id());
    let json_str = serde_json::to_string(&blocks).expect("Should serialize");

    assert!(json_str.contains("settlement_approve"));
    assert!(json_str.contains("\\\"step\\\":0"));
    assert!(json_str.contains("2025-06"));
}

// =============================================================================
// Step Prompt Tests
// =============================================================================

#[test]
fn test_step_prompt_carries_next_step_payload() {
    let registry = registry();
    let flow = registry.get("meridian").expect("registered flow");
    let action = ApprovalAction {
        flow: flow.id.clone(),
        step: 2,
        period: period(),
        title: "Meridian 2025-06 first settlement".to_string(),
    };
    let step = flow.step(action.step).expect("third step");

    let (text, blocks) = build_step_prompt(step, &action, flow.action_id());

    assert!(text.contains(&format!("<@{}>", step.user_id)));

    let actions_block = blocks.iter().find(|b| matches!(b, Block::Actions { .. }));
    assert!(actions_block.is_some(), "Should have an Actions block");

    let json_str = serde_json::to_string(&blocks).expect("Should serialize");
    assert!(json_str.contains("\\\"step\\\":2"));
}

#[test]
fn test_step_prompt_renders_title_into_template() {
    let registry = registry();
    let flow = registry.get("aurora").expect("registered flow");
    let action = ApprovalAction {
        flow: flow.id.clone(),
        step: 4,
        period: period(),
        title: "Aurora 2025-06 mid-month settlement".to_string(),
    };
    let step = flow.step(action.step).expect("last step");

    let (text, _) = build_step_prompt(step, &action, flow.action_id());
    assert!(text.contains("Aurora 2025-06 mid-month settlement"));
    assert!(!text.contains("{title}"));
}

// =============================================================================
// Completed Rendering Tests
// =============================================================================

#[test]
fn test_completed_rendering_drops_the_button() {
    let (_, blocks) = build_completed_step(
        "Aurora 2025-06 regular settlement",
        "Draft filed",
        "U02JEALKDAT",
        "sumin",
        "2025-06-11 09:12",
    );

    assert!(
        !blocks
            .iter()
            .any(|block| matches!(block, Block::Actions { .. })),
        "Completed rendering must not stay clickable"
    );
}

#[test]
fn test_completed_rendering_records_actor_and_time() {
    let (_, blocks) = build_completed_step(
        "Aurora 2025-06 regular settlement",
        "Approved (CEO)",
        "U013RC4Q719",
        "casey",
        "2025-06-12 14:03",
    );

    let json_str = serde_json::to_string(&blocks).expect("Should serialize");
    assert!(json_str.contains("U013RC4Q719"));
    assert!(json_str.contains("casey"));
    assert!(json_str.contains("2025-06-12 14:03"));
    assert!(json_str.contains("Approved (CEO)"));
}

// =============================================================================
// Sentinel Tests
// =============================================================================

#[test]
fn test_completion_notice_contains_sentinel_and_title() {
    let notice = completion_notice("Meridian 2025-05 third settlement");
    assert!(notice.contains(COMPLETION_SENTINEL));
    assert!(notice.contains("Meridian 2025-05 third settlement"));
}

#[test]
fn test_reminder_text_starts_with_sentinel_prefix() {
    let text = reminder_text(
        "U044Z1AB6CT",
        "Aurora 2025-06 regular settlement",
        "2025-06-13 09:00",
    );
    assert!(text.starts_with(REMINDER_PREFIX));
    assert!(text.contains("<@U044Z1AB6CT>"));
    assert!(text.contains("2025-06-13 09:00"));
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_all_builders_serialize_to_valid_json_arrays() {
    let registry = registry();
    let flow = registry.get("aurora").expect("registered flow");
    let step = flow.step(0).expect("first step");
    let action = ApprovalAction::initial(&flow.id, period(), "title");

    let built = vec![
        ("alert", build_initial_alert(step, &action, flow.action_id()).1),
        ("prompt", build_step_prompt(step, &action, flow.action_id()).1),
        (
            "completed",
            build_completed_step("title", "label", "U1", "name", "now").1,
        ),
    ];

    for (name, blocks) in built {
        let json_str = serde_json::to_string(&blocks)
            .unwrap_or_else(|_| panic!("{name} blocks should serialize"));
        let parsed: serde_json::Value = serde_json::from_str(&json_str)
            .unwrap_or_else(|_| panic!("{name} blocks JSON should be parseable"));
        assert!(parsed.is_array(), "{name} blocks should serialize to array");
    }
}
