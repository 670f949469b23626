//! Slack webhook handler for interaction and event payloads.
//!
//! Everything arriving here is verified against the signing secret before
//! any state-mutating logic runs. Once verified, the handler always answers
//! 200 to Slack - processing failures are logged and handled out of band,
//! since Slack retries on non-200 and a retry storm helps nobody.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::AppError;
use crate::services::StepAdvancer;
use crate::slack::{InteractionPayload, MessageEvent};
use crate::state::AppState;

/// Create Slack webhook routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/slack/interactions", post(handle_interaction))
}

/// Handle a Slack webhook delivery.
#[instrument(skip(state, headers, body))]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    // Extract headers for signature verification.
    let timestamp = headers
        .get("X-Slack-Request-Timestamp")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;

    let signature = headers
        .get("X-Slack-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    state
        .slack()
        .verify_signature(timestamp, &body, signature)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    debug!("Slack signature verified");

    // Interactions arrive URL-encoded under `payload=`; events arrive as
    // plain JSON.
    let payload: serde_json::Value = if let Some(encoded) = body.strip_prefix("payload=") {
        let decoded = urlencoding::decode(encoded)
            .map_err(|e| AppError::BadRequest(format!("Failed to decode payload: {e}")))?;
        serde_json::from_str(&decoded)
            .map_err(|e| AppError::BadRequest(format!("Failed to parse payload: {e}")))?
    } else {
        serde_json::from_str(&body)
            .map_err(|e| AppError::BadRequest(format!("Failed to parse payload: {e}")))?
    };

    match payload.get("type").and_then(|t| t.as_str()) {
        Some("url_verification") => {
            let challenge = payload
                .get("challenge")
                .and_then(|c| c.as_str())
                .ok_or_else(|| AppError::BadRequest("Missing challenge".into()))?;
            info!("URL verification handshake");
            Ok(Json(serde_json::json!({ "challenge": challenge })).into_response())
        }
        Some("block_actions") => {
            let interaction: InteractionPayload = serde_json::from_value(payload)
                .map_err(|e| AppError::BadRequest(format!("Failed to parse interaction: {e}")))?;
            handle_block_actions(&state, &interaction).await;
            Ok(StatusCode::OK.into_response())
        }
        Some("event_callback") => {
            if payload
                .pointer("/event/type")
                .and_then(|t| t.as_str())
                == Some("message")
            {
                let event: MessageEvent = payload
                    .get("event")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| AppError::BadRequest(format!("Failed to parse event: {e}")))?
                    .unwrap_or_default();
                handle_message_event(&state, &event).await;
            }
            Ok(StatusCode::OK.into_response())
        }
        other => {
            debug!(payload_type = ?other, "Unhandled payload type");
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// Dispatch a button click to the step advancer, once per delivery.
async fn handle_block_actions(state: &AppState, interaction: &InteractionPayload) {
    // Suppress duplicate concurrent deliveries of the same click within
    // this process lifetime.
    let dedup_key = format!(
        "{}:{}:{}",
        interaction.channel_id().unwrap_or_default(),
        interaction.message_ts().unwrap_or_default(),
        interaction
            .actions
            .first()
            .map(|action| action.action_id.as_str())
            .unwrap_or_default(),
    );
    if state.seen_interactions().get(&dedup_key).await.is_some() {
        info!(key = %dedup_key, "Duplicate interaction delivery suppressed");
        return;
    }
    state.seen_interactions().insert(dedup_key, ()).await;

    let advancer = StepAdvancer::new(
        state.slack(),
        state.registry(),
        state.config().business_timezone,
    );
    match advancer.handle_block_action(interaction).await {
        Ok(outcome) => debug!(outcome = ?outcome, "Interaction processed"),
        // Slack already got its 200; failures surface in logs only.
        Err(e) => error!(error = %e, "Interaction processing failed"),
    }
}

/// Dispatch a message event to the reaction supplement.
async fn handle_message_event(state: &AppState, event: &MessageEvent) {
    let advancer = StepAdvancer::new(
        state.slack(),
        state.registry(),
        state.config().business_timezone,
    );
    match advancer.handle_message_event(event).await {
        Ok(reacted) => {
            if reacted {
                debug!("Completion keyword reaction added");
            }
        }
        Err(e) => warn!(error = %e, "Message event processing failed"),
    }
}
