//! Administrative cleanup endpoint.
//!
//! Deletes the N most recent bot-authored messages matching a category
//! filter. Usage: `/api/cleanup?channel=test&category=settlement&count=3`.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::services::{CleanupCategory, MessageJanitor};
use crate::state::AppState;

/// Create cleanup routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/cleanup", get(handle_cleanup))
}

#[derive(Debug, Deserialize)]
struct CleanupQuery {
    /// `approvals` (default), `test`, or a raw channel id.
    channel: Option<String>,
    /// `settlement`, `deadline`, `reminder` or `all` (default).
    category: Option<String>,
    /// How many matching messages to delete (default 1).
    count: Option<usize>,
}

/// Delete recent bot-authored messages.
#[instrument(skip(state))]
async fn handle_cleanup(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Result<impl IntoResponse, AppError> {
    let config = state.config();

    let channel = match query.channel.as_deref() {
        None | Some("approvals") => config.slack.approvals_channel.clone(),
        Some("test") => config
            .slack
            .test_channel
            .clone()
            .ok_or_else(|| AppError::BadRequest("no test channel configured".into()))?,
        Some(raw) => raw.to_string(),
    };

    let category: CleanupCategory = match query.category.as_deref() {
        None => CleanupCategory::All,
        Some(raw) => raw.parse().map_err(AppError::BadRequest)?,
    };

    let count = query.count.unwrap_or(1);

    let janitor = MessageJanitor::new(state.slack());
    let report = janitor.delete_recent(&channel, category, count).await?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "deleted": report.deleted,
        "total": report.selected,
        "channel": channel,
    })))
}
