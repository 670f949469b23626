//! Manual reminder entry point.
//!
//! Sweeps one flow+period for incomplete instances immediately, without
//! waiting for the daily cron. Usage: `/api/remind?flow=aurora&period=2025-06`.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use countersign_core::PeriodKey;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::services::TriggerScheduler;
use crate::state::AppState;

/// Create manual reminder routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/remind", get(handle_remind))
}

#[derive(Debug, Deserialize)]
struct RemindQuery {
    flow: String,
    period: String,
}

/// Run the reminder sweep for one flow and period.
#[instrument(skip(state))]
async fn handle_remind(
    State(state): State<AppState>,
    Query(query): Query<RemindQuery>,
) -> Result<impl IntoResponse, AppError> {
    let flow = state
        .registry()
        .get(&query.flow)
        .ok_or_else(|| AppError::BadRequest(format!("unknown flow `{}`", query.flow)))?;

    let period: PeriodKey = query
        .period
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid period `{}`", query.period)))?;

    let config = state.config();
    let scheduler = TriggerScheduler::new(
        state.slack(),
        state.registry(),
        state.calendar(),
        config.business_timezone,
        config.alert_cutoff_hour,
        config.reminder_cooldown,
        state.posted_alerts(),
    );

    let reminded = scheduler
        .remind_period(&config.slack.approvals_channel, flow, &period, Utc::now())
        .await?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "reminded": reminded,
    })))
}
