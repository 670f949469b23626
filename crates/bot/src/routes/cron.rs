//! The time-triggered entry point.
//!
//! An external scheduler hits this endpoint daily (optionally twice daily).
//! A `date` query parameter marks an explicit test run: the afternoon
//! cutoff does not apply and, when configured, the test channel is used
//! instead of the approvals channel.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use chrono::{NaiveDate, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::services::TriggerScheduler;
use crate::state::AppState;

/// Create cron routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/cron", get(handle_cron).post(handle_cron))
}

#[derive(Debug, Deserialize)]
struct CronQuery {
    /// Simulated date for test runs, `YYYY-MM-DD`.
    date: Option<String>,
}

/// Run the scheduler once.
#[instrument(skip(state, headers, query))]
async fn handle_cron(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CronQuery>,
) -> Result<impl IntoResponse, AppError> {
    check_cron_secret(&state, &headers)?;

    let config = state.config();
    let now = Utc::now();

    // A date override is a test run: forced, and routed to the test channel
    // when one is configured.
    let (today, forced, channel) = match query.date.as_deref() {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AppError::BadRequest(format!("invalid date `{raw}`")))?;
            let channel = config
                .slack
                .test_channel
                .clone()
                .unwrap_or_else(|| config.slack.approvals_channel.clone());
            info!(date = %date, "Cron test run");
            (date, true, channel)
        }
        None => {
            let today = now.with_timezone(&config.business_timezone).date_naive();
            (today, false, config.slack.approvals_channel.clone())
        }
    };

    let scheduler = TriggerScheduler::new(
        state.slack(),
        state.registry(),
        state.calendar(),
        config.business_timezone,
        config.alert_cutoff_hour,
        config.reminder_cooldown,
        state.posted_alerts(),
    );
    let report = scheduler.run(&channel, today, now, forced).await;

    Ok(Json(serde_json::json!({
        "ok": true,
        "processed": report.processed(),
        "alerts_posted": report.alerts_posted,
        "reminders_sent": report.reminders_sent,
        "failures": report.failures,
    })))
}

/// Enforce the bearer secret when one is configured.
fn check_cron_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.config().cron_secret.as_ref() else {
        return Ok(());
    };

    let provided = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if provided == Some(expected.expose_secret()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("invalid cron secret".to_string()))
    }
}
