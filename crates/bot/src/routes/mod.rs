//! HTTP route handlers for the bot.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//!
//! # Cron (bearer-secret gated)
//! GET  /api/cron                - Daily trigger/reminder run
//! POST /api/cron                - Same, for schedulers that POST
//!                                 ?date=YYYY-MM-DD forces a test run
//!
//! # Slack (signature verified)
//! POST /api/slack/interactions  - Button clicks, URL verification,
//!                                 message events
//!
//! # Manual operations
//! GET  /api/remind              - ?flow=<id>&period=<YYYY-MM> manual sweep
//! GET  /api/cleanup             - ?channel=&category=&count= delete recent
//!                                 bot messages
//! ```

use axum::Router;

use crate::state::AppState;

mod cleanup;
mod cron;
mod interactions;
mod remind;

/// Create all bot routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(cron::router())
        .merge(interactions::router())
        .merge(remind::router())
        .merge(cleanup::router())
}
