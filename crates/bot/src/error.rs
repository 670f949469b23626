//! Unified error handling for the bot's HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::slack::SlackError;

/// Application-level error type for the bot.
#[derive(Debug, Error)]
pub enum AppError {
    /// Slack API operation failed.
    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    /// Caller is not authenticated (bad cron secret, bad signature).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server-side failures with Sentry.
        if matches!(self, Self::Internal(_) | Self::Slack(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Bot request error"
            );
        }

        let status = match &self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Slack(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // Don't expose internal error details (or anything a Slack error
        // message might echo back) to clients.
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Slack(_) => "Upstream messaging error".to_string(),
            _ => self.to_string(),
        };

        let body = Json(serde_json::json!({ "ok": false, "error": message }));
        (status, body).into_response()
    }
}
