//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use countersign_core::{FlowRegistry, HolidayCalendar};
use moka::future::Cache;

use crate::config::BotConfig;
use crate::slack::SlackClient;

/// How long a processed interaction key suppresses duplicate deliveries.
const INTERACTION_DEDUP_TTL: Duration = Duration::from_secs(60);

/// How long a posted initial alert is remembered in-process. Re-runs within
/// this window skip the history scan; the channel log stays ground truth.
const POSTED_ALERT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Entries kept in each best-effort cache.
const CACHE_CAPACITY: u64 = 1_000;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BotConfig,
    slack: SlackClient,
    registry: FlowRegistry,
    calendar: HolidayCalendar,
    /// Best-effort suppression of duplicate concurrent deliveries of the
    /// same interaction. Keyed channel + message ts + action id; not relied
    /// upon for correctness across restarts.
    seen_interactions: Cache<String, ()>,
    /// Write-through record of initial alerts posted by this process.
    posted_alerts: Cache<String, String>,
}

impl AppState {
    /// Build the application state from loaded configuration.
    #[must_use]
    pub fn new(config: BotConfig) -> Self {
        let slack = SlackClient::new(
            config.slack.bot_token.clone(),
            config.slack.signing_secret.clone(),
        );
        Self::with_slack(config, slack)
    }

    /// Build state around an explicit client (used by tests to point the
    /// client at a fake API base).
    #[must_use]
    pub fn with_slack(config: BotConfig, slack: SlackClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                slack,
                registry: FlowRegistry::production_defaults(),
                calendar: HolidayCalendar::korean_public_holidays(),
                seen_interactions: Cache::builder()
                    .max_capacity(CACHE_CAPACITY)
                    .time_to_live(INTERACTION_DEDUP_TTL)
                    .build(),
                posted_alerts: Cache::builder()
                    .max_capacity(CACHE_CAPACITY)
                    .time_to_live(POSTED_ALERT_TTL)
                    .build(),
            }),
        }
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.inner.config
    }

    /// Slack API client.
    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.inner.slack
    }

    /// Flow definition registry.
    #[must_use]
    pub fn registry(&self) -> &FlowRegistry {
        &self.inner.registry
    }

    /// Holiday calendar.
    #[must_use]
    pub fn calendar(&self) -> &HolidayCalendar {
        &self.inner.calendar
    }

    /// Interaction de-duplication cache.
    #[must_use]
    pub fn seen_interactions(&self) -> &Cache<String, ()> {
        &self.inner.seen_interactions
    }

    /// Posted-alert write-through cache.
    #[must_use]
    pub fn posted_alerts(&self) -> &Cache<String, String> {
        &self.inner.posted_alerts
    }
}
