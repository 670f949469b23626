//! The opaque payload embedded in interactive buttons.
//!
//! This payload is the only durable pointer from a posted message back to
//! its place in an approval chain. It rides in the button's `value` field,
//! is read back by the state reconstructor during history scans, and by the
//! step advancer when a click arrives. Deserialization is validating: any
//! failure means "not found", never a crash.

use serde::{Deserialize, Serialize};

use crate::period::PeriodKey;

/// Payload attached to every approval button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAction {
    /// Flow id, resolved against the registry on read.
    pub flow: String,
    /// Zero-based index of the step this button completes.
    pub step: usize,
    /// Period the instance belongs to.
    pub period: PeriodKey,
    /// Human-readable instance title, carried so later steps render without
    /// re-deriving it.
    pub title: String,
}

impl ApprovalAction {
    /// Payload for step 0 of a fresh chain.
    #[must_use]
    pub fn initial(flow: &str, period: PeriodKey, title: &str) -> Self {
        Self {
            flow: flow.to_string(),
            step: 0,
            period,
            title: title.to_string(),
        }
    }

    /// The payload for the step after this one.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            step: self.step + 1,
            ..self.clone()
        }
    }

    /// Serialize for embedding in a button `value`.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a button `value`; `None` on malformed or foreign payloads.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let action: Self = serde_json::from_str(raw).ok()?;
        if action.flow.trim().is_empty() {
            return None;
        }
        Some(action)
    }
}
