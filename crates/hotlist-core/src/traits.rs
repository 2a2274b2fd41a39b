use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SinkError;
use crate::settings::{HoldRule, RuleTable};
use crate::types::ResumeAction;

/// Action code the workflow scheduler expects for a new hold.
pub const MARK_AS_PAUSED: &str = "MARK_AS_PAUSED";

/// Provides the current rule table snapshot.
pub trait RuleSource: Send + Sync {
    fn snapshot(&self) -> Arc<RuleTable>;
}

/// Request handed to the pause/resume scheduler when an event is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRequest {
    pub rid: String,
    pub action_code: String,
    pub reason: String,
    pub source_channel: String,
    pub pause_for: u64,
    pub default_resume_action: ResumeAction,
    pub event_timestamp: DateTime<Utc>,
    pub resume_timestamp: DateTime<Utc>,
}

impl HoldRequest {
    /// Build a hold for `rid` from the matched rule, starting at `now`.
    pub fn from_rule(rid: &str, rule: &HoldRule, now: DateTime<Utc>) -> Self {
        let pause = i64::try_from(rule.pause_for)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let resume_timestamp = now.checked_add_signed(pause).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            rid: rid.to_string(),
            action_code: MARK_AS_PAUSED.to_string(),
            reason: rule.reason.clone(),
            source_channel: rule.source_channel.clone(),
            pause_for: rule.pause_for,
            default_resume_action: rule.default_resume_action,
            event_timestamp: now,
            resume_timestamp,
        }
    }
}

/// Receives hold requests (boundary to the pause/resume scheduler).
pub trait HoldSink: Send + Sync {
    fn submit(&self, request: &HoldRequest) -> Result<(), SinkError>;
}
