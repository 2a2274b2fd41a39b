use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SettingsError;
use crate::event::json_kind;
use crate::types::{ResumeAction, SettingsFailurePolicy};

/// Reason reported on the synthesized rule of a fail-closed table.
pub const SETTINGS_UNAVAILABLE_REASON: &str = "SETTINGS_UNAVAILABLE";

/// One entry of the pause settings: hold records tagged with `reason`
/// when they arrive on `source_channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoldRule {
    #[serde(rename = "hotlistedReason")]
    pub reason: String,

    #[serde(rename = "pauseFor")]
    pub pause_for: u64,

    #[serde(rename = "defaultResumeAction")]
    pub default_resume_action: ResumeAction,

    #[serde(rename = "fromAddress")]
    pub source_channel: String,
}

impl HoldRule {
    /// Exact match on both channel and reason.
    pub fn applies_to(&self, channel: &str, reason: &str) -> bool {
        self.source_channel == channel && self.reason == reason
    }
}

/// Process configuration for the route gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,

    #[serde(rename = "hotlistedTagKey")]
    pub hotlisted_tag_key: String,

    #[serde(rename = "onSettingsError", default)]
    pub on_settings_error: SettingsFailurePolicy,

    /// Kept as raw JSON so a broken rule table never makes the whole
    /// configuration unreadable. Parsed by the settings registry.
    #[serde(rename = "pauseSettings", default)]
    pub pause_settings: Value,
}

impl GateConfig {
    /// Read a configuration document from disk.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("cannot read config {path}"))?;
        Self::from_json(&content).with_context(|| format!("{path}: invalid gate config"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: GateConfig = serde_json::from_str(content)?;
        if config.hotlisted_tag_key.is_empty() {
            anyhow::bail!("hotlistedTagKey must not be empty");
        }
        Ok(config)
    }
}

/// Parse pause settings given either as a JSON array or as a string
/// holding a JSON array. `null` (settings not configured) is an empty table.
pub fn parse_hold_rules(value: &Value) -> Result<Vec<HoldRule>, SettingsError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(text) => parse_hold_rules_str(text),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<HoldRule>(item.clone()).map_err(|e| {
                    SettingsError::InvalidRule {
                        index,
                        message: e.to_string(),
                    }
                })
            })
            .collect(),
        other => Err(SettingsError::NotAnArray(json_kind(other))),
    }
}

/// Parse pause settings from raw JSON text.
pub fn parse_hold_rules_str(text: &str) -> Result<Vec<HoldRule>, SettingsError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| SettingsError::InvalidJson(e.to_string()))?;
    if value.is_string() {
        // A string nested inside a string is not a rule table.
        return Err(SettingsError::NotAnArray("string"));
    }
    parse_hold_rules(&value)
}

/// Positions `(first, later)` of rules sharing a `(source_channel, reason)`
/// pair. The later rule can never match.
pub fn shadowed_rules(rules: &[HoldRule]) -> Vec<(usize, usize)> {
    let mut shadowed = Vec::new();
    for (later, rule) in rules.iter().enumerate() {
        if let Some(first) = rules[..later]
            .iter()
            .position(|r| r.applies_to(&rule.source_channel, &rule.reason))
        {
            shadowed.push((first, later));
        }
    }
    shadowed
}

/// State of a published rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Loaded,
    /// Settings were malformed; the table is empty and nothing is held.
    FailedOpen { error: SettingsError },
    /// Settings were malformed; every event is held with these parameters.
    FailedClosed {
        error: SettingsError,
        pause_for: u64,
        default_resume_action: ResumeAction,
    },
}

/// Immutable, ordered rule table as published by the settings registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<HoldRule>,
    status: TableStatus,
}

impl RuleTable {
    pub fn loaded(rules: Vec<HoldRule>) -> Self {
        Self {
            rules,
            status: TableStatus::Loaded,
        }
    }

    /// Table published after a settings failure, shaped by `policy`.
    pub fn failed(error: SettingsError, policy: SettingsFailurePolicy) -> Self {
        let status = match policy {
            SettingsFailurePolicy::FailOpen => TableStatus::FailedOpen { error },
            SettingsFailurePolicy::FailClosed {
                pause_for,
                default_resume_action,
            } => TableStatus::FailedClosed {
                error,
                pause_for,
                default_resume_action,
            },
        };
        Self {
            rules: Vec::new(),
            status,
        }
    }

    pub fn rules(&self) -> &[HoldRule] {
        &self.rules
    }

    pub fn status(&self) -> &TableStatus {
        &self.status
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn load_error(&self) -> Option<&SettingsError> {
        match &self.status {
            TableStatus::Loaded => None,
            TableStatus::FailedOpen { error } | TableStatus::FailedClosed { error, .. } => {
                Some(error)
            }
        }
    }

    /// First rule, in load order, bound to `channel` and `reason`.
    pub fn first_match(&self, channel: &str, reason: &str) -> Option<&HoldRule> {
        self.rules.iter().find(|r| r.applies_to(channel, reason))
    }

    /// Rule that holds every event while the table is failed closed.
    pub fn closed_rule(&self, channel: &str) -> Option<HoldRule> {
        match &self.status {
            TableStatus::FailedClosed {
                pause_for,
                default_resume_action,
                ..
            } => Some(HoldRule {
                reason: SETTINGS_UNAVAILABLE_REASON.to_string(),
                pause_for: *pause_for,
                default_resume_action: *default_resume_action,
                source_channel: channel.to_string(),
            }),
            _ => None,
        }
    }
}
