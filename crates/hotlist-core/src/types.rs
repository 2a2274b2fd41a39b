use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy applied by the scheduler once a hold expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResumeAction {
    /// Continue from the stage where the record was held.
    ResumeProcessing,
    /// Restart the record from the first stage of the pipeline.
    ResumeFromBeginning,
    /// Stop processing the record permanently.
    StopProcessing,
}

impl ResumeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ResumeAction::ResumeProcessing => "ResumeProcessing",
            ResumeAction::ResumeFromBeginning => "ResumeFromBeginning",
            ResumeAction::StopProcessing => "StopProcessing",
        }
    }
}

impl fmt::Display for ResumeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the registry publishes when the pause settings cannot be parsed.
///
/// `FailOpen` leaves every record flowing (no rule can match).
/// `FailClosed` holds every event on every channel until the settings are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SettingsFailurePolicy {
    #[default]
    FailOpen,
    FailClosed {
        #[serde(rename = "pauseFor")]
        pause_for: u64,
        #[serde(rename = "defaultResumeAction")]
        default_resume_action: ResumeAction,
    },
}

impl SettingsFailurePolicy {
    pub fn is_fail_closed(&self) -> bool {
        matches!(self, SettingsFailurePolicy::FailClosed { .. })
    }
}

impl fmt::Display for SettingsFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsFailurePolicy::FailOpen => f.write_str("fail_open"),
            SettingsFailurePolicy::FailClosed { .. } => f.write_str("fail_closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_action_uses_wire_names() {
        let json = serde_json::to_string(&ResumeAction::ResumeFromBeginning).unwrap();
        assert_eq!(json, "\"ResumeFromBeginning\"");
        let parsed: ResumeAction = serde_json::from_str("\"StopProcessing\"").unwrap();
        assert_eq!(parsed, ResumeAction::StopProcessing);
    }

    #[test]
    fn resume_action_rejects_placeholder_text() {
        let parsed = serde_json::from_str::<ResumeAction>(
            "\"<ResumeProcessing/ResumeFromBeginning/StopProcessing>\"",
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn failure_policy_defaults_to_fail_open() {
        assert_eq!(SettingsFailurePolicy::default(), SettingsFailurePolicy::FailOpen);
        let parsed: SettingsFailurePolicy =
            serde_json::from_str(r#"{"policy":"fail_open"}"#).unwrap();
        assert!(!parsed.is_fail_closed());
    }

    #[test]
    fn failure_policy_fail_closed_carries_hold_parameters() {
        let parsed: SettingsFailurePolicy = serde_json::from_str(
            r#"{"policy":"fail_closed","pauseFor":3600,"defaultResumeAction":"ResumeProcessing"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            SettingsFailurePolicy::FailClosed {
                pause_for: 3600,
                default_resume_action: ResumeAction::ResumeProcessing,
            }
        );
        assert_eq!(parsed.to_string(), "fail_closed");
    }
}
