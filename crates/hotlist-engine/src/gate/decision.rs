use hotlist_core::settings::HoldRule;
use serde::Serialize;

/// Outcome of one route gate evaluation.
///
/// `matched` is true exactly when a rule is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<HoldRule>,
}

impl GateDecision {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            rule: None,
        }
    }

    pub fn matched_rule(rule: HoldRule) -> Self {
        Self {
            matched: true,
            rule: Some(rule),
        }
    }

    pub fn matched(&self) -> bool {
        self.matched
    }

    pub fn rule(&self) -> Option<&HoldRule> {
        self.rule.as_ref()
    }

    pub fn into_rule(self) -> Option<HoldRule> {
        self.rule
    }
}
