use std::sync::{Arc, PoisonError, RwLock};

use hotlist_core::errors::SettingsError;
use hotlist_core::settings::{
    parse_hold_rules, parse_hold_rules_str, shadowed_rules, GateConfig, HoldRule, RuleTable,
};
use hotlist_core::traits::RuleSource;
use hotlist_core::types::SettingsFailurePolicy;
use serde_json::Value;
use tracing::{error, info, warn};

/// Owns the published rule table.
///
/// The table is an immutable `Arc<RuleTable>`. Readers take a clone of the
/// pointer and never observe a partially built table; `reload` replaces
/// the pointer as a whole. A settings failure is never returned from
/// `load`: it is logged, recorded on the table, and the table published
/// according to the failure policy.
pub struct SettingsRegistry {
    current: RwLock<Arc<RuleTable>>,
    policy: SettingsFailurePolicy,
}

impl SettingsRegistry {
    /// Load pause settings given as a JSON value (array, string or null).
    pub fn load(source: &Value, policy: SettingsFailurePolicy) -> Self {
        let table = build_table(parse_hold_rules(source), policy);
        Self {
            current: RwLock::new(Arc::new(table)),
            policy,
        }
    }

    /// Load pause settings from raw JSON text.
    pub fn load_str(source: &str, policy: SettingsFailurePolicy) -> Self {
        let table = build_table(parse_hold_rules_str(source), policy);
        Self {
            current: RwLock::new(Arc::new(table)),
            policy,
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::load(&config.pause_settings, config.on_settings_error)
    }

    /// Registry over an already parsed rule list.
    pub fn from_rules(rules: Vec<HoldRule>) -> Self {
        Self {
            current: RwLock::new(Arc::new(build_table(Ok(rules), SettingsFailurePolicy::FailOpen))),
            policy: SettingsFailurePolicy::FailOpen,
        }
    }

    /// Current rule table snapshot.
    pub fn get(&self) -> Arc<RuleTable> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn policy(&self) -> SettingsFailurePolicy {
        self.policy
    }

    /// Error recorded when the current table was published, if any.
    pub fn load_error(&self) -> Option<SettingsError> {
        self.get().load_error().cloned()
    }

    /// Parse `source` and publish it in place of the current table.
    ///
    /// A broken `source` is published per the failure policy, exactly as
    /// on first load; the error is also returned so the caller can report it.
    pub fn reload(&self, source: &Value) -> Result<usize, SettingsError> {
        let parsed = parse_hold_rules(source);
        let outcome = parsed.as_ref().map(Vec::len).map_err(Clone::clone);
        let table = Arc::new(build_table(parsed, self.policy));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = table;
        if let Ok(count) = outcome {
            info!(rules = count, "pause settings reloaded");
        }
        outcome
    }
}

impl RuleSource for SettingsRegistry {
    fn snapshot(&self) -> Arc<RuleTable> {
        self.get()
    }
}

fn build_table(
    parsed: Result<Vec<HoldRule>, SettingsError>,
    policy: SettingsFailurePolicy,
) -> RuleTable {
    match parsed {
        Ok(rules) => {
            for (first, later) in shadowed_rules(&rules) {
                let rule = &rules[later];
                warn!(
                    reason = %rule.reason,
                    channel = %rule.source_channel,
                    first,
                    later,
                    "duplicate pause setting is unreachable"
                );
            }
            info!(rules = rules.len(), "pause settings loaded");
            RuleTable::loaded(rules)
        }
        Err(e) => {
            // One bad entry rejects the whole table.
            let rule = e.rule_index();
            if policy.is_fail_closed() {
                error!(error = %e, ?rule, "pause settings failed to load, holding every event");
            } else {
                error!(error = %e, ?rule, "pause settings failed to load, hotlist holds disabled");
            }
            RuleTable::failed(e, policy)
        }
    }
}
