use std::sync::Arc;

use hotlist_core::event::{decode, RecordEvent};
use hotlist_core::traits::RuleSource;
use tracing::debug;

use super::decision::GateDecision;

/// Decides whether an in-flight event is under a configured hotlist hold.
///
/// Algorithm:
/// 1. Decode the message body; an undecodable body is not hotlisted
/// 2. Read the hotlist tag; absent or empty means not hotlisted
/// 3. Scan rules in load order, first rule bound to (channel, tag value) wins
///
/// A table published fail-closed holds every decodable event.
/// The gate is pure over (event, channel, rule snapshot) and is shared
/// freely across consumer threads.
pub struct HotlistGate {
    rules: Arc<dyn RuleSource>,
    tag_key: String,
}

impl HotlistGate {
    pub fn new(rules: Arc<dyn RuleSource>, tag_key: impl Into<String>) -> Self {
        Self {
            rules,
            tag_key: tag_key.into(),
        }
    }

    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }

    /// Evaluate a raw message body received on `channel`.
    pub fn matches(&self, raw: &[u8], channel: &str) -> GateDecision {
        match decode(raw) {
            Ok(event) => self.matches_event(&event, channel),
            Err(e) => {
                debug!(channel, error = %e, "undecodable event treated as not hotlisted");
                GateDecision::no_match()
            }
        }
    }

    /// Evaluate an already decoded event received on `channel`.
    pub fn matches_event(&self, event: &RecordEvent, channel: &str) -> GateDecision {
        let table = self.rules.snapshot();

        if let Some(rule) = table.closed_rule(channel) {
            debug!(rid = %event.record_id, channel, "pause settings unavailable, holding");
            return GateDecision::matched_rule(rule);
        }

        let Some(reason) = event.tag(&self.tag_key) else {
            return GateDecision::no_match();
        };

        match table.first_match(channel, reason) {
            Some(rule) => {
                debug!(rid = %event.record_id, channel, reason, "hotlist rule matched");
                GateDecision::matched_rule(rule.clone())
            }
            None => GateDecision::no_match(),
        }
    }
}


#[cfg(test)]
mod proptests {
    //! Gate properties over generated rule tables, tag maps and channels.

    use super::*;
    use crate::settings::registry::SettingsRegistry;
    use hotlist_core::settings::HoldRule;
    use hotlist_core::types::{ResumeAction, SettingsFailurePolicy};
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    const TAG: &str = "HOTLISTED";

    fn arb_resume_action() -> impl Strategy<Value = ResumeAction> {
        prop_oneof![
            Just(ResumeAction::ResumeProcessing),
            Just(ResumeAction::ResumeFromBeginning),
            Just(ResumeAction::StopProcessing),
        ]
    }

    // Small alphabets so generated events hit generated rules often.
    fn arb_rule() -> impl Strategy<Value = HoldRule> {
        ("[a-c]{1,2}", 0u64..1_000_000, arb_resume_action(), "ch[0-2]").prop_map(
            |(reason, pause_for, default_resume_action, source_channel)| HoldRule {
                reason,
                pause_for,
                default_resume_action,
                source_channel,
            },
        )
    }

    fn arb_rules() -> impl Strategy<Value = Vec<HoldRule>> {
        prop::collection::vec(arb_rule(), 0..8)
    }

    fn arb_other_tags() -> impl Strategy<Value = BTreeMap<String, String>> {
        prop::collection::btree_map("[A-Z]{1,8}", "[a-z]{0,4}", 0..4)
            .prop_map(|mut tags| {
                tags.remove(TAG);
                tags
            })
    }

    fn gate_over(rules: Vec<HoldRule>) -> HotlistGate {
        HotlistGate::new(Arc::new(SettingsRegistry::from_rules(rules)), TAG)
    }

    fn body(rid: &str, tags: &BTreeMap<String, String>) -> Vec<u8> {
        json!({ "rid": rid, "tags": tags }).to_string().into_bytes()
    }

    proptest! {
        #[test]
        fn returns_first_rule_in_load_order(
            rules in arb_rules(),
            channel in "ch[0-3]",
            reason in "[a-c]{1,2}",
            mut tags in arb_other_tags(),
        ) {
            let expected = rules.iter().find(|r| r.applies_to(&channel, &reason)).cloned();
            tags.insert(TAG.to_string(), reason);
            let decision = gate_over(rules).matches(&body("r", &tags), &channel);
            prop_assert_eq!(decision.matched(), expected.is_some());
            prop_assert_eq!(decision.into_rule(), expected);
        }

        #[test]
        fn missing_or_empty_tag_never_matches(
            rules in arb_rules(),
            channel in "ch[0-3]",
            empty in any::<bool>(),
            mut tags in arb_other_tags(),
        ) {
            if empty {
                tags.insert(TAG.to_string(), String::new());
            }
            let decision = gate_over(rules).matches(&body("r", &tags), &channel);
            prop_assert!(!decision.matched());
        }

        #[test]
        fn reason_bound_to_other_channels_never_matches(
            rules in arb_rules(),
            pick in any::<prop::sample::Index>(),
            channel in "ch[0-3]",
        ) {
            prop_assume!(!rules.is_empty());
            let reason = rules[pick.index(rules.len())].reason.clone();
            prop_assume!(rules.iter().all(|r| !r.applies_to(&channel, &reason)));

            let tags = BTreeMap::from([(TAG.to_string(), reason)]);
            let decision = gate_over(rules).matches(&body("r", &tags), &channel);
            prop_assert!(!decision.matched());
        }

        #[test]
        fn unknown_reason_never_matches(
            rules in arb_rules(),
            channel in "ch[0-3]",
            reason in "[x-z]{3}",
        ) {
            let tags = BTreeMap::from([(TAG.to_string(), reason)]);
            let decision = gate_over(rules).matches(&body("r", &tags), &channel);
            prop_assert!(!decision.matched());
        }

        #[test]
        fn failed_open_table_never_matches(
            rules in arb_rules(),
            channel in "ch[0-3]",
            reason in "[a-c]{1,2}",
        ) {
            // A valid table with one broken entry fails as a whole.
            let mut settings = serde_json::to_value(&rules).unwrap();
            if let Some(items) = settings.as_array_mut() {
                items.push(json!({"hotlistedReason": reason, "pauseFor": -1}));
            }
            let registry = SettingsRegistry::load(&settings, SettingsFailurePolicy::FailOpen);
            prop_assert!(registry.load_error().is_some());

            let gate = HotlistGate::new(Arc::new(registry), TAG);
            let tags = BTreeMap::from([(TAG.to_string(), reason)]);
            prop_assert!(!gate.matches(&body("r", &tags), &channel).matched());
        }
    }
}
