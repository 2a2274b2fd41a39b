#![no_main]
use std::sync::{Arc, OnceLock};

use hotlist_core::types::SettingsFailurePolicy;
use hotlist_engine::gate::route_gate::HotlistGate;
use hotlist_engine::settings::registry::SettingsRegistry;
use libfuzzer_sys::fuzz_target;

const SETTINGS: &str = r#"[
  {"hotlistedReason": "operator", "pauseFor": 432000, "defaultResumeAction": "ResumeProcessing", "fromAddress": "bio-debup-bus-out"},
  {"hotlistedReason": "center", "pauseFor": 432000, "defaultResumeAction": "ResumeProcessing", "fromAddress": "bio-debup-bus-out"}
]"#;

fn gate() -> &'static HotlistGate {
    static GATE: OnceLock<HotlistGate> = OnceLock::new();
    GATE.get_or_init(|| {
        let registry = SettingsRegistry::load_str(SETTINGS, SettingsFailurePolicy::FailOpen);
        HotlistGate::new(Arc::new(registry), "HOTLISTED")
    })
}

fuzz_target!(|data: &[u8]| {
    let decision = gate().matches(data, "bio-debup-bus-out");
    if let Some(rule) = decision.rule() {
        assert_eq!(rule.source_channel, "bio-debup-bus-out");
    }
});
