#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(rules) = hotlist_core::settings::parse_hold_rules_str(text) {
            let _ = hotlist_core::settings::shadowed_rules(&rules);
        }
    }
});
