use serde_json::{json, Value};

/// Built-in starter configurations.
pub fn list_templates() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "dedupe",
            "Hold operator and center hotlists leaving biometric deduplication for 5 days",
        ),
        (
            "strict",
            "Same rules, but hold everything for 1 hour if the settings ever break",
        ),
        ("empty", "Tag key only, no rules (nothing is held)"),
    ]
}

pub fn generate(template: &str, tag_key: Option<&str>) -> Option<Value> {
    let tag_key = tag_key.unwrap_or("HOTLISTED");
    match template {
        "dedupe" => Some(dedupe(tag_key)),
        "strict" => Some(strict(tag_key)),
        "empty" => Some(empty(tag_key)),
        _ => None,
    }
}

fn dedupe_rules() -> Value {
    json!([
        {
            "hotlistedReason": "operator",
            "pauseFor": 432000,
            "defaultResumeAction": "ResumeProcessing",
            "fromAddress": "bio-debup-bus-out"
        },
        {
            "hotlistedReason": "center",
            "pauseFor": 432000,
            "defaultResumeAction": "ResumeProcessing",
            "fromAddress": "bio-debup-bus-out"
        }
    ])
}

fn dedupe(tag_key: &str) -> Value {
    json!({
        "hotlistedTagKey": tag_key,
        "onSettingsError": { "policy": "fail_open" },
        "pauseSettings": dedupe_rules()
    })
}

fn strict(tag_key: &str) -> Value {
    json!({
        "hotlistedTagKey": tag_key,
        "onSettingsError": {
            "policy": "fail_closed",
            "pauseFor": 3600,
            "defaultResumeAction": "ResumeProcessing"
        },
        "pauseSettings": dedupe_rules()
    })
}

fn empty(tag_key: &str) -> Value {
    json!({
        "hotlistedTagKey": tag_key,
        "pauseSettings": []
    })
}
