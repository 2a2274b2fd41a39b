use anyhow::{bail, Context, Result};
use jsonschema::Validator;
use serde_json::Value;

use crate::errors::{CheckIssue, CheckReport};
use crate::settings::{parse_hold_rules, shadowed_rules, HoldRule};

const SCHEMA_GATE_CONFIG: &str = include_str!("../schema/gate-config.schema.json");

/// Create a validator for the gate configuration schema.
pub fn validator() -> Result<Validator> {
    let schema: Value =
        serde_json::from_str(SCHEMA_GATE_CONFIG).context("embedded schema is invalid JSON")?;
    Validator::new(&schema).map_err(|e| anyhow::anyhow!("schema compilation failed: {e}"))
}

/// Validate a gate configuration value against the schema.
pub fn validate(data: &Value) -> Result<()> {
    let v = validator()?;
    if v.is_valid(data) {
        return Ok(());
    }
    let mut msgs: Vec<String> = Vec::new();
    for error in v.iter_errors(data) {
        let path = error.instance_path.to_string();
        let loc = if path.is_empty() {
            "(root)".into()
        } else {
            path
        };
        msgs.push(format!("  {loc}: {error}"));
    }
    bail!("validation failed:\n{}", msgs.join("\n"));
}

/// Full check producing structured report (for `hotlist check --json`).
pub fn check(data: &Value, file: &str, strict: bool) -> CheckReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Schema validation
    if let Ok(v) = validator() {
        for error in v.iter_errors(data) {
            let path = error.instance_path.to_string();
            errors.push(CheckIssue {
                code: "E001".to_string(),
                check: "schema".to_string(),
                message: error.to_string(),
                path: Some(if path.is_empty() {
                    "$(root)".to_string()
                } else {
                    format!("${path}")
                }),
            });
        }
    }

    let settings = data.get("pauseSettings").unwrap_or(&Value::Null);
    let rules = match parse_hold_rules(settings) {
        Ok(rules) => rules,
        Err(e) => {
            errors.push(CheckIssue {
                code: "E002".to_string(),
                check: "settings".to_string(),
                message: format!("{e} (the registry would publish a failed table)"),
                path: Some("$.pauseSettings".to_string()),
            });
            Vec::new()
        }
    };

    lint_rules(&rules, errors.is_empty(), &mut warnings);
    lint_policy(data, &mut warnings);

    let pass = errors.is_empty() && (!strict || warnings.is_empty());
    CheckReport {
        file: file.to_string(),
        rules: rules.len(),
        pass,
        errors,
        warnings,
    }
}

fn lint_rules(rules: &[HoldRule], parsed: bool, warnings: &mut Vec<CheckIssue>) {
    // W002: nothing will ever be held
    if parsed && rules.is_empty() {
        warnings.push(CheckIssue {
            code: "W002".to_string(),
            check: "lint".to_string(),
            message: "no pause settings configured, no record will be held".to_string(),
            path: Some("$.pauseSettings".to_string()),
        });
    }

    // W001: duplicate (fromAddress, hotlistedReason)
    for (first, later) in shadowed_rules(rules) {
        let rule = &rules[later];
        warnings.push(CheckIssue {
            code: "W001".to_string(),
            check: "lint".to_string(),
            message: format!(
                "rule for '{}' on '{}' is unreachable, shadowed by pauseSettings[{first}]",
                rule.reason, rule.source_channel
            ),
            path: Some(format!("$.pauseSettings[{later}]")),
        });
    }
}

fn lint_policy(data: &Value, warnings: &mut Vec<CheckIssue>) {
    // W003: a broken table holds every event
    let policy = data
        .pointer("/onSettingsError/policy")
        .and_then(Value::as_str);
    if policy == Some("fail_closed") {
        warnings.push(CheckIssue {
            code: "W003".to_string(),
            check: "lint".to_string(),
            message: "fail_closed holds every event on every channel when pauseSettings is broken"
                .to_string(),
            path: Some("$.onSettingsError".to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(reason: &str, from: &str) -> Value {
        json!({
            "hotlistedReason": reason,
            "pauseFor": 432000,
            "defaultResumeAction": "ResumeProcessing",
            "fromAddress": from
        })
    }

    #[test]
    fn valid_config_passes_strict() {
        let data = json!({
            "hotlistedTagKey": "HOTLISTED",
            "pauseSettings": [rule("operator", "bio-debup-bus-out"), rule("center", "bio-debup-bus-out")]
        });
        validate(&data).unwrap();
        let report = check(&data, "gate.json", true);
        assert!(report.pass, "{:?}", report.errors);
        assert_eq!(report.rules, 2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_tag_key_is_schema_error() {
        let data = json!({ "pauseSettings": [] });
        let report = check(&data, "gate.json", false);
        assert!(!report.pass);
        assert!(report.errors.iter().any(|e| e.code == "E001"));
        assert!(validate(&data).is_err());
    }

    #[test]
    fn unparseable_string_settings_is_e002() {
        let data = json!({ "hotlistedTagKey": "HOTLISTED", "pauseSettings": "[{" });
        let report = check(&data, "gate.json", false);
        assert!(!report.pass);
        assert!(report.errors.iter().any(|e| e.code == "E002"));
        assert_eq!(report.rules, 0);
    }

    #[test]
    fn duplicate_rule_is_w001_and_fails_strict() {
        let data = json!({
            "hotlistedTagKey": "HOTLISTED",
            "pauseSettings": [rule("operator", "a"), rule("center", "a"), rule("operator", "a")]
        });
        let lenient = check(&data, "gate.json", false);
        assert!(lenient.pass);
        let w = lenient.warnings.iter().find(|w| w.code == "W001").unwrap();
        assert_eq!(w.path.as_deref(), Some("$.pauseSettings[2]"));

        let strict = check(&data, "gate.json", true);
        assert!(!strict.pass);
    }

    #[test]
    fn empty_table_is_w002() {
        let data = json!({ "hotlistedTagKey": "HOTLISTED", "pauseSettings": [] });
        let report = check(&data, "gate.json", false);
        assert!(report.warnings.iter().any(|w| w.code == "W002"));
    }

    #[test]
    fn fail_closed_is_w003() {
        let data = json!({
            "hotlistedTagKey": "HOTLISTED",
            "onSettingsError": {
                "policy": "fail_closed",
                "pauseFor": 60,
                "defaultResumeAction": "ResumeProcessing"
            },
            "pauseSettings": [rule("operator", "a")]
        });
        let report = check(&data, "gate.json", false);
        assert!(report.pass);
        assert!(report.warnings.iter().any(|w| w.code == "W003"));
    }
}
