/// The pause settings (rule table) could not be turned into hold rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("pause settings are not valid JSON: {0}")]
    InvalidJson(String),
    #[error("pause settings must be a JSON array, found {0}")]
    NotAnArray(&'static str),
    #[error("pause setting #{index} is malformed: {message}")]
    InvalidRule { index: usize, message: String },
}

impl SettingsError {
    /// Position of the rule that made the table unusable, if one did.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            SettingsError::InvalidRule { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// An inbound message body could not be decoded into a record event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("message body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("message body must be a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("message body has a malformed field: {0}")]
    InvalidField(String),
}

/// The hold scheduler did not accept a hold request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("hold rejected for record {rid}: {reason}")]
    Rejected { rid: String, reason: String },
    #[error("hold sink unavailable: {0}")]
    Unavailable(String),
}

/// Structured check result for `hotlist check --json`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckReport {
    pub file: String,
    pub rules: usize,
    pub pass: bool,
    pub errors: Vec<CheckIssue>,
    pub warnings: Vec<CheckIssue>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckIssue {
    pub code: String,
    pub check: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
