use std::io::Write;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use hotlist_core::errors::SinkError;
use hotlist_core::traits::{HoldRequest, HoldSink};
use serde_json::Value;
use sha2::{Digest, Sha256};

const GENESIS: &str = "genesis";

fn line_hash(line: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(line.as_bytes()))
}

/// Append an entry to the hold log, maintaining the hash chain.
///
/// Each entry gets a `prev_hash` field containing the SHA-256 of the previous line.
/// The first entry uses "genesis" as its prev_hash.
pub fn append_entry(path: &str, entry: &Value) -> Result<String> {
    let content = if std::path::Path::new(path).exists() {
        std::fs::read_to_string(path).with_context(|| format!("cannot read hold log {path}"))?
    } else {
        String::new()
    };

    let prev_hash = content
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(line_hash)
        .unwrap_or_else(|| GENESIS.to_string());

    let mut entry = entry.clone();
    if let Some(obj) = entry.as_object_mut() {
        obj.insert("prev_hash".into(), Value::String(prev_hash));
        obj.insert(
            "ts".into(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
    }

    let entry_json = serde_json::to_string(&entry)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open hold log {path}"))?;
    if !content.is_empty() && !content.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    file.write_all(entry_json.as_bytes())?;
    file.write_all(b"\n")
        .with_context(|| format!("cannot write hold log {path}"))?;

    Ok(line_hash(&entry_json))
}

/// Append a hold request as a `Hold` event.
pub fn append_hold(path: &str, request: &HoldRequest) -> Result<String> {
    let mut entry = serde_json::to_value(request)?;
    if let Some(obj) = entry.as_object_mut() {
        obj.insert("event_type".into(), Value::String("Hold".into()));
    }
    append_entry(path, &entry)
}

/// Verify the hash chain of a hold log. Returns the number of valid entries.
pub fn verify_chain(path: &str) -> Result<u64> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read hold log {path}"))?;

    let mut count = 0u64;
    let mut prev_hash = GENESIS.to_string();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: Value = serde_json::from_str(line)
            .with_context(|| format!("invalid JSON at line {}", i + 1))?;

        let entry_prev = entry
            .get("prev_hash")
            .and_then(Value::as_str)
            .unwrap_or(GENESIS);

        if entry_prev != prev_hash {
            bail!(
                "hash chain broken at entry {}: expected prev_hash '{}', got '{}'",
                count,
                prev_hash,
                entry_prev
            );
        }

        prev_hash = line_hash(line);
        count += 1;
    }

    Ok(count)
}

/// Count `Hold` events per reason, in first-seen order.
pub fn count_by_reason(path: &str) -> Result<Vec<(String, u64)>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read hold log {path}"))?;

    let mut counts: Vec<(String, u64)> = Vec::new();
    for line in content.lines() {
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if entry.get("event_type").and_then(Value::as_str) != Some("Hold") {
            continue;
        }
        let reason = entry
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string();
        match counts.iter_mut().find(|(r, _)| *r == reason) {
            Some((_, n)) => *n += 1,
            None => counts.push((reason, 1)),
        }
    }
    Ok(counts)
}

/// Hold sink that records every hold in a hash-chained JSONL file.
pub struct HoldLogSink {
    path: String,
    write: Mutex<()>,
}

impl HoldLogSink {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl HoldSink for HoldLogSink {
    fn submit(&self, request: &HoldRequest) -> Result<(), SinkError> {
        // Appends read the chain head first; one writer at a time.
        let _guard = self
            .write
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        append_hold(&self.path, request)
            .map(|_| ())
            .map_err(|e| SinkError::Unavailable(format!("{e:#}")))
    }
}
