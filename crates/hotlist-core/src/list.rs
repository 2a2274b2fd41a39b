use crate::settings::{HoldRule, RuleTable, TableStatus};

/// Summary row for a single hold rule.
pub struct RuleRow {
    pub position: usize,
    pub from_address: String,
    pub reason: String,
    pub pause_for: String,
    pub resume: String,
}

/// Produce summary rows in load order.
pub fn rows(rules: &[HoldRule]) -> Vec<RuleRow> {
    rules
        .iter()
        .enumerate()
        .map(|(position, r)| RuleRow {
            position,
            from_address: r.source_channel.clone(),
            reason: r.reason.clone(),
            pause_for: format_pause(r.pause_for),
            resume: r.default_resume_action.to_string(),
        })
        .collect()
}

/// `432000` → `432000s (5d)`.
pub fn format_pause(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let human = match (days, hours, minutes) {
        (0, 0, 0) => return format!("{seconds}s"),
        (0, 0, m) => format!("{m}m"),
        (0, h, 0) => format!("{h}h"),
        (0, h, m) => format!("{h}h{m}m"),
        (d, 0, _) => format!("{d}d"),
        (d, h, _) => format!("{d}d{h}h"),
    };
    format!("{seconds}s ({human})")
}

/// Print the table as aligned columns to stdout.
pub fn print_table(table: &RuleTable) {
    match table.status() {
        TableStatus::Loaded => {}
        TableStatus::FailedOpen { error } => {
            println!("(pause settings failed to load, failing open: {error})");
        }
        TableStatus::FailedClosed {
            error,
            pause_for,
            default_resume_action,
        } => {
            println!(
                "(pause settings failed to load, failing closed: every event held for {} then {default_resume_action}: {error})",
                format_pause(*pause_for)
            );
        }
    }

    let rows = rows(table.rules());
    if rows.is_empty() {
        println!("(no hold rules)");
        return;
    }
    let w_from = rows
        .iter()
        .map(|r| r.from_address.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let w_reason = rows.iter().map(|r| r.reason.len()).max().unwrap_or(6).max(6);
    let w_pause = rows
        .iter()
        .map(|r| r.pause_for.len())
        .max()
        .unwrap_or(9)
        .max(9);

    println!(
        "{:<3}  {:<w_from$}  {:<w_reason$}  {:<w_pause$}  RESUME",
        "#", "FROM", "REASON", "PAUSE FOR"
    );
    println!(
        "{:<3}  {:<w_from$}  {:<w_reason$}  {:<w_pause$}  ------",
        "---",
        "-".repeat(w_from),
        "-".repeat(w_reason),
        "-".repeat(w_pause)
    );
    for r in rows {
        println!(
            "{:<3}  {:<w_from$}  {:<w_reason$}  {:<w_pause$}  {}",
            r.position, r.from_address, r.reason, r.pause_for, r.resume
        );
    }
}
