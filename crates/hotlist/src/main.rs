#![forbid(unsafe_code)]

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hotlist_core::event::BusEnvelope;
use hotlist_core::settings::GateConfig;
use hotlist_core::traits::HoldSink;
use hotlist_engine::audit::hold_log::{self, HoldLogSink};
use hotlist_engine::gate::route_gate::HotlistGate;
use hotlist_engine::gate::router::{DiscardSink, HoldRouter, RouteDecision};
use hotlist_engine::settings::registry::SettingsRegistry;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `debug`, `hotlist_engine=info`).
const LOG_ENV: &str = "HOTLIST_LOG";

#[derive(Parser)]
#[command(
    name = "hotlist",
    version,
    about = "Decide which in-flight registration events are held by hotlist pause settings."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write a starter gate configuration from a built-in template.
    Init {
        /// Template name: dedupe, strict, empty.
        #[arg(default_value = "dedupe")]
        template: String,

        /// Hotlist tag key to inspect.
        #[arg(long)]
        tag_key: Option<String>,

        /// Write to file instead of stdout.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List available built-in templates.
    Templates,

    /// Validate a gate configuration: schema + rule table + lint.
    Check {
        /// Path to gate config .json file.
        file: String,

        /// Output structured JSON report.
        #[arg(long)]
        json: bool,

        /// Fail on warnings (not just errors).
        #[arg(long)]
        strict: bool,
    },

    /// Show the rule table the registry would publish.
    Rules {
        /// Path to gate config .json file.
        file: String,
    },

    /// Evaluate the route gate for one message body.
    Eval {
        /// Path to gate config .json file.
        #[arg(long)]
        config: String,

        /// Channel (bus address) the message was received on.
        #[arg(long)]
        channel: String,

        /// Path to the message body (or "-" / omit for stdin).
        #[arg(default_value = "-")]
        event: String,
    },

    /// Route one message body: hold (with scheduler request) or continue.
    Route {
        /// Path to gate config .json file.
        #[arg(long)]
        config: String,

        /// Channel (bus address) the message was received on.
        #[arg(long)]
        channel: String,

        /// Path to the message body (or "-" / omit for stdin).
        #[arg(default_value = "-")]
        event: String,

        /// Append holds to this hash-chained log.
        #[arg(long)]
        audit: Option<String>,
    },

    /// Route a JSONL stream of bus envelopes ({"channel", "body"}) on worker threads.
    Batch {
        /// Path to gate config .json file.
        #[arg(long)]
        config: String,

        /// Path to the envelope stream (or "-" / omit for stdin).
        #[arg(default_value = "-")]
        input: String,

        /// Number of worker threads sharing the gate.
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Append holds to this hash-chained log.
        #[arg(long)]
        audit: Option<String>,
    },

    /// Inspect a hold log.
    Audit {
        /// Path to hold log .jsonl file.
        file: String,

        /// Verify the hash chain.
        #[arg(long)]
        verify: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Init {
            template,
            tag_key,
            output,
        } => cmd_init(&template, tag_key.as_deref(), output.as_deref()),

        Cmd::Templates => cmd_templates(),

        Cmd::Check { file, json, strict } => cmd_check(&file, json, strict),

        Cmd::Rules { file } => cmd_rules(&file),

        Cmd::Eval {
            config,
            channel,
            event,
        } => cmd_eval(&config, &channel, &event),

        Cmd::Route {
            config,
            channel,
            event,
            audit,
        } => cmd_route(&config, &channel, &event, audit.as_deref()),

        Cmd::Batch {
            config,
            input,
            workers,
            audit,
        } => cmd_batch(&config, &input, workers, audit.as_deref()),

        Cmd::Audit { file, verify } => cmd_audit(&file, verify),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn read_input(file: &str) -> Result<Vec<u8>> {
    if file == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(file).with_context(|| format!("cannot read {file}"))
    }
}

fn load_gate(config_path: &str) -> Result<(Arc<SettingsRegistry>, HotlistGate)> {
    let config = GateConfig::load(config_path)?;
    let registry = Arc::new(SettingsRegistry::from_config(&config));
    debug!(
        config = config_path,
        tag_key = %config.hotlisted_tag_key,
        policy = %config.on_settings_error,
        "gate config loaded"
    );
    let gate = HotlistGate::new(registry.clone(), config.hotlisted_tag_key);
    Ok((registry, gate))
}

fn hold_sink(audit: Option<&str>) -> Arc<dyn HoldSink> {
    match audit {
        Some(path) => Arc::new(HoldLogSink::new(path)),
        None => Arc::new(DiscardSink),
    }
}

fn cmd_init(template: &str, tag_key: Option<&str>, output: Option<&str>) -> Result<()> {
    let config = hotlist_core::templates::generate(template, tag_key).ok_or_else(|| {
        let available: Vec<_> = hotlist_core::templates::list_templates()
            .iter()
            .map(|(n, _)| *n)
            .collect();
        anyhow::anyhow!(
            "unknown template \"{template}\". available: {}",
            available.join(", ")
        )
    })?;

    hotlist_core::schema::validate(&config)
        .with_context(|| format!("template {template} produced an invalid config"))?;
    let json = serde_json::to_string_pretty(&config)?;

    if let Some(path) = output {
        std::fs::write(path, &json).with_context(|| format!("cannot write {path}"))?;
        eprintln!("wrote {path}");
    } else {
        println!("{json}");
    }
    Ok(())
}

fn cmd_templates() -> Result<()> {
    for (name, desc) in hotlist_core::templates::list_templates() {
        println!("  {name:<8} {desc}");
    }
    Ok(())
}

fn cmd_check(file: &str, json_out: bool, strict: bool) -> Result<()> {
    let content =
        std::fs::read_to_string(file).map_err(|e| anyhow::anyhow!("cannot read {file}: {e}"))?;
    let data: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("{file}: invalid JSON: {e}"))?;

    let report = hotlist_core::schema::check(&data, file, strict);

    if json_out {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if report.pass {
            eprintln!("  ok  {file} ({} rules)", report.rules);
        } else {
            eprintln!("  FAIL {file} ({} rules)", report.rules);
        }
        for e in &report.errors {
            eprintln!(
                "  error {}: {} {}",
                e.code,
                e.message,
                e.path.as_deref().unwrap_or("")
            );
        }
        for w in &report.warnings {
            eprintln!(
                "  warn  {}: {} {}",
                w.code,
                w.message,
                w.path.as_deref().unwrap_or("")
            );
        }
    }

    if !report.pass {
        bail!("check failed for {file}");
    }
    Ok(())
}

fn cmd_rules(file: &str) -> Result<()> {
    let (registry, gate) = load_gate(file)?;
    println!("tag key: {}", gate.tag_key());
    hotlist_core::list::print_table(&registry.get());
    Ok(())
}

fn cmd_eval(config: &str, channel: &str, event: &str) -> Result<()> {
    let (_, gate) = load_gate(config)?;
    let body = read_input(event)?;
    let decision = gate.matches(&body, channel);
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn cmd_route(config: &str, channel: &str, event: &str, audit: Option<&str>) -> Result<()> {
    let (_, gate) = load_gate(config)?;
    let router = HoldRouter::new(gate, hold_sink(audit));
    let body = read_input(event)?;
    let decision = router.route(&body, channel)?;
    if decision.is_hold() {
        eprintln!("  hold  {channel}");
    } else {
        eprintln!("  continue  {channel}");
    }
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

/// One output line of `hotlist batch`.
#[derive(Serialize)]
struct BatchLine {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    #[serde(flatten)]
    decision: Option<RouteDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn route_line(router: &HoldRouter, number: usize, line: &str) -> BatchLine {
    let envelope: BusEnvelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(e) => {
            return BatchLine {
                line: number,
                channel: None,
                decision: None,
                error: Some(format!("invalid envelope: {e}")),
            }
        }
    };
    match router.route(&envelope.body.as_bytes(), &envelope.channel) {
        Ok(decision) => BatchLine {
            line: number,
            channel: Some(envelope.channel),
            decision: Some(decision),
            error: None,
        },
        Err(e) => BatchLine {
            line: number,
            channel: Some(envelope.channel),
            decision: None,
            error: Some(e.to_string()),
        },
    }
}

fn cmd_batch(config: &str, input: &str, workers: usize, audit: Option<&str>) -> Result<()> {
    if workers == 0 {
        bail!("--workers must be at least 1");
    }
    let (_, gate) = load_gate(config)?;
    let router = HoldRouter::new(gate, hold_sink(audit));

    let raw = read_input(input)?;
    let text = String::from_utf8(raw).context("envelope stream is not UTF-8")?;
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l))
        .collect();

    let chunk = lines.len().div_ceil(workers).max(1);
    let results = std::thread::scope(|s| -> Result<Vec<BatchLine>> {
        let handles: Vec<_> = lines
            .chunks(chunk)
            .map(|part| {
                let router = &router;
                s.spawn(move || {
                    part.iter()
                        .map(|(n, l)| route_line(router, *n, l))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        // Chunks are joined in spawn order, so output keeps input order.
        let mut out = Vec::with_capacity(lines.len());
        for h in handles {
            out.extend(
                h.join()
                    .map_err(|_| anyhow::anyhow!("batch worker panicked"))?,
            );
        }
        Ok(out)
    })?;

    let mut held = 0usize;
    let mut failed = 0usize;
    for r in &results {
        if r.error.is_some() {
            failed += 1;
        } else if r.decision.as_ref().is_some_and(|d| d.is_hold()) {
            held += 1;
        }
        println!("{}", serde_json::to_string(r)?);
    }
    eprintln!(
        "\n{} events, {held} held, {} continued, {failed} failed",
        results.len(),
        results.len() - held - failed
    );
    if failed > 0 {
        bail!("{failed} event(s) could not be routed");
    }
    Ok(())
}

fn cmd_audit(file: &str, verify: bool) -> Result<()> {
    if verify {
        let count = hold_log::verify_chain(file)?;
        eprintln!("  ok  {file}: {count} entries, chain intact");
        println!("{}", serde_json::json!({ "file": file, "entries": count, "valid": true }));
        return Ok(());
    }
    for (reason, count) in hold_log::count_by_reason(file)? {
        println!("  {reason:<16} {count}");
    }
    Ok(())
}
