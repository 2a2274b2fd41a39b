use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

/// Channel the sample configs bind their rules to.
#[allow(dead_code)]
pub const DEDUPE_CHANNEL: &str = "bio-debup-bus-out";

pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .expect("crate lives two levels below the workspace root")
}

/// Path of a file under `fixtures/`, relative to the workspace root.
#[allow(dead_code)]
pub fn fixture(name: &str) -> String {
    format!("fixtures/{name}")
}

/// `hotlist` run from the workspace root with logging at its default level.
pub fn hotlist_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hotlist"));
    cmd.current_dir(workspace_root());
    cmd.env_remove("HOTLIST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    hotlist_bin()
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("cannot run hotlist {}: {e}", args.join(" ")))
}

fn exit_code(out: &Output) -> i32 {
    out.status.code().unwrap_or(-1)
}

/// Run hotlist, assert the exit code, parse stdout as one JSON document.
pub fn hotlist_json(args: &[&str], expected_exit: i32) -> Value {
    let out = run(args);
    assert_eq!(
        exit_code(&out),
        expected_exit,
        "hotlist {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!(
            "hotlist {} printed invalid JSON: {e}\n{}",
            args.join(" "),
            String::from_utf8_lossy(&out.stdout)
        )
    })
}

/// Gate decision for one event fixture: `hotlist eval`.
#[allow(dead_code)]
pub fn eval(config: &str, channel: &str, event: &str) -> Value {
    hotlist_json(
        &[
            "eval",
            "--config",
            &fixture(config),
            "--channel",
            channel,
            &fixture(event),
        ],
        0,
    )
}

/// Route decision for one event fixture: `hotlist route`, holds optionally logged.
#[allow(dead_code)]
pub fn route(config: &str, channel: &str, event: &str, audit: Option<&str>) -> Value {
    let (config, event) = (fixture(config), fixture(event));
    let mut args = vec![
        "route",
        "--config",
        config.as_str(),
        "--channel",
        channel,
        event.as_str(),
    ];
    if let Some(path) = audit {
        args.extend(["--audit", path]);
    }
    hotlist_json(&args, 0)
}

/// Run hotlist expecting success, return stdout.
#[allow(dead_code)]
pub fn hotlist_stdout(args: &[&str]) -> String {
    let out = run(args);
    assert!(
        out.status.success(),
        "hotlist {} exited {}\nstderr: {}",
        args.join(" "),
        exit_code(&out),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

/// One JSON value per non-blank stdout line (`hotlist batch`).
#[allow(dead_code)]
pub fn json_lines(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("bad JSON line {l}: {e}")))
        .collect()
}
