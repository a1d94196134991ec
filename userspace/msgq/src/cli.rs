// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! User-facing CLI helpers for inspecting a message queue configuration.

use std::path::Path;

use serde_json::json;

use crate::{Caller, GetFlags, Key, Limits, MsgSystem, QueueStat, RecvFlags, SendFlags};

/// Returns the CLI usage string.
pub fn help() -> &'static str {
    "msgq inspects SVID message queue limits. \
     Usage: msgq [--config PATH] [limits|dump|selftest] [--help]"
}

/// Executes the CLI using provided arguments.
pub fn execute(args: &[&str]) -> String {
    if args.contains(&"--help") {
        return help().to_string();
    }
    let mut config = None;
    let mut command = "limits";
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "--config" => match iter.next() {
                Some(path) => config = Some(*path),
                None => return "error: --config needs a path".to_string(),
            },
            other => command = other,
        }
    }
    let limits = match config {
        Some(path) => match Limits::load(Path::new(path)) {
            Ok(limits) => limits,
            Err(err) => return format!("error: {err}"),
        },
        None => Limits::default(),
    };
    match command {
        "limits" => render(&json!({
            "limits": limits,
            "max_message_bytes": limits.max_message_bytes(),
        })),
        "dump" => match MsgSystem::start(limits) {
            Ok(system) => {
                let queues: Vec<QueueStat> = system.dump();
                render(&json!({ "queues": queues, "pools": system.pool_usage() }))
            }
            Err(err) => format!("error: {err}"),
        },
        "selftest" => selftest(limits),
        other => format!("error: unknown command '{other}'\n{}", help()),
    }
}

/// Parses `std::env::args` and prints the execution result.
pub fn run() {
    let owned: Vec<String> = std::env::args().skip(1).collect();
    let refs: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
    println!("{}", execute(&refs));
}

fn render(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("error: {err}"))
}

/// Round-trips one message per type through a private queue and tears it down.
fn selftest(limits: Limits) -> String {
    let system = match MsgSystem::start(limits) {
        Ok(system) => system,
        Err(err) => return format!("error: {err}"),
    };
    match round_trip(&system, &Caller::root(std::process::id())) {
        Ok(3) => "selftest ok".to_string(),
        Ok(n) => format!("selftest failed: {n}/3 messages intact"),
        Err(err) => format!("selftest failed: {err}"),
    }
}

fn round_trip(system: &MsgSystem, caller: &Caller) -> crate::Result<usize> {
    let id = system.create_or_lookup(caller, Key::Private, GetFlags::empty(), 0o600)?;
    let payload_len = system.limits().segment_size + 1;
    for mtype in (1..=3).rev() {
        system.send(caller, id, mtype, &vec![mtype as u8; payload_len], SendFlags::NOWAIT)?;
    }
    let mut intact = 0;
    for mtype in 1..=3 {
        let msg = system.receive_message(caller, id, payload_len, mtype, RecvFlags::NOWAIT)?;
        let filled = msg.data.len() == payload_len && msg.data.iter().all(|&b| b == mtype as u8);
        if msg.mtype == mtype && filled {
            intact += 1;
        }
    }
    system.remove(caller, id)?;
    system.shutdown()?;
    Ok(intact)
}

#[cfg(test)]
mod tests {
    use super::{execute, help};

    #[test]
    fn help_contains_name() {
        assert!(help().contains("msgq"));
        assert!(execute(&["--help"]).contains("Usage"));
    }

    #[test]
    fn default_prints_limits() {
        let out = execute(&[]);
        assert!(out.contains("\"max_queues\": 40"));
        assert!(out.contains("\"max_message_bytes\": 16384"));
    }

    #[test]
    fn selftest_passes_with_defaults() {
        assert_eq!(execute(&["selftest"]), "selftest ok");
    }

    #[test]
    fn unknown_command_reports_usage() {
        assert!(execute(&["frobnicate"]).starts_with("error: unknown command"));
    }

    #[test]
    fn missing_config_path() {
        assert!(execute(&["--config"]).contains("needs a path"));
    }
}
