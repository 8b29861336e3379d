//! Integration tests for the palisade binary.
//!
//! Spawns the process with a manual clock, drives it over stdin, and checks
//! the `ok` / `error` response lines on stdout.

use std::io::{BufRead, BufReader, Lines, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde_json::Value;

fn spawn(args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_palisade"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start palisade")
}

/// Sends a sequence of commands and collects every stdout line.
fn run_session(commands: &[&str]) -> Vec<String> {
    let mut child = spawn(&["--manual-clock"]);
    let mut stdin = child.stdin.take().unwrap();
    let reader = BufReader::new(child.stdout.take().unwrap());

    for cmd in commands {
        writeln!(stdin, "{}", cmd).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    lines
}

/// One command, one answer, for flows that need ids from earlier replies.
struct Client {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl Client {
    fn start() -> Self {
        let mut child = spawn(&["--manual-clock"]);
        let stdin = child.stdin.take().unwrap();
        let lines = BufReader::new(child.stdout.take().unwrap()).lines();
        Client { child, stdin, lines }
    }

    fn send(&mut self, cmd: &str) -> String {
        writeln!(self.stdin, "{}", cmd).unwrap();
        self.stdin.flush().unwrap();
        self.lines.next().expect("no response").unwrap()
    }

    fn ok(&mut self, cmd: &str) -> Value {
        let line = self.send(cmd);
        let json = line
            .strip_prefix("ok ")
            .unwrap_or_else(|| panic!("'{cmd}' failed: {line}"));
        serde_json::from_str(json).unwrap()
    }

    fn quit(mut self) {
        assert_eq!(self.send("quit"), "ok \"bye\"");
        drop(self.stdin);
        assert!(self.child.wait().unwrap().success());
    }
}

#[test]
fn quit_says_goodbye() {
    let lines = run_session(&["quit"]);
    assert_eq!(lines, vec!["ok \"bye\""]);
}

#[test]
fn blank_lines_get_no_answer() {
    let lines = run_session(&["", "   ", "quit"]);
    assert_eq!(lines.len(), 1);
}

#[test]
fn bad_commands_are_reported_and_the_session_continues() {
    let lines = run_session(&[
        "fortify 1",
        "player ana",
        "player ana elves",
        "village 42",
        "quit",
    ]);
    assert_eq!(lines[0], "error unknown command: fortify");
    assert_eq!(lines[1], "error usage: player <name> <roman|teuton|gaul>");
    assert!(lines[2].starts_with("error invalid"), "got {}", lines[2]);
    assert_eq!(lines[3], "error village 42 not found");
    assert_eq!(lines[4], "ok \"bye\"");
}

#[test]
fn new_village_starts_empty_and_idle() {
    let mut client = Client::start();
    let player = client.ok("player ana roman");
    assert_eq!(player["name"], "ana");
    let pid = player["id"].as_u64().unwrap();

    let founded = client.ok(&format!("found {pid} 5 -3 Ostia"));
    let vid = founded["village"].as_u64().unwrap();

    let village = client.ok(&format!("village {vid}"));
    assert_eq!(village["name"], "Ostia");
    assert_eq!(village["loyalty"], 100);
    assert_eq!(village["fields"].as_array().unwrap().len(), 18);

    let snapshot = client.ok(&format!("resources {vid}"));
    assert_eq!(snapshot["quantities"]["wood"], 0);
    assert_eq!(snapshot["warehouse_capacity"], 800);

    let line = client.send(&format!("upgrade {vid} 1"));
    assert!(line.starts_with("error insufficient resources"), "got {line}");

    let events = client.ok(&format!("events {vid}"));
    assert!(events.as_array().unwrap().is_empty());
    client.quit();
}

#[test]
fn occupied_coordinates_are_rejected() {
    let mut client = Client::start();
    let pid = client.ok("player bo gaul")["id"].as_u64().unwrap();
    client.ok(&format!("found {pid} 0 0"));
    let line = client.send(&format!("found {pid} 0 0"));
    assert_eq!(line, "error invalid order: (0, 0) is already occupied");
    client.quit();
}

#[test]
fn advance_moves_time_and_polls() {
    let mut client = Client::start();
    let pid = client.ok("player cy teuton")["id"].as_u64().unwrap();
    let vid = client.ok(&format!("found {pid} 1 1"))["village"].as_u64().unwrap();
    let before = client.ok(&format!("resources {vid}"));

    let advanced = client.ok("advance 3600");
    assert_eq!(advanced["poll"]["claimed"], 0);
    assert_ne!(advanced["now"], before["at"]);

    // Level-0 fields produce nothing; the main building still eats.
    let after = client.ok(&format!("resources {vid}"));
    assert_eq!(after["quantities"]["wood"], 0);
    assert_eq!(after["crop_upkeep"], before["crop_upkeep"]);
    client.quit();
}

#[test]
fn missing_troops_are_refused() {
    let mut client = Client::start();
    let a = client.ok("player dee teuton")["id"].as_u64().unwrap();
    let b = client.ok("player eli gaul")["id"].as_u64().unwrap();
    let va = client.ok(&format!("found {a} 0 0"))["village"].as_u64().unwrap();
    let vb = client.ok(&format!("found {b} 0 7"))["village"].as_u64().unwrap();

    let line = client.send(&format!("send {va} {vb} raid clubswinger:5"));
    assert!(line.starts_with("error insufficient troops"), "got {line}");
    let line = client.send(&format!("send {va} {va} raid clubswinger:5"));
    assert!(line.starts_with("error invalid order"), "got {line}");
    let reports = client.ok(&format!("reports {vb}"));
    assert!(reports.as_array().unwrap().is_empty());
    client.quit();
}

#[test]
fn unreadable_config_exits_with_usage_status() {
    let path = std::env::temp_dir().join(format!("palisade-missing-{}.json", std::process::id()));
    let mut child = spawn(&["--config", path.to_str().unwrap()]);
    drop(child.stdin.take());
    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn config_file_sets_speed() {
    let path = std::env::temp_dir().join(format!("palisade-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "speed": 2.0, "manual_clock": true }"#).unwrap();

    let mut child = spawn(&["--config", path.to_str().unwrap()]);
    let mut stdin = child.stdin.take().unwrap();
    let reader = BufReader::new(child.stdout.take().unwrap());
    writeln!(stdin, "advance 60").unwrap();
    writeln!(stdin, "quit").unwrap();
    drop(stdin);

    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    assert!(child.wait().unwrap().success());
    std::fs::remove_file(&path).unwrap();
    // `advance` only works with the manual clock the file asked for.
    assert!(lines[0].starts_with("ok "), "got {}", lines[0]);
    assert_eq!(lines[1], "ok \"bye\"");
}
