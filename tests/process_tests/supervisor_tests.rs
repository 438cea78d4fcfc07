//! Tests for SupervisedProcess
//!
//! These tests verify:
//! - Spawning with piped stdin/stdout and a working directory
//! - Streams can be taken exactly once
//! - stderr is merged into the output stream
//! - Exit status reporting, bounded waits and kill

#![cfg(unix)]

use std::io::{BufRead, Write};
use std::time::Duration;

use consolerelay::process::{LaunchSpec, SupervisedProcess};
use consolerelay::RelayError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn shell(script: &str) -> LaunchSpec {
    LaunchSpec::new("sh").arg("-c").arg(script)
}

// =============================================================================
// Spawn Tests
// =============================================================================

#[test]
fn test_spawn_missing_program() {
    let result = SupervisedProcess::spawn(&LaunchSpec::new("consolerelay-no-such-binary"));

    match result {
        Err(RelayError::Spawn { program, .. }) => assert_eq!(program, "consolerelay-no-such-binary"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("spawn should fail"),
    }
}

#[test]
fn test_streams_taken_once() {
    let mut process = SupervisedProcess::spawn(&LaunchSpec::new("cat")).unwrap();

    assert!(process.take_input().is_some());
    assert!(process.take_input().is_none());
    assert!(process.take_output().is_some());
    assert!(process.take_output().is_none());

    // Dropping stdin ends `cat`
    assert!(process.wait().unwrap().success());
}

#[test]
fn test_stdin_to_stdout_round_trip() {
    let mut process = SupervisedProcess::spawn(&LaunchSpec::new("cat")).unwrap();
    let mut input = process.take_input().unwrap();
    let mut output = process.take_output().unwrap();

    input.write_all(b"say hi\n").unwrap();
    input.flush().unwrap();

    let mut line = String::new();
    output.read_line(&mut line).unwrap();
    assert_eq!(line, "say hi\n");

    drop(input);
    process.wait().unwrap();
}

#[test]
fn test_stderr_shares_output_stream() {
    let mut process = SupervisedProcess::spawn(&shell("echo OUT; echo ERR 1>&2; echo DONE")).unwrap();
    let output = process.take_output().unwrap();

    let lines: Vec<String> = output.lines().map(|l| l.unwrap()).collect();

    assert_eq!(lines, vec!["OUT", "ERR", "DONE"]);
    assert!(process.wait().unwrap().success());
}

#[test]
fn test_output_ends_when_process_exits() {
    let mut process = SupervisedProcess::spawn(&shell("echo last")).unwrap();
    let mut output = process.take_output().unwrap();

    let mut rest = String::new();
    std::io::Read::read_to_string(&mut output, &mut rest).unwrap();

    assert_eq!(rest, "last\n");
    process.wait().unwrap();
}

#[test]
fn test_working_directory_applied() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("marker.txt"), b"").unwrap();

    let spec = shell("ls").working_dir(temp_dir.path());
    let mut process = SupervisedProcess::spawn(&spec).unwrap();
    let output = process.take_output().unwrap();

    let listing: Vec<String> = output.lines().map(|l| l.unwrap()).collect();
    assert!(listing.contains(&"marker.txt".to_string()));
    assert!(process.wait().unwrap().success());
}

// =============================================================================
// Exit Tests
// =============================================================================

#[test]
fn test_exit_code_reported() {
    let mut process = SupervisedProcess::spawn(&shell("exit 7")).unwrap();

    let status = process.wait().unwrap();

    assert_eq!(status.code(), Some(7));
}

#[test]
fn test_wait_timeout_then_kill() {
    let mut process = SupervisedProcess::spawn(&shell("sleep 30")).unwrap();

    assert!(process.try_wait().unwrap().is_none());
    assert!(process.wait_timeout(Duration::from_millis(100)).unwrap().is_none());

    process.kill().unwrap();
    let status = process.wait_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(!status.success());
}

#[test]
fn test_wait_timeout_with_unbounded_duration() {
    let mut process = SupervisedProcess::spawn(&shell("exit 2")).unwrap();

    let status = process.wait_timeout(Duration::MAX).unwrap().unwrap();

    assert_eq!(status.code(), Some(2));
}

#[test]
fn test_kill_after_exit_is_noop() {
    let mut process = SupervisedProcess::spawn(&shell("true")).unwrap();
    process.wait().unwrap();

    assert!(process.kill().is_ok());
}
