//! Binary-level tests.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("pubtator-agents").unwrap_or_else(|e| unreachable!("{e}"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_tools_server_reports_unknown_tool() {
    bin()
        .arg("tools")
        .env("PUBTATOR_API_URL", "http://127.0.0.1:9")
        .write_stdin(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"bogus_tool\",\"arguments\":{}}}\n",
        ))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{\"type\":\"ready\"}\n"))
        .stdout(predicate::str::contains("\"protocolVersion\":\"2024-11-05\""))
        .stdout(predicate::str::contains("Unknown tool: bogus_tool"))
        .stdout(predicate::str::contains("-32000"));
}

#[test]
fn test_tools_server_drops_garbage_lines() {
    let output = bin()
        .arg("tools")
        .write_stdin("not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n")
        .output()
        .unwrap_or_else(|e| unreachable!("{e}"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout was {stdout}");
    assert!(lines[1].contains("\"id\":7"));
}

#[test]
fn test_memory_and_clear_need_no_api_key() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let path = dir.path().join("session.json");

    bin()
        .arg("memory")
        .env("PUBTATOR_SESSION_PATH", &path)
        .env_remove("OPENAI_API_KEY")
        .env_remove("PUBTATOR_API_KEY")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"conversationId\""))
        .stdout(predicate::str::contains("\"totalInteractions\": 0"));
    assert!(path.exists());

    bin()
        .arg("clear")
        .env("PUBTATOR_SESSION_PATH", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Session cleared"));
    assert!(!path.exists());
}

#[test]
fn test_ask_without_api_key_fails_cleanly() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    bin()
        .args(["ask", "curcumin"])
        .env("PUBTATOR_SESSION_PATH", dir.path().join("s.json"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("PUBTATOR_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn test_init_prompts_writes_files() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    bin()
        .arg("init-prompts")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 6 prompt template(s)"));
    assert!(dir.path().join("judge.md").exists());
}
