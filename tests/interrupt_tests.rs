//! Ctrl-C handling of the `kira` binary.

#![cfg(unix)]

mod common;

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use common::{write_model, HIGH_ID};

const FAREWELL: &str = "Thank you for using Kira Health Assistant!";

/// Forward everything the child prints, accumulated, over a channel
fn watch_stdout(child: &mut Child) -> Receiver<String> {
    let mut stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut seen = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match stdout.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    seen.extend_from_slice(&buf[..n]);
                    if tx.send(String::from_utf8_lossy(&seen).into_owned()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

fn wait_for_output(rx: &Receiver<String>, needle: &str, timeout: Duration) -> String {
    let deadline = Instant::now() + timeout;
    let mut latest = String::new();
    while !latest.contains(needle) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(text) => latest = text,
            Err(_) => panic!("no {needle:?} in output within {timeout:?}: {latest:?}"),
        }
    }
    latest
}

fn interrupt(child: &Child) {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::process::ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            child.kill().ok();
            panic!("kira still running {timeout:?} after the interrupt");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn test_interrupt_at_prompt_prints_farewell_and_exits() {
    let dir = TempDir::new().unwrap();
    write_model(dir.path(), HIGH_ID);

    let mut child = Command::new(env!("CARGO_BIN_EXE_kira"))
        .args(["--model_path", dir.path().to_str().unwrap(), "--cpu"])
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    // kept open so the session blocks reading input
    let _stdin = child.stdin.take();
    let output = watch_stdout(&mut child);

    wait_for_output(&output, "You: ", Duration::from_secs(60));
    interrupt(&child);

    let status = wait_with_timeout(&mut child, Duration::from_secs(10));
    assert!(status.success(), "exit status {status:?}");
    let transcript = wait_for_output(&output, FAREWELL, Duration::from_secs(5));
    assert!(transcript.trim_end().ends_with(FAREWELL), "{transcript}");
}
