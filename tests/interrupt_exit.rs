//! Interrupt behaviour of the `piescan` binary.
//!
//! The simulated scanner is held in warm-up, where the session does not poll
//! the cancel flag, so a second interrupt finds the first one still pending.

#![cfg(unix)]

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

fn send_interrupt(child: &Child) {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("kill should run");
    assert!(status.success());
}

#[test]
fn test_second_interrupt_exits_130() {
    let out = tempfile::tempdir().expect("tempdir");
    let mut child = Command::new(env!("CARGO_BIN_EXE_piescan"))
        .args(["scan", "--pixels", "8", "--lines", "4", "--warmup-cycles", "1000"])
        .arg("--output")
        .arg(out.path())
        .env("PIESCAN_WARMUP__MAX_ATTEMPTS", "1000")
        .env("PIESCAN_WARMUP__DELAY_MS", "50")
        .env_remove("RUST_LOG")
        .env_remove("PIESCAN_CONFIG")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("binary should start");

    let stderr = child.stderr.take().expect("stderr is piped");
    let mut lines = BufReader::new(stderr).lines().map_while(Result::ok);
    assert!(
        lines.by_ref().any(|line| line.contains("Warming up")),
        "binary never reached warm-up"
    );

    send_interrupt(&child);
    thread::sleep(Duration::from_millis(200));
    send_interrupt(&child);

    let rest: Vec<String> = lines.collect();
    let status = child.wait().expect("binary should exit");
    assert_eq!(status.code(), Some(130), "{rest:?}");
    assert!(rest.iter().any(|line| line.contains("Aborting")), "{rest:?}");
    assert!(!out.path().join("png").exists());
}
