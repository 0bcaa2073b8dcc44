#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end tests of the `gosp-server` binary

mod common;

use common::sockets::{temp_socket, wait_for};
use gosp_runtime::{RenderedResponse, Request};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn gosp_server() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gosp-server"));
    cmd.env("GOSP_LOG_LEVEL", "error")
        .env_remove("GOSP_SOCKET")
        .env_remove("GOSP_IDLE_TIMEOUT_SECS");
    cmd
}

#[test]
fn test_render_request_file_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let request_file = dir.path().join("request.json");
    let request = Request {
        uri: "/from-file.gosp".into(),
        method: "GET".into(),
        ..Request::default()
    };
    std::fs::write(&request_file, request.to_json()).unwrap();

    let output = gosp_server()
        .args(["render", "--file"])
        .arg(&request_file)
        .output()
        .expect("run gosp-server");
    assert!(output.status.success());

    let resp = RenderedResponse::parse(&output.stdout).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.mime_type.as_deref(), Some("text/html"));
    assert!(resp.body_text().contains("/from-file.gosp"));
}

#[test]
fn test_no_arguments_renders_without_request() {
    let output = gosp_server().output().expect("run gosp-server");
    assert!(output.status.success());
    let resp = RenderedResponse::parse(&output.stdout).unwrap();
    assert!(resp.body_text().contains("No request was provided."));
}

#[test]
fn test_malformed_request_file_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let request_file = dir.path().join("bad.json");
    std::fs::write(&request_file, r#"{"Uri": 42}"#).unwrap();

    let output = gosp_server()
        .args(["render", "--file"])
        .arg(&request_file)
        .output()
        .expect("run gosp-server");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_serve_then_stop() {
    let (_dir, socket) = temp_socket();
    let mut child = gosp_server()
        .args(["serve", "--idle-timeout-secs", "0", "--socket"])
        .arg(&socket)
        .stdout(Stdio::null())
        .spawn()
        .expect("spawn gosp-server");
    assert!(wait_for(&socket, true, Duration::from_secs(10)));

    let output = gosp_server()
        .args(["stop", "--socket"])
        .arg(&socket)
        .output()
        .expect("run gosp-server stop");
    assert!(output.status.success());
    let pid: u32 = String::from_utf8(output.stdout).unwrap().trim().parse().unwrap();
    assert_eq!(pid, child.id());

    assert!(child.wait().unwrap().success());
    assert!(!socket.exists());
}

#[test]
fn test_idle_timeout_exits_and_removes_socket() {
    let (_dir, socket) = temp_socket();
    let started = Instant::now();
    let mut child = gosp_server()
        .args(["serve", "--idle-timeout-secs", "1", "--socket"])
        .arg(&socket)
        .spawn()
        .expect("spawn gosp-server");
    assert!(wait_for(&socket, true, Duration::from_secs(10)));

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        assert!(Instant::now() < deadline, "server did not exit on idle timeout");
        std::thread::sleep(Duration::from_millis(20));
    };
    assert!(status.success());
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(!socket.exists());
}

#[cfg(unix)]
#[test]
fn test_sigterm_stops_server_gracefully() {
    let (_dir, socket) = temp_socket();
    let mut child = gosp_server()
        .args(["serve", "--idle-timeout-secs", "0", "--socket"])
        .arg(&socket)
        .spawn()
        .expect("spawn gosp-server");
    assert!(wait_for(&socket, true, Duration::from_secs(10)));

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("run kill");
    assert!(killed.success());

    assert!(child.wait().unwrap().success());
    assert!(!socket.exists());
}
