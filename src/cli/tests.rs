//! Unit tests for CLI parsing and single-shot rendering

use crate::cli::{run_cli, Cli, Commands};
use crate::supervisor::PageContext;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn test_no_subcommand_means_render_without_request() {
    let cli = Cli::try_parse_from(["gosp-server"]).unwrap();
    assert_eq!(cli.command, None);
}

#[test]
fn test_serve_with_overrides() {
    let cli = Cli::try_parse_from([
        "gosp-server",
        "serve",
        "--socket",
        "/tmp/page.sock",
        "--idle-timeout-secs",
        "0",
        "--read-timeout-ms",
        "250",
    ])
    .unwrap();

    assert_eq!(
        cli.command,
        Some(Commands::Serve {
            socket: PathBuf::from("/tmp/page.sock"),
            idle_timeout_secs: Some(0),
            read_timeout_ms: Some(250),
        })
    );
}

#[test]
fn test_render_file_short_flag() {
    let cli = Cli::try_parse_from(["gosp-server", "render", "-f", "req.json"]).unwrap();
    match cli.command {
        Some(Commands::Render { file }) => assert_eq!(file, Some(PathBuf::from("req.json"))),
        other => panic!("Expected Render command, got {other:?}"),
    }
}

#[test]
fn test_stop_command() {
    let cli = Cli::try_parse_from(["gosp-server", "stop", "-s", "page.sock"]).unwrap();
    assert_eq!(
        cli.command,
        Some(Commands::Stop {
            socket: PathBuf::from("page.sock"),
        })
    );
}

#[test]
fn test_rejects_bad_timeout() {
    assert!(Cli::try_parse_from([
        "gosp-server",
        "serve",
        "--socket",
        "x.sock",
        "--idle-timeout-secs",
        "soon",
    ])
    .is_err());
}

#[test]
fn test_single_shot_page_may_print_to_stdout() {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let cli = Cli {
            command: Some(Commands::Render { file: None }),
        };
        let page = |_: &mut PageContext| -> anyhow::Result<()> {
            println!("debug output from the page");
            Ok(())
        };
        tx.send(run_cli(cli, page).is_ok()).unwrap();
    });
    let finished = rx
        .recv_timeout(Duration::from_secs(20))
        .expect("render blocked while the page wrote to stdout");
    assert!(finished);
}
