//! # CLI Module
//!
//! Command-line entry point shared by the `gosp-server` binary and by
//! generated page crates.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Run a persistent page server on a Unix socket:
//!
//! ```bash
//! gosp-server serve --socket /run/gosp/index.sock --idle-timeout-secs 600
//! ```
//!
//! Options:
//! - `--socket <PATH>` - Socket to create (or `GOSP_SOCKET`)
//! - `--idle-timeout-secs <N>` - Exit after N idle seconds, 0 = never
//! - `--read-timeout-ms <N>` - Request read deadline
//!
//! SIGTERM and SIGINT stop the server gracefully.
//!
//! ### `render`
//!
//! Render once to standard output, for web servers that spawn one process
//! per request:
//!
//! ```bash
//! gosp-server render --file request.json
//! gosp-server            # same as `render` with no request
//! ```
//!
//! ### `stop`
//!
//! Shut down a running server and print its process id:
//!
//! ```bash
//! gosp-server stop --socket /run/gosp/index.sock
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use gosp_runtime::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse(), MyPage)?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, Cli, Commands};
