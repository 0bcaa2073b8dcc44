//! # Connection Server
//!
//! Accepts connections on a Unix socket and serves one request per
//! connection on its own coroutine.
//!
//! ## Lifecycle
//!
//! ```text
//! bind ─► Listening ─► accept ─► stop flag? ──yes──► Draining ─► Stopped
//!            ▲                      │no
//!            │                reset idle timer
//!            └──── spawn connection coroutine
//! ```
//!
//! - **Bind** removes a stale socket file, then binds. Any other bind
//!   failure is returned.
//! - **Per connection** the request is read under a deadline and decoded. A
//!   malformed request closes the connection with no response. A shutdown
//!   message is answered with `gosp-pid <pid>` and raises the stop flag.
//!   Anything else is rendered by the [`crate::supervisor::Supervisor`].
//! - **Draining** waits for every dispatched connection, then removes the
//!   socket file.
//!
//! An accept failure also drains and removes the socket, then returns the
//! error.
//!
//! ## Single-shot mode
//!
//! [`render_file`] and [`render_once`] run the supervisor once without any
//! socket, for web servers that spawn one process per request.
//!
//! ## Example
//!
//! ```no_run
//! use gosp_runtime::runtime_config::ServerConfig;
//! use gosp_runtime::server::Server;
//! use gosp_runtime::EchoPage;
//!
//! let server = Server::bind(ServerConfig::from_env("/run/gosp/index.sock"), EchoPage)?;
//! server.run()?;
//! # Ok::<(), gosp_runtime::GospError>(())
//! ```

mod connection;
mod in_flight;
mod listener;
mod single_shot;

pub use listener::{Server, ServerHandle};
pub use single_shot::{render_file, render_once};
