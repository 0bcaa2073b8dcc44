//! # Gosp Runtime
//!
//! **Gosp Runtime** is the server side of Gosp pages: it receives a
//! description of one HTTP request from a front-end web server, runs the
//! page logic for it and streams back an ordered list of response metadata
//! followed by the page body.
//!
//! ## Overview
//!
//! A page is any type implementing [`Page`]. The runtime can host it two
//! ways:
//!
//! - **Persistent server** - [`server::Server`] listens on a Unix socket and
//!   renders one request per connection, each on its own `may` coroutine.
//!   The server exits after an idle period or when asked to stop.
//! - **Single shot** - [`server::render_file`] and [`server::render_once`]
//!   render once to standard output for web servers that spawn a process per
//!   request.
//!
//! ## Architecture
//!
//! - **[`request`]** - the request message and its JSON wire form
//! - **[`protocol`]** - metadata entries, the bounded hand-off queue and the
//!   response stream format
//! - **[`supervisor`]** - runs a page with fault isolation and renders its
//!   output
//! - **[`server`]** - socket server, connection handling and single-shot mode
//! - **[`lifecycle`]** - idle timeout and graceful shutdown
//! - **[`client`]** - the web server's side of the socket protocol
//! - **[`cli`]** - the `gosp-server` command line
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Web as Web server
//!     participant Accept as Accept loop
//!     participant Conn as Connection<br/>(coroutine)
//!     participant Sup as Supervisor
//!     participant Page as Page<br/>(coroutine)
//!
//!     Web->>Accept: connect(socket)
//!     Accept->>Accept: stop flag set? reset idle timer
//!     Accept->>Conn: spawn
//!     Web->>Conn: {"Uri": "/index.gosp", ...}
//!     Conn->>Conn: decode under read deadline
//!
//!     alt Malformed request
//!         Conn-->>Web: close, no bytes
//!     end
//!
//!     alt ExitNow
//!         Conn-->>Web: gosp-pid 1234
//!         Conn->>Accept: raise stop flag, self-dial
//!     end
//!
//!     Conn->>Sup: render(request, connection)
//!     Sup->>Page: spawn with body buffer + queue
//!     Page->>Sup: mime-type text/html
//!     Sup-->>Web: mime-type text/html
//!     Page->>Sup: keep-alive
//!     Sup-->>Web: keep-alive
//!
//!     alt Page panics or returns Err
//!         Page->>Sup: http-status 500
//!         Sup-->>Web: http-status 500
//!     end
//!
//!     Page->>Sup: queue closed, body
//!     Sup-->>Web: end-header
//!     Sup-->>Web: body (only if status is 200)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use gosp_runtime::runtime_config::ServerConfig;
//! use gosp_runtime::server::Server;
//! use gosp_runtime::PageContext;
//! use std::io::Write;
//!
//! let page = |ctx: &mut PageContext| -> anyhow::Result<()> {
//!     ctx.set_mime_type("text/plain");
//!     let uri = ctx.request().map(|r| r.uri.clone()).unwrap_or_default();
//!     write!(ctx, "you asked for {uri}")?;
//!     Ok(())
//! };
//!
//! Server::bind(ServerConfig::from_env("/run/gosp/hello.sock"), page)?.run()?;
//! # Ok::<(), gosp_runtime::GospError>(())
//! ```
//!
//! ## Runtime Considerations
//!
//! The runtime uses the `may` coroutine runtime, not tokio or async-std:
//!
//! - Pages run in coroutines; blocking std I/O inside a page blocks a worker
//!   thread
//! - Stack size is configurable via the `GOSP_STACK_SIZE` environment variable
//! - Fault isolation relies on unwinding; do not build with `panic = "abort"`
//! - Before a page runs, the process working directory is changed to the
//!   page's directory. Concurrent pages in different directories race on it;
//!   use [`Request::page_dir`] when that matters

pub mod cli;
pub mod client;
mod echo;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod logging;
pub mod protocol;
pub mod request;
pub mod runtime_config;
pub mod server;
pub mod supervisor;

pub use client::Client;
pub use echo::EchoPage;
pub use error::{GospError, Result};
pub use protocol::{MetadataEntry, RenderedResponse};
pub use request::{Inbound, Request};
pub use supervisor::{Page, PageContext, RenderOutcome, Supervisor};
