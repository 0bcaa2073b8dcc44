//! # Client
//!
//! The web server's side of the socket protocol. Front-end modules (and
//! tests) use it to hand a request to a page server and read back the
//! metadata and body, or to ask a server to shut down.
//!
//! ```no_run
//! use gosp_runtime::{Client, Request};
//!
//! let client = Client::new("/run/gosp/index.sock");
//! let response = client.render(&Request {
//!     uri: "/index.gosp".into(),
//!     method: "GET".into(),
//!     ..Request::default()
//! })?;
//! if response.is_ok() {
//!     print!("{}", response.body_text());
//! }
//! # Ok::<(), gosp_runtime::GospError>(())
//! ```

use crate::error::{GospError, Result};
use crate::protocol::RenderedResponse;
use crate::request::Request;
use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default deadline for reading a response
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connects to a page server socket, one connection per call
#[derive(Debug, Clone)]
pub struct Client {
    socket_path: PathBuf,
    timeout: Option<Duration>,
}

impl Client {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: Some(DEFAULT_CLIENT_TIMEOUT),
        }
    }

    /// Set the read deadline; `None` waits forever
    ///
    /// Slow pages send `keep-alive` entries, but those only help a client
    /// that resets its own deadline per line. This client reads the whole
    /// response under one deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send a request and read the full response
    ///
    /// # Errors
    ///
    /// - [`GospError::Transport`] on connect, write or read failure
    /// - [`GospError::Protocol`] if the server closed the connection without a
    ///   well-formed response (e.g. it rejected the request)
    pub fn render(&self, request: &Request) -> Result<RenderedResponse> {
        let mut stream = self.connect()?;
        request.encode(&mut stream)?;
        let raw = read_all(&mut stream)?;
        RenderedResponse::parse(&raw)
    }

    /// Ask the server to shut down and return its process id
    ///
    /// # Errors
    ///
    /// - [`GospError::Transport`] on connect, write or read failure
    /// - [`GospError::Protocol`] if the reply is not `gosp-pid <pid>`
    pub fn shutdown(&self) -> Result<u32> {
        let mut stream = self.connect()?;
        Request::shutdown().encode(&mut stream)?;
        let raw = read_all(&mut stream)?;
        let reply = String::from_utf8_lossy(&raw);
        reply
            .trim_end()
            .strip_prefix("gosp-pid ")
            .and_then(|pid| pid.parse().ok())
            .ok_or_else(|| GospError::Protocol(format!("unexpected shutdown reply {reply:?}")))
    }

    /// Send raw bytes, close the write half and return whatever comes back
    ///
    /// # Errors
    ///
    /// Returns [`GospError::Transport`] on connect, write or read failure.
    pub fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut stream = self.connect()?;
        stream
            .write_all(payload)
            .and_then(|()| stream.shutdown(Shutdown::Write))
            .map_err(|e| GospError::transport("write", e))?;
        read_all(&mut stream)
    }

    fn connect(&self) -> Result<UnixStream> {
        let stream =
            UnixStream::connect(&self.socket_path).map_err(|e| GospError::transport("connect", e))?;
        stream
            .set_read_timeout(self.timeout)
            .map_err(|e| GospError::transport("set read timeout", e))?;
        Ok(stream)
    }
}

fn read_all(stream: &mut UnixStream) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .map_err(|e| GospError::transport("read", e))?;
    Ok(raw)
}
