use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors produced by the page runtime
///
/// Every failure the runtime can observe falls in one of these buckets. Only
/// `Transport` failures at bind or accept time ever reach the caller of
/// [`crate::server::Server::run`]; the others are handled per connection.
#[derive(Debug)]
pub enum GospError {
    /// The request message was not valid JSON, had wrongly typed fields, or
    /// was cut short by the peer
    ///
    /// The connection is dropped without a response.
    MalformedRequest(serde_json::Error),
    /// The page logic panicked or returned an error
    ///
    /// Surfaced to the peer as a final `http-status 500` entry.
    GenerationFault {
        /// Panic payload or error text
        message: String,
    },
    /// The working directory could not be changed to the page's directory
    ///
    /// Handled exactly like a [`GospError::GenerationFault`].
    WorkingDirectory {
        /// Directory the page lives in
        dir: PathBuf,
        /// Underlying OS error
        source: io::Error,
    },
    /// Socket bind, accept, read or write failure
    Transport {
        /// Operation that failed (e.g. `"bind"`, `"accept"`)
        op: &'static str,
        /// Underlying OS error
        source: io::Error,
    },
    /// A response stream that does not follow the metadata protocol
    Protocol(String),
}

impl GospError {
    pub(crate) fn transport(op: &'static str, source: io::Error) -> Self {
        GospError::Transport { op, source }
    }

    /// Whether the peer should see a 500 status because of this error
    #[must_use]
    pub fn is_internal_fault(&self) -> bool {
        matches!(
            self,
            GospError::GenerationFault { .. } | GospError::WorkingDirectory { .. }
        )
    }

    /// Whether a transport failure was a read deadline expiring
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            GospError::Transport { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

impl fmt::Display for GospError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GospError::MalformedRequest(e) => write!(f, "malformed request: {e}"),
            GospError::GenerationFault { message } => {
                write!(f, "page generation failed: {message}")
            }
            GospError::WorkingDirectory { dir, source } => write!(
                f,
                "cannot change working directory to {}: {source}",
                dir.display()
            ),
            GospError::Transport { op, source } => write!(f, "socket {op} failed: {source}"),
            GospError::Protocol(msg) => write!(f, "protocol violation: {msg}"),
        }
    }
}

impl std::error::Error for GospError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GospError::MalformedRequest(e) => Some(e),
            GospError::WorkingDirectory { source, .. } | GospError::Transport { source, .. } => {
                Some(source)
            }
            GospError::GenerationFault { .. } | GospError::Protocol(_) => None,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GospError>;
