//! # Runtime Configuration Module
//!
//! Environment variable based configuration for the page server.
//!
//! ## Environment Variables
//!
//! ### `GOSP_IDLE_TIMEOUT_SECS`
//!
//! Seconds without a new connection before the server removes its socket and
//! exits. `0` disables the idle timeout. Default: `300`.
//!
//! ### `GOSP_READ_TIMEOUT_MS`
//!
//! Deadline for reading the request message from a connection. Default:
//! `10000`.
//!
//! ### `GOSP_STACK_SIZE`
//!
//! Stack size for connection and page coroutines. Accepts values in:
//! - Decimal: `262144` (256 KB)
//! - Hexadecimal: `0x40000` (256 KB)
//!
//! Default: `0x40000` (256 KB)
//!
//! **Why this matters:**
//! - Page logic runs entirely on a coroutine stack
//! - Unwinding out of a panicking page needs headroom; a stack overflow
//!   aborts the whole process instead of producing a 500
//!
//! ### `GOSP_METADATA_CAPACITY`
//!
//! Entries buffered between a page and the renderer before the page blocks.
//! Default: `5`.
//!
//! ## Usage
//!
//! ```rust
//! use gosp_runtime::runtime_config::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::from_env("/tmp/page.sock")
//!     .with_idle_timeout(Duration::from_secs(60));
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use crate::protocol::DEFAULT_CAPACITY;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default idle timeout before auto-shutdown
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default deadline for reading a request
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default coroutine stack size in bytes
pub const DEFAULT_STACK_SIZE: usize = 0x40000;

/// Configuration for one page server.
///
/// Load this at startup with [`ServerConfig::from_env()`], then override
/// individual values with the `with_*` setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Unix socket path; made absolute at bind time
    pub socket_path: PathBuf,
    /// Idle time before auto-shutdown; zero disables it
    pub idle_timeout: Duration,
    /// Deadline for reading the request message
    pub read_timeout: Duration,
    /// Stack size for connection and page coroutines in bytes
    pub stack_size: usize,
    /// Capacity of the per-invocation metadata queue
    pub metadata_capacity: usize,
}

impl ServerConfig {
    /// Configuration with built-in defaults
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            stack_size: DEFAULT_STACK_SIZE,
            metadata_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env(socket_path: impl Into<PathBuf>) -> Self {
        let defaults = Self::new(socket_path);
        Self {
            idle_timeout: env_number("GOSP_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            read_timeout: env_number("GOSP_READ_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.read_timeout),
            stack_size: env::var("GOSP_STACK_SIZE")
                .ok()
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.stack_size),
            metadata_capacity: env::var("GOSP_METADATA_CAPACITY")
                .ok()
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.metadata_capacity),
            ..defaults
        }
    }

    /// Set the idle timeout (zero disables it)
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Set the request read deadline
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Set the coroutine stack size
    #[must_use]
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Set the metadata queue capacity (zero is treated as one)
    #[must_use]
    pub fn with_metadata_capacity(mut self, capacity: usize) -> Self {
        self.metadata_capacity = capacity;
        self
    }
}

fn env_number(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a decimal or `0x`-prefixed hexadecimal size
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}

/// Whole milliseconds in `duration` for log fields, saturating at `u64::MAX`
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
