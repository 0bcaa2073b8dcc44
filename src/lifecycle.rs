//! # Lifecycle Manager
//!
//! Decides when a page server stops.
//!
//! - [`KillClock`] terminates an idle server: once no connection has been
//!   accepted for the configured duration it removes the socket file and
//!   exits the process without draining.
//! - [`ShutdownHandle`] stops a server gracefully: it raises the stop flag and
//!   wakes the accept loop, which then drains in-flight connections.
//!
//! The control message, SIGTERM/SIGINT (see [`install_signal_handlers`]) and
//! embedding code all go through [`ShutdownHandle::request_stop`].

use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What the kill clock does when it fires
pub type ExpiryAction = Box<dyn FnOnce() + Send + 'static>;

struct ClockState {
    deadline: Instant,
    disarmed: bool,
}

struct ClockShared {
    state: Mutex<ClockState>,
    wake: Condvar,
    idle: Duration,
}

/// Idle-timeout timer for a server
///
/// The timer thread sleeps until the current deadline and re-checks it on
/// every wake, so [`KillClock::reset`] only has to move the deadline. A reset
/// racing with expiry either lands before the check (and the clock sleeps
/// again) or after it (and the action has already been taken); it never fires
/// twice. Dropping the clock disarms it.
pub struct KillClock {
    shared: Arc<ClockShared>,
}

impl KillClock {
    /// Start a clock that runs `on_expiry` after `idle` without a reset
    ///
    /// Returns `Ok(None)` when `idle` is zero, which disables auto-shutdown.
    ///
    /// # Errors
    ///
    /// Fails if the timer thread cannot be spawned.
    pub fn arm(idle: Duration, on_expiry: ExpiryAction) -> std::io::Result<Option<Self>> {
        if idle.is_zero() {
            debug!("Idle timeout disabled");
            return Ok(None);
        }
        let shared = Arc::new(ClockShared {
            state: Mutex::new(ClockState {
                deadline: Instant::now() + idle,
                disarmed: false,
            }),
            wake: Condvar::new(),
            idle,
        });
        let timer = Arc::clone(&shared);
        thread::Builder::new()
            .name("gosp-kill-clock".to_string())
            .spawn(move || {
                if timer.wait_for_expiry() {
                    on_expiry();
                }
            })?;
        info!(idle_secs = idle.as_secs_f64(), "Idle timeout armed");
        Ok(Some(Self { shared }))
    }

    /// Push the deadline back to a full idle period from now
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.deadline = Instant::now() + self.shared.idle;
    }

    /// Stop the clock without firing
    pub fn disarm(&self) {
        self.shared.lock().disarmed = true;
        self.shared.wake.notify_all();
    }

    /// Configured idle period
    #[must_use]
    pub fn idle(&self) -> Duration {
        self.shared.idle
    }
}

impl Drop for KillClock {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl ClockShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the deadline passes (true) or the clock is disarmed (false)
    fn wait_for_expiry(&self) -> bool {
        let mut state = self.lock();
        loop {
            if state.disarmed {
                return false;
            }
            let now = Instant::now();
            if now >= state.deadline {
                // Nobody can reset or fire again once we leave holding the lock.
                state.disarmed = true;
                return true;
            }
            let wait = state.deadline - now;
            state = self
                .wake
                .wait_timeout(state, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Default idle expiry: remove the socket file and exit immediately
///
/// In-flight connections are not drained.
pub fn exit_on_expiry(socket_path: PathBuf) -> ExpiryAction {
    Box::new(move || {
        warn!(socket = %socket_path.display(), "Idle timeout expired, exiting");
        remove_socket_file(&socket_path);
        std::process::exit(0);
    })
}

/// Remove a socket file, ignoring a file that is already gone
pub fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(socket = %path.display(), "Socket file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(socket = %path.display(), error = %e, "Failed to remove socket file"),
    }
}

/// Graceful stop request for a running server
///
/// Cheap to clone; every clone controls the same server.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    socket_path: PathBuf,
}

impl ShutdownHandle {
    pub(crate) fn new(socket_path: PathBuf) -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            socket_path,
        }
    }

    /// Whether a stop has been requested
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Ask the server to stop accepting and drain
    ///
    /// The accept loop only looks at the stop flag after `accept` returns, so
    /// the handle dials the server's own socket to hand it one last
    /// connection. The loop sees the flag and exits without serving it.
    ///
    /// Returns `false` if a stop was already requested.
    pub fn request_stop(&self) -> bool {
        if self.stop.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!(socket = %self.socket_path.display(), "Shutdown requested");
        if let Err(e) = UnixStream::connect(&self.socket_path) {
            // The listener is already gone; nothing is parked in accept.
            debug!(error = %e, "Self-dial failed");
        }
        true
    }

    /// Socket this handle wakes
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

/// Route SIGTERM and SIGINT to a graceful stop
///
/// A second signal after the stop has begun is ignored; the drain completes
/// on its own.
///
/// # Errors
///
/// Fails if the handlers cannot be registered or the watcher thread cannot
/// be spawned.
#[cfg(unix)]
pub fn install_signal_handlers(handle: ShutdownHandle) -> std::io::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGTERM, SIGINT])?;
    thread::Builder::new()
        .name("gosp-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                info!(signal, "Signal received, stopping server");
                handle.request_stop();
            }
        })?;
    Ok(())
}
