use super::connection::handle_connection;
use super::in_flight::InFlight;
use crate::error::{GospError, Result};
use crate::ids::ConnectionId;
use crate::lifecycle::{exit_on_expiry, remove_socket_file, ExpiryAction, KillClock, ShutdownHandle};
use crate::runtime_config::{millis, ServerConfig};
use crate::supervisor::{Page, Supervisor};
use may::coroutine::{self, JoinHandle};
use may::os::unix::net::UnixListener;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// State shared by every connection coroutine of one server
pub(crate) struct Shared {
    pub(crate) supervisor: Supervisor,
    pub(crate) shutdown: ShutdownHandle,
    pub(crate) read_timeout: Duration,
}

/// Removes the socket file when the server goes away, including on unwind
struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        remove_socket_file(&self.path);
    }
}

/// A page server bound to a Unix socket
///
/// Binding and running are separate steps so callers can grab a
/// [`ShutdownHandle`] or install an expiry hook before serving starts.
pub struct Server {
    listener: UnixListener,
    socket: SocketGuard,
    shared: Arc<Shared>,
    idle_timeout: Duration,
    stack_size: usize,
    on_expiry: Option<ExpiryAction>,
}

impl Server {
    /// Bind the socket described by `config` and prepare to serve `page`
    ///
    /// A stale socket file left by an earlier process is removed first.
    ///
    /// # Errors
    ///
    /// Returns [`GospError::Transport`] if the path cannot be resolved or
    /// the socket cannot be bound.
    pub fn bind<P: Page>(config: ServerConfig, page: P) -> Result<Self> {
        let path = absolute_path(&config.socket_path)
            .map_err(|e| GospError::transport("resolve socket path", e))?;
        remove_socket_file(&path);
        let listener = UnixListener::bind(&path).map_err(|e| GospError::transport("bind", e))?;
        info!(
            socket = %path.display(),
            idle_timeout_secs = config.idle_timeout.as_secs(),
            read_timeout_ms = millis(config.read_timeout),
            stack_size = config.stack_size,
            "Listening"
        );

        let supervisor = Supervisor::new(page)
            .with_stack_size(config.stack_size)
            .with_metadata_capacity(config.metadata_capacity);
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                supervisor,
                shutdown: ShutdownHandle::new(path.clone()),
                read_timeout: config.read_timeout,
            }),
            socket: SocketGuard { path },
            idle_timeout: config.idle_timeout,
            stack_size: config.stack_size,
            on_expiry: None,
        })
    }

    /// Absolute path of the bound socket
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket.path
    }

    /// Handle for stopping this server gracefully
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shared.shutdown.clone()
    }

    /// Replace what happens when the idle timeout expires
    ///
    /// The default removes the socket file and exits the process. A custom
    /// hook is responsible for any cleanup it wants.
    #[must_use]
    pub fn on_idle_expiry(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_expiry = Some(Box::new(hook));
        self
    }

    /// Serve connections until stopped
    ///
    /// Returns once a stop was requested and every accepted connection has
    /// finished. The socket file is gone by then.
    ///
    /// # Errors
    ///
    /// Returns [`GospError::Transport`] if accepting a connection fails. In
    /// that case in-flight connections are still drained first.
    pub fn run(self) -> Result<()> {
        let Server {
            listener,
            socket,
            shared,
            idle_timeout,
            stack_size,
            on_expiry,
        } = self;

        let expiry = on_expiry.unwrap_or_else(|| exit_on_expiry(socket.path.clone()));
        let clock = KillClock::arm(idle_timeout, expiry)
            .map_err(|e| GospError::transport("start idle timer", e))?;
        let in_flight = InFlight::new();

        let result = loop {
            let stream = match listener.accept() {
                Ok((stream, _)) => stream,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "Accept failed, shutting down");
                    break Err(GospError::transport("accept", e));
                }
            };
            if shared.shutdown.is_stop_requested() {
                // This is the wake-up connection from ShutdownHandle::request_stop.
                debug!("Stop flag set, leaving accept loop");
                break Ok(());
            }
            if let Some(clock) = &clock {
                clock.reset();
            }

            let id = ConnectionId::new();
            let guard = in_flight.enter();
            let conn_shared = Arc::clone(&shared);
            // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
            // The closure owns the stream, an Arc of the shared state and the
            // in-flight guard; nothing borrowed from this stack frame escapes.
            let spawned = unsafe {
                coroutine::Builder::new()
                    .name(format!("gosp-conn-{id}"))
                    .stack_size(stack_size)
                    .spawn(move || {
                        let _guard = guard;
                        handle_connection(id, stream, &conn_shared);
                    })
            };
            if let Err(e) = spawned {
                // The closure, and with it the stream and guard, is dropped here.
                error!(connection_id = %id, error = %e, "Failed to spawn connection coroutine");
            }
        };

        drop(clock);
        info!(in_flight = in_flight.count(), "Draining connections");
        in_flight.wait();
        drop(listener);
        drop(socket);
        info!("Server stopped");
        result
    }

    /// Run the server on its own coroutine
    ///
    /// # Errors
    ///
    /// Fails if the coroutine cannot be spawned.
    pub fn start(self) -> Result<ServerHandle> {
        let socket_path = self.socket.path.clone();
        let shutdown = self.shutdown_handle();
        let stack_size = self.stack_size;
        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The server is moved into the coroutine whole.
        let handle = unsafe {
            coroutine::Builder::new()
                .name("gosp-accept".to_string())
                .stack_size(stack_size)
                .spawn(move || self.run())
        }
        .map_err(|e| GospError::transport("spawn accept loop", e))?;
        Ok(ServerHandle {
            socket_path,
            shutdown,
            handle,
        })
    }
}

/// Handle to a server running on its own coroutine
pub struct ServerHandle {
    socket_path: PathBuf,
    shutdown: ShutdownHandle,
    handle: JoinHandle<Result<()>>,
}

impl ServerHandle {
    /// Absolute path of the server socket
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Handle for stopping the server
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Stop the server gracefully and wait for it to drain
    ///
    /// # Errors
    ///
    /// Returns the server's own error, if it failed before the stop.
    pub fn stop(self) -> Result<()> {
        self.shutdown.request_stop();
        self.join()
    }

    /// Wait for the server to return
    ///
    /// # Errors
    ///
    /// Returns the server's error, or a transport error if the accept loop
    /// panicked.
    pub fn join(self) -> Result<()> {
        self.handle.join().unwrap_or_else(|_| {
            warn!("Accept loop panicked");
            Err(GospError::transport(
                "accept",
                io::Error::other("accept loop panicked"),
            ))
        })
    }
}

fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
