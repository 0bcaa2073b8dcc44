use super::listener::Shared;
use crate::ids::ConnectionId;
use crate::request::{Inbound, Request};
use crate::runtime_config::millis;
use may::os::unix::net::UnixStream;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Serve one accepted connection: decode, then shut down or render
///
/// Nothing is ever written back for a request that fails to decode; the
/// connection is simply closed.
pub(crate) fn handle_connection(id: ConnectionId, mut stream: UnixStream, shared: &Shared) {
    let started = Instant::now();
    debug!(connection_id = %id, "Connection start");

    if let Err(e) = stream.set_read_timeout(Some(shared.read_timeout)) {
        warn!(connection_id = %id, error = %e, "Cannot set read deadline, dropping connection");
        return;
    }

    let request = match Request::decode(&mut stream) {
        Ok(request) => request,
        Err(e) if e.is_timeout() => {
            warn!(
                connection_id = %id,
                timeout_ms = millis(shared.read_timeout),
                "Request read timed out, dropping connection"
            );
            return;
        }
        Err(e) => {
            warn!(connection_id = %id, error = %e, "Dropping connection");
            return;
        }
    };

    match Inbound::from(request) {
        Inbound::Shutdown => {
            let pid = std::process::id();
            info!(connection_id = %id, pid, "Shutdown message received");
            if let Err(e) = writeln!(stream, "gosp-pid {pid}").and_then(|()| stream.flush()) {
                warn!(connection_id = %id, error = %e, "Failed to acknowledge shutdown");
            }
            drop(stream);
            shared.shutdown.request_stop();
        }
        Inbound::Render(request) => {
            let request: Arc<Request> = Arc::from(request);
            info!(
                connection_id = %id,
                method = %request.method,
                uri = %request.uri,
                filename = %request.filename,
                "Render request"
            );
            match shared.supervisor.render(Some(request), &mut stream) {
                Ok(outcome) => {
                    if let Some(fault) = &outcome.fault {
                        error!(connection_id = %id, error = %fault, "Page generation fault");
                    }
                    debug!(
                        connection_id = %id,
                        status = outcome.status,
                        elapsed_ms = millis(started.elapsed()),
                        "Connection complete"
                    );
                }
                Err(e) => {
                    warn!(connection_id = %id, error = %e, "Response stream failed");
                }
            }
        }
    }
}
