use crate::error::{GospError, Result};
use crate::request::Request;
use crate::supervisor::{RenderOutcome, Supervisor};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Render one page for the request stored in a JSON file
///
/// Used when the web server runs the page as a short-lived process instead
/// of talking to a persistent server. An `ExitNow` flag in the file has no
/// meaning here and is ignored.
///
/// # Errors
///
/// - [`GospError::Transport`] if the file cannot be opened or `sink` fails
/// - [`GospError::MalformedRequest`] if the file is not a valid request
pub fn render_file<W: Write>(supervisor: &Supervisor, path: &Path, sink: W) -> Result<RenderOutcome> {
    let file = File::open(path).map_err(|e| GospError::transport("open request file", e))?;
    let request = Request::decode(file)?;
    if request.is_control() {
        debug!("Ignoring ExitNow in single-shot mode");
    }
    info!(
        request_file = %path.display(),
        uri = %request.uri,
        "Single-shot render"
    );
    supervisor.render(Some(Arc::new(request)), sink)
}

/// Render one page with no request at all
///
/// # Errors
///
/// Returns [`GospError::Transport`] if writing to `sink` fails.
pub fn render_once<W: Write>(supervisor: &Supervisor, sink: W) -> Result<RenderOutcome> {
    info!("Single-shot render without a request");
    supervisor.render(None, sink)
}
