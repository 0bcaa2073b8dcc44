use super::page::{Page, PageContext};
use crate::error::{GospError, Result};
use crate::protocol::{self, MetaSender, MetadataEntry, StreamRenderer, FAULT_STATUS};
use crate::request::Request;
use crate::runtime_config::{millis, DEFAULT_STACK_SIZE};
use may::coroutine;
use std::any::Any;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of one supervised page invocation
#[derive(Debug)]
pub struct RenderOutcome {
    /// Final HTTP status sent to the peer
    pub status: u16,
    /// Metadata entries written, including a synthesized 500
    pub entries: usize,
    /// Size of the body the page produced
    pub body_bytes: usize,
    /// Whether the body followed the sentinel
    pub body_forwarded: bool,
    /// The fault that forced a 500, if any
    pub fault: Option<GospError>,
}

/// Runs page invocations with fault isolation
///
/// Each call to [`Supervisor::render`] spawns the page on its own coroutine
/// and streams its metadata to the sink while it runs. The supervisor is
/// cheap to share; the server keeps one behind an `Arc`.
pub struct Supervisor {
    page: Arc<dyn Page>,
    stack_size: usize,
    metadata_capacity: usize,
}

impl Supervisor {
    /// Supervise `page` with default stack size and queue capacity
    pub fn new<P: Page>(page: P) -> Self {
        Self::from_arc(Arc::new(page))
    }

    /// Supervise an already shared page
    pub fn from_arc(page: Arc<dyn Page>) -> Self {
        Self {
            page,
            stack_size: DEFAULT_STACK_SIZE,
            metadata_capacity: protocol::DEFAULT_CAPACITY,
        }
    }

    /// Set the page coroutine stack size
    #[must_use]
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Set the metadata queue capacity
    #[must_use]
    pub fn with_metadata_capacity(mut self, capacity: usize) -> Self {
        self.metadata_capacity = capacity;
        self
    }

    /// Run the page once and write the response stream to `sink`
    ///
    /// Page faults never surface as `Err`: they become a final
    /// `http-status 500` and are reported in [`RenderOutcome::fault`].
    ///
    /// # Errors
    ///
    /// Returns [`GospError::Transport`] if writing to `sink` fails. The page
    /// still runs to completion first.
    pub fn render<W: Write>(&self, request: Option<Arc<Request>>, sink: W) -> Result<RenderOutcome> {
        let started = Instant::now();
        let (tx, rx) = protocol::channel(self.metadata_capacity);
        let mut renderer = StreamRenderer::new(sink);

        let page = Arc::clone(&self.page);
        let page_request = request.clone();
        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The closure owns everything it touches (Arc'd page and request, the
        // queue sender) and never uses thread-local storage directly.
        let spawned = unsafe {
            coroutine::Builder::new()
                .name("gosp-page".to_string())
                .stack_size(self.stack_size)
                .spawn(move || run_page(page.as_ref(), page_request, tx))
        };

        let (body, fault) = match spawned {
            Ok(handle) => {
                for entry in rx.iter() {
                    renderer.entry(&entry);
                }
                match handle.join() {
                    Ok(result) => result,
                    Err(panic) => {
                        // run_page catches page panics; this is a panic in the runtime itself.
                        renderer.entry(&MetadataEntry::HttpStatus(FAULT_STATUS));
                        let message = panic_message(panic.as_ref());
                        (Vec::new(), Some(GospError::GenerationFault { message }))
                    }
                }
            }
            Err(e) => {
                error!(
                    error = %e,
                    stack_size = self.stack_size,
                    "Failed to spawn page coroutine - CRITICAL"
                );
                renderer.entry(&MetadataEntry::HttpStatus(FAULT_STATUS));
                let fault = GospError::GenerationFault {
                    message: format!("cannot spawn page coroutine: {e}"),
                };
                (Vec::new(), Some(fault))
            }
        };

        let summary = renderer
            .finish(&body)
            .map_err(|e| GospError::transport("write", e))?;

        info!(
            uri = request.as_deref().map_or("", |r| r.uri.as_str()),
            status = summary.status,
            entries = summary.entries,
            body_bytes = summary.body_bytes,
            body_forwarded = summary.body_forwarded,
            elapsed_ms = millis(started.elapsed()),
            "Page rendered"
        );

        Ok(RenderOutcome {
            status: summary.status,
            entries: summary.entries,
            body_bytes: summary.body_bytes,
            body_forwarded: summary.body_forwarded,
            fault,
        })
    }
}

/// Body of the page coroutine
///
/// The sender is owned by the context and dropped when this returns, on
/// every path, which closes the queue for the renderer.
fn run_page(
    page: &dyn Page,
    request: Option<Arc<Request>>,
    meta: MetaSender,
) -> (Vec<u8>, Option<GospError>) {
    let mut ctx = PageContext::new(request, meta);

    let fault = match enter_page_dir(ctx.request()) {
        Err(e) => Some(e),
        Ok(()) => match catch_unwind(AssertUnwindSafe(|| page.render(&mut ctx))) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(GospError::GenerationFault {
                message: format!("{e:#}"),
            }),
            Err(panic) => Some(GospError::GenerationFault {
                message: panic_message(panic.as_ref()),
            }),
        },
    };

    if let Some(fault) = &fault {
        warn!(error = %fault, "Page generation fault, reporting 500");
        ctx.emit(MetadataEntry::HttpStatus(FAULT_STATUS));
    }
    (ctx.into_body(), fault)
}

/// Change to the directory holding the page so relative paths resolve
///
/// The working directory is process-wide: with concurrent requests for pages
/// in different directories the last change wins.
fn enter_page_dir(request: Option<&Request>) -> Result<()> {
    let Some(dir) = request.and_then(Request::page_dir) else {
        return Ok(());
    };
    debug!(dir = %dir.display(), "Entering page directory");
    std::env::set_current_dir(&dir).map_err(|source| GospError::WorkingDirectory { dir, source })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "page panicked".to_string()
    }
}
