use crate::protocol::{MetaSender, MetadataEntry};
use crate::request::Request;
use http::StatusCode;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Page logic invoked once per request
///
/// Implementations write the body through [`PageContext`] (it implements
/// [`io::Write`]) and emit metadata with its `set_*` methods. Returning `Err`
/// or panicking turns the response into a 500.
///
/// Closures of the right shape are pages too:
///
/// ```rust
/// use gosp_runtime::supervisor::PageContext;
/// use std::io::Write;
///
/// let page = |ctx: &mut PageContext| -> anyhow::Result<()> {
///     ctx.set_mime_type("text/plain");
///     write!(ctx, "hello")?;
///     Ok(())
/// };
/// # let _ = gosp_runtime::supervisor::Supervisor::new(page);
/// ```
pub trait Page: Send + Sync + 'static {
    /// Generate the page for the request held by `ctx`
    ///
    /// # Errors
    ///
    /// Any error is reported to the web server as status 500.
    fn render(&self, ctx: &mut PageContext) -> anyhow::Result<()>;
}

impl<F> Page for F
where
    F: Fn(&mut PageContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn render(&self, ctx: &mut PageContext) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// Everything one page invocation can touch
///
/// Holds the request, the private body buffer and the producer half of the
/// metadata queue. Metadata calls may block briefly when the queue is full.
pub struct PageContext {
    request: Option<Arc<Request>>,
    body: Vec<u8>,
    meta: MetaSender,
    closed: bool,
}

impl PageContext {
    pub(crate) fn new(request: Option<Arc<Request>>, meta: MetaSender) -> Self {
        Self {
            request,
            body: Vec::new(),
            meta,
            closed: false,
        }
    }

    /// The request being served, or `None` when rendering without one
    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    /// Body written so far
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Set the HTTP status code; the last call wins
    pub fn set_http_status(&mut self, code: u16) {
        self.emit(MetadataEntry::HttpStatus(code));
    }

    /// Set the HTTP status from a typed status code
    pub fn set_status_code(&mut self, status: StatusCode) {
        self.set_http_status(status.as_u16());
    }

    /// Set the MIME type of the body
    pub fn set_mime_type(&mut self, mime_type: impl Into<String>) {
        self.emit(MetadataEntry::MimeType(mime_type.into()));
    }

    /// Set or append an HTTP header field
    ///
    /// With `replace` the web server overwrites earlier values of `name`;
    /// without it the value is added alongside them (e.g. `Set-Cookie`).
    pub fn set_header_field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        replace: bool,
    ) {
        self.emit(MetadataEntry::HeaderField {
            replace,
            name: name.into(),
            value: value.into(),
        });
    }

    /// Tell the web server that a slow page is still working
    pub fn heartbeat(&mut self) {
        self.emit(MetadataEntry::KeepAlive);
    }

    /// Ask the web server to log a message
    pub fn debug_message(&mut self, message: impl Into<String>) {
        self.emit(MetadataEntry::DebugMessage(message.into()));
    }

    pub(crate) fn emit(&mut self, entry: MetadataEntry) {
        if self.closed {
            return;
        }
        if let Err(rejected) = self.meta.send(entry) {
            // Only happens when the renderer is gone; nothing else will be read.
            debug!(key = rejected.0.key(), "metadata receiver closed, dropping entry");
            self.closed = true;
        }
    }

    /// Drop the metadata sender and hand back the body
    pub(crate) fn into_body(self) -> Vec<u8> {
        self.body
    }
}

impl Write for PageContext {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
