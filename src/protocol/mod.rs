//! # Metadata Protocol
//!
//! A page talks to the web server over two logical channels multiplexed onto
//! one byte stream:
//!
//! ```text
//! mime-type text/html
//! keep-alive
//! header-field false Set-Cookie id=42
//! http-status 200
//! end-header
//! <html>...body bytes...
//! ```
//!
//! Metadata lines are forwarded as the page produces them so heartbeats reach
//! the web server while the page is still running. The body is buffered and
//! only sent after `end-header`, and only when the final status is 200.
//!
//! - [`entry`] - metadata records and the stream renderer
//! - [`queue`] - bounded hand-off between page and renderer
//! - [`response`] - parser for the peer side of the stream

pub mod entry;
pub mod queue;
pub mod response;

pub use entry::{
    MetadataEntry, RenderSummary, StreamRenderer, DEFAULT_STATUS, END_HEADER, FAULT_STATUS,
};
pub use queue::{channel, MetaReceiver, MetaSender, QueueClosed, DEFAULT_CAPACITY};
pub use response::RenderedResponse;
