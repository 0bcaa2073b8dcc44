//! # Generation Supervisor
//!
//! Runs one page invocation and turns it into a well-formed response stream,
//! no matter how the page behaves.
//!
//! ## Flow
//!
//! ```text
//! render(request, sink)
//!   ├─ spawn page coroutine ──► chdir(page dir) ─► Page::render(ctx)
//!   │                              │ metadata entries   │ body bytes
//!   │          bounded queue ◄─────┘                    ▼
//!   ├─ write each entry as it arrives            private buffer
//!   ├─ queue closed (sender dropped on every exit path)
//!   ├─ join page coroutine ◄── (body, fault)
//!   └─ end-header, then body iff final status is 200
//! ```
//!
//! ## Fault isolation
//!
//! A panic inside the page is caught at the coroutine boundary with
//! `catch_unwind`; an `Err` return is treated the same way. Either one
//! appends a final `http-status 500` entry, so the last status the web server
//! sees is 500 and the partial body is discarded. The serving process keeps
//! running.
//!
//! Fault isolation depends on unwinding; building with `panic = "abort"`
//! turns every page panic into a process abort.

mod core;
mod page;

pub use core::{RenderOutcome, Supervisor};
pub use page::{Page, PageContext};
