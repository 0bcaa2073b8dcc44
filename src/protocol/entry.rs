use crate::error::{GospError, Result};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use tracing::warn;

/// Line that separates metadata from the body
pub const END_HEADER: &str = "end-header";

/// Status assumed when the page never sets one (200 OK)
pub const DEFAULT_STATUS: u16 = 200;

/// Status synthesized when page generation faults (500 Internal Server Error)
pub const FAULT_STATUS: u16 = 500;

/// One record of the out-of-band metadata channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataEntry {
    /// `http-status <code>`
    HttpStatus(u16),
    /// `mime-type <type>`
    MimeType(String),
    /// `header-field <replace> <name> <value>`
    ///
    /// The web server decides whether to replace or append; the runtime only
    /// forwards the flag.
    HeaderField {
        /// Replace any earlier value for the field instead of appending
        replace: bool,
        /// Header field name
        name: String,
        /// Header field value
        value: String,
    },
    /// `keep-alive ` heartbeat, tells the peer a slow page is still alive
    KeepAlive,
    /// `debug-message <text>`
    DebugMessage(String),
}

impl MetadataEntry {
    /// Wire key of this entry
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            MetadataEntry::HttpStatus(_) => "http-status",
            MetadataEntry::MimeType(_) => "mime-type",
            MetadataEntry::HeaderField { .. } => "header-field",
            MetadataEntry::KeepAlive => "keep-alive",
            MetadataEntry::DebugMessage(_) => "debug-message",
        }
    }

    /// The entry in a form that fits on one protocol line
    ///
    /// CR and LF inside values become spaces. A header field whose name is
    /// empty or contains whitespace or control characters has no valid line
    /// and yields `None`.
    #[must_use]
    pub fn to_single_line(&self) -> Option<Cow<'_, Self>> {
        match self {
            MetadataEntry::HeaderField { name, .. } if !is_header_name(name) => None,
            MetadataEntry::MimeType(mt) if has_line_break(mt) => {
                Some(Cow::Owned(MetadataEntry::MimeType(flatten(mt))))
            }
            MetadataEntry::HeaderField {
                replace,
                name,
                value,
            } if has_line_break(value) => Some(Cow::Owned(MetadataEntry::HeaderField {
                replace: *replace,
                name: name.clone(),
                value: flatten(value),
            })),
            MetadataEntry::DebugMessage(msg) if has_line_break(msg) => {
                Some(Cow::Owned(MetadataEntry::DebugMessage(flatten(msg))))
            }
            entry => Some(Cow::Borrowed(entry)),
        }
    }

    /// Write this entry as one `<key> <value>\n` line
    ///
    /// Line breaks in values are written as spaces.
    ///
    /// # Errors
    ///
    /// Propagates write errors from the sink. A header field with an invalid
    /// name fails with [`io::ErrorKind::InvalidInput`] before anything is
    /// written.
    pub fn render<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        let line = self.to_single_line().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "invalid header field name")
        })?;
        // One write_all per line so a heartbeat is never split across writes.
        sink.write_all(format!("{line}\n").as_bytes())
    }

    /// Parse one metadata line (without its trailing newline)
    ///
    /// # Errors
    ///
    /// Returns [`GospError::Protocol`] for unknown keys or malformed values.
    pub fn parse_line(line: &str) -> Result<Self> {
        let (key, value) = match line.split_once(' ') {
            Some((k, v)) => (k, v),
            None => (line, ""),
        };
        match key {
            "http-status" => value
                .trim()
                .parse::<u16>()
                .map(MetadataEntry::HttpStatus)
                .map_err(|_| GospError::Protocol(format!("bad http-status value {value:?}"))),
            "mime-type" => Ok(MetadataEntry::MimeType(value.to_string())),
            "header-field" => {
                let mut parts = value.splitn(3, ' ');
                let replace = match parts.next() {
                    Some("true") => true,
                    Some("false") => false,
                    other => {
                        return Err(GospError::Protocol(format!(
                            "bad header-field replace flag {other:?}"
                        )))
                    }
                };
                let name = parts
                    .next()
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| GospError::Protocol("header-field without a name".into()))?;
                Ok(MetadataEntry::HeaderField {
                    replace,
                    name: name.to_string(),
                    value: parts.next().unwrap_or_default().to_string(),
                })
            }
            "keep-alive" => Ok(MetadataEntry::KeepAlive),
            "debug-message" => Ok(MetadataEntry::DebugMessage(value.to_string())),
            other => Err(GospError::Protocol(format!("unknown metadata key {other:?}"))),
        }
    }
}

impl fmt::Display for MetadataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.key();
        match self {
            MetadataEntry::HttpStatus(code) => write!(f, "{key} {code}"),
            MetadataEntry::MimeType(mt) => write!(f, "{key} {mt}"),
            MetadataEntry::HeaderField {
                replace,
                name,
                value,
            } => write!(f, "{key} {replace} {name} {value}"),
            MetadataEntry::KeepAlive => write!(f, "{key} "),
            MetadataEntry::DebugMessage(msg) => write!(f, "{key} {msg}"),
        }
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

fn flatten(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Summary of one rendered response stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    /// Value of the last `http-status` entry, or [`DEFAULT_STATUS`]
    pub status: u16,
    /// Number of metadata entries written
    pub entries: usize,
    /// Size of the buffered body
    pub body_bytes: usize,
    /// Whether the body followed the sentinel
    pub body_forwarded: bool,
}

/// Writes a metadata stream to a sink in protocol order
///
/// Entries go out as they are fed in. [`StreamRenderer::finish`] writes the
/// sentinel and then the body, but only when the final status is OK.
///
/// After the first write error the renderer keeps counting entries but stops
/// writing, so the caller can go on draining its producer.
pub struct StreamRenderer<W: Write> {
    sink: W,
    status: u16,
    entries: usize,
    error: Option<io::Error>,
}

impl<W: Write> StreamRenderer<W> {
    /// Start a stream on `sink`
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            status: DEFAULT_STATUS,
            entries: 0,
            error: None,
        }
    }

    /// Status the stream would finish with right now
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Render one entry
    ///
    /// Values with line breaks are flattened and header fields with invalid
    /// names are dropped, so every entry stays on its own line and the
    /// sentinel can only come from [`StreamRenderer::finish`].
    pub fn entry(&mut self, entry: &MetadataEntry) {
        let Some(line) = entry.to_single_line() else {
            warn!(key = entry.key(), "Dropping header field with an invalid name");
            return;
        };
        if let Cow::Owned(_) = line {
            warn!(key = entry.key(), "Line breaks in metadata value replaced with spaces");
        }
        let entry = &*line;
        if let MetadataEntry::HttpStatus(code) = entry {
            self.status = *code;
        }
        self.entries += 1;
        if self.error.is_none() {
            if let Err(e) = entry.render(&mut self.sink) {
                self.error = Some(e);
            }
        }
    }

    /// Write the sentinel and, if the final status is OK, the body
    ///
    /// # Errors
    ///
    /// Returns the first write error seen anywhere in the stream.
    pub fn finish(mut self, body: &[u8]) -> io::Result<RenderSummary> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        let body_forwarded = self.status == DEFAULT_STATUS;
        self.sink.write_all(END_HEADER.as_bytes())?;
        self.sink.write_all(b"\n")?;
        if body_forwarded {
            self.sink.write_all(body)?;
        }
        self.sink.flush()?;
        Ok(RenderSummary {
            status: self.status,
            entries: self.entries,
            body_bytes: body.len(),
            body_forwarded,
        })
    }
}
