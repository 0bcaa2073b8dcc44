use super::entry::{MetadataEntry, DEFAULT_STATUS, END_HEADER};
use crate::error::{GospError, Result};

/// A complete response stream as seen by the web server
///
/// This is the peer side of [`super::StreamRenderer`]: metadata lines up to
/// the `end-header` sentinel, then the raw body bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedResponse {
    /// Every metadata entry, in stream order
    pub entries: Vec<MetadataEntry>,
    /// Last `http-status` value, or 200 if none was sent
    pub status: u16,
    /// Last `mime-type` value
    pub mime_type: Option<String>,
    /// `(replace, name, value)` for each `header-field` entry
    pub header_fields: Vec<(bool, String, String)>,
    /// Bytes after the sentinel
    pub body: Vec<u8>,
}

impl RenderedResponse {
    /// Split a raw response stream into metadata and body
    ///
    /// # Errors
    ///
    /// Returns [`GospError::Protocol`] when the sentinel is missing or a
    /// metadata line cannot be parsed.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut response = RenderedResponse {
            status: DEFAULT_STATUS,
            ..RenderedResponse::default()
        };
        let mut rest = bytes;
        loop {
            let newline = rest
                .iter()
                .position(|b| *b == b'\n')
                .ok_or_else(|| GospError::Protocol("stream ended before end-header".into()))?;
            let line = std::str::from_utf8(&rest[..newline])
                .map_err(|_| GospError::Protocol("metadata line is not UTF-8".into()))?;
            rest = &rest[newline + 1..];
            if line == END_HEADER {
                break;
            }
            let entry = MetadataEntry::parse_line(line)?;
            match &entry {
                MetadataEntry::HttpStatus(code) => response.status = *code,
                MetadataEntry::MimeType(mt) => response.mime_type = Some(mt.clone()),
                MetadataEntry::HeaderField {
                    replace,
                    name,
                    value,
                } => response
                    .header_fields
                    .push((*replace, name.clone(), value.clone())),
                MetadataEntry::KeepAlive | MetadataEntry::DebugMessage(_) => {}
            }
            response.entries.push(entry);
        }
        response.body = rest.to_vec();
        Ok(response)
    }

    /// Whether the body was forwarded
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == DEFAULT_STATUS
    }

    /// Body as text, replacing invalid UTF-8
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Number of heartbeats seen before the sentinel
    #[must_use]
    pub fn keep_alives(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, MetadataEntry::KeepAlive))
            .count()
    }
}
