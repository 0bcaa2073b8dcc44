//! # Request Model
//!
//! The structured description of one inbound HTTP request, as handed over by
//! the front-end web server.
//!
//! ## Wire Format
//!
//! One JSON object per connection (or per file in single-shot mode). Field
//! names are PascalCase, every field is optional and unknown fields are
//! ignored:
//!
//! ```json
//! {
//!   "Scheme": "https",
//!   "LocalHostname": "www.example.com",
//!   "Port": 443,
//!   "Uri": "/hello.gosp",
//!   "QueryArgs": "name=world",
//!   "Method": "GET",
//!   "Filename": "/var/www/hello.gosp",
//!   "HeaderData": {"Accept": "text/html"},
//!   "ExitNow": false
//! }
//! ```
//!
//! A message with `"ExitNow": true` is a control message: the server shuts
//! down instead of rendering anything, and every other field is ignored.
//!
//! ## Trust
//!
//! `RemoteIp`, `RemoteHostname`, the header map and the POST map all come
//! from the HTTP client. Validate them before using them for anything that
//! matters.

use crate::error::{GospError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Web-server information passed to a page invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Request {
    /// HTTP scheme ("http" or "https")
    pub scheme: String,
    /// Name of the local host
    pub local_hostname: String,
    /// Port number to which the request was issued
    pub port: u16,
    /// Path portion of the URI
    pub uri: String,
    /// Additional text following the page filename
    pub path_info: String,
    /// Query arguments from the request
    pub query_args: String,
    /// Complete URL requested
    pub url: String,
    /// Request method ("GET", "POST", etc.)
    pub method: String,
    /// First line of the request (e.g. "GET / HTTP/1.1")
    pub request_line: String,
    /// Request time in nanoseconds since the Unix epoch
    pub request_time: i64,
    /// Name of the remote host
    pub remote_hostname: String,
    /// IP address of the remote host
    pub remote_ip: String,
    /// Local filename of the page; empty means "no page context"
    pub filename: String,
    /// Fields sent by a POST request
    #[serde(deserialize_with = "null_as_default")]
    pub post_data: HashMap<String, String>,
    /// Request headers
    #[serde(deserialize_with = "null_as_default")]
    pub header_data: HashMap<String, String>,
    /// Email address of the web server administrator
    pub admin_email: String,
    /// Environment variables passed in from the web server
    #[serde(deserialize_with = "null_as_default")]
    pub environment: HashMap<String, String>,
    /// Control flag: shut the server down cleanly instead of rendering
    pub exit_now: bool,
}

/// Maps encoded as JSON `null` decode as empty maps
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What a decoded message asks the server to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `ExitNow` was set: run the shutdown handshake
    Shutdown,
    /// Render a page for this request
    Render(Box<Request>),
}

impl From<Request> for Inbound {
    fn from(req: Request) -> Self {
        if req.exit_now {
            Inbound::Shutdown
        } else {
            Inbound::Render(Box::new(req))
        }
    }
}

impl Request {
    /// The control message that asks a server to shut down
    #[must_use]
    pub fn shutdown() -> Self {
        Request {
            exit_now: true,
            ..Request::default()
        }
    }

    /// Decode exactly one request from a byte stream
    ///
    /// Reading stops at the closing brace of the JSON object, so the peer may
    /// keep its end of the connection open while it waits for the response.
    ///
    /// # Errors
    ///
    /// - [`GospError::MalformedRequest`] for invalid JSON, wrongly typed
    ///   fields or input that ends mid-message
    /// - [`GospError::Transport`] when the underlying read fails, including a
    ///   read deadline expiring
    pub fn decode<R: Read>(reader: R) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));
        Request::deserialize(&mut de).map_err(|e| {
            if e.is_io() {
                // Converting an I/O-category error hands back the original io::Error.
                GospError::transport("read", io::Error::from(e))
            } else {
                GospError::MalformedRequest(e)
            }
        })
    }

    /// Decode a request from a JSON string
    ///
    /// # Errors
    ///
    /// Returns [`GospError::MalformedRequest`] if the text is not a valid
    /// request object.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(GospError::MalformedRequest)
    }

    /// Encode this request as a single JSON object followed by a newline
    ///
    /// # Errors
    ///
    /// Returns [`GospError::Transport`] if writing fails.
    pub fn encode<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer(&mut writer, self)
            .map_err(|e| GospError::transport("write", io::Error::from(e)))?;
        writer
            .write_all(b"\n")
            .map_err(|e| GospError::transport("write", e))
    }

    /// JSON text of this request
    #[must_use]
    pub fn to_json(&self) -> String {
        // Serializing string maps and scalars cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Whether this is a control message rather than a render request
    #[inline]
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.exit_now
    }

    /// Directory containing the page, or `None` when there is no page context
    ///
    /// A bare filename lives in the current directory (`.`). Page logic that
    /// must not depend on the process-wide working directory can resolve its
    /// relative paths against this instead.
    #[must_use]
    pub fn page_dir(&self) -> Option<PathBuf> {
        if self.filename.is_empty() {
            return None;
        }
        match Path::new(&self.filename).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => Some(dir.to_path_buf()),
            _ => Some(PathBuf::from(".")),
        }
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_data
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a POST field by name
    #[must_use]
    pub fn post_field(&self, name: &str) -> Option<&str> {
        self.post_data.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let req = Request::from_json(r#"{"Uri": "/index.gosp"}"#).unwrap();
        assert_eq!(req.uri, "/index.gosp");
        assert_eq!(req.port, 0);
        assert!(req.filename.is_empty());
        assert!(req.post_data.is_empty());
        assert!(!req.exit_now);
    }

    #[test]
    fn test_null_maps_decode_empty() {
        let req = Request::from_json(
            r#"{"PostData": null, "HeaderData": null, "Environment": null}"#,
        )
        .unwrap();
        assert!(req.post_data.is_empty());
        assert!(req.header_data.is_empty());
        assert!(req.environment.is_empty());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let req = Request::from_json(r#"{"Method": "GET", "Extra": [1, 2, 3]}"#).unwrap();
        assert_eq!(req.method, "GET");
    }

    #[test]
    fn test_control_message_classification() {
        let req = Request::from_json(r#"{"ExitNow": true, "Uri": "/ignored"}"#).unwrap();
        assert!(req.is_control());
        assert_eq!(Inbound::from(req), Inbound::Shutdown);

        let req = Request::from_json(r#"{"Uri": "/page"}"#).unwrap();
        match Inbound::from(req) {
            Inbound::Render(r) => assert_eq!(r.uri, "/page"),
            Inbound::Shutdown => panic!("expected render request"),
        }
    }

    #[test]
    fn test_decode_stops_after_object() {
        // The peer keeps writing (or keeps the connection open) after the object.
        let input = b"{\"Method\": \"POST\"}\nthis is not json";
        let req = Request::decode(&input[..]).unwrap();
        assert_eq!(req.method, "POST");
    }

    #[test]
    fn test_page_dir() {
        let mut req = Request::default();
        assert_eq!(req.page_dir(), None);

        req.filename = "/srv/www/pages/index.gosp".into();
        assert_eq!(req.page_dir(), Some(PathBuf::from("/srv/www/pages")));

        req.filename = "index.gosp".into();
        assert_eq!(req.page_dir(), Some(PathBuf::from(".")));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut req = Request::default();
        req.header_data
            .insert("Content-Type".into(), "text/plain".into());
        assert_eq!(req.header("content-type"), Some("text/plain"));
        assert_eq!(req.header("accept"), None);
    }
}
