//! State shared by requests and responses.
//!
//! [`HttpMessage`] is embedded in both [`HttpRequest`](crate::HttpRequest) and
//! [`HttpResponse`](crate::HttpResponse); the [`Message`] trait exposes its
//! accessors on the outer types. Cloning a message produces an independent
//! copy of headers and body while keeping the original creation time, which
//! lets a shared template be tailored per exchange without locking.

use std::time::{Duration, SystemTime};

use crate::config::config;
use crate::http::headers::HttpHeaders;

#[derive(Debug, Clone)]
pub struct HttpMessage {
    /// URL scheme, `http` or `https`.
    pub protocol: String,
    /// Version without the `HTTP/` prefix, e.g. `1.1`.
    pub protocol_version: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
    created: SystemTime,
}

impl HttpMessage {
    pub fn new() -> Self {
        Self {
            protocol: config().default_protocol.clone(),
            protocol_version: config().default_protocol_version.clone(),
            headers: HttpHeaders::new(),
            body: Vec::new(),
            created: SystemTime::now(),
        }
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    /// Time elapsed since the message was created. Clock skew reads as zero.
    pub fn age(&self) -> Duration {
        self.created.elapsed().unwrap_or_default()
    }
}

impl Default for HttpMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// Common accessors for types built around an [`HttpMessage`].
pub trait Message {
    fn message(&self) -> &HttpMessage;
    fn message_mut(&mut self) -> &mut HttpMessage;

    fn headers(&self) -> &HttpHeaders {
        &self.message().headers
    }

    fn headers_mut(&mut self) -> &mut HttpHeaders {
        &mut self.message_mut().headers
    }

    fn body(&self) -> &[u8] {
        &self.message().body
    }

    fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.message_mut().body = body.into();
    }

    fn protocol(&self) -> &str {
        &self.message().protocol
    }

    fn protocol_version(&self) -> &str {
        &self.message().protocol_version
    }

    fn age(&self) -> Duration {
        self.message().age()
    }
}

impl Message for HttpMessage {
    fn message(&self) -> &HttpMessage {
        self
    }

    fn message_mut(&mut self) -> &mut HttpMessage {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let m = HttpMessage::new();
        assert_eq!(m.protocol, "http");
        assert_eq!(m.protocol_version, "1.0");
        assert!(m.headers.is_empty());
        assert!(m.body.is_empty());
    }

    #[test]
    fn clone_is_independent_and_keeps_timestamp() {
        let mut original = HttpMessage::new();
        original.headers.set("X-Template", "yes");
        original.body = b"template".to_vec();

        let mut copy = original.clone();
        copy.headers.set("X-Template", "no");
        copy.body.push(b'!');

        assert_eq!(original.headers.get("x-template"), Some("yes"));
        assert_eq!(original.body, b"template");
        assert_eq!(copy.created(), original.created());
    }
}
