use std::borrow::Cow;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::config;
use crate::error::{HttpError, Result};
use crate::http::compression::{Codec, ContentCoding, Flate2Codec};
use crate::http::message::{HttpMessage, Message};
use crate::http::parser::decode_token_header;
use crate::http::status::HttpStatus;

/// An HTTP response.
///
/// Cloning yields an independent copy that shares only the (stateless)
/// codec, so a canned response can be tailored per request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    message: HttpMessage,
    pub status: HttpStatus,
    pub status_message: String,
    /// Compression level for [`optimize_data`](Self::optimize_data);
    /// negative disables compression.
    pub compression_level: i32,
    codec: Option<Arc<dyn Codec>>,
}

impl Message for HttpResponse {
    fn message(&self) -> &HttpMessage {
        &self.message
    }

    fn message_mut(&mut self) -> &mut HttpMessage {
        &mut self.message
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponse {
    /// A `200 OK` response with the [`Flate2Codec`] installed.
    pub fn new() -> Self {
        Self {
            message: HttpMessage::new(),
            status: HttpStatus::OK,
            status_message: "OK".to_string(),
            compression_level: config().compression_level,
            codec: Some(Arc::new(Flate2Codec)),
        }
    }

    pub fn with_status(status: HttpStatus) -> Self {
        let mut res = Self::new();
        res.set_status(status);
        res
    }

    /// Sets the status and resets the message to its reason phrase
    /// (empty for codes without one).
    pub fn set_status(&mut self, status: HttpStatus) {
        self.status = status;
        self.status_message = status.reason().unwrap_or_default().to_string();
    }

    pub fn codec(&self) -> Option<&Arc<dyn Codec>> {
        self.codec.as_ref()
    }

    /// Installs or removes the compression codec. Without one, compression
    /// and [`content`](Self::content) on encoded bodies fail with
    /// [`HttpError::NoCompressionSupport`].
    pub fn set_codec(&mut self, codec: Option<Arc<dyn Codec>>) {
        self.codec = codec;
    }

    /// Parses `HTTP/VERSION SP CODE [SP MESSAGE]`.
    pub fn parse_status_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (version, rest) = line
            .split_once(' ')
            .ok_or_else(|| HttpError::malformed(format!("no spaces in status line: {line:?}")))?;

        let version = version
            .strip_prefix("HTTP/")
            .ok_or_else(|| HttpError::malformed(format!("bad protocol in status line: {line:?}")))?;

        let (code, message) = match rest.split_once(' ') {
            Some((code, message)) => (code, message),
            None => (rest, ""),
        };
        let code = code
            .parse::<u16>()
            .map_err(|_| HttpError::malformed(format!("bad status code in status line: {line:?}")))?;

        self.message.protocol_version = version.to_string();
        self.status = HttpStatus(code);
        self.status_message = message.to_string();
        Ok(())
    }

    /// Status line and headers, ready to be followed by the body.
    pub fn encode_head(&self) -> String {
        // HTTP/<version> <status> <reason>\r\n
        // <header_name>: <header_value>\r\n
        // ...
        // \r\n
        format!(
            "HTTP/{} {} {}\r\n{}\r\n",
            self.message.protocol_version,
            self.status.code(),
            self.status_message,
            self.message.headers.stringify(),
        )
    }

    /// Whether the `Content-Type` is one the config marks compressible.
    pub fn is_compressible(&self) -> bool {
        match self.message.headers.get("Content-Type") {
            Some(ct) => config().is_compressible(&decode_token_header(ct).value.to_ascii_lowercase()),
            None => false,
        }
    }

    /// The body with any `deflate`/`gzip` content coding removed.
    ///
    /// Decompresses on every call; cache the result if it is needed again.
    pub fn content(&self) -> Result<Cow<'_, [u8]>> {
        let coding = self
            .message
            .headers
            .get("Content-Encoding")
            .and_then(|e| ContentCoding::from_token(e.trim()));

        let Some(coding) = coding else {
            return Ok(Cow::Borrowed(self.message.body.as_slice()));
        };

        let codec = self.codec.as_ref().ok_or(HttpError::NoCompressionSupport)?;
        codec
            .decompress(coding, &self.message.body)
            .map(Cow::Owned)
            .map_err(|source| HttpError::Codec { method: coding, source })
    }

    pub fn redirect(&mut self, location: &str, status: HttpStatus) {
        self.set_status(status);
        self.message.headers.set("Location", location);
    }

    /// Replaces the body with a minimal HTML error page.
    pub fn write_error(&mut self, status: HttpStatus, details: Option<&str>) {
        self.set_status(status);
        let title = format!("{} {}", status.code(), self.status_message);
        let body = match details {
            Some(details) => format!("<h1>{title}</h1>\n<p>{details}</p>"),
            None => format!("<h1>{title}</h1>"),
        };

        self.message.headers.set("Content-Type", "text/html; charset=utf-8");
        self.message.body = body.into_bytes();
    }

    pub fn set_last_modified(&mut self, time: SystemTime) {
        self.message.headers.set("Last-Modified", &httpdate::fmt_http_date(time));
    }

    pub fn cache_forever(&mut self) {
        let expires = SystemTime::now() + std::time::Duration::from_secs(365 * 24 * 60 * 60);
        self.message.headers.set("Expires", &httpdate::fmt_http_date(expires));
        self.message.headers.set("Cache-Control", "public, max-age=31536000, immutable");
    }

    pub fn disable_cache(&mut self) {
        self.message.headers.set("Expires", "Mon, 26 Jul 1997 05:00:00 GMT");
        self.message.headers.set("Cache-Control", "no-cache, must-revalidate");
        self.message.headers.set("Pragma", "no-cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line() {
        let mut res = HttpResponse::new();
        res.parse_status_line("HTTP/1.1 404 Not Found\r\n").unwrap();
        assert_eq!(res.protocol_version(), "1.1");
        assert_eq!(res.status, HttpStatus::NOT_FOUND);
        assert_eq!(res.status_message, "Not Found");

        res.parse_status_line("HTTP/1.0 299").unwrap();
        assert_eq!(res.status, HttpStatus(299));
        assert_eq!(res.status_message, "");

        res.parse_status_line("HTTP/1.1 200 Everything Is Fine").unwrap();
        assert_eq!(res.status_message, "Everything Is Fine");
    }

    #[test]
    fn status_line_errors() {
        let mut res = HttpResponse::new();
        assert!(matches!(res.parse_status_line("HTTP/1.1"), Err(HttpError::Malformed(_))));
        assert!(matches!(res.parse_status_line("HTTP/1.1 abc OK"), Err(HttpError::Malformed(_))));
        assert!(matches!(res.parse_status_line("ICY 200 OK"), Err(HttpError::Malformed(_))));
    }

    #[test]
    fn set_status_uses_reason_table() {
        let mut res = HttpResponse::new();
        res.set_status(HttpStatus(503));
        assert_eq!(res.status_message, "Service Unavailable");
        res.set_status(HttpStatus(599));
        assert_eq!(res.status_message, "");
    }

    #[test]
    fn encode_head_lists_all_headers() {
        let mut res = HttpResponse::with_status(HttpStatus::CREATED);
        res.message_mut().protocol_version = "1.1".to_string();
        res.headers_mut().add("Set-Cookie", "a=1");
        res.headers_mut().add("Set-Cookie", "b=2");
        assert_eq!(
            res.encode_head(),
            "HTTP/1.1 201 Created\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n"
        );
    }

    #[test]
    fn content_passthrough_and_decompression() {
        let mut res = HttpResponse::new();
        res.set_body("plain");
        assert_eq!(&*res.content().unwrap(), b"plain");

        let gz = Flate2Codec.compress(ContentCoding::Gzip, 6, b"packed").unwrap();
        res.set_body(gz);
        res.headers_mut().set("Content-Encoding", "gzip");
        assert_eq!(&*res.content().unwrap(), b"packed");

        res.set_codec(None);
        assert!(matches!(res.content(), Err(HttpError::NoCompressionSupport)));
    }

    #[test]
    fn compressible_content_types() {
        let mut res = HttpResponse::new();
        assert!(!res.is_compressible());
        res.headers_mut().set("Content-Type", "Text/HTML; charset=utf-8");
        assert!(res.is_compressible());
        res.headers_mut().set("Content-Type", "image/png");
        assert!(!res.is_compressible());
    }

    #[test]
    fn redirect_and_error_page() {
        let mut res = HttpResponse::new();
        res.redirect("/login", HttpStatus::SEE_OTHER);
        assert_eq!(res.status_message, "See Other");
        assert_eq!(res.headers().get("location"), Some("/login"));

        res.write_error(HttpStatus::NOT_FOUND, Some("no such page"));
        assert_eq!(res.body(), b"<h1>404 Not Found</h1>\n<p>no such page</p>");
    }

    #[test]
    fn cache_headers() {
        let mut res = HttpResponse::new();
        res.disable_cache();
        assert_eq!(res.headers().get("Pragma"), Some("no-cache"));
        res.cache_forever();
        assert!(res.headers().get("Cache-Control").unwrap().contains("immutable"));
        assert!(httpdate::parse_http_date(res.headers().get("Expires").unwrap()).is_ok());
    }
}
