//! Content negotiation: response compression and byte-range slicing.
//!
//! Both steps read the client's request headers and rewrite the response in
//! place. Range mismatches and conditional-GET hits become `416` and `304`
//! responses; only malformed `Range` syntax or a missing codec is an error.

use log::{debug, trace, warn};
use std::time::SystemTime;

use crate::error::{HttpError, Result};
use crate::http::compression::ContentCoding;
use crate::http::message::Message;
use crate::http::parser::parse_item_list;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::status::HttpStatus;

fn parse_date(headers_value: Option<&str>, name: &str) -> Option<SystemTime> {
    let value = headers_value?;
    match httpdate::parse_http_date(value) {
        Ok(time) => Some(time),
        Err(err) => {
            warn!("Ignoring unparsable {name} header {value:?}: {err}");
            None
        }
    }
}

/// `bytes=START-END` as a half-open window `[start, end)` over `len` bytes.
/// Only the first of several comma-separated ranges is used.
fn parse_range(header: &str, len: usize) -> Result<(usize, usize)> {
    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| HttpError::malformed(format!("unsupported range unit: {header:?}")))?;
    let first = spec.split(',').next().unwrap_or_default().trim();

    let (start, end) = first
        .split_once('-')
        .ok_or_else(|| HttpError::malformed(format!("bad range: {header:?}")))?;

    let start = start
        .trim()
        .parse::<usize>()
        .map_err(|_| HttpError::malformed(format!("bad range start: {header:?}")))?;
    let end = match end.trim() {
        "" => len,
        end => end
            .parse::<usize>()
            .map_err(|_| HttpError::malformed(format!("bad range end: {header:?}")))?
            .saturating_add(1),
    };
    Ok((start, end))
}

impl HttpResponse {
    /// Compresses the body according to the request's `Accept-Encoding`.
    ///
    /// Runs only when `compression_level` is non-negative, the response has
    /// no `Content-Length`, no non-identity `Content-Encoding`, and a
    /// compressible `Content-Type`. The client's preferences are tried in
    /// order, followed by an implicit `*`: `deflate` and `gzip` compress the
    /// body, `*` clears `Content-Encoding` and leaves the body as is.
    pub fn optimize_data(&mut self, req: &HttpRequest) -> Result<()> {
        if self.compression_level < 0
            || self.headers().contains("Content-Length")
            || !self.is_compressible()
        {
            return Ok(());
        }

        let encoding = self.headers().get_or("Content-Encoding", "").trim();
        if !encoding.is_empty() && !encoding.eq_ignore_ascii_case("identity") {
            return Ok(());
        }

        let mut preferences = parse_item_list(req.headers().get_or("Accept-Encoding", ""));
        preferences.push("*".to_string());
        trace!("Encoding preferences: {preferences:?}");

        for method in &preferences {
            if method == "*" {
                self.headers_mut().remove("Content-Encoding");
                return Ok(());
            }

            if let Some(coding) = ContentCoding::from_token(method) {
                return self.compress_body(coding);
            }
        }

        Ok(())
    }

    fn compress_body(&mut self, coding: ContentCoding) -> Result<()> {
        let codec = self.codec().cloned().ok_or(HttpError::NoCompressionSupport)?;
        let level = self.compression_level.clamp(0, 9) as u32;

        let compressed = codec
            .compress(coding, level, self.body())
            .map_err(|source| HttpError::Codec { method: coding, source })?;
        debug!(
            "Compressed body with {coding}: {} -> {} bytes",
            self.body().len(),
            compressed.len()
        );

        self.set_body(compressed);
        self.headers_mut().set("Content-Encoding", coding.as_str());
        self.headers_mut().add("Vary", "Accept-Encoding");
        Ok(())
    }

    /// Applies `If-Modified-Since` and `Range` from the request.
    ///
    /// Runs only on a `200` response without `Content-Range`, `Accept-Ranges`
    /// or `Content-Length`. An unchanged resource becomes `304` with an empty
    /// body; otherwise ranges are advertised and a satisfiable single range
    /// turns the response into `206`, an unsatisfiable one into `416`.
    pub fn slice_data(&mut self, req: &HttpRequest) -> Result<()> {
        if self.status != HttpStatus::OK
            || self.headers().contains("Content-Range")
            || self.headers().contains("Accept-Ranges")
            || self.headers().contains("Content-Length")
        {
            return Ok(());
        }

        let if_modified_since = parse_date(req.headers().get("If-Modified-Since"), "If-Modified-Since");
        let last_modified = parse_date(self.headers().get("Last-Modified"), "Last-Modified");
        if let (Some(since), Some(modified)) = (if_modified_since, last_modified) {
            if modified <= since {
                debug!("Resource not modified since {}", httpdate::fmt_http_date(since));
                self.set_status(HttpStatus::NOT_MODIFIED);
                self.set_body(Vec::new());
                return Ok(());
            }
        }

        let len = self.body().len();
        let range = req.headers().get("Range");
        // Parsed before any header is touched so a malformed range leaves
        // the response unchanged.
        let window = range.map(|r| parse_range(r, len)).transpose()?;

        self.headers_mut().set("Accept-Ranges", "bytes");

        let (Some(range), Some((start, end))) = (range, window) else {
            return Ok(());
        };

        if start >= len || start >= end || end > len {
            debug!("Range {range:?} not satisfiable for {len} bytes");
            self.set_status(HttpStatus::RANGE_NOT_SATISFIABLE);
            let reason = self.status_message.clone();
            self.set_body(reason);
            return Ok(());
        }

        let slice = self.body()[start..end].to_vec();
        self.set_body(slice);
        self.set_status(HttpStatus::PARTIAL_CONTENT);
        self.headers_mut()
            .set("Content-Range", &format!("bytes {}-{}/{}", start, end - 1, len));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::http::compression::{Codec, Flate2Codec};

    fn request(headers: &[(&str, &str)]) -> HttpRequest {
        let mut req = HttpRequest::new();
        for (name, value) in headers {
            req.headers_mut().add(name, value);
        }
        req
    }

    fn text_response(body: &[u8]) -> HttpResponse {
        let mut res = HttpResponse::new();
        res.headers_mut().set("Content-Type", "text/plain");
        res.set_body(body);
        res
    }

    fn hundred_bytes() -> HttpResponse {
        let body: Vec<u8> = (0..100).collect();
        let mut res = HttpResponse::new();
        res.set_body(body);
        res
    }

    #[test]
    fn highest_weight_wins() {
        let req = request(&[("Accept-Encoding", "identity;q=0, deflate;q=0.5, gzip")]);
        let mut res = text_response(b"hello hello hello hello");
        res.optimize_data(&req).unwrap();

        assert_eq!(res.headers().get("Content-Encoding"), Some("gzip"));
        assert_eq!(res.headers().get("Vary"), Some("Accept-Encoding"));
        assert_eq!(&*res.content().unwrap(), b"hello hello hello hello");
    }

    #[test]
    fn deflate_when_preferred() {
        let req = request(&[("Accept-Encoding", "gzip;q=0.1, deflate")]);
        let mut res = text_response(b"payload");
        res.optimize_data(&req).unwrap();

        assert_eq!(res.headers().get("Content-Encoding"), Some("deflate"));
        let plain = Flate2Codec.decompress(ContentCoding::Deflate, res.body()).unwrap();
        assert_eq!(plain, b"payload");
    }

    #[test]
    fn star_clears_identity_encoding() {
        let req = request(&[("Accept-Encoding", "*")]);
        let mut res = text_response(b"payload");
        res.headers_mut().set("Content-Encoding", "identity");
        res.optimize_data(&req).unwrap();

        assert!(!res.headers().contains("Content-Encoding"));
        assert!(!res.headers().contains("Vary"));
        assert_eq!(res.body(), b"payload");
    }

    #[test]
    fn unknown_codings_fall_through_to_star() {
        let req = request(&[("Accept-Encoding", "br, zstd")]);
        let mut res = text_response(b"payload");
        res.optimize_data(&req).unwrap();
        assert!(!res.headers().contains("Content-Encoding"));
        assert_eq!(res.body(), b"payload");
    }

    #[test]
    fn preconditions_skip_compression() {
        let req = request(&[("Accept-Encoding", "gzip")]);

        let mut res = text_response(b"payload");
        res.compression_level = -1;
        res.optimize_data(&req).unwrap();
        assert!(!res.headers().contains("Content-Encoding"));

        let mut res = text_response(b"payload");
        res.headers_mut().set("Content-Length", "7");
        res.optimize_data(&req).unwrap();
        assert!(!res.headers().contains("Content-Encoding"));

        let mut res = text_response(b"payload");
        res.headers_mut().set("Content-Type", "image/png");
        res.optimize_data(&req).unwrap();
        assert!(!res.headers().contains("Content-Encoding"));

        let mut res = text_response(b"already");
        res.headers_mut().set("Content-Encoding", "br");
        res.optimize_data(&req).unwrap();
        assert_eq!(res.headers().get("Content-Encoding"), Some("br"));
        assert_eq!(res.body(), b"already");
    }

    #[test]
    fn missing_codec_is_a_configuration_error() {
        let req = request(&[("Accept-Encoding", "gzip")]);
        let mut res = text_response(b"payload");
        res.set_codec(None);
        assert!(matches!(res.optimize_data(&req), Err(HttpError::NoCompressionSupport)));

        // `*` needs no codec.
        let req = request(&[("Accept-Encoding", "*")]);
        assert!(res.optimize_data(&req).is_ok());

        res.set_codec(Some(Arc::new(Flate2Codec)));
        let req = request(&[("Accept-Encoding", "gzip")]);
        assert!(res.optimize_data(&req).is_ok());
    }

    #[test]
    fn full_range() {
        let req = request(&[("Range", "bytes=0-99")]);
        let mut res = hundred_bytes();
        res.slice_data(&req).unwrap();
        assert_eq!(res.status, HttpStatus::PARTIAL_CONTENT);
        assert_eq!(res.body().len(), 100);
        assert_eq!(res.headers().get("Content-Range"), Some("bytes 0-99/100"));
        assert_eq!(res.headers().get("Accept-Ranges"), Some("bytes"));
    }

    #[test]
    fn open_ended_range() {
        let req = request(&[("Range", "bytes=50-")]);
        let mut res = hundred_bytes();
        res.slice_data(&req).unwrap();
        assert_eq!(res.status, HttpStatus::PARTIAL_CONTENT);
        assert_eq!(res.body(), (50..100).collect::<Vec<u8>>());
        assert_eq!(res.headers().get("Content-Range"), Some("bytes 50-99/100"));
    }

    #[test]
    fn only_first_range_is_used() {
        let req = request(&[("Range", "bytes=10-19, 30-39")]);
        let mut res = hundred_bytes();
        res.slice_data(&req).unwrap();
        assert_eq!(res.body(), (10..20).collect::<Vec<u8>>());
    }

    #[test]
    fn unsatisfiable_ranges() {
        for range in ["bytes=100-150", "bytes=10-200", "bytes=60-40"] {
            let req = request(&[("Range", range)]);
            let mut res = hundred_bytes();
            res.slice_data(&req).unwrap();
            assert_eq!(res.status, HttpStatus::RANGE_NOT_SATISFIABLE, "{range}");
            assert_eq!(res.body(), b"Requested Range Not Satisfiable");
            assert!(!res.headers().contains("Content-Range"));
        }
    }

    #[test]
    fn malformed_ranges_are_errors() {
        for range in ["bytes=-500", "items=0-1", "bytes=a-b", "bytes=5"] {
            let req = request(&[("Range", range)]);
            let mut res = hundred_bytes();
            assert!(matches!(res.slice_data(&req), Err(HttpError::Malformed(_))), "{range}");
            assert!(!res.headers().contains("Accept-Ranges"), "{range}");
            assert_eq!(res.status, HttpStatus::OK);
            assert_eq!(res.body().len(), 100);
        }
    }

    #[test]
    fn no_range_only_advertises() {
        let mut res = hundred_bytes();
        res.slice_data(&request(&[])).unwrap();
        assert_eq!(res.status, HttpStatus::OK);
        assert_eq!(res.body().len(), 100);
        assert_eq!(res.headers().get("Accept-Ranges"), Some("bytes"));
    }

    #[test]
    fn slicing_preconditions() {
        let req = request(&[("Range", "bytes=0-9")]);

        let mut res = hundred_bytes();
        res.set_status(HttpStatus::NOT_FOUND);
        res.slice_data(&req).unwrap();
        assert_eq!(res.body().len(), 100);
        assert!(!res.headers().contains("Accept-Ranges"));

        let mut res = hundred_bytes();
        res.headers_mut().set("Content-Length", "100");
        res.slice_data(&req).unwrap();
        assert_eq!(res.status, HttpStatus::OK);
    }

    #[test]
    fn not_modified() {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let req = request(&[
            ("If-Modified-Since", httpdate::fmt_http_date(modified).as_str()),
            ("Range", "bytes=0-9"),
        ]);

        let mut res = hundred_bytes();
        res.set_last_modified(modified);
        res.slice_data(&req).unwrap();
        assert_eq!(res.status, HttpStatus::NOT_MODIFIED);
        assert_eq!(res.status_message, "Not Modified");
        assert!(res.body().is_empty());
    }

    #[test]
    fn modified_after_request_date() {
        let since = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let req = request(&[("If-Modified-Since", httpdate::fmt_http_date(since).as_str())]);

        let mut res = hundred_bytes();
        res.set_last_modified(since + Duration::from_secs(60));
        res.slice_data(&req).unwrap();
        assert_eq!(res.status, HttpStatus::OK);
        assert_eq!(res.body().len(), 100);
    }

    #[test]
    fn unparsable_dates_are_ignored() {
        let req = request(&[("If-Modified-Since", "yesterday")]);
        let mut res = hundred_bytes();
        res.headers_mut().set("Last-Modified", "Sun, 06 Nov 1994 08:49:37 GMT");
        res.slice_data(&req).unwrap();
        assert_eq!(res.status, HttpStatus::OK);
    }
}
