//! `multipart/*` body codec.
//!
//! Wire layout for boundary `b`:
//!
//! ```text
//! --b\r\n
//! Name: value\r\n
//! \r\n
//! body\r\n
//! --b\r\n
//! ...
//! --b--\r\n
//! ```

use crate::error::{HttpError, Result};
use crate::http::headers::HttpHeaders;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPart {
    pub headers: HttpHeaders,
    pub data: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split<'a>(mut data: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    while let Some(i) = find(data, delimiter) {
        segments.push(&data[..i]);
        data = &data[i + delimiter.len()..];
    }
    segments.push(data);
    segments
}

/// Fails with [`HttpError::BoundaryInBody`] if any part body contains `boundary`.
///
/// An empty part list encodes to the bare `--boundary--\r\n` terminator,
/// which [`decode_multipart`] rejects: the wire grammar needs at least one
/// part, so only non-empty lists survive a round trip.
pub fn encode_multipart(parts: &[MultipartPart], boundary: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for part in parts {
        if find(&part.data, boundary.as_bytes()).is_some() {
            return Err(HttpError::BoundaryInBody(boundary.to_string()));
        }

        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        out.extend_from_slice(part.headers.stringify().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&part.data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(out)
}

pub fn decode_multipart(data: &[u8], boundary: &str) -> Result<Vec<MultipartPart>> {
    let terminator = format!("\r\n--{boundary}--\r\n");
    let data = data
        .strip_suffix(terminator.as_bytes())
        .ok_or_else(|| HttpError::malformed("bad multipart terminator"))?;

    let start = format!("--{boundary}\r\n");
    let data = data
        .strip_prefix(start.as_bytes())
        .ok_or_else(|| HttpError::malformed("bad multipart start"))?;

    let delimiter = format!("\r\n--{boundary}\r\n");
    split(data, delimiter.as_bytes())
        .into_iter()
        .map(decode_part)
        .collect()
}

fn decode_part(segment: &[u8]) -> Result<MultipartPart> {
    // A part without headers starts directly with the blank line.
    let (head, data) = match segment.strip_prefix(b"\r\n") {
        Some(data) => (&b""[..], data),
        None => {
            let i = find(segment, b"\r\n\r\n")
                .ok_or_else(|| HttpError::malformed("can't find headers in part"))?;
            (&segment[..i], &segment[i + 4..])
        }
    };

    let mut headers = HttpHeaders::new();
    let head = String::from_utf8_lossy(head);
    for line in head.split("\r\n").filter(|l| !l.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::malformed(format!("malformed part header: {line:?}")))?;
        headers.add(name.trim(), value.trim());
    }

    Ok(MultipartPart {
        headers,
        data: data.to_vec(),
    })
}
