//! Errors surfaced by the message core.
//!
//! Only hard failures live here. Range mismatches and conditional-GET hits
//! are valid protocol outcomes and are written into the response as status
//! codes instead (see [`negotiate`](crate::http::negotiate)).

use std::io;

use crate::http::compression::ContentCoding;

#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    /// Request line, status line, multipart framing or range syntax
    /// could not be parsed.
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("missing content type")]
    MissingContentType,

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("multipart boundary {0:?} occurs inside a part body")]
    BoundaryInBody(String),

    /// Compression or decompression was requested but no codec is installed.
    #[error("built without compression support")]
    NoCompressionSupport,

    #[error("{method} codec failed: {source}")]
    Codec {
        method: ContentCoding,
        #[source]
        source: io::Error,
    },
}

impl HttpError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        HttpError::Malformed(reason.into())
    }
}

pub type Result<T, E = HttpError> = std::result::Result<T, E>;
