//! Body compression capability.
//!
//! Responses do not call `flate2` directly: they hold an optional [`Codec`]
//! and report [`HttpError::NoCompressionSupport`](crate::HttpError::NoCompressionSupport)
//! when none is installed. [`Flate2Codec`] is the default implementation.

use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use std::fmt;
use std::io::{self, Read, Write};

/// Content codings this crate can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Deflate,
    Gzip,
}

impl ContentCoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCoding::Deflate => "deflate",
            ContentCoding::Gzip => "gzip",
        }
    }

    /// Case-insensitive lookup of a `Content-Encoding` token.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("deflate") {
            Some(ContentCoding::Deflate)
        } else if token.eq_ignore_ascii_case("gzip") {
            Some(ContentCoding::Gzip)
        } else {
            None
        }
    }
}

impl fmt::Display for ContentCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Codec: fmt::Debug + Send + Sync {
    /// `level` is already clamped to `0..=9`.
    fn compress(&self, coding: ContentCoding, level: u32, data: &[u8]) -> io::Result<Vec<u8>>;
    fn decompress(&self, coding: ContentCoding, data: &[u8]) -> io::Result<Vec<u8>>;
}

/// `deflate` is the zlib-wrapped stream HTTP calls deflate; `gzip` is a gzip member.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flate2Codec;

impl Codec for Flate2Codec {
    fn compress(&self, coding: ContentCoding, level: u32, data: &[u8]) -> io::Result<Vec<u8>> {
        let level = Compression::new(level);
        match coding {
            ContentCoding::Deflate => {
                let mut e = ZlibEncoder::new(Vec::new(), level);
                e.write_all(data)?;
                e.finish()
            }
            ContentCoding::Gzip => {
                let mut e = GzEncoder::new(Vec::new(), level);
                e.write_all(data)?;
                e.finish()
            }
        }
    }

    fn decompress(&self, coding: ContentCoding, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match coding {
            ContentCoding::Deflate => ZlibDecoder::new(data).read_to_end(&mut out)?,
            ContentCoding::Gzip => GzDecoder::new(data).read_to_end(&mut out)?,
        };
        Ok(out)
    }
}
