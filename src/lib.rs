//! In-memory HTTP message core shared by client and server code.
//!
//! The crate models requests and responses, stores headers in a
//! case-insensitive multimap, negotiates response compression and byte
//! ranges, and encodes or decodes `multipart/*` bodies. It performs no I/O:
//! messages are built from fully buffered input and handed back ready for
//! serialization by a transport layer.

pub mod config;
pub mod error;
pub mod http;

pub use error::{HttpError, Result};
pub use http::headers::HttpHeaders;
pub use http::message::{HttpMessage, Message};
pub use http::request::HttpRequest;
pub use http::response::HttpResponse;
pub use http::status::HttpStatus;
