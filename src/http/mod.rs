//! HTTP message model and content shaping.
//!
//! [`request::HttpRequest`] and [`response::HttpResponse`] embed a shared
//! [`message::HttpMessage`] and store headers in a [`headers::HttpHeaders`]
//! multimap. Negotiation (compression, ranges, conditional GET) lives in
//! [`negotiate`]; [`multipart`] and [`parser`] are pure codecs used by both.

pub mod compression;
pub mod headers;
pub mod message;
pub mod multipart;
pub mod negotiate;
pub mod params;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;
