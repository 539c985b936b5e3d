//! `application/x-www-form-urlencoded` parameters, as found in query strings
//! and form bodies.

use indexmap::IndexMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Decoded parameters in order of first appearance. A repeated name keeps
/// its last value.
pub type UrlParameters = IndexMap<String, String>;

/// Everything except unreserved characters gets escaped.
const FORM_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_decode_str(&s).decode_utf8_lossy().into_owned()
}

pub fn decode_url_parameters(qs: &str) -> UrlParameters {
    qs.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (decode_component(name), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

pub fn encode_url_parameters(params: &UrlParameters) -> String {
    params
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(name, FORM_COMPONENT),
                utf8_percent_encode(value, FORM_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
