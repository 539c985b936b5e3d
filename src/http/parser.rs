//! Parsers for structured header values.
//!
//! - Token headers: `value; key=val; key2="val 2"` (`Content-Type`,
//!   `Content-Disposition`).
//! - Weighted item lists: `item1, item2;q=0.5, item3` (`Accept-Encoding`,
//!   `Accept-Language`).

use indexmap::IndexMap;

/// A header value of the form `value; key=val; ...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenHeader {
    pub value: String,
    /// Property names are lower-cased; a repeated name keeps its last value.
    pub properties: IndexMap<String, String>,
}

impl TokenHeader {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

pub fn decode_token_header(s: &str) -> TokenHeader {
    let (value, mut rest) = match s.split_once(';') {
        Some((value, rest)) => (value, rest),
        None => (s, ""),
    };

    let mut header = TokenHeader {
        value: value.trim().to_string(),
        properties: IndexMap::new(),
    };

    loop {
        rest = rest.trim_start_matches(|c: char| c == ';' || c.is_ascii_whitespace());
        if rest.is_empty() {
            break;
        }

        // Flag properties without `=` map to an empty value.
        let (name, after) = match rest.find(['=', ';']) {
            Some(i) if rest.as_bytes()[i] == b'=' => (&rest[..i], &rest[i + 1..]),
            Some(i) => {
                header.properties.insert(rest[..i].trim().to_ascii_lowercase(), String::new());
                rest = &rest[i..];
                continue;
            }
            None => {
                header.properties.insert(rest.trim().to_ascii_lowercase(), String::new());
                break;
            }
        };
        let name = name.trim().to_ascii_lowercase();

        let after = after.trim_start();
        let value;
        if let Some(quoted) = after.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => {
                    value = &quoted[..end];
                    let tail = &quoted[end + 1..];
                    rest = tail.find(';').map_or("", |i| &tail[i + 1..]);
                }
                // Unterminated quote runs to the end of the header.
                None => {
                    value = quoted;
                    rest = "";
                }
            }
        } else {
            match after.find(';') {
                Some(end) => {
                    value = after[..end].trim_end();
                    rest = &after[end + 1..];
                }
                None => {
                    value = after.trim_end();
                    rest = "";
                }
            }
        }

        header.properties.insert(name, value.to_string());
    }

    header
}

/// Items with their q-values, ordered by descending weight. Items of equal
/// weight keep their order from the input.
pub fn parse_weighted_items(s: &str) -> Vec<(String, f32)> {
    let mut items: Vec<(String, f32)> = s
        .split(',')
        .filter_map(|item| {
            let mut params = item.split(';');
            let token = params.next()?.trim();
            if token.is_empty() {
                return None;
            }
            let q = params
                .filter_map(|p| {
                    let (key, value) = p.split_once('=')?;
                    key.trim().eq_ignore_ascii_case("q").then_some(value.trim())
                })
                .next()
                .and_then(|q| q.parse::<f32>().ok())
                .filter(|q| q.is_finite())
                .unwrap_or(1.0);
            Some((token.to_string(), q))
        })
        .collect();

    // `sort_by` is stable.
    items.sort_by(|a, b| b.1.total_cmp(&a.1));
    items
}

/// Primary tokens of a weighted list, most preferred first.
pub fn parse_item_list(s: &str) -> Vec<String> {
    parse_weighted_items(s).into_iter().map(|(item, _)| item).collect()
}
