use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{HttpError, Result};
use crate::http::message::{HttpMessage, Message};
use crate::http::multipart::decode_multipart;
use crate::http::params::{UrlParameters, decode_url_parameters, encode_url_parameters};
use crate::http::parser::decode_token_header;

/// Splits `host[:port]`, leaving bracketed IPv6 literals intact.
fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    let colon = if authority.starts_with('[') {
        authority
            .find(']')
            .and_then(|end| authority[end + 1..].starts_with(':').then_some(end + 1))
    } else {
        authority.rfind(':')
    };

    match colon {
        Some(i) => (&authority[..i], Some(&authority[i + 1..])),
        None => (authority, None),
    }
}

/// An HTTP request.
///
/// `host` and `port` are derived from the `Host` header when present. Without
/// one, the host is empty and the port comes from a fallback field, so
/// [`set_port`](Self::set_port) only touches the header if it already exists.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    message: HttpMessage,
    pub method: String,
    /// Forward proxy to send the request through, as `host:port`.
    pub proxy: Option<String>,
    resource: String,
    /// Port used while there is no `Host` header; `None` means the
    /// protocol default.
    port: Option<u16>,
}

impl Message for HttpRequest {
    fn message(&self) -> &HttpMessage {
        &self.message
    }

    fn message_mut(&mut self) -> &mut HttpMessage {
        &mut self.message
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequest {
    pub fn new() -> Self {
        Self {
            message: HttpMessage::new(),
            method: "GET".to_string(),
            proxy: None,
            resource: "/".to_string(),
            port: None,
        }
    }

    /// Request for an absolute `http://` or `https://` URL.
    pub fn from_url(url: &str) -> Self {
        let mut req = Self::new();
        req.set_resource(url);
        req
    }

    /// Parses `METHOD SP RESOURCE SP HTTP/VERSION`.
    ///
    /// The resource is everything between the first and the last space, so
    /// unencoded spaces inside it are tolerated.
    pub fn parse_request_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.len() < 11 {
            return Err(HttpError::malformed(format!("request line too short: {line:?}")));
        }

        let (first, last) = match (line.find(' '), line.rfind(' ')) {
            (Some(first), Some(last)) if first < last => (first, last),
            _ => return Err(HttpError::malformed(format!("no spaces in request line: {line:?}"))),
        };
        if first == 0 {
            return Err(HttpError::malformed(format!("empty method in request line: {line:?}")));
        }
        if last == first + 1 {
            return Err(HttpError::malformed(format!("empty resource in request line: {line:?}")));
        }

        let version = line[last + 1..]
            .strip_prefix("HTTP/")
            .ok_or_else(|| HttpError::malformed(format!("bad protocol in request line: {line:?}")))?;

        self.method = line[..first].to_string();
        self.message.protocol_version = version.to_string();
        self.set_resource(&line[first + 1..last]);
        Ok(())
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Sets the request target.
    ///
    /// An absolute `http://`/`https://` URL also sets the protocol and the
    /// `Host` header, turns `user:pass@` credentials into a Basic
    /// `Authorization` header and keeps only path and query as the resource.
    /// A bare path leaves `Host` untouched.
    pub fn set_resource(&mut self, value: &str) {
        let absolute = ["http", "https"].into_iter().find_map(|scheme| {
            value
                .strip_prefix(scheme)
                .and_then(|rest| rest.strip_prefix("://"))
                .map(|rest| (scheme, rest))
        });

        let Some((scheme, rest)) = absolute else {
            self.resource = value.to_string();
            return;
        };

        let end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, target) = rest.split_at(end);

        let host = match authority.rsplit_once('@') {
            Some((credentials, host)) => {
                let auth = format!("Basic {}", BASE64.encode(credentials));
                self.message.headers.set("Authorization", &auth);
                host
            }
            None => authority,
        };

        self.message.protocol = scheme.to_string();
        self.message.headers.set("Host", host);
        self.resource = if target.starts_with('/') {
            target.to_string()
        } else {
            format!("/{target}")
        };
    }

    /// Resource up to the first `?`.
    pub fn path(&self) -> &str {
        match self.resource.split_once('?') {
            Some((path, _)) => path,
            None => &self.resource,
        }
    }

    pub fn query_string(&self) -> &str {
        self.resource.split_once('?').map_or("", |(_, qs)| qs)
    }

    pub fn url_parameters(&self) -> UrlParameters {
        decode_url_parameters(self.query_string())
    }

    /// Replaces the query string, dropping it entirely for empty parameters.
    pub fn set_url_parameters(&mut self, params: &UrlParameters) {
        let path = self.path().to_string();
        self.resource = if params.is_empty() {
            path
        } else {
            format!("{path}?{}", encode_url_parameters(params))
        };
    }

    pub fn default_port(&self) -> u16 {
        default_port_for(&self.message.protocol)
    }

    pub fn is_secure(&self) -> bool {
        self.message.protocol.eq_ignore_ascii_case("https")
    }

    /// Host part of the `Host` header, or empty without one.
    pub fn host(&self) -> &str {
        match self.message.headers.get("Host") {
            Some(h) => split_host_port(h).0,
            None => "",
        }
    }

    pub fn set_host(&mut self, host: &str) {
        let port = self.port();
        self.write_host_header(host, port);
    }

    pub fn port(&self) -> u16 {
        let Some(h) = self.message.headers.get("Host") else {
            return self.port.unwrap_or_else(|| self.default_port());
        };

        match split_host_port(h).1 {
            None | Some("") => self.default_port(),
            Some(p) => p.parse().unwrap_or_else(|_| {
                warn!("Unparsable port in Host header {h:?}, using default");
                self.default_port()
            }),
        }
    }

    pub fn set_port(&mut self, port: u16) {
        if self.message.headers.contains("Host") {
            let host = self.host().to_string();
            self.write_host_header(&host, port);
        } else {
            self.port = Some(port);
        }
    }

    fn write_host_header(&mut self, host: &str, port: u16) {
        let value = if port == self.default_port() {
            host.to_string()
        } else {
            format!("{host}:{port}")
        };
        self.message.headers.set("Host", &value);
    }

    /// `protocol://host`, with `:port` when it is not the protocol default.
    pub fn root(&self) -> String {
        let port = self.port();
        if port == self.default_port() {
            format!("{}://{}", self.message.protocol, self.host())
        } else {
            format!("{}://{}:{}", self.message.protocol, self.host(), port)
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.root(), self.resource)
    }

    pub fn base_url(&self) -> String {
        format!("{}{}", self.root(), self.path())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.message.headers.get("Content-Length")?.trim().parse().ok()
    }

    /// Client address chain: `X-Forwarded-For` entries (client first)
    /// followed by the directly connected `peer`.
    pub fn remote_hosts(&self, peer: &str) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .message
            .headers
            .get_all("X-Forwarded-For")
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        hosts.push(peer.to_string());
        hosts
    }

    /// Cookies from the `Cookie` header. Segments without `=` are ignored
    /// and a repeated name keeps its last value.
    pub fn cookies(&self) -> IndexMap<String, String> {
        let mut cookies = IndexMap::new();
        let Some(header) = self.message.headers.get("Cookie") else {
            return cookies;
        };

        for segment in header.split(';') {
            if let Some((name, value)) = segment.trim().split_once('=') {
                cookies.insert(name.to_string(), value.to_string());
            }
        }
        cookies
    }

    /// Decodes a form submission body by its `Content-Type`.
    pub fn decode_post_data(&self) -> Result<UrlParameters> {
        let content_type = self
            .message
            .headers
            .get("Content-Type")
            .ok_or(HttpError::MissingContentType)?;
        let content_type = decode_token_header(content_type);

        match content_type.value.to_ascii_lowercase().as_str() {
            "application/x-www-form-urlencoded" => {
                Ok(decode_url_parameters(&String::from_utf8_lossy(&self.message.body)))
            }
            "multipart/form-data" => {
                let boundary = content_type
                    .property("boundary")
                    .ok_or_else(|| HttpError::malformed("multipart content type without boundary"))?;

                let mut fields = UrlParameters::new();
                for part in decode_multipart(&self.message.body, boundary)? {
                    let disposition = decode_token_header(part.headers.get_or("Content-Disposition", ""));
                    let name = disposition
                        .property("name")
                        .ok_or_else(|| HttpError::malformed("multipart field without a name"))?;
                    fields.insert(name.to_string(), String::from_utf8_lossy(&part.data).into_owned());
                }
                debug!("Decoded {} multipart form fields", fields.len());
                Ok(fields)
            }
            _ => Err(HttpError::UnsupportedMediaType(content_type.value)),
        }
    }

    /// Request line and headers, ready to be followed by the body.
    /// The target is the absolute URL when a proxy is set.
    pub fn encode_head(&self) -> String {
        let target = if self.proxy.is_some() {
            self.url()
        } else {
            self.resource.clone()
        };

        // <METHOD> <target> HTTP/<version>\r\n
        // <header_name>: <header_value>\r\n
        // ...
        // \r\n
        format!(
            "{} {} HTTP/{}\r\n{}\r\n",
            self.method,
            target,
            self.message.protocol_version,
            self.message.headers.stringify(),
        )
    }
}

fn default_port_for(protocol: &str) -> u16 {
    if protocol.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}
