//! Resolution of the externally visible host for absolute URLs

use axum::http::{header, HeaderMap, Uri};

/// Resolves `scheme://host[:port]` as seen by the client
pub trait HostResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap, uri: &Uri) -> String;
}

/// Resolver honouring a configured public URL, then proxy headers, then `Host`
#[derive(Debug, Clone)]
pub struct DefaultHostResolver {
    public_url: Option<String>,
    fallback: String,
}

impl DefaultHostResolver {
    /// `fallback` is used when the request carries no usable host information,
    /// typically `http://{bind address}`
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            public_url: None,
            fallback: trim_base(fallback.into()),
        }
    }

    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url.map(trim_base).filter(|url| !url.is_empty());
        self
    }
}

impl HostResolver for DefaultHostResolver {
    fn resolve(&self, headers: &HeaderMap, uri: &Uri) -> String {
        if let Some(url) = &self.public_url {
            return url.clone();
        }

        if let Some(resolved) = from_forwarded(headers) {
            return resolved;
        }

        if let Some(resolved) = from_x_forwarded(headers, uri) {
            return resolved;
        }

        if let Some(host) = header_str(headers, header::HOST.as_str()) {
            return format!("{}://{}", uri.scheme_str().unwrap_or("http"), host);
        }

        if let Some(authority) = uri.authority() {
            return format!("{}://{}", uri.scheme_str().unwrap_or("http"), authority);
        }

        self.fallback.clone()
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// First value of a comma separated header
fn first_value(value: &str) -> &str {
    value.split(',').next().unwrap_or(value).trim()
}

/// RFC 7239 `Forwarded: proto=https;host=example.com`
fn from_forwarded(headers: &HeaderMap) -> Option<String> {
    let value = header_str(headers, "forwarded")?;
    let element = first_value(value);

    let mut proto = None;
    let mut host = None;
    for pair in element.split(';') {
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        let val = val.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "proto" => proto = Some(val),
            "host" => host = Some(val),
            _ => {}
        }
    }

    host.filter(|h| !h.is_empty())
        .map(|h| format!("{}://{}", proto.unwrap_or("http"), h))
}

fn from_x_forwarded(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let host = header_str(headers, "x-forwarded-host").map(first_value)?;
    let proto = header_str(headers, "x-forwarded-proto")
        .map(first_value)
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");

    let port = header_str(headers, "x-forwarded-port").map(first_value);
    let has_port = host.rsplit_once(':').is_some_and(|(_, p)| p.parse::<u16>().is_ok());

    match port {
        Some(port) if !has_port && !is_default_port(proto, port) => {
            Some(format!("{proto}://{host}:{port}"))
        }
        _ => Some(format!("{proto}://{host}")),
    }
}

fn is_default_port(proto: &str, port: &str) -> bool {
    matches!((proto, port), ("http", "80") | ("https", "443"))
}
