//! The incoming request representation.
//!
//! A [`Request`] can come from three places:
//!
//! - [`Request::new`] — built directly by the embedding application (or a
//!   test) and injected into the lifecycle;
//! - [`Request::parse`] — a buffered raw HTTP/1.1 request, parsed with the
//!   [`httparse`] crate;
//! - [`Request::from_env`] — the ambient CGI environment of a
//!   request-per-process deployment (`REQUEST_METHOD`, `PATH_INFO`,
//!   `QUERY_STRING`, `HTTP_*`, body on stdin).

use std::collections::HashMap;
use std::io::Read;

use bytes::Bytes;
use percent_encoding::percent_decode_str;
use thiserror::Error;

use super::{Headers, Method};

/// Errors raised while constructing a [`Request`].
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("missing required CGI variable: {var}")]
    MissingVar { var: &'static str },

    #[error("CONTENT_LENGTH is not a valid length: {value:?}")]
    InvalidContentLength { value: String },

    #[error("failed to read request body")]
    Io(#[from] std::io::Error),
}

/// Percent-decode a single path or query component.
///
/// Invalid UTF-8 after decoding is replaced rather than rejected; a routing
/// layer has no better answer for it than the handler does.
pub(crate) fn decode_component(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Parses `key=value&key2=value2` into a map, percent-decoding keys and
/// values and treating `+` as a space per form encoding.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = decode_component(&parts.next()?.replace('+', " "));
            let value = decode_component(&parts.next().unwrap_or("").replace('+', " "));
            Some((key, value))
        })
        .collect()
}

/// An incoming HTTP request, read-only from the router's perspective.
///
/// # Examples
///
/// ```
/// use gears_router::http::{Method, Request};
///
/// let request = Request::new(Method::Get, "/search?q=hello+world");
/// assert_eq!(request.path(), "/search");
/// assert_eq!(request.query_param("q"), Some("hello world"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    query_params: HashMap<String, String>,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers accepted by [`Request::parse`].
    const MAX_HEADERS: usize = 64;

    /// Builds a request directly from a method and a request target.
    ///
    /// `target` may include a query string (`/search?q=hello`).
    pub fn new(method: Method, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = split_target(target);
        let query_params = query.as_deref().map(parse_query_string).unwrap_or_default();
        Self {
            method,
            path,
            query,
            query_params,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Adds a header to the request. Builder-style, for injected requests.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the request body. Builder-style, for injected requests.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Parses a buffered raw HTTP/1.1 request.
    ///
    /// Returns the request and the byte offset at which the body begins in
    /// `buf` (immediately after the `\r\n\r\n` terminator). Everything past
    /// the offset is taken as the body.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`] — the headers are not fully buffered.
    /// - [`RequestError::Parse`] — the bytes are not a valid request.
    /// - [`RequestError::MissingField`] — method or path absent.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw = httparse::Request::new(&mut headers);

        let body_offset = match raw.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method: Method = raw
            .method
            .ok_or(RequestError::MissingField { field: "method" })?
            .parse()
            .unwrap(); // Infallible

        let target = raw
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;
        let (path, query) = split_target(target);

        let mut header_map = Headers::with_capacity(raw.headers.len());
        for header in raw.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        let query_params = query.as_deref().map(parse_query_string).unwrap_or_default();
        let body = Bytes::copy_from_slice(&buf[body_offset..]);

        Ok((
            Self {
                method,
                path,
                query,
                query_params,
                headers: header_map,
                body,
            },
            body_offset,
        ))
    }

    /// Builds the request from the ambient CGI environment.
    ///
    /// Reads `REQUEST_METHOD`, `PATH_INFO` (falling back to `REQUEST_URI`),
    /// `QUERY_STRING`, `CONTENT_TYPE`, `CONTENT_LENGTH` and every `HTTP_*`
    /// variable from the process environment, and the body (when
    /// `CONTENT_LENGTH` is set) from stdin.
    ///
    /// # Errors
    ///
    /// - [`RequestError::MissingVar`] — `REQUEST_METHOD` is absent.
    /// - [`RequestError::InvalidContentLength`] — `CONTENT_LENGTH` is not a
    ///   number.
    /// - [`RequestError::Io`] — the body could not be read.
    pub fn from_env() -> Result<Self, RequestError> {
        Self::from_cgi(std::env::vars(), std::io::stdin().lock())
    }

    /// CGI construction over injected sources, so tests and non-standard
    /// embeddings do not have to mutate the real process environment.
    pub fn from_cgi(
        vars: impl IntoIterator<Item = (String, String)>,
        mut body_source: impl Read,
    ) -> Result<Self, RequestError> {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let method: Method = vars
            .get("REQUEST_METHOD")
            .ok_or(RequestError::MissingVar {
                var: "REQUEST_METHOD",
            })?
            .parse()
            .unwrap(); // Infallible

        // PATH_INFO is the script-relative path; fall back to the full
        // REQUEST_URI, and to "/" for servers that set neither on the root.
        let (path, uri_query) = match vars.get("PATH_INFO") {
            Some(p) if !p.is_empty() => (p.clone(), None),
            _ => match vars.get("REQUEST_URI") {
                Some(uri) => split_target(uri),
                None => ("/".to_owned(), None),
            },
        };

        let query = vars
            .get("QUERY_STRING")
            .filter(|q| !q.is_empty())
            .cloned()
            .or(uri_query);

        let mut headers = Headers::new();
        for (name, value) in &vars {
            if let Some(raw) = name.strip_prefix("HTTP_") {
                headers.insert(cgi_header_name(raw), value.clone());
            }
        }
        if let Some(ct) = vars.get("CONTENT_TYPE") {
            headers.set("Content-Type", ct.clone());
        }
        if let Some(cl) = vars.get("CONTENT_LENGTH") {
            headers.set("Content-Length", cl.clone());
        }

        let body = match vars.get("CONTENT_LENGTH") {
            Some(cl) if !cl.is_empty() => {
                let length: u64 =
                    cl.parse()
                        .map_err(|_| RequestError::InvalidContentLength {
                            value: cl.clone(),
                        })?;
                let mut buf = Vec::with_capacity(length as usize);
                body_source.by_ref().take(length).read_to_end(&mut buf)?;
                Bytes::from(buf)
            }
            _ => Bytes::new(),
        };

        let query_params = query.as_deref().map(parse_query_string).unwrap_or_default();

        Ok(Self {
            method,
            path,
            query,
            query_params,
            headers,
            body,
        })
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns a decoded query parameter value by key.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the `Content-Length` header parsed as a `usize`, if present.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.parse().ok()
    }
}

// Splits a request target into (path, query).
fn split_target(target: &str) -> (String, Option<String>) {
    match target.find('?') {
        Some(pos) => (
            target[..pos].to_owned(),
            Some(target[pos + 1..].to_owned()),
        ),
        None => (target.to_owned(), None),
    }
}

// HTTP_USER_AGENT → User-Agent.
fn cgi_header_name(raw: &str) -> String {
    raw.split('_')
        .map(|word| {
            let mut out = String::with_capacity(word.len());
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
            }
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
            out
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_splits_target() {
        let req = Request::new(Method::Get, "/search?q=rust&page=2");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query_string(), Some("q=rust&page=2"));
        assert_eq!(req.query_param("q"), Some("rust"));
        assert_eq!(req.query_param("page"), Some("2"));
    }

    #[test]
    fn query_params_are_decoded() {
        let req = Request::new(Method::Get, "/greet?name=Brad%20Jones&msg=hi+there");
        assert_eq!(req.query_param("name"), Some("Brad Jones"));
        assert_eq!(req.query_param("msg"), Some("hi there"));
    }

    #[test]
    fn parse_simple_get() {
        let raw = b"GET /hello?name=world HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/hello");
        assert_eq!(req.query_param("name"), Some("world"));
        assert_eq!(req.headers().get("host"), Some("localhost"));
        assert_eq!(offset, raw.len());
    }

    #[test]
    fn parse_with_body() {
        let raw = b"POST /submit HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.content_length(), Some(5));
        assert_eq!(req.body().as_ref(), b"hello");
    }

    #[test]
    fn parse_incomplete() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        assert!(matches!(Request::parse(raw), Err(RequestError::Incomplete)));
    }

    #[test]
    fn cgi_basic() {
        let vars = [
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/foobar"),
            ("QUERY_STRING", "a=1"),
            ("CONTENT_TYPE", "text/plain"),
            ("CONTENT_LENGTH", "4"),
            ("HTTP_USER_AGENT", "curl/8"),
        ]
        .map(|(k, v)| (k.to_owned(), v.to_owned()));

        let req = Request::from_cgi(vars, &b"ping"[..]).unwrap();
        assert_eq!(req.method(), &Method::Post);
        assert_eq!(req.path(), "/foobar");
        assert_eq!(req.query_param("a"), Some("1"));
        assert_eq!(req.headers().get("user-agent"), Some("curl/8"));
        assert_eq!(req.headers().get("content-type"), Some("text/plain"));
        assert_eq!(req.body().as_ref(), b"ping");
    }

    #[test]
    fn cgi_falls_back_to_request_uri() {
        let vars = [
            ("REQUEST_METHOD", "GET"),
            ("REQUEST_URI", "/users/7?full=1"),
        ]
        .map(|(k, v)| (k.to_owned(), v.to_owned()));

        let req = Request::from_cgi(vars, std::io::empty()).unwrap();
        assert_eq!(req.path(), "/users/7");
        assert_eq!(req.query_param("full"), Some("1"));
    }

    #[test]
    fn cgi_requires_method() {
        let vars = [("PATH_INFO".to_owned(), "/".to_owned())];
        let err = Request::from_cgi(vars, std::io::empty()).unwrap_err();
        assert!(matches!(
            err,
            RequestError::MissingVar {
                var: "REQUEST_METHOD"
            }
        ));
    }

    #[test]
    fn cgi_rejects_bad_content_length() {
        let vars = [
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/"),
            ("CONTENT_LENGTH", "many"),
        ]
        .map(|(k, v)| (k.to_owned(), v.to_owned()));

        let err = Request::from_cgi(vars, std::io::empty()).unwrap_err();
        assert!(matches!(err, RequestError::InvalidContentLength { .. }));
    }

    #[test]
    fn header_name_mapping() {
        assert_eq!(cgi_header_name("USER_AGENT"), "User-Agent");
        assert_eq!(cgi_header_name("ACCEPT"), "Accept");
        assert_eq!(cgi_header_name("X_FORWARDED_FOR"), "X-Forwarded-For");
    }
}
