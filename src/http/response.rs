//! HTTP response builder and output-channel writer.
//!
//! A [`Response`] is built fluently by a handler (or by the lifecycle's 404
//! path) and then written exactly once to the process's output channel with
//! [`Response::send`] / [`Response::send_to`].

use std::io::Write;

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use super::{Headers, StatusCode};

/// An HTTP response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use gears_router::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("X-Request-Id", "abc-123")
///     .body("Hello World");
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 11\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Shorthand for a `200 OK` response with a text body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::Ok).body(body)
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body from a string.
    ///
    /// `Content-Length` is written automatically at serialization time.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `value` as the JSON body and sets the `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when `value` cannot be
    /// serialized.
    pub fn json(mut self, value: &impl Serialize) -> Result<Self, serde_json::Error> {
        self.body = serde_json::to_vec(value)?;
        self.headers.set("Content-Type", "application/json");
        Ok(self)
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers accumulated so far.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body bytes.
    pub fn body_as_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the response into HTTP/1.1 wire format.
    ///
    /// Adds `Content-Type: text/plain; charset=utf-8` when the body is
    /// non-empty and no `Content-Type` was set, and always writes
    /// `Content-Length`.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        if !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        let estimated_size = 64 + self.headers.len() * 48 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        // Content-Length is always the last header before the blank line.
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(&b"\r\n"[..]);

        if !self.body.is_empty() {
            buf.put(self.body.as_slice());
        }

        buf
    }

    /// Writes the serialized response to `out` and flushes it.
    ///
    /// # Errors
    ///
    /// Any I/O error from the underlying writer.
    pub fn send_to(self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(&self.into_bytes())?;
        out.flush()
    }

    /// Writes the serialized response to the process's standard output.
    ///
    /// This is the output channel of the request-per-process model: the web
    /// server on the other side of stdout relays the bytes to the client.
    ///
    /// # Errors
    ///
    /// Any I/O error from stdout.
    pub fn send(self) -> std::io::Result<()> {
        self.send_to(&mut std::io::stdout().lock())
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(r: Response) -> String {
        String::from_utf8(r.into_bytes().to_vec()).unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let s = to_string(Response::ok("Hello"));
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn custom_header_is_written() {
        let s = to_string(Response::ok("ok").header("X-Request-Id", "abc-123"));
        assert!(s.contains("X-Request-Id: abc-123\r\n"));
    }

    #[test]
    fn empty_body_has_no_content_type() {
        let s = to_string(Response::new(StatusCode::NoContent));
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let s = to_string(
            Response::new(StatusCode::NotFound)
                .header("Content-Type", "text/html; charset=utf-8")
                .body("<h1>gone</h1>"),
        );
        let occurrences = s.matches("Content-Type").count();
        assert_eq!(occurrences, 1);
        assert!(s.contains("Content-Type: text/html; charset=utf-8\r\n"));
    }

    #[test]
    fn json_body_sets_content_type() {
        #[derive(serde::Serialize)]
        struct Payload {
            ok: bool,
        }
        let s = to_string(
            Response::new(StatusCode::Ok)
                .json(&Payload { ok: true })
                .unwrap(),
        );
        assert!(s.contains("Content-Type: application/json\r\n"));
        assert!(s.ends_with(r#"{"ok":true}"#));
    }

    #[test]
    fn send_to_writes_everything() {
        let mut out = Vec::new();
        Response::new(StatusCode::NotFound)
            .body("Not Found")
            .send_to(&mut out)
            .unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(s.ends_with("Not Found"));
    }
}
