//! Per-request context handed to route handlers.
//!
//! A [`Context`] owns the matched [`Request`] plus the [`PathParams`]
//! extracted from the route pattern's `{name}` placeholders.

use std::collections::HashMap;

use crate::Request;

/// Named path parameters captured from the matched route pattern.
///
/// Values are percent-decoded before they land here: a request for
/// `/uri/vars/Brad%20Jones/37` against `/uri/vars/{name}/{age}` yields
/// `name = "Brad Jones"` and `age = "37"`.
#[derive(Default, Debug, Clone)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a captured parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    /// Returns a captured value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Returns the number of captured parameters.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when the pattern captured nothing.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Everything a handler gets to see about the request it matched.
pub struct Context {
    request: Request,
    params: PathParams,
}

impl Context {
    /// Wraps a request with no path parameters.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            params: PathParams::new(),
        }
    }

    /// Wraps a request together with the parameters its route captured.
    pub fn with_params(request: Request, params: PathParams) -> Self {
        Self { request, params }
    }

    /// Returns the matched request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns all captured path parameters.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Returns a single captured path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Deserializes the request body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the body is not
    /// valid JSON for `T`.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    #[test]
    fn param_lookup() {
        let mut params = PathParams::new();
        params.insert("name", "Brad Jones");
        params.insert("age", "37");

        let ctx = Context::with_params(Request::new(Method::Get, "/uri/vars/x/y"), params);
        assert_eq!(ctx.param("name"), Some("Brad Jones"));
        assert_eq!(ctx.param("age"), Some("37"));
        assert_eq!(ctx.param("missing"), None);
        assert_eq!(ctx.params().len(), 2);
    }

    #[test]
    fn json_body() {
        #[derive(serde::Deserialize)]
        struct Payload {
            name: String,
        }

        let request =
            Request::new(Method::Post, "/users").with_body(&br#"{"name":"gears"}"#[..]);
        let ctx = Context::new(request);
        let payload: Payload = ctx.json().unwrap();
        assert_eq!(payload.name, "gears");
    }

    #[test]
    fn json_body_invalid() {
        let request = Request::new(Method::Post, "/users").with_body(&b"not json"[..]);
        let ctx = Context::new(request);
        assert!(ctx.json::<serde_json::Value>().is_err());
    }
}
