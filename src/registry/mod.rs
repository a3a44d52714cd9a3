//! The route table the lifecycle populates and dispatches against.
//!
//! All pattern and verb matching is delegated to the [`matchit`] radix
//! router — this module only adapts it: one `matchit::Router` per HTTP
//! method, type-erased handlers, and percent-decoding of captured `{name}`
//! segments.
//!
//! Pattern syntax is `matchit`'s: literal segments plus `{name}` named
//! placeholders, e.g. `/uri/vars/{name}/{age}`. Trailing slashes are
//! normalized on both patterns and incoming paths, so `/users/` and
//! `/users` are equivalent.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchRouter;
use thiserror::Error;
use tracing::{debug, trace};

use crate::context::{Context, PathParams};
use crate::http::request::decode_component;
use crate::http::{Method, Request, Response, StatusCode};

/// Type-erased handler stored in the route table.
///
/// Handlers are kept behind `Arc<dyn Fn(…)>` so the table can hand out
/// clones at dispatch time without copying the underlying closure. You never
/// construct this type directly — registration methods accept any
/// [`IntoHandler`].
pub type Handler = Arc<dyn Fn(Context) -> Response + Send + Sync + 'static>;

/// Conversion trait for handler functions.
///
/// Any `Fn(Context) -> impl IntoResponse` that is `Send + Sync + 'static`
/// qualifies via the blanket impl, so route files can return a bare string,
/// a status/body pair, or a full [`Response`].
pub trait IntoHandler: Send + Sync + 'static {
    /// Calls the handler and converts its return value into a [`Response`].
    fn call(&self, ctx: Context) -> Response;
}

impl<T, R> IntoHandler for T
where
    T: Fn(Context) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    fn call(&self, ctx: Context) -> Response {
        (self)(ctx).into_response()
    }
}

/// Conversion into a [`Response`], for terse handler return values.
pub trait IntoResponse {
    /// Converts `self` into a full response.
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::ok(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::ok(self)
    }
}

impl IntoResponse for (StatusCode, String) {
    fn into_response(self) -> Response {
        Response::new(self.0).body(self.1)
    }
}

/// A (method, pattern) pair could not be added to the table.
///
/// Uniqueness is per (method, pattern): registering the same pattern twice
/// under one method conflicts, while the same pattern under different
/// methods is fine.
#[derive(Debug, Error)]
#[error("cannot register route {pattern:?}: {source}")]
pub struct RegistrationError {
    pattern: String,
    #[source]
    source: matchit::InsertError,
}

/// No registered route matched the request.
///
/// Carried back to the lifecycle, which applies the configured not-found
/// policy; with the rethrow policy it surfaces to the embedding application.
#[derive(Debug, Error)]
#[error("no route matched {method} {path}")]
pub struct RouteNotFound {
    /// Method of the unmatched request.
    pub method: Method,
    /// Path of the unmatched request.
    pub path: String,
}

/// The registry of (method, pattern, handler) mappings.
///
/// # Examples
///
/// ```
/// use gears_router::http::{Method, Request};
/// use gears_router::registry::Registry;
///
/// let mut registry = Registry::new();
/// registry.get("/users/{id}", |ctx: gears_router::Context| format!("user {}", ctx.param("id").unwrap())).unwrap();
///
/// let response = registry.dispatch(Request::new(Method::Get, "/users/42")).unwrap();
/// assert_eq!(response.body_as_bytes(), b"user 42");
/// ```
#[derive(Default)]
pub struct Registry {
    tables: HashMap<Method, MatchRouter<Handler>>,
    len: usize,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` requests matching `pattern`.
    ///
    /// # Errors
    ///
    /// [`RegistrationError`] when the pattern is malformed or conflicts with
    /// an existing registration for the same method.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RegistrationError> {
        let normalized = normalize(pattern);
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));

        self.tables
            .entry(method.clone())
            .or_insert_with(MatchRouter::new)
            .insert(normalized, handler)
            .map_err(|source| RegistrationError {
                pattern: pattern.to_owned(),
                source,
            })?;

        self.len += 1;
        debug!(method = %method, pattern, "route registered");
        Ok(())
    }

    /// Registers a handler for `GET` requests matching `pattern`.
    pub fn get(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.register(Method::Get, pattern, handler)
    }

    /// Registers a handler for `POST` requests matching `pattern`.
    pub fn post(
        &mut self,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RegistrationError> {
        self.register(Method::Post, pattern, handler)
    }

    /// Registers a handler for `PUT` requests matching `pattern`.
    pub fn put(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.register(Method::Put, pattern, handler)
    }

    /// Registers a handler for `DELETE` requests matching `pattern`.
    pub fn delete(
        &mut self,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RegistrationError> {
        self.register(Method::Delete, pattern, handler)
    }

    /// Registers a handler for `PATCH` requests matching `pattern`.
    pub fn patch(
        &mut self,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RegistrationError> {
        self.register(Method::Patch, pattern, handler)
    }

    /// Registers a handler for `OPTIONS` requests matching `pattern`.
    pub fn options(
        &mut self,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RegistrationError> {
        self.register(Method::Options, pattern, handler)
    }

    /// Registers a handler for `HEAD` requests matching `pattern`.
    pub fn head(
        &mut self,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RegistrationError> {
        self.register(Method::Head, pattern, handler)
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dispatches `request` to the handler registered for its method and
    /// path, returning the handler's response.
    ///
    /// Captured `{name}` segments are percent-decoded and handed to the
    /// handler as [`PathParams`] on the [`Context`].
    ///
    /// # Errors
    ///
    /// [`RouteNotFound`] when no registration matches the request's method
    /// and path.
    pub fn dispatch(&self, request: Request) -> Result<Response, RouteNotFound> {
        let path = normalize(request.path());

        let not_found = |request: &Request| RouteNotFound {
            method: request.method().clone(),
            path: request.path().to_owned(),
        };

        let Some(table) = self.tables.get(request.method()) else {
            return Err(not_found(&request));
        };

        let (handler, params) = match table.at(&path) {
            Ok(matched) => {
                let mut params = PathParams::new();
                for (name, value) in matched.params.iter() {
                    params.insert(name, decode_component(value));
                }
                (Arc::clone(matched.value), params)
            }
            Err(_) => return Err(not_found(&request)),
        };

        trace!(method = %request.method(), path = %request.path(), "route matched");
        Ok(handler(Context::with_params(request, params)))
    }
}

// Strip a trailing slash so `/users/` and `/users` are the same route; the
// root `/` stays as-is.
fn normalize(path: &str) -> String {
    if path != "/" && path.ends_with('/') {
        path[..path.len() - 1].to_owned()
    } else {
        path.to_owned()
    }
}
