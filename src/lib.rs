//! # gears-router
//!
//! A thin convenience layer over the [`matchit`] routing engine: route
//! definitions live one-per-file in a directory, registration reads as terse
//! `Route::get(...)` calls, and one incoming request is dispatched per
//! process with a built-in 404 page for everything unmatched.
//!
//! This crate does no route matching of its own — pattern and verb dispatch
//! are `matchit`'s job. What it adds is the lifecycle around it: route-file
//! discovery, the registration window, single-shot dispatch, and not-found
//! handling.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gears_router::{NotFound, Route, Router};
//!
//! fn main() -> Result<(), gears_router::RouterError> {
//!     // routes/ holds one file per route, e.g. routes/index.GET.routes;
//!     // each file's stem selects a registration module bound here.
//!     Router::new("routes")
//!         .module("index.GET", |_r| {
//!             Route::get("/", |_ctx| "Hello World")?;
//!             Ok(())
//!         })
//!         .module("users.GET", |r| {
//!             r.get("/users/{id}", |ctx: gears_router::Context| {
//!                 format!("user {}", ctx.param("id").unwrap_or("?"))
//!             })?;
//!             Ok(())
//!         })
//!         .not_found(NotFound::DefaultPage)
//!         .install() // dispatches the CGI request, then exits the process
//! }
//! ```

pub mod context;
pub mod facade;
pub mod http;
pub mod loader;
pub mod registry;
pub mod router;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use context::{Context, PathParams};
pub use facade::{FacadeError, Route};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use registry::{Handler, IntoHandler, IntoResponse, RegistrationError, Registry, RouteNotFound};
pub use router::{LoadError, LoadResult, NotFound, Router, RouterError, Routes};
