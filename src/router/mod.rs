//! The install/dispatch lifecycle.
//!
//! A [`Router`] is configured once, run once, and handles exactly one
//! request:
//!
//! 1. a fresh [`Registry`] is created and published as the thread's active
//!    registry, opening the registration window for the [`Route`](crate::Route)
//!    facade;
//! 2. every route file under the configured path is resolved (sorted,
//!    recursive) and its bound module is run with a [`Routes`] context;
//! 3. the registration window is closed — strictly before dispatch — so no
//!    late registration can reach this registry, nor leak into the next
//!    lifecycle's;
//! 4. the request (injected, or read from the CGI environment) is dispatched
//!    through the registry and the response is written to the output
//!    channel, with unmatched requests handled per [`NotFound`] policy;
//! 5. with `exit_on_complete` (the default) the process terminates so
//!    nothing can write after the response.
//!
//! Rust has no runtime file execution, so a route file on disk does not
//! carry code; it selects, by file stem, a registration module bound with
//! [`Router::module`]. The files keep what the on-disk layout is for —
//! discovery, ordering, one-route-per-file organization — while the modules
//! are ordinary compiled functions.
//!
//! Only one lifecycle may be open per thread at a time; opening a second
//! while one is loading is a usage error, not a supported scenario.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info};

use crate::facade;
use crate::http::request::RequestError;
use crate::http::{Method, Request, Response, StatusCode};
use crate::loader::{self, LoaderError};
use crate::registry::{IntoHandler, RegistrationError, Registry, RouteNotFound};

/// The default 404 page, derived from the html5-boilerplate error page.
///
/// Self-contained and deliberately padded past 512 bytes: several legacy
/// browsers replace shorter error bodies with their own page.
pub const NOT_FOUND_PAGE: &str = r#"<!doctype html>
<html lang="en">
	<head>
		<meta charset="utf-8">
		<title>Page Not Found</title>
		<meta name="viewport" content="width=device-width, initial-scale=1">
		<style>
			* { line-height: 1.2; margin: 0; }
			html { color: #888; display: table; font-family: sans-serif; height: 100%; text-align: center; width: 100%; }
			body { display: table-cell; vertical-align: middle; margin: 2em auto; }
			h1 { color: #555; font-size: 2em; font-weight: 400; }
			p { margin: 0 auto; width: 280px; }
			@media only screen and (max-width: 280px)
			{
				body, p { width: 95%; }
				h1 { font-size: 1.5em; margin: 0 0 0.3em 0; }
			}
		</style>
	</head>
	<body>
		<h1>Page Not Found</h1>
		<p>Sorry, but the page you were trying to view does not exist.</p>
	</body>
</html>
"#;

/// Policy for requests no route matches. Chosen at construction time and
/// immutable for the run.
#[derive(Debug, Clone, Default)]
pub enum NotFound {
    /// Send `404` with the built-in [`NOT_FOUND_PAGE`].
    #[default]
    DefaultPage,
    /// Send `404` with the given body.
    Custom(String),
    /// Do not handle the miss: return [`RouterError::NotFound`] to the
    /// caller, which then owns 404 handling.
    Rethrow,
}

/// Error type route modules may return.
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// What a route module returns.
pub type LoadResult = Result<(), LoadError>;

type RouteModule = Box<dyn Fn(&Routes) -> LoadResult>;

/// Registration context passed to each route module.
///
/// Carries the open lifecycle's registry explicitly, as the alternative to
/// the global-looking [`Route`](crate::Route) facade — both land in the same
/// registry while the window is open.
pub struct Routes {
    registry: Rc<RefCell<Registry>>,
}

impl Routes {
    /// Registers `handler` for `method` requests matching `pattern`.
    ///
    /// # Errors
    ///
    /// [`RegistrationError`] on a malformed or conflicting pattern.
    pub fn register(
        &self,
        method: Method,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RegistrationError> {
        self.registry.borrow_mut().register(method, pattern, handler)
    }

    /// Registers a `GET` route.
    pub fn get(&self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.registry.borrow_mut().get(pattern, handler)
    }

    /// Registers a `POST` route.
    pub fn post(&self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.registry.borrow_mut().post(pattern, handler)
    }

    /// Registers a `PUT` route.
    pub fn put(&self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.registry.borrow_mut().put(pattern, handler)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.registry.borrow_mut().delete(pattern, handler)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.registry.borrow_mut().patch(pattern, handler)
    }

    /// Registers an `OPTIONS` route.
    pub fn options(&self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.registry.borrow_mut().options(pattern, handler)
    }

    /// Registers a `HEAD` route.
    pub fn head(&self, pattern: &str, handler: impl IntoHandler) -> Result<(), RegistrationError> {
        self.registry.borrow_mut().head(pattern, handler)
    }
}

/// Errors raised by [`Router::install`].
///
/// Everything here propagates to the caller uncaught; only the not-found
/// condition is subject to policy, and it appears as [`RouterError::NotFound`]
/// solely under [`NotFound::Rethrow`].
#[derive(Debug, Error)]
pub enum RouterError {
    /// The routes path could not be resolved. Raised before any
    /// registration.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// A discovered route file has no module bound to its stem.
    #[error("route file {path:?} has no bound module")]
    UnboundRouteFile {
        /// The discovered file.
        path: PathBuf,
    },

    /// A route module returned an error; the lifecycle aborted immediately
    /// and no partial registry state was used.
    #[error("route file {path:?} failed to load")]
    RouteFile {
        /// The route file whose module failed.
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    /// The ambient request could not be constructed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// No route matched and the policy is [`NotFound::Rethrow`].
    #[error(transparent)]
    NotFound(#[from] RouteNotFound),

    /// The response could not be written to the output channel.
    #[error("failed to send response")]
    Send(#[from] std::io::Error),
}

/// The single-shot dispatch lifecycle.
///
/// # Examples
///
/// ```no_run
/// use gears_router::{Route, Router};
///
/// // routes/home.routes and routes/users.routes exist on disk.
/// Router::new("routes")
///     .module("home", |r| {
///         r.get("/", |_ctx| "Hello World")?;
///         Ok(())
///     })
///     .module("users", |_r| {
///         // Modules may equally use the static facade.
///         Route::get("/users/{id}", |ctx: gears_router::Context| format!("user {}", ctx.param("id").unwrap()))?;
///         Ok(())
///     })
///     .install()?;
/// # Ok::<(), gears_router::RouterError>(())
/// ```
pub struct Router {
    routes_path: PathBuf,
    not_found: NotFound,
    exit_on_complete: bool,
    request: Option<Request>,
    modules: HashMap<String, RouteModule>,
}

impl Router {
    /// Creates a lifecycle for the given routes path (a single route file or
    /// a directory of them).
    ///
    /// Defaults: default 404 page, `exit_on_complete = true`, request read
    /// from the CGI environment.
    pub fn new(routes_path: impl Into<PathBuf>) -> Self {
        Self {
            routes_path: routes_path.into(),
            not_found: NotFound::default(),
            exit_on_complete: true,
            request: None,
            modules: HashMap::new(),
        }
    }

    /// Sets the not-found policy for this run.
    #[must_use]
    pub fn not_found(mut self, policy: NotFound) -> Self {
        self.not_found = policy;
        self
    }

    /// Controls whether the process terminates after the response is sent.
    ///
    /// Defaults to `true`, guaranteeing nothing can corrupt the response
    /// stream afterwards; long-lived embeddings opt out.
    #[must_use]
    pub fn exit_on_complete(mut self, exit: bool) -> Self {
        self.exit_on_complete = exit;
        self
    }

    /// Injects the request to dispatch instead of reading the CGI
    /// environment. Used by embeddings that already hold a request, and by
    /// tests.
    #[must_use]
    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Binds a registration module to a route-file stem.
    ///
    /// `stem` is the file name minus its final extension: a discovered
    /// `routes/foobar.GET.routes` runs the module bound to `"foobar.GET"`.
    /// A discovered file with no binding aborts the lifecycle.
    #[must_use]
    pub fn module(
        mut self,
        stem: impl Into<String>,
        module: impl Fn(&Routes) -> LoadResult + 'static,
    ) -> Self {
        self.modules.insert(stem.into(), Box::new(module));
        self
    }

    /// Runs the lifecycle and writes the response to standard output.
    ///
    /// Does not return when `exit_on_complete` is set: the process
    /// terminates with a success status right after the response is flushed.
    ///
    /// # Errors
    ///
    /// See [`RouterError`]; all of them abort before or instead of sending a
    /// response.
    pub fn install(self) -> Result<(), RouterError> {
        self.install_to(&mut std::io::stdout().lock())
    }

    /// Alias of [`Router::install`] — it reads better to dispatch a router
    /// than to install one once configuration is out of the way.
    ///
    /// # Errors
    ///
    /// Same as [`Router::install`].
    pub fn dispatch(self) -> Result<(), RouterError> {
        self.install()
    }

    /// Runs the lifecycle against an explicit output channel.
    ///
    /// # Errors
    ///
    /// Same as [`Router::install`].
    pub fn install_to(mut self, out: &mut impl Write) -> Result<(), RouterError> {
        let registry = Rc::new(RefCell::new(Registry::new()));
        let window = facade::activate(Rc::clone(&registry));
        info!(path = %self.routes_path.display(), "installing router");

        let files = loader::resolve(&self.routes_path)?;
        let routes = Routes {
            registry: Rc::clone(&registry),
        };
        for file in &files {
            let key = module_key(file);
            let module = self
                .modules
                .get(&key)
                .ok_or_else(|| RouterError::UnboundRouteFile { path: file.clone() })?;
            debug!(file = %file.display(), module = %key, "loading route file");
            module(&routes).map_err(|source| RouterError::RouteFile {
                path: file.clone(),
                source,
            })?;
        }

        // Close the registration window strictly before dispatch: from here
        // on no facade call can reach this registry, and a subsequently
        // constructed lifecycle starts from a clean slot.
        drop(window);

        let request = match self.request.take() {
            Some(request) => request,
            None => Request::from_env()?,
        };
        info!(
            method = %request.method(),
            path = %request.path(),
            routes = registry.borrow().len(),
            "dispatching request"
        );

        match registry.borrow().dispatch(request) {
            Ok(response) => response.send_to(out)?,
            Err(miss) => match &self.not_found {
                NotFound::Rethrow => return Err(miss.into()),
                NotFound::Custom(body) => Response::new(StatusCode::NotFound)
                    .body(body.clone())
                    .send_to(out)?,
                NotFound::DefaultPage => Response::new(StatusCode::NotFound)
                    .header("Content-Type", "text/html; charset=utf-8")
                    .body(NOT_FOUND_PAGE)
                    .send_to(out)?,
            },
        }

        if self.exit_on_complete {
            info!("response sent — exiting");
            std::process::exit(0);
        }
        Ok(())
    }
}

// Binding key for a discovered route file: file name minus final extension.
fn module_key(file: &Path) -> String {
    file.file_stem()
        .unwrap_or_else(|| file.as_os_str())
        .to_string_lossy()
        .into_owned()
}
