//! Static-call facade over the currently-active registry.
//!
//! Route files like to read as plain registration calls:
//!
//! ```no_run
//! use gears_router::Route;
//!
//! Route::get("/", |_ctx| "Hello World")?;
//! # Ok::<(), gears_router::facade::FacadeError>(())
//! ```
//!
//! That only works while a lifecycle is between "installed" and "dispatch":
//! the lifecycle publishes its registry into a thread-scoped single slot
//! before loading route files and clears it again strictly before dispatch.
//! Outside that window every facade call fails with
//! [`FacadeError::NotInstalled`], which is also what stops a late
//! registration from leaking into some other lifecycle's registry.
//!
//! The slot is thread-local rather than process-global: the execution model
//! is one lifecycle per process anyway, and thread scoping gives the same
//! single-slot discipline without locking while keeping concurrently running
//! embedders (and test threads) isolated.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::http::Method;
use crate::registry::{IntoHandler, RegistrationError, Registry};

thread_local! {
    static ACTIVE: RefCell<Option<Rc<RefCell<Registry>>>> = const { RefCell::new(None) };
}

/// Publishes `registry` as this thread's active registry.
///
/// The returned guard clears the slot on drop, so a lifecycle that aborts
/// mid-load cannot leave a stale registry behind.
pub(crate) fn activate(registry: Rc<RefCell<Registry>>) -> ActiveGuard {
    ACTIVE.with(|slot| *slot.borrow_mut() = Some(registry));
    ActiveGuard(())
}

/// Clears the active-registry slot for the lifetime of one lifecycle.
pub(crate) struct ActiveGuard(());

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.with(|slot| *slot.borrow_mut() = None);
    }
}

/// Errors raised by facade calls.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// No lifecycle is currently between install and dispatch on this
    /// thread.
    #[error("you need to install a router first")]
    NotInstalled,

    /// The forwarded registration itself failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// The static registration facade.
///
/// Every method forwards verbatim to the active registry; the verb set is
/// spelled out explicitly rather than forwarded dynamically, with
/// [`Route::register`] as the generic fallback for anything else.
pub struct Route;

impl Route {
    /// Registers `handler` for `method` requests matching `pattern` on the
    /// active registry.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NotInstalled`] outside an open lifecycle.
    /// - [`FacadeError::Registration`] when the forwarded registration fails.
    pub fn register(
        method: Method,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), FacadeError> {
        ACTIVE.with(|slot| match slot.borrow().as_ref() {
            Some(registry) => {
                registry.borrow_mut().register(method, pattern, handler)?;
                Ok(())
            }
            None => Err(FacadeError::NotInstalled),
        })
    }

    /// Registers a `GET` route on the active registry.
    pub fn get(pattern: &str, handler: impl IntoHandler) -> Result<(), FacadeError> {
        Self::register(Method::Get, pattern, handler)
    }

    /// Registers a `POST` route on the active registry.
    pub fn post(pattern: &str, handler: impl IntoHandler) -> Result<(), FacadeError> {
        Self::register(Method::Post, pattern, handler)
    }

    /// Registers a `PUT` route on the active registry.
    pub fn put(pattern: &str, handler: impl IntoHandler) -> Result<(), FacadeError> {
        Self::register(Method::Put, pattern, handler)
    }

    /// Registers a `DELETE` route on the active registry.
    pub fn delete(pattern: &str, handler: impl IntoHandler) -> Result<(), FacadeError> {
        Self::register(Method::Delete, pattern, handler)
    }

    /// Registers a `PATCH` route on the active registry.
    pub fn patch(pattern: &str, handler: impl IntoHandler) -> Result<(), FacadeError> {
        Self::register(Method::Patch, pattern, handler)
    }

    /// Registers an `OPTIONS` route on the active registry.
    pub fn options(pattern: &str, handler: impl IntoHandler) -> Result<(), FacadeError> {
        Self::register(Method::Options, pattern, handler)
    }

    /// Registers a `HEAD` route on the active registry.
    pub fn head(pattern: &str, handler: impl IntoHandler) -> Result<(), FacadeError> {
        Self::register(Method::Head, pattern, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_without_an_active_registry() {
        let err = Route::get("/", |_ctx| "nope").unwrap_err();
        assert!(matches!(err, FacadeError::NotInstalled));
    }

    #[test]
    fn forwards_to_the_active_registry() {
        let registry = Rc::new(RefCell::new(Registry::new()));
        let guard = activate(Rc::clone(&registry));

        Route::get("/a", |_ctx| "a").unwrap();
        Route::post("/a", |_ctx| "b").unwrap();
        assert_eq!(registry.borrow().len(), 2);

        drop(guard);
        // Window closed: calls fail again.
        assert!(matches!(
            Route::get("/late", |_ctx| "late").unwrap_err(),
            FacadeError::NotInstalled
        ));
        // And the late call did not land in the registry.
        assert_eq!(registry.borrow().len(), 2);
    }

    #[test]
    fn registration_errors_pass_through() {
        let registry = Rc::new(RefCell::new(Registry::new()));
        let _guard = activate(Rc::clone(&registry));

        Route::get("/dup", |_ctx| "one").unwrap();
        let err = Route::get("/dup", |_ctx| "two").unwrap_err();
        assert!(matches!(err, FacadeError::Registration(_)));
    }

    #[test]
    fn guard_clears_slot_on_drop() {
        {
            let registry = Rc::new(RefCell::new(Registry::new()));
            let _guard = activate(registry);
            Route::get("/in-window", |_ctx| "ok").unwrap();
        }
        assert!(matches!(
            Route::get("/out", |_ctx| "no").unwrap_err(),
            FacadeError::NotInstalled
        ));
    }
}
