//! Error taxonomy for console construction and route resolution.
//!
//! Registration errors are programming errors: they surface at process
//! start-up and abort it. Route errors are expected at request time and
//! are logged and absorbed by the callers (navigation resolver, search
//! aggregator) rather than surfaced to end users.

use thiserror::Error;

/// Errors raised while collecting registrations and building the console.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// An entity type was registered twice with conflicting ownership.
    #[error("entity type `{0}` is already registered")]
    DuplicateRegistration(String),

    /// A registration arrived after the queue was drained, or `drain`
    /// was called a second time. A late registration would otherwise be
    /// silently dropped and produce a console missing functionality.
    #[error("registration queue is sealed; `{0}` arrived after drain")]
    SealedQueueViolation(&'static str),

    /// An autoregister request named a feature module that was never
    /// installed.
    #[error("unknown feature module `{0}`")]
    UnknownModule(String),
}

/// Errors raised when resolving a route name to a concrete URL.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no route named `{0}`")]
    UnknownRoute(String),

    /// The route template expects a different number of positional
    /// arguments than were supplied.
    #[error("route `{name}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}
