//! Error surface shared by failover backends.
//!
//! Backends report failures as [`Error`]. Each error carries an
//! [`ErrorKind`]; the kinds [`ErrorKind::Unavailable`] and
//! [`ErrorKind::Timeout`] form the *infra* category, meaning the backend
//! could not reach its own dependency. Only infra errors make a router
//! switch backends. Every other kind is an operation failure and reaches
//! the caller untouched.
//!
//! When both backends fail, the error the caller sees is the fallback's,
//! with the primary's infra error attached as a *suppressed* error:
//!
//! ```rust
//! use tower_failover_core::{Classify, Error};
//!
//! let original = Error::unavailable("redis down");
//! let outcome = Error::illegal_state("local fail").with_suppressed(original);
//!
//! assert_eq!(outcome.to_string(), "local fail");
//! assert!(outcome.chain().any(|e| e.to_string() == "redis down"));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Boxed error type used at service boundaries.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Category of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend's dependency is unreachable (connection refused, reset, closed).
    Unavailable,
    /// The backend gave up waiting on its dependency.
    Timeout,
    /// The operation cannot run in the backend's current state.
    IllegalState,
    /// The operation's input was rejected (e.g. incrementing a non-integer).
    InvalidArgument,
    /// Anything not covered above.
    Other,
}

impl ErrorKind {
    /// Returns true for the kinds that signal infrastructure unavailability.
    pub fn is_infra(self) -> bool {
        matches!(self, ErrorKind::Unavailable | ErrorKind::Timeout)
    }

    /// Maps an I/O error kind onto a backend error kind.
    pub fn from_io(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => ErrorKind::Unavailable,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => {
                ErrorKind::InvalidArgument
            }
            _ => ErrorKind::Other,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::IllegalState => "illegal state",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by a capability backend.
///
/// `Display` prints only the message, so an error observed by the caller
/// reads exactly as the backend produced it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
    suppressed: Vec<Error>,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            suppressed: Vec::new(),
        }
    }

    /// Infra error: the backend's dependency is unreachable.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Infra error: the backend timed out waiting on its dependency.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Operation error: the call is not valid in the current state.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalState, message)
    }

    /// Operation error: the call's input was rejected.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Operation error of no particular kind.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, message)
    }

    /// Sets the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The error's category.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message as produced by the backend.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error signals infrastructure unavailability.
    pub fn is_infra(&self) -> bool {
        self.kind.is_infra()
    }

    /// Errors that were superseded by this one.
    pub fn suppressed(&self) -> &[Error] {
        &self.suppressed
    }

    /// Walks this error, its cause chain, and (recursively) every
    /// suppressed error with its own causes, depth first.
    ///
    /// An `Error` met inside the cause chain is walked the same way, so
    /// its suppressed errors stay reachable after it has been wrapped.
    pub fn chain(&self) -> std::vec::IntoIter<&(dyn StdError + 'static)> {
        let mut out = Vec::new();
        self.collect_chain(&mut out);
        out.into_iter()
    }

    fn collect_chain<'a>(&'a self, out: &mut Vec<&'a (dyn StdError + 'static)>) {
        out.push(self);
        let mut cause = StdError::source(self);
        while let Some(err) = cause {
            if let Some(inner) = err.downcast_ref::<Error>() {
                inner.collect_chain(out);
                break;
            }
            out.push(err);
            cause = err.source();
        }
        for suppressed in &self.suppressed {
            suppressed.collect_chain(out);
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = ErrorKind::from_io(err.kind());
        let message = err.to_string();
        Error::new(kind, message).with_source(err)
    }
}

/// How the dispatcher reads a backend error.
///
/// Implemented by [`Error`]; custom service error types implement it to be
/// routed by a failover dispatcher.
pub trait Classify: Sized {
    /// Returns true if the error means the backend is unreachable.
    fn is_infra(&self) -> bool;

    /// Returns `self` with `original` attached as a suppressed error.
    fn with_suppressed(self, original: Self) -> Self;
}

impl Classify for Error {
    fn is_infra(&self) -> bool {
        self.kind.is_infra()
    }

    fn with_suppressed(mut self, original: Self) -> Self {
        self.suppressed.push(original);
        self
    }
}
