//! Core infrastructure for tower-failover.
//!
//! This crate provides the pieces shared by every failover capability:
//! - Event system for observability of routing decisions
//! - The backend error surface ([`Error`], [`ErrorKind`]) and the
//!   [`Classify`] trait that separates infrastructure failures from
//!   operation failures

pub mod error;
pub mod events;

pub use error::{BoxError, Classify, Error, ErrorKind};
pub use events::{EventListener, EventListeners, FnListener, RouterEvent};
