//! Authentication state.
//!
//! This module provides:
//! - `Credentials`: the validated email/password pair, fixed per process
//! - `SessionManager`: the single cached session behind an async mutex
//!
//! Sessions live in memory only. A restart logs in again on first use.

pub mod credentials;
pub mod session;

pub use credentials::Credentials;
pub use session::{Session, SessionData, SessionManager};

#[cfg(test)]
pub(crate) use session::test_session;
