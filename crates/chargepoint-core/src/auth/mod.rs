//! Authentication types for the vendor account.
//!
//! This module provides:
//! - `Credentials`: the username/password pair collected during setup
//! - `SessionToken`: the opaque token issued at login
//! - `Session`: the single in-memory token holder owned by the coordinator
//!
//! Nothing here touches disk; the host decides what to persist.

pub mod credentials;
pub mod session;

pub use credentials::Credentials;
pub use session::{Session, SessionToken};
