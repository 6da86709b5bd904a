//! # Tutora Identity
//!
//! Identity model shared by the Tutora client.
//!
//! ## Identity Domains
//!
//! - **End users** (students, teachers): [`User`], always derived from a
//!   remote [`Session`] through [`map_session_user`]
//! - **Administrators**: [`AdminUser`], verified locally and persisted in
//!   session-scoped storage
//!
//! The two identity types are unrelated: one can never be passed where the
//! other is expected.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
pub mod mapper;
pub mod session;
pub mod user;

pub use admin::{AdminRole, AdminUser};
pub use mapper::{map_session, map_session_user};
pub use session::{RemoteUser, Session};
pub use user::{Preferences, Role, User, UserPatch};
