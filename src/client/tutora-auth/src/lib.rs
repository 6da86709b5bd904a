//! # Tutora Auth
//!
//! Authentication and session-state synchronization for the Tutora client.
//!
//! ## Identity Domains
//!
//! - **End users**: [`SessionController`] hydrates from an
//!   [`IdentityService`], follows its session-change notifications and
//!   exposes [`AuthContext`] to consumers
//! - **Administrators**: [`AdminSessionController`] reads and writes a
//!   [`tutora_storage::SessionStorage`] and exposes [`AdminAuthContext`]
//!
//! ## Route Guards
//!
//! - [`RouteGuard`]: loading, protected content, or a blocking view
//! - [`AdminRouteGuard`]: loading, protected content, or a redirect to the
//!   admin sign-in view

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
pub mod config;
pub mod context;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod memory;
pub mod navigation;
pub mod service;

pub use admin::{AdminAuthContext, AdminSessionController, AdminSnapshot};
pub use config::SessionConfig;
pub use context::{
    provide_admin_auth, provide_auth, try_use_admin_auth, try_use_auth, use_admin_auth, use_auth,
    Scope,
};
pub use controller::{AuthContext, AuthSnapshot, SessionController};
pub use credentials::{
    admin_sign_in, AdminAuthenticator, AdminCredential, AdminDirectory, Argon2AdminAuthenticator,
    MemoryAdminDirectory,
};
pub use error::{AuthError, IdentityError};
pub use guard::{
    AdminGuardView, AdminRouteGuard, GuardState, GuardView, RouteGuard, UnauthorizedView,
};
pub use memory::{InMemoryIdentityService, ServiceCall};
pub use navigation::{NavigationEvent, Navigator, RecordingNavigator};
pub use service::{IdentityService, SessionCallback, Subscription};
