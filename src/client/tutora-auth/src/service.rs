//! Identity service capability.
//!
//! The remote identity service (session issuance, password verification,
//! token refresh) is an external collaborator. The controllers only depend
//! on this trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tutora_identity::Session;

use crate::IdentityError;

/// Callback invoked on every session change (login elsewhere, token
/// refresh, logout elsewhere). `None` means no session.
pub type SessionCallback = Arc<dyn Fn(Option<Session>) + Send + Sync>;

/// Handle to a session-change subscription.
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a subscription that runs `unsubscribe` when disposed.
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Creates a subscription with nothing to dispose.
    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    /// Disposes the subscription now.
    pub fn unsubscribe(mut self) {
        self.dispose();
    }

    fn dispose(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Client for the remote identity service.
///
/// Timeouts and transport retries, if any, belong to the implementation;
/// callers treat every error as an ordinary failure.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Returns the current session, if any.
    async fn current_session(&self) -> Result<Option<Session>, IdentityError>;

    /// Verifies an email/password pair and opens a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    /// Terminates the current session. Best effort.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Registers a session-change callback.
    fn on_session_change(&self, callback: SessionCallback) -> Subscription;

    /// Returns the name of this service for logging/debugging.
    fn name(&self) -> &'static str;
}
