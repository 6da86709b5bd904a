//! Route guards.
//!
//! A guard turns the current identity state into a rendering decision:
//!
//! - **Pending**: identity not resolved yet, show a loading indicator
//! - **Authorized**: identity present, show the protected content
//! - **Unauthorized**: identity resolved to absent
//!
//! The end-user guard renders a blocking view on `Unauthorized` and lets the
//! visitor choose where to go. The admin guard reveals nothing and redirects
//! to the admin sign-in view instead.

use std::sync::Arc;

use tracing::debug;
use tutora_identity::{AdminUser, User};

use crate::{AdminSnapshot, AuthSnapshot, Navigator, SessionConfig};

/// Guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Identity source not resolved yet.
    Pending,
    /// Identity present.
    Authorized,
    /// Identity resolved to absent.
    Unauthorized,
}

impl GuardState {
    fn resolve(is_loading: bool, present: bool) -> Self {
        match (is_loading, present) {
            (true, _) => Self::Pending,
            (false, true) => Self::Authorized,
            (false, false) => Self::Unauthorized,
        }
    }
}

/// Actions offered to a visitor blocked by [`RouteGuard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedView {
    /// Sign-in page.
    pub sign_in: String,
    /// Sign-up page.
    pub sign_up: String,
    /// Site root.
    pub home: String,
}

/// What an end-user route renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView<T> {
    /// Loading indicator.
    Loading,
    /// The protected content.
    Protected(T),
    /// Blocking view with sign-in, sign-up and home actions.
    Unauthorized(UnauthorizedView),
}

/// Guard for end-user routes.
#[derive(Debug)]
pub struct RouteGuard {
    state: GuardState,
    view: UnauthorizedView,
}

impl RouteGuard {
    /// Creates a guard in the `Pending` state.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            state: GuardState::Pending,
            view: UnauthorizedView {
                sign_in: config.sign_in_path.clone(),
                sign_up: config.sign_up_path.clone(),
                home: config.home_path.clone(),
            },
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Re-evaluates the guard against `snapshot`.
    pub fn evaluate(&mut self, snapshot: &AuthSnapshot) -> GuardState {
        let next = GuardState::resolve(snapshot.is_loading, snapshot.user.is_some());
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "Route guard transition");
            self.state = next;
        }
        next
    }

    /// Evaluates the guard and builds the view; `protected` runs only when
    /// authorized.
    pub fn render<T>(
        &mut self,
        snapshot: &AuthSnapshot,
        protected: impl FnOnce(&User) -> T,
    ) -> GuardView<T> {
        match (self.evaluate(snapshot), snapshot.user.as_ref()) {
            (GuardState::Authorized, Some(user)) => GuardView::Protected(protected(user)),
            (GuardState::Unauthorized, _) => GuardView::Unauthorized(self.view.clone()),
            _ => GuardView::Loading,
        }
    }
}

/// What an admin route renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminGuardView<T> {
    /// Loading indicator.
    Loading,
    /// The protected content.
    Protected(T),
    /// Nothing: a redirect to the admin sign-in view was issued.
    Redirecting,
}

/// Guard for admin routes.
pub struct AdminRouteGuard {
    state: GuardState,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl AdminRouteGuard {
    /// Creates a guard in the `Pending` state.
    pub fn new(navigator: Arc<dyn Navigator>, config: &SessionConfig) -> Self {
        Self {
            state: GuardState::Pending,
            navigator,
            login_path: config.admin_login_path.clone(),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Re-evaluates the guard against `snapshot`.
    ///
    /// Entering `Unauthorized` issues exactly one redirect; staying there
    /// issues none.
    pub fn evaluate(&mut self, snapshot: &AdminSnapshot) -> GuardState {
        let next = GuardState::resolve(snapshot.is_loading, snapshot.admin.is_some());
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "Admin guard transition");
            self.state = next;
            if next == GuardState::Unauthorized {
                self.navigator.navigate_to(&self.login_path);
            }
        }
        next
    }

    /// Evaluates the guard and builds the view; `protected` runs only when
    /// authorized.
    pub fn render<T>(
        &mut self,
        snapshot: &AdminSnapshot,
        protected: impl FnOnce(&AdminUser) -> T,
    ) -> AdminGuardView<T> {
        match (self.evaluate(snapshot), snapshot.admin.as_ref()) {
            (GuardState::Authorized, Some(admin)) => AdminGuardView::Protected(protected(admin)),
            (GuardState::Unauthorized, _) => AdminGuardView::Redirecting,
            _ => AdminGuardView::Loading,
        }
    }
}
