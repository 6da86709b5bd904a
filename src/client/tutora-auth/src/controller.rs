//! End-user session controller.
//!
//! Owns the lifecycle of the end-user identity: hydration from the identity
//! service, live session-change subscription, explicit login/logout and
//! local profile patching.
//!
//! ## Ordering
//!
//! Login and logout results are applied in completion order: the last call
//! to finish decides the published user. Two results are dropped as stale:
//!
//! - a login result, if a logout completed after that login was issued
//! - a hydration result, if any login, logout or notification was applied
//!   before it resolved
//!
//! After [`SessionController::stop`] nothing is applied at all.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use tutora_identity::{map_session, map_session_user, Session, User, UserPatch};

use crate::{
    AuthError, IdentityError, IdentityService, Navigator, SessionCallback, SessionConfig,
    Subscription,
};

/// Lifecycle phase shared by both controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Active,
    Stopped,
}

/// Published end-user identity state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    /// Current user, `None` when signed out.
    pub user: Option<User>,
    /// True until hydration resolves, and during login/logout.
    pub is_loading: bool,
}

impl AuthSnapshot {
    /// Returns true if a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }
}

/// Counters observed when an operation was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    applied: u64,
    logouts: u64,
}

enum Outcome {
    /// Publish the signed-in user, unless a logout completed meanwhile.
    SignedIn(User),
    /// Clear the user.
    SignedOut,
    /// Leave the current user untouched.
    Keep,
}

struct Lifecycle {
    phase: Phase,
    subscription: Option<Subscription>,
    /// Results applied so far (login, logout, notification).
    applied: u64,
    /// Logouts completed so far.
    logouts: u64,
    hydrating: bool,
    in_flight: usize,
}

impl Lifecycle {
    fn ticket(&self) -> Ticket {
        Ticket {
            applied: self.applied,
            logouts: self.logouts,
        }
    }

    /// Resolves `outcome` against the counters and records it if applied.
    /// Returns the user to publish, if any.
    fn resolve(&mut self, ticket: Ticket, outcome: Outcome) -> Option<Option<User>> {
        match outcome {
            Outcome::SignedIn(user) if ticket.logouts == self.logouts => {
                self.applied += 1;
                Some(Some(user))
            },
            Outcome::SignedOut => {
                self.applied += 1;
                self.logouts += 1;
                Some(None)
            },
            Outcome::SignedIn(_) | Outcome::Keep => None,
        }
    }

    fn is_loading(&self) -> bool {
        self.hydrating || self.in_flight > 0
    }
}

struct Shared {
    service: Arc<dyn IdentityService>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    state: watch::Sender<AuthSnapshot>,
    lifecycle: Mutex<Lifecycle>,
}

impl Shared {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self) -> bool {
        self.lifecycle().phase == Phase::Active
    }

    fn apply_notification(&self, session: Option<&Session>) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.phase != Phase::Active {
            debug!("Ignoring session change after stop");
            return;
        }

        lifecycle.applied += 1;
        let user = map_session(session);
        debug!(
            user_id = user.as_ref().map(|u| u.id.as_str()),
            "Session changed"
        );
        self.state.send_modify(|snapshot| snapshot.user = user);
    }

    fn finish_hydration(&self, ticket: Ticket, result: Result<Option<Session>, IdentityError>) {
        let mut lifecycle = self.lifecycle();
        lifecycle.hydrating = false;
        if lifecycle.phase != Phase::Active {
            debug!("Discarding hydration result after stop");
            return;
        }

        let user = match result {
            Ok(session) => map_session(session.as_ref()),
            Err(e) => {
                warn!(error = %e, "Session hydration failed, continuing signed out");
                None
            },
        };

        let current = ticket.applied == lifecycle.applied;
        if !current {
            debug!("Discarding stale hydration result");
        }
        let is_loading = lifecycle.is_loading();
        self.state.send_modify(|snapshot| {
            if current {
                snapshot.user = user;
            }
            snapshot.is_loading = is_loading;
        });
        info!(
            authenticated = self.state.borrow().is_authenticated(),
            "Session hydrated"
        );
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let operation = Operation::begin(self)?;
        debug!(email = %email, service = self.service.name(), "Signing in");

        match self.service.sign_in_with_password(email, password).await {
            Ok(session) => {
                let user = map_session_user(&session.user);
                if operation.complete(Outcome::SignedIn(user.clone())) {
                    info!(user_id = %user.id, "Signed in");
                } else {
                    debug!(user_id = %user.id, "Sign-in result superseded by a logout");
                }
                Ok(user)
            },
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                operation.complete(Outcome::Keep);
                Err(AuthError::SignIn(e.user_message()))
            },
        }
    }

    async fn logout(&self) {
        let operation = match Operation::begin(self) {
            Ok(operation) => operation,
            Err(e) => {
                warn!(error = %e, "Ignoring logout");
                return;
            },
        };

        if let Err(e) = self.service.sign_out().await {
            warn!(error = %e, "Remote sign-out failed, clearing local session anyway");
        }

        if operation.complete(Outcome::SignedOut) {
            info!("Signed out");
            self.navigator.navigate_to(&self.config.home_path);
            self.navigator.refresh_current_view();
        } else {
            debug!("Controller stopped during sign-out");
        }
    }

    fn update_user(&self, patch: UserPatch) {
        if !self.is_active() || patch.is_empty() {
            return;
        }
        self.state.send_if_modified(|snapshot| match snapshot.user.as_mut() {
            Some(user) => {
                user.apply(patch);
                true
            },
            None => false,
        });
    }
}

/// An in-flight login/logout.
///
/// Completing, or dropping without completing (cancelled future), releases
/// its share of the loading state.
struct Operation<'a> {
    shared: &'a Shared,
    ticket: Ticket,
    done: bool,
}

impl<'a> Operation<'a> {
    fn begin(shared: &'a Shared) -> Result<Self, AuthError> {
        let mut lifecycle = shared.lifecycle();
        if lifecycle.phase != Phase::Active {
            return Err(AuthError::Inactive);
        }
        let ticket = lifecycle.ticket();
        lifecycle.in_flight += 1;
        shared.state.send_if_modified(|snapshot| {
            let changed = !snapshot.is_loading;
            snapshot.is_loading = true;
            changed
        });
        Ok(Self {
            shared,
            ticket,
            done: false,
        })
    }

    /// Finishes the operation. Returns true if `outcome` was applied.
    fn complete(mut self, outcome: Outcome) -> bool {
        self.done = true;
        self.finish(outcome)
    }

    fn finish(&self, outcome: Outcome) -> bool {
        let mut lifecycle = self.shared.lifecycle();
        lifecycle.in_flight = lifecycle.in_flight.saturating_sub(1);
        if lifecycle.phase != Phase::Active {
            return false;
        }

        let applied = lifecycle.resolve(self.ticket, outcome);
        let is_loading = lifecycle.is_loading();
        let was_applied = applied.is_some();
        self.shared.state.send_modify(|snapshot| {
            if let Some(user) = applied {
                snapshot.user = user;
            }
            snapshot.is_loading = is_loading;
        });
        was_applied
    }
}

impl Drop for Operation<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.finish(Outcome::Keep);
        }
    }
}

/// Owner of the end-user session.
///
/// Construct it, [`start`](SessionController::start) it, hand out
/// [`AuthContext`] values to consumers, and [`stop`](SessionController::stop)
/// it (or drop it) when the owning view goes away.
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    /// Creates a controller. Nothing happens until [`SessionController::start`].
    pub fn new(
        service: Arc<dyn IdentityService>,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Result<Self, AuthError> {
        config.validate()?;
        let (state, _) = watch::channel(AuthSnapshot::default());

        Ok(Self {
            shared: Arc::new(Shared {
                service,
                navigator,
                config,
                state,
                lifecycle: Mutex::new(Lifecycle {
                    phase: Phase::Idle,
                    subscription: None,
                    applied: 0,
                    logouts: 0,
                    hydrating: false,
                    in_flight: 0,
                }),
            }),
        })
    }

    /// Activates the controller.
    ///
    /// Subscribes to session changes and spawns hydration on the current
    /// tokio runtime. `is_loading` stays true until hydration resolves.
    pub fn start(&self) -> Result<(), AuthError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AuthError::Lifecycle(format!("no async runtime: {e}")))?;

        let ticket = {
            let mut lifecycle = self.shared.lifecycle();
            match lifecycle.phase {
                Phase::Idle => {},
                Phase::Active => return Err(AuthError::Lifecycle("already started".into())),
                Phase::Stopped => return Err(AuthError::Lifecycle("already stopped".into())),
            }
            lifecycle.phase = Phase::Active;
            lifecycle.hydrating = true;
            lifecycle.ticket()
        };

        // Subscribe without holding the lifecycle lock: a service may call
        // back synchronously.
        let subscription = self.shared.service.on_session_change(self.callback());
        {
            let mut lifecycle = self.shared.lifecycle();
            if lifecycle.phase == Phase::Active {
                lifecycle.subscription = Some(subscription);
            }
        }

        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            let result = shared.service.current_session().await;
            shared.finish_hydration(ticket, result);
        });

        debug!(service = self.shared.service.name(), "Session controller started");
        Ok(())
    }

    /// Deactivates the controller.
    ///
    /// Disposes the session-change subscription. In-flight calls still
    /// complete, but their results are discarded.
    pub fn stop(&self) {
        let subscription = {
            let mut lifecycle = self.shared.lifecycle();
            if lifecycle.phase == Phase::Stopped {
                return;
            }
            lifecycle.phase = Phase::Stopped;
            lifecycle.subscription.take()
        };
        drop(subscription);
        debug!("Session controller stopped");
    }

    /// Returns true between `start` and `stop`.
    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Returns the consumer-facing context.
    pub fn context(&self) -> AuthContext {
        AuthContext {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns the current state.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.shared.state.borrow().clone()
    }

    fn callback(&self) -> SessionCallback {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        Arc::new(move |session: Option<Session>| {
            if let Some(shared) = weak.upgrade() {
                shared.apply_notification(session.as_ref());
            }
        })
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// End-user identity as seen by consumers.
///
/// Cheap to clone; every clone observes the same controller.
#[derive(Clone)]
pub struct AuthContext {
    shared: Arc<Shared>,
}

impl AuthContext {
    /// Returns the current state.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Returns the current user.
    pub fn user(&self) -> Option<User> {
        self.shared.state.borrow().user.clone()
    }

    /// Returns true while hydrating or during login/logout.
    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().is_loading
    }

    /// Returns true if a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.shared.state.borrow().is_authenticated()
    }

    /// Signs in with email and password.
    ///
    /// On failure the current user is left unchanged and the error carries a
    /// human-readable message.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.shared.login(email, password).await
    }

    /// Signs out, clears the user even if the remote call fails, and
    /// navigates to the site root.
    pub async fn logout(&self) {
        self.shared.logout().await
    }

    /// Merges `patch` into the current user, in memory only.
    ///
    /// No-op when signed out.
    pub fn update_user(&self, patch: UserPatch) {
        self.shared.update_user(patch);
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.shared.state.subscribe()
    }

    /// Waits until the state is no longer loading and returns it.
    pub async fn wait_until_loaded(&self) -> Result<AuthSnapshot, AuthError> {
        let mut receiver = self.subscribe();
        let snapshot = receiver
            .wait_for(|snapshot| !snapshot.is_loading)
            .await
            .map_err(|_| AuthError::Inactive)?;
        Ok(snapshot.clone())
    }
}
