//! In-memory identity service.
//!
//! Backs the console harness and the test suites. Besides an account table
//! it supports remote-side session changes ([`InMemoryIdentityService::emit`]),
//! failure injection ([`InMemoryIdentityService::fail_next`]) and response
//! gates ([`InMemoryIdentityService::hold`]) for deterministic interleaving
//! of concurrent calls.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::debug;
use tutora_identity::{RemoteUser, Session};

use crate::{IdentityError, IdentityService, SessionCallback, Subscription};

/// Message returned for an unknown email or a wrong password.
pub const INVALID_LOGIN_MESSAGE: &str = "Invalid login credentials";

/// Session lifetime reported in issued sessions (seconds).
const SESSION_TTL_SECS: u64 = 3600;

/// Identity service operations, used to target gates and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceCall {
    /// `current_session`.
    CurrentSession,
    /// `sign_in_with_password`.
    SignIn,
    /// `sign_out`.
    SignOut,
}

/// Holds back the response of one service call until released.
///
/// The call's effect (session change, notifications) is applied when the
/// call arrives; only the response to the caller is delayed. Dropping the
/// gate releases it.
#[derive(Debug)]
pub struct Gate {
    release: oneshot::Sender<()>,
    entered: oneshot::Receiver<()>,
}

impl Gate {
    /// Waits until the gated call has arrived at the service.
    pub async fn entered(&mut self) {
        let _ = (&mut self.entered).await;
    }

    /// Lets the gated call respond.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

struct PendingGate {
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

impl PendingGate {
    async fn wait(self) {
        let _ = self.entered.send(());
        let _ = self.release.await;
    }
}

struct Account {
    password: String,
    user: RemoteUser,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    current: Option<Session>,
    listeners: BTreeMap<u64, SessionCallback>,
    next_listener: u64,
    next_token: u64,
    failures: HashMap<ServiceCall, VecDeque<IdentityError>>,
    gates: HashMap<ServiceCall, VecDeque<PendingGate>>,
    calls: HashMap<ServiceCall, usize>,
}

impl State {
    /// Records a call and returns its injected failure and gate, if any.
    fn enter(&mut self, call: ServiceCall) -> (Option<IdentityError>, Option<PendingGate>) {
        *self.calls.entry(call).or_default() += 1;
        let failure = self.failures.get_mut(&call).and_then(VecDeque::pop_front);
        let gate = self.gates.get_mut(&call).and_then(VecDeque::pop_front);
        (failure, gate)
    }

    fn issue_session(&mut self, user: &RemoteUser) -> Session {
        self.next_token += 1;
        Session {
            access_token: format!("access-{}-{}", user.id, self.next_token),
            refresh_token: Some(format!("refresh-{}-{}", user.id, self.next_token)),
            expires_at: Some(now() + SESSION_TTL_SECS),
            user: user.clone(),
        }
    }

    fn listeners(&self) -> Vec<SessionCallback> {
        self.listeners.values().cloned().collect()
    }
}

/// Identity service keeping accounts and the current session in memory.
#[derive(Default)]
pub struct InMemoryIdentityService {
    state: Arc<Mutex<State>>,
}

impl InMemoryIdentityService {
    /// Creates a service with no accounts and no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account.
    ///
    /// `metadata` must be a JSON object; anything else is stored as empty
    /// metadata.
    pub fn add_account(&self, id: &str, email: &str, password: &str, metadata: Value) {
        let user = RemoteUser {
            id: id.to_string(),
            email: Some(email.to_string()),
            user_metadata: match metadata {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        };
        self.lock().accounts.insert(
            normalize_email(email),
            Account {
                password: password.to_string(),
                user,
            },
        );
    }

    /// Builder form of [`InMemoryIdentityService::add_account`].
    pub fn with_account(self, id: &str, email: &str, password: &str, metadata: Value) -> Self {
        self.add_account(id, email, password, metadata);
        self
    }

    /// Issues a fresh session for a registered account without signing in.
    pub fn issue_session(&self, email: &str) -> Option<Session> {
        let mut state = self.lock();
        let user = state.accounts.get(&normalize_email(email))?.user.clone();
        Some(state.issue_session(&user))
    }

    /// Sets the current session without notifying listeners.
    ///
    /// Models a session that already existed before the client loaded.
    pub fn set_current_session(&self, session: Option<Session>) {
        self.lock().current = session;
    }

    /// Returns the current session.
    pub fn current(&self) -> Option<Session> {
        self.lock().current.clone()
    }

    /// Changes the session on the service side and notifies listeners
    /// (login in another tab, token refresh, remote logout).
    pub fn emit(&self, session: Option<Session>) {
        let listeners = {
            let mut state = self.lock();
            state.current = session.clone();
            state.listeners()
        };
        notify(&listeners, session);
    }

    /// Makes the next `call` fail with `error`.
    pub fn fail_next(&self, call: ServiceCall, error: IdentityError) {
        self.lock()
            .failures
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// Gates the response of the next `call`.
    pub fn hold(&self, call: ServiceCall) -> Gate {
        let (release_tx, release_rx) = oneshot::channel();
        let (entered_tx, entered_rx) = oneshot::channel();
        self.lock()
            .gates
            .entry(call)
            .or_default()
            .push_back(PendingGate {
                entered: entered_tx,
                release: release_rx,
            });
        Gate {
            release: release_tx,
            entered: entered_rx,
        }
    }

    /// Returns how many times `call` was made.
    pub fn call_count(&self, call: ServiceCall) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    /// Returns the number of registered session-change listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock_state(&self.state)
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn current_session(&self) -> Result<Option<Session>, IdentityError> {
        let (outcome, gate) = {
            let mut state = self.lock();
            let (failure, gate) = state.enter(ServiceCall::CurrentSession);
            let outcome = match failure {
                Some(err) => Err(err),
                None => Ok(state.current.clone()),
            };
            (outcome, gate)
        };

        if let Some(gate) = gate {
            gate.wait().await;
        }
        outcome
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let (outcome, listeners, gate) = {
            let mut state = self.lock();
            let (failure, gate) = state.enter(ServiceCall::SignIn);

            let verified = state
                .accounts
                .get(&normalize_email(email))
                .filter(|account| account.password == password)
                .map(|account| account.user.clone());

            let outcome = match (failure, verified) {
                (Some(err), _) => Err(err),
                (None, Some(user)) => Ok(state.issue_session(&user)),
                (None, None) => Err(IdentityError::Rejected {
                    message: INVALID_LOGIN_MESSAGE.to_string(),
                }),
            };

            let listeners = match &outcome {
                Ok(session) => {
                    state.current = Some(session.clone());
                    state.listeners()
                },
                Err(_) => Vec::new(),
            };
            (outcome, listeners, gate)
        };

        if let Ok(session) = &outcome {
            debug!(user_id = %session.user.id, "In-memory sign-in");
            notify(&listeners, Some(session.clone()));
        }
        if let Some(gate) = gate {
            gate.wait().await;
        }
        outcome
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let (outcome, listeners, gate) = {
            let mut state = self.lock();
            let (failure, gate) = state.enter(ServiceCall::SignOut);
            match failure {
                Some(err) => (Err(err), Vec::new(), gate),
                None => {
                    state.current = None;
                    (Ok(()), state.listeners(), gate)
                },
            }
        };

        if outcome.is_ok() {
            notify(&listeners, None);
        }
        if let Some(gate) = gate {
            gate.wait().await;
        }
        outcome
    }

    fn on_session_change(&self, callback: SessionCallback) -> Subscription {
        let id = {
            let mut state = self.lock();
            let id = state.next_listener;
            state.next_listener += 1;
            state.listeners.insert(id, callback);
            id
        };

        let weak: Weak<Mutex<State>> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                lock_state(&state).listeners.remove(&id);
            }
        })
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

fn lock_state(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn notify(listeners: &[SessionCallback], session: Option<Session>) {
    for listener in listeners {
        listener(session.clone());
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
