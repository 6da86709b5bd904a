//! Admin session controller.
//!
//! The admin domain has no remote hydration: identity is read back from
//! session storage in one synchronous step and written only by
//! [`AdminAuthContext::login`] / [`AdminAuthContext::logout`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use tutora_identity::AdminUser;
use tutora_storage::SessionStorage;

use crate::controller::Phase;
use crate::{AuthError, Navigator, SessionConfig};

/// Published admin identity state.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSnapshot {
    /// Current admin, `None` when signed out.
    pub admin: Option<AdminUser>,
    /// True until the storage read completes.
    pub is_loading: bool,
}

impl AdminSnapshot {
    /// Returns true if an admin is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.admin.is_some()
    }
}

impl Default for AdminSnapshot {
    fn default() -> Self {
        Self {
            admin: None,
            is_loading: true,
        }
    }
}

struct AdminShared {
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    state: watch::Sender<AdminSnapshot>,
    phase: Mutex<Phase>,
}

impl AdminShared {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_active(&self) -> Result<(), AuthError> {
        if *self.phase() == Phase::Active {
            Ok(())
        } else {
            Err(AuthError::Inactive)
        }
    }

    /// Reads the persisted admin record, discarding it if corrupt.
    fn read_persisted(&self) -> Option<AdminUser> {
        let key = self.config.admin_storage_key.as_str();

        let raw = match self.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Admin session storage unreadable");
                return None;
            },
        };

        match serde_json::from_str::<AdminUser>(&raw) {
            Ok(admin) => Some(admin),
            Err(e) => {
                warn!(error = %e, "Discarding corrupt admin session record");
                if let Err(e) = self.storage.remove(key) {
                    warn!(error = %e, "Failed to remove corrupt admin session record");
                }
                None
            },
        }
    }

    fn login(&self, admin: AdminUser) -> Result<(), AuthError> {
        self.ensure_active()?;
        let encoded = serde_json::to_string(&admin)?;
        let admin_id = admin.id.clone();

        self.state.send_modify(|snapshot| snapshot.admin = Some(admin));
        self.storage
            .set(&self.config.admin_storage_key, &encoded)
            .map_err(|e| {
                warn!(error = %e, "Failed to persist admin session");
                AuthError::from(e)
            })?;

        info!(admin_id = %admin_id, "Admin signed in");
        Ok(())
    }

    fn logout(&self) -> Result<(), AuthError> {
        self.ensure_active()?;

        self.state.send_modify(|snapshot| snapshot.admin = None);
        let removed = self.storage.remove(&self.config.admin_storage_key);
        self.navigator.navigate_to(&self.config.admin_login_path);
        info!("Admin signed out");

        removed.map_err(|e| {
            warn!(error = %e, "Failed to remove admin session record");
            AuthError::from(e)
        })
    }
}

/// Owner of the admin session.
pub struct AdminSessionController {
    shared: Arc<AdminShared>,
}

impl AdminSessionController {
    /// Creates a controller. Nothing is read until
    /// [`AdminSessionController::start`].
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Result<Self, AuthError> {
        config.validate()?;
        let (state, _) = watch::channel(AdminSnapshot::default());

        Ok(Self {
            shared: Arc::new(AdminShared {
                storage,
                navigator,
                config,
                state,
                phase: Mutex::new(Phase::Idle),
            }),
        })
    }

    /// Activates the controller and hydrates from session storage.
    pub fn start(&self) -> Result<(), AuthError> {
        {
            let mut phase = self.shared.phase();
            match *phase {
                Phase::Idle => *phase = Phase::Active,
                Phase::Active => return Err(AuthError::Lifecycle("already started".into())),
                Phase::Stopped => return Err(AuthError::Lifecycle("already stopped".into())),
            }
        }

        let admin = self.shared.read_persisted();
        debug!(restored = admin.is_some(), "Admin session hydrated");
        self.shared.state.send_replace(AdminSnapshot {
            admin,
            is_loading: false,
        });
        Ok(())
    }

    /// Deactivates the controller. Later login/logout calls fail with
    /// [`AuthError::Inactive`].
    pub fn stop(&self) {
        *self.shared.phase() = Phase::Stopped;
    }

    /// Returns true between `start` and `stop`.
    pub fn is_active(&self) -> bool {
        *self.shared.phase() == Phase::Active
    }

    /// Returns the consumer-facing context.
    pub fn context(&self) -> AdminAuthContext {
        AdminAuthContext {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns the current state.
    pub fn snapshot(&self) -> AdminSnapshot {
        self.shared.state.borrow().clone()
    }
}

impl Drop for AdminSessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Admin identity as seen by consumers.
#[derive(Clone)]
pub struct AdminAuthContext {
    shared: Arc<AdminShared>,
}

impl AdminAuthContext {
    /// Returns the current state.
    pub fn snapshot(&self) -> AdminSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Returns the current admin.
    pub fn admin(&self) -> Option<AdminUser> {
        self.shared.state.borrow().admin.clone()
    }

    /// Returns true until the controller has read session storage.
    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().is_loading
    }

    /// Publishes an already-verified admin and persists it.
    ///
    /// If persisting fails the admin stays signed in for this controller
    /// and the storage error is returned.
    pub fn login(&self, admin: AdminUser) -> Result<(), AuthError> {
        self.shared.login(admin)
    }

    /// Clears the admin, removes the persisted record, and navigates to the
    /// admin sign-in view.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.shared.logout()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AdminSnapshot> {
        self.shared.state.subscribe()
    }
}
