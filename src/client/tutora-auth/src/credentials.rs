//! Admin credential verification.
//!
//! Admin passwords are provisioned out of band as Argon2 PHC strings. This
//! module only verifies them.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use tutora_identity::AdminUser;

use crate::{AdminAuthContext, AuthError};

/// Stored admin record with its password hash.
#[derive(Debug, Clone)]
pub struct AdminCredential {
    /// Identity published on successful verification.
    pub admin: AdminUser,
    /// Argon2 hash in PHC string format.
    pub password_hash: String,
}

/// Lookup of admin records by email.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Returns the record for `email` (already normalized), if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminCredential>, AuthError>;
}

/// Admin directory held in memory.
#[derive(Debug, Default)]
pub struct MemoryAdminDirectory {
    records: HashMap<String, AdminCredential>,
}

impl MemoryAdminDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a record, keyed by the admin's email.
    pub fn insert(&mut self, credential: AdminCredential) {
        self.records
            .insert(normalize_email(&credential.admin.email), credential);
    }

    /// Builder form of [`MemoryAdminDirectory::insert`].
    pub fn with_admin(mut self, admin: AdminUser, password_hash: impl Into<String>) -> Self {
        self.insert(AdminCredential {
            admin,
            password_hash: password_hash.into(),
        });
        self
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the directory has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AdminDirectory for MemoryAdminDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminCredential>, AuthError> {
        Ok(self.records.get(email).cloned())
    }
}

/// Verifies admin email/password pairs.
#[async_trait]
pub trait AdminAuthenticator: Send + Sync {
    /// Returns the admin identity if the credentials are valid, `None` if
    /// they are not.
    async fn authenticate(&self, email: &str, password: &str)
        -> Result<Option<AdminUser>, AuthError>;

    /// Returns the name of this authenticator for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Authenticator checking passwords against Argon2 hashes.
pub struct Argon2AdminAuthenticator {
    directory: Arc<dyn AdminDirectory>,
}

impl Argon2AdminAuthenticator {
    /// Creates an authenticator over `directory`.
    pub fn new(directory: Arc<dyn AdminDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AdminAuthenticator for Argon2AdminAuthenticator {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AdminUser>, AuthError> {
        let email = normalize_email(email);

        let Some(credential) = self.directory.find_by_email(&email).await? else {
            debug!(email = %email, "No admin record for email");
            return Ok(None);
        };

        let parsed_hash = PasswordHash::new(&credential.password_hash)
            .map_err(|_| AuthError::Storage("invalid admin password hash".into()))?;

        let valid = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();

        if !valid {
            debug!(email = %email, "Admin password mismatch");
            return Ok(None);
        }

        Ok(Some(credential.admin))
    }

    fn name(&self) -> &'static str {
        "argon2"
    }
}

/// Runs the admin sign-in flow.
///
/// Verifies the credentials and, only if they are valid, publishes the admin
/// through `context`. Invalid credentials never reach the controller.
pub async fn admin_sign_in(
    authenticator: &dyn AdminAuthenticator,
    context: &AdminAuthContext,
    email: &str,
    password: &str,
) -> Result<AdminUser, AuthError> {
    match authenticator.authenticate(email, password).await? {
        Some(admin) => {
            context.login(admin.clone())?;
            info!(admin_id = %admin.id, authenticator = authenticator.name(), "Admin verified");
            Ok(admin)
        },
        None => {
            warn!(authenticator = authenticator.name(), "Admin sign-in rejected");
            Err(AuthError::InvalidCredentials)
        },
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
