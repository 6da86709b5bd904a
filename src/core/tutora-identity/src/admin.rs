//! Administrator identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role tag carried by every admin record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// The only admin role.
    #[default]
    Admin,
}

/// Verified administrator identity.
///
/// The shape is defined by the admin verification path; fields this crate
/// does not know about are kept in `extra` so the record survives a
/// storage round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    /// Admin record identifier.
    pub id: String,
    /// Admin email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Always [`AdminRole::Admin`].
    #[serde(default)]
    pub role: AdminRole,
    /// Additional fields from the verification path.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdminUser {
    /// Creates an admin identity without extra fields.
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            role: AdminRole::Admin,
            extra: Map::new(),
        }
    }
}
