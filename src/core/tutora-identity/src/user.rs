//! End-user identity types.

use serde::{Deserialize, Serialize};

/// Role of an end user inside the learning platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Default role for any account without explicit role metadata.
    #[default]
    Student,
    /// Course author / instructor.
    Teacher,
    /// Platform admin as reported by the identity service.
    ///
    /// This is an end-user role and never grants access to the admin area.
    Admin,
}

impl Role {
    /// Parses a role name from loosely-typed metadata.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn from_metadata(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the canonical role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

/// Per-user display preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Interface language code (e.g., "en", "ar").
    pub language: String,
    /// Theme name (e.g., "light", "dark").
    pub theme: String,
    /// Whether notifications are enabled.
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            theme: "light".to_string(),
            notifications: true,
        }
    }
}

/// Normalized end-user identity.
///
/// Never stored directly: rebuilt from the remote session payload on every
/// session event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque account identifier issued by the identity service.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address (empty when the service did not report one).
    pub email: String,
    /// Platform role.
    pub role: Role,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Display preferences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
}

/// Partial update applied to an in-memory [`User`].
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    /// New display name.
    pub name: Option<String>,
    /// New email address.
    pub email: Option<String>,
    /// New role.
    pub role: Option<Role>,
    /// New avatar URL.
    pub avatar: Option<String>,
    /// New preferences.
    pub preferences: Option<Preferences>,
}

impl UserPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl User {
    /// Merges a patch into this user.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(avatar) = patch.avatar {
            self.avatar = Some(avatar);
        }
        if let Some(preferences) = patch.preferences {
            self.preferences = Some(preferences);
        }
    }
}
