//! Remote session payload as reported by the identity service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Account record embedded in a remote session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteUser {
    /// Account identifier.
    pub id: String,
    /// Email address, if the account has one.
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form profile metadata (full name, role, avatar, preferences...).
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

/// An authenticated session issued by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for the session.
    pub access_token: String,
    /// Refresh token, when the service issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiration timestamp (Unix seconds).
    #[serde(default)]
    pub expires_at: Option<u64>,
    /// The account the session belongs to.
    pub user: RemoteUser,
}
