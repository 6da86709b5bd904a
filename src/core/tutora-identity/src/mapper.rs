//! Remote session to [`User`] mapping.
//!
//! The mapping is total: any remote payload produces a `User`, whatever
//! metadata it carries.

use serde_json::{Map, Value};

use crate::{Preferences, RemoteUser, Role, Session, User};

/// Metadata keys checked for the display name, in precedence order.
const NAME_KEYS: &[&str] = &["full_name", "name", "first_name", "given_name"];

/// Metadata keys checked for the avatar URL, in precedence order.
const AVATAR_KEYS: &[&str] = &["avatar_url", "avatar"];

/// Maps an optional session to the current user.
pub fn map_session(session: Option<&Session>) -> Option<User> {
    session.map(|s| map_session_user(&s.user))
}

/// Maps a remote account record to the normalized [`User`] shape.
///
/// Name precedence: `full_name`, `name`, `first_name`, `given_name`
/// metadata, then the local part of the email address, then the empty
/// string. Role falls back
/// to [`Role::Student`] when metadata omits it or names an unknown role.
pub fn map_session_user(remote: &RemoteUser) -> User {
    let meta = &remote.user_metadata;
    let email = remote.email.clone().unwrap_or_default();

    let name = NAME_KEYS
        .iter()
        .find_map(|key| metadata_str(meta, key))
        .map(str::to_string)
        .unwrap_or_else(|| email_local_part(&email).to_string());

    let role = metadata_str(meta, "role")
        .and_then(Role::from_metadata)
        .unwrap_or_default();

    let avatar = AVATAR_KEYS
        .iter()
        .find_map(|key| metadata_str(meta, key))
        .map(str::to_string);

    User {
        id: remote.id.clone(),
        name,
        email,
        role,
        avatar,
        preferences: meta.get("preferences").and_then(map_preferences),
    }
}

/// Returns a non-blank string metadata value.
fn metadata_str<'a>(meta: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    meta.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or_default()
}

fn map_preferences(value: &Value) -> Option<Preferences> {
    let prefs = value.as_object()?;
    let defaults = Preferences::default();

    Some(Preferences {
        language: metadata_str(prefs, "language")
            .map(str::to_string)
            .unwrap_or(defaults.language),
        theme: metadata_str(prefs, "theme")
            .map(str::to_string)
            .unwrap_or(defaults.theme),
        notifications: prefs
            .get("notifications")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.notifications),
    })
}
