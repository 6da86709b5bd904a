//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Paths and storage keys used by the session controllers and guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Site root, target of end-user logout.
    pub home_path: String,
    /// End-user sign-in page offered by the blocking view.
    pub sign_in_path: String,
    /// End-user sign-up page offered by the blocking view.
    pub sign_up_path: String,
    /// Admin sign-in page, target of admin logout and admin guard redirects.
    pub admin_login_path: String,
    /// Session storage key holding the serialized admin record.
    pub admin_storage_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            home_path: "/".to_string(),
            sign_in_path: "/login".to_string(),
            sign_up_path: "/signup".to_string(),
            admin_login_path: "/admin/login".to_string(),
            admin_storage_key: "adminUser".to_string(),
        }
    }
}

impl SessionConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), AuthError> {
        let paths = [
            ("home_path", &self.home_path),
            ("sign_in_path", &self.sign_in_path),
            ("sign_up_path", &self.sign_up_path),
            ("admin_login_path", &self.admin_login_path),
        ];

        for (field, path) in paths {
            if !path.starts_with('/') {
                return Err(AuthError::Configuration(format!(
                    "{field} must be an absolute path, got {path:?}"
                )));
            }
        }

        if self.admin_storage_key.trim().is_empty() {
            return Err(AuthError::Configuration(
                "admin_storage_key cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_relative_path_rejected() {
        let config = SessionConfig {
            admin_login_path: "admin/login".to_string(),
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_storage_key_rejected() {
        let config = SessionConfig {
            admin_storage_key: " ".to_string(),
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"home_path":"/en"}"#).expect("config should parse");
        assert_eq!(config.home_path, "/en");
        assert_eq!(config.admin_storage_key, "adminUser");
    }
}
