//! Authentication error types.

use thiserror::Error;

/// Errors reported by an identity service.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// The service could not be reached.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),

    /// The service did not answer in time.
    #[error("identity service request timed out")]
    Timeout,

    /// The service rejected the request (bad credentials, unconfirmed
    /// email...). The message comes from the service.
    #[error("{message}")]
    Rejected {
        /// Message reported by the service.
        message: String,
    },
}

impl IdentityError {
    /// Returns a message suitable for showing to the person signing in.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable(_) => {
                "Unable to reach the sign-in service. Please try again.".to_string()
            },
            Self::Timeout => "The sign-in service took too long to respond.".to_string(),
            Self::Rejected { message } => message.clone(),
        }
    }
}

/// Errors that can occur in the session controllers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Sign-in failed. Carries a human-readable message.
    #[error("{0}")]
    SignIn(String),

    /// Invalid admin credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Context consumed outside of its provider scope.
    #[error("no enclosing {0}")]
    MissingProvider(&'static str),

    /// Operation on a controller that is not started or already stopped.
    #[error("session controller is not active")]
    Inactive,

    /// Invalid lifecycle transition (double start, start after stop...).
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<tutora_storage::StorageError> for AuthError {
    fn from(e: tutora_storage::StorageError) -> Self {
        AuthError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Serialization(e.to_string())
    }
}
