//! Error taxonomy shared by every client operation.

use thiserror::Error;

/// A local precondition that failed before any request was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid input {0}")]
    Validation(ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A protected call was rejected with 401, or made with no session at all
    #[error("Session expired, please log in again")]
    Unauthorized,

    #[error("Server error{}: {message}", status.map(|s| format!(" {}", s)).unwrap_or_default())]
    Server {
        status: Option<u16>,
        message: String,
    },

    #[error("Could not persist session: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// True when the error means the held session can no longer be used
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => *status,
            Self::NotFound(_) => Some(404),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
