//! Error types for the chit-fund system.

use thiserror::Error;

/// Coarse classification of a [`ChitFundError`], used by transport
/// layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Expired,
    Auth,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum ChitFundError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Expired: {what}")]
    Expired { what: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Code delivery failed: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChitFundError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Expired { .. } => ErrorKind::Expired,
            Self::AuthenticationFailed { .. } => ErrorKind::Auth,
            Self::Database(_) | Self::Crypto(_) | Self::Delivery(_) | Self::Internal(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}

pub type ChitFundResult<T> = Result<T, ChitFundError>;
