//! Database-specific error types and conversions.

use chitfund_core::error::ChitFundError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Cannot reach SurrealDB at {url}: {source}")]
    Connection {
        url: String,
        source: surrealdb::Error,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("{entity} already exists: {key}")]
    Duplicate { entity: String, key: String },

    #[error("Corrupt {entity} record: {detail}")]
    Decode { entity: &'static str, detail: String },
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub(crate) fn decode(entity: &'static str, detail: impl ToString) -> Self {
        Self::Decode {
            entity,
            detail: detail.to_string(),
        }
    }

    /// Classify a failed write. Record-id collisions and unique-index
    /// violations become [`DbError::Duplicate`].
    pub(crate) fn from_write(entity: &str, key: impl Into<String>, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already exists") || message.contains("already contains") {
            Self::Duplicate {
                entity: entity.into(),
                key: key.into(),
            }
        } else {
            Self::Query(message)
        }
    }
}

impl From<DbError> for ChitFundError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ChitFundError::NotFound { entity, id },
            DbError::Duplicate { entity, .. } => ChitFundError::Conflict {
                reason: format!("{entity} already exists"),
            },
            other => ChitFundError::Database(other.to_string()),
        }
    }
}
