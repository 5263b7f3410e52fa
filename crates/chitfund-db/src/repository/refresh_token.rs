//! SurrealDB implementation of [`RefreshTokenRepository`].
//!
//! Only the SHA-256 hash of a refresh token is persisted. Revocation
//! deletes the record, so a revoked token can no longer be looked up.

use chitfund_core::error::ChitFundResult;
use chitfund_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use chitfund_core::repository::RefreshTokenRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RefreshTokenRow {
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RefreshTokenRowWithId {
    record_id: String,
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn row_to_token(row: RefreshTokenRow, id: Uuid) -> Result<RefreshToken, DbError> {
    Ok(RefreshToken {
        id,
        user_id: parse_uuid("refresh_token", "user_id", &row.user_id)?,
        token_hash: row.token_hash,
        expires_at: row.expires_at,
        created_at: row.created_at,
    })
}

impl RefreshTokenRowWithId {
    fn try_into_token(self) -> Result<RefreshToken, DbError> {
        let id = parse_uuid("refresh_token", "id", &self.record_id)?;
        row_to_token(
            RefreshTokenRow {
                user_id: self.user_id,
                token_hash: self.token_hash,
                expires_at: self.expires_at,
                created_at: self.created_at,
            },
            id,
        )
    }
}

/// SurrealDB implementation of the RefreshToken repository.
#[derive(Clone)]
pub struct SurrealRefreshTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRefreshTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RefreshTokenRepository for SurrealRefreshTokenRepository<C> {
    async fn create(&self, input: CreateRefreshToken) -> ChitFundResult<RefreshToken> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('refresh_token', $id) SET \
                 user_id = $user_id, \
                 token_hash = $token_hash, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("refresh_token", id_str.clone(), e))?;

        let rows: Vec<RefreshTokenRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("refresh_token", id_str))?;

        Ok(row_to_token(row, id)?)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> ChitFundResult<RefreshToken> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM refresh_token \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefreshTokenRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("refresh_token", format!("token_hash={token_hash}")))?;

        Ok(row.try_into_token()?)
    }

    async fn revoke(&self, id: Uuid) -> ChitFundResult<bool> {
        let mut result = self
            .db
            .query("DELETE type::record('refresh_token', $id) RETURN BEFORE")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefreshTokenRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> ChitFundResult<()> {
        self.db
            .query("DELETE refresh_token WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn cleanup_expired(&self) -> ChitFundResult<u64> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM refresh_token \
                 WHERE expires_at < time::now() GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE refresh_token WHERE expires_at < time::now()")
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}
