//! SurrealDB implementation of [`MemberRepository`].
//!
//! A membership's record id is derived from its chit and user, so a
//! second insert for the same pair collides on the id as well as on the
//! `(chit_id, user_id)` unique index.

use chitfund_core::error::ChitFundResult;
use chitfund_core::models::member::{CreateMember, Member, MemberStatus};
use chitfund_core::repository::MemberRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, parse_wire};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MemberRow {
    chit_id: String,
    user_id: String,
    status: String,
    joined_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemberRow {
    fn try_into_member(self) -> Result<Member, DbError> {
        Ok(Member {
            chit_id: parse_uuid("member", "chit_id", &self.chit_id)?,
            user_id: parse_uuid("member", "user_id", &self.user_id)?,
            status: parse_wire("member", &self.status)?,
            joined_at: self.joined_at,
            updated_at: self.updated_at,
        })
    }
}

fn member_key(chit_id: Uuid, user_id: Uuid) -> String {
    format!("{chit_id}_{user_id}")
}

/// SurrealDB implementation of the Member repository.
#[derive(Clone)]
pub struct SurrealMemberRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMemberRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MemberRepository for SurrealMemberRepository<C> {
    async fn find(&self, chit_id: Uuid, user_id: Uuid) -> ChitFundResult<Option<Member>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('member', $id)")
            .bind(("id", member_key(chit_id, user_id)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let member = rows
            .into_iter()
            .next()
            .map(MemberRow::try_into_member)
            .transpose()?;

        Ok(member)
    }

    async fn insert(&self, input: CreateMember) -> ChitFundResult<Member> {
        let key = member_key(input.chit_id, input.user_id);

        let result = self
            .db
            .query(
                "CREATE type::record('member', $id) SET \
                 chit_id = $chit_id, user_id = $user_id, status = $status",
            )
            .bind(("id", key.clone()))
            .bind(("chit_id", input.chit_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("status", input.status.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("member", key.clone(), e))?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("member", key))?;

        Ok(row.try_into_member()?)
    }

    async fn update_status(
        &self,
        chit_id: Uuid,
        user_id: Uuid,
        status: MemberStatus,
    ) -> ChitFundResult<Member> {
        let key = member_key(chit_id, user_id);

        let result = self
            .db
            .query(
                "UPDATE type::record('member', $id) SET \
                 status = $status, updated_at = time::now()",
            )
            .bind(("id", key.clone()))
            .bind(("status", status.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("member", key))?;

        Ok(row.try_into_member()?)
    }

    async fn count_active_for_chit(&self, chit_id: Uuid) -> ChitFundResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM member \
                 WHERE chit_id = $chit_id AND status != $rejected GROUP ALL",
            )
            .bind(("chit_id", chit_id.to_string()))
            .bind(("rejected", MemberStatus::Rejected.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn list_for_chit(&self, chit_id: Uuid) -> ChitFundResult<Vec<Member>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM member WHERE chit_id = $chit_id \
                 ORDER BY joined_at ASC",
            )
            .bind(("chit_id", chit_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let members = rows
            .into_iter()
            .map(MemberRow::try_into_member)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(members)
    }
}
