//! SurrealDB implementation of [`ChitRepository`].

use chitfund_core::error::ChitFundResult;
use chitfund_core::models::chit::{Chit, ChitStatus, CreateChit};
use chitfund_core::repository::ChitRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, parse_wire};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ChitRow {
    name: String,
    fund_amount: i64,
    tenure: u32,
    member_count: u32,
    start_month: String,
    end_month: String,
    payout_method: String,
    moderator_id: String,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ChitRowWithId {
    record_id: String,
    name: String,
    fund_amount: i64,
    tenure: u32,
    member_count: u32,
    start_month: String,
    end_month: String,
    payout_method: String,
    moderator_id: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl ChitRow {
    fn into_chit(self, id: Uuid) -> Result<Chit, DbError> {
        Ok(Chit {
            id,
            name: self.name,
            fund_amount: self.fund_amount,
            tenure: self.tenure,
            member_count: self.member_count,
            start_month: parse_wire("chit", &self.start_month)?,
            end_month: parse_wire("chit", &self.end_month)?,
            payout_method: parse_wire("chit", &self.payout_method)?,
            moderator_id: parse_uuid("chit", "moderator_id", &self.moderator_id)?,
            status: parse_wire("chit", &self.status)?,
            created_at: self.created_at,
        })
    }
}

impl ChitRowWithId {
    fn try_into_chit(self) -> Result<Chit, DbError> {
        let id = parse_uuid("chit", "id", &self.record_id)?;
        ChitRow {
            name: self.name,
            fund_amount: self.fund_amount,
            tenure: self.tenure,
            member_count: self.member_count,
            start_month: self.start_month,
            end_month: self.end_month,
            payout_method: self.payout_method,
            moderator_id: self.moderator_id,
            status: self.status,
            created_at: self.created_at,
        }
        .into_chit(id)
    }
}

/// SurrealDB implementation of the Chit repository.
#[derive(Clone)]
pub struct SurrealChitRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealChitRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ChitRepository for SurrealChitRepository<C> {
    async fn create(&self, input: CreateChit) -> ChitFundResult<Chit> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('chit', $id) SET \
                 name = $name, fund_amount = $fund_amount, \
                 tenure = $tenure, member_count = $member_count, \
                 start_month = $start_month, end_month = $end_month, \
                 payout_method = $payout_method, \
                 moderator_id = $moderator_id, status = $status",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("fund_amount", input.fund_amount))
            .bind(("tenure", input.tenure))
            .bind(("member_count", input.member_count))
            .bind(("start_month", input.start_month.to_string()))
            .bind(("end_month", input.end_month.to_string()))
            .bind(("payout_method", input.payout_method.as_str()))
            .bind(("moderator_id", input.moderator_id.to_string()))
            .bind(("status", ChitStatus::Open.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("chit", id_str.clone(), e))?;

        let rows: Vec<ChitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("chit", id_str))?;

        Ok(row.into_chit(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> ChitFundResult<Chit> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('chit', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("chit", id_str))?;

        Ok(row.into_chit(id)?)
    }

    async fn update_status(&self, id: Uuid, status: ChitStatus) -> ChitFundResult<Chit> {
        let id_str = id.to_string();

        let result = self
            .db
            .query("UPDATE type::record('chit', $id) SET status = $status")
            .bind(("id", id_str.clone()))
            .bind(("status", status.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ChitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("chit", id_str))?;

        Ok(row.into_chit(id)?)
    }

    async fn list_for_user(&self, user_id: Uuid) -> ChitFundResult<Vec<Chit>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM chit \
                 WHERE moderator_id = $user_id \
                 OR meta::id(id) IN \
                 (SELECT VALUE chit_id FROM member WHERE user_id = $user_id) \
                 ORDER BY created_at DESC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChitRowWithId> = result.take(0).map_err(DbError::from)?;
        let chits = rows
            .into_iter()
            .map(ChitRowWithId::try_into_chit)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(chits)
    }

    async fn delete(&self, id: Uuid) -> ChitFundResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT count() AS total FROM type::record('chit', $id) GROUP ALL")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<super::CountRow> = result.take(0).map_err(DbError::from)?;
        if rows.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::not_found("chit", id_str).into());
        }

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE member WHERE chit_id = $id; \
                 DELETE payment WHERE chit_id = $id; \
                 DELETE payout WHERE chit_id = $id; \
                 DELETE type::record('chit', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
