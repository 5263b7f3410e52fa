//! SurrealDB implementation of [`PayoutRepository`].

use chitfund_core::error::ChitFundResult;
use chitfund_core::models::payout::{CreatePayout, Payout, PayoutStatus};
use chitfund_core::month::YearMonth;
use chitfund_core::repository::PayoutRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, parse_wire};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PayoutRowWithId {
    record_id: String,
    chit_id: String,
    recipient_id: String,
    amount: i64,
    month: String,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PayoutRowWithId {
    fn try_into_payout(self) -> Result<Payout, DbError> {
        Ok(Payout {
            id: parse_uuid("payout", "id", &self.record_id)?,
            chit_id: parse_uuid("payout", "chit_id", &self.chit_id)?,
            recipient_id: parse_uuid("payout", "recipient_id", &self.recipient_id)?,
            amount: self.amount,
            month: parse_wire("payout", &self.month)?,
            status: parse_wire("payout", &self.status)?,
            paid_at: self.paid_at,
            created_at: self.created_at,
        })
    }
}

fn first_payout(rows: Vec<PayoutRowWithId>) -> Result<Option<Payout>, DbError> {
    rows.into_iter()
        .next()
        .map(PayoutRowWithId::try_into_payout)
        .transpose()
}

/// SurrealDB implementation of the Payout repository.
#[derive(Clone)]
pub struct SurrealPayoutRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPayoutRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PayoutRepository for SurrealPayoutRepository<C> {
    async fn create(&self, input: CreatePayout) -> ChitFundResult<Payout> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let key = format!("{}/{}", input.chit_id, input.month);

        let result = self
            .db
            .query(
                "CREATE type::record('payout', $id) SET \
                 chit_id = $chit_id, recipient_id = $recipient_id, \
                 amount = $amount, month = $month, status = $status \
                 RETURN meta::id(id) AS record_id, *",
            )
            .bind(("id", id_str.clone()))
            .bind(("chit_id", input.chit_id.to_string()))
            .bind(("recipient_id", input.recipient_id.to_string()))
            .bind(("amount", input.amount))
            .bind(("month", input.month.to_string()))
            .bind(("status", PayoutStatus::Pending.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("payout", key, e))?;

        let rows: Vec<PayoutRowWithId> = result.take(0).map_err(DbError::from)?;
        first_payout(rows)?.ok_or_else(|| DbError::not_found("payout", id_str).into())
    }

    async fn get_by_id(&self, id: Uuid) -> ChitFundResult<Payout> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('payout', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PayoutRowWithId> = result.take(0).map_err(DbError::from)?;
        first_payout(rows)?.ok_or_else(|| DbError::not_found("payout", id_str).into())
    }

    async fn find_by_month(
        &self,
        chit_id: Uuid,
        month: YearMonth,
    ) -> ChitFundResult<Option<Payout>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM payout \
                 WHERE chit_id = $chit_id AND month = $month",
            )
            .bind(("chit_id", chit_id.to_string()))
            .bind(("month", month.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PayoutRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_payout(rows)?)
    }

    async fn update_status(&self, id: Uuid, status: PayoutStatus) -> ChitFundResult<Payout> {
        let id_str = id.to_string();

        let paid_at = match status {
            PayoutStatus::Paid => "time::now()",
            PayoutStatus::Pending => "NONE",
        };
        let query = format!(
            "UPDATE type::record('payout', $id) SET \
             status = $status, paid_at = {paid_at} \
             RETURN meta::id(id) AS record_id, *"
        );

        let result = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("status", status.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PayoutRowWithId> = result.take(0).map_err(DbError::from)?;
        first_payout(rows)?.ok_or_else(|| DbError::not_found("payout", id_str).into())
    }

    async fn list_for_chit(&self, chit_id: Uuid) -> ChitFundResult<Vec<Payout>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM payout \
                 WHERE chit_id = $chit_id ORDER BY month ASC",
            )
            .bind(("chit_id", chit_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PayoutRowWithId> = result.take(0).map_err(DbError::from)?;
        let payouts = rows
            .into_iter()
            .map(PayoutRowWithId::try_into_payout)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(payouts)
    }
}
