//! SurrealDB implementation of [`PaymentRepository`].

use chitfund_core::error::ChitFundResult;
use chitfund_core::models::payment::{CreatePayment, Payment, PaymentStatus};
use chitfund_core::month::YearMonth;
use chitfund_core::repository::PaymentRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, parse_wire};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PaymentRowWithId {
    record_id: String,
    chit_id: String,
    member_id: String,
    amount: i64,
    month: String,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PaymentRowWithId {
    fn try_into_payment(self) -> Result<Payment, DbError> {
        Ok(Payment {
            id: parse_uuid("payment", "id", &self.record_id)?,
            chit_id: parse_uuid("payment", "chit_id", &self.chit_id)?,
            member_id: parse_uuid("payment", "member_id", &self.member_id)?,
            amount: self.amount,
            month: parse_wire("payment", &self.month)?,
            status: parse_wire("payment", &self.status)?,
            paid_at: self.paid_at,
            created_at: self.created_at,
        })
    }
}

fn first_payment(rows: Vec<PaymentRowWithId>) -> Result<Option<Payment>, DbError> {
    rows.into_iter()
        .next()
        .map(PaymentRowWithId::try_into_payment)
        .transpose()
}

/// SurrealDB implementation of the Payment repository.
#[derive(Clone)]
pub struct SurrealPaymentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPaymentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PaymentRepository for SurrealPaymentRepository<C> {
    async fn create(&self, input: CreatePayment) -> ChitFundResult<Payment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let key = format!("{}/{}/{}", input.chit_id, input.member_id, input.month);

        let result = self
            .db
            .query(
                "CREATE type::record('payment', $id) SET \
                 chit_id = $chit_id, member_id = $member_id, \
                 amount = $amount, month = $month, status = $status \
                 RETURN meta::id(id) AS record_id, *",
            )
            .bind(("id", id_str.clone()))
            .bind(("chit_id", input.chit_id.to_string()))
            .bind(("member_id", input.member_id.to_string()))
            .bind(("amount", input.amount))
            .bind(("month", input.month.to_string()))
            .bind(("status", PaymentStatus::Pending.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("payment", key, e))?;

        let rows: Vec<PaymentRowWithId> = result.take(0).map_err(DbError::from)?;
        first_payment(rows)?.ok_or_else(|| DbError::not_found("payment", id_str).into())
    }

    async fn get_by_id(&self, id: Uuid) -> ChitFundResult<Payment> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('payment', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PaymentRowWithId> = result.take(0).map_err(DbError::from)?;
        first_payment(rows)?.ok_or_else(|| DbError::not_found("payment", id_str).into())
    }

    async fn find(
        &self,
        chit_id: Uuid,
        member_id: Uuid,
        month: YearMonth,
    ) -> ChitFundResult<Option<Payment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM payment \
                 WHERE chit_id = $chit_id AND member_id = $member_id \
                 AND month = $month",
            )
            .bind(("chit_id", chit_id.to_string()))
            .bind(("member_id", member_id.to_string()))
            .bind(("month", month.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PaymentRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_payment(rows)?)
    }

    async fn update_status(&self, id: Uuid, status: PaymentStatus) -> ChitFundResult<Payment> {
        let id_str = id.to_string();

        let mut sets = vec!["status = $status"];
        if status == PaymentStatus::Paid {
            sets.push("paid_at = time::now()");
        }
        let query = format!(
            "UPDATE type::record('payment', $id) SET {} \
             RETURN meta::id(id) AS record_id, *",
            sets.join(", ")
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

        let rows: Vec<PaymentRowWithId> = result.take(0).map_err(DbError::from)?;
        first_payment(rows)?.ok_or_else(|| DbError::not_found("payment", id_str).into())
    }

    async fn list_for_chit(&self, chit_id: Uuid) -> ChitFundResult<Vec<Payment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM payment \
                 WHERE chit_id = $chit_id ORDER BY month ASC, created_at ASC",
            )
            .bind(("chit_id", chit_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PaymentRowWithId> = result.take(0).map_err(DbError::from)?;
        let payments = rows
            .into_iter()
            .map(PaymentRowWithId::try_into_payment)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(payments)
    }
}
