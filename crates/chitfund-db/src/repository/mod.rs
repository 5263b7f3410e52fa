//! SurrealDB repository implementations.

mod chit;
mod member;
mod payment;
mod payout;
mod refresh_token;
mod user;

pub use chit::SurrealChitRepository;
pub use member::SurrealMemberRepository;
pub use payment::SurrealPaymentRepository;
pub use payout::SurrealPayoutRepository;
pub use refresh_token::SurrealRefreshTokenRepository;
pub use user::SurrealUserRepository;

use std::str::FromStr;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(entity: &'static str, field: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::decode(entity, format!("invalid {field}: {e}")))
}

/// Parse a stored wire name (status, method or month) back into its type.
fn parse_wire<T>(entity: &'static str, raw: &str) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| DbError::decode(entity, e))
}
