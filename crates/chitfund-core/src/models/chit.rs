//! Chit (rotating savings fund) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Paisa;
use crate::month::YearMonth;

wire_enum! {
    /// Lifecycle of a chit: OPEN → ACTIVE → CLOSED. No way back from CLOSED.
    ChitStatus {
        Open => "OPEN",
        Active => "ACTIVE",
        Closed => "CLOSED",
    }
}

wire_enum! {
    /// How each month's recipient is chosen.
    PayoutMethod {
        Random => "RANDOM",
        Voting => "VOTING",
    }
}

/// A chit fund owned by its moderator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chit {
    pub id: Uuid,
    pub name: String,
    pub fund_amount: Paisa,
    /// Number of months the chit runs for.
    pub tenure: u32,
    /// Target membership size.
    pub member_count: u32,
    pub start_month: YearMonth,
    /// Always `start_month + tenure - 1`.
    pub end_month: YearMonth,
    pub payout_method: PayoutMethod,
    pub moderator_id: Uuid,
    pub status: ChitStatus,
    pub created_at: DateTime<Utc>,
}

impl Chit {
    pub fn is_moderated_by(&self, user_id: Uuid) -> bool {
        self.moderator_id == user_id
    }

    /// Whether `month` falls inside the chit's running span.
    pub fn covers(&self, month: YearMonth) -> bool {
        self.start_month <= month && month <= self.end_month
    }
}

/// Unvalidated chit creation request as received from a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChitRequest {
    pub name: String,
    pub fund_amount: Paisa,
    pub tenure: u32,
    pub member_count: u32,
    /// `YYYY-MM`.
    pub start_month: String,
    pub payout_method: PayoutMethod,
}

/// Validated repository input; derived fields already computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChit {
    pub name: String,
    pub fund_amount: Paisa,
    pub tenure: u32,
    pub member_count: u32,
    pub start_month: YearMonth,
    pub end_month: YearMonth,
    pub payout_method: PayoutMethod,
    pub moderator_id: Uuid,
}
