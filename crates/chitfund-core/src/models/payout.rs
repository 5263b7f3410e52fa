//! Monthly pot payout model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Paisa;
use crate::month::YearMonth;

wire_enum! {
    PayoutStatus {
        Pending => "PENDING",
        Paid => "PAID",
    }
}

/// One payout per (chit, month).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payout {
    pub id: Uuid,
    pub chit_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: Paisa,
    pub month: YearMonth,
    pub status: PayoutStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayout {
    pub chit_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: Paisa,
    pub month: YearMonth,
}
