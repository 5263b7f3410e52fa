//! Monthly member contribution model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Paisa;
use crate::month::YearMonth;

wire_enum! {
    PaymentStatus {
        Pending => "PENDING",
        Paid => "PAID",
        Overdue => "OVERDUE",
    }
}

/// One contribution per (chit, member, month).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub chit_id: Uuid,
    pub member_id: Uuid,
    pub amount: Paisa,
    pub month: YearMonth,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub chit_id: Uuid,
    pub member_id: Uuid,
    pub amount: Paisa,
    pub month: YearMonth,
}
