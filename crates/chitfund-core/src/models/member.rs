//! Chit membership model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

wire_enum! {
    /// INVITED → JOINED → APPROVED, with REJECTED reachable from
    /// INVITED or JOINED.
    MemberStatus {
        Invited => "INVITED",
        Joined => "JOINED",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

impl MemberStatus {
    /// APPROVED and REJECTED admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// Association between a chit and a user. At most one per (chit, user).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub chit_id: Uuid,
    pub user_id: Uuid,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMember {
    pub chit_id: Uuid,
    pub user_id: Uuid,
    pub status: MemberStatus,
}
