//! Lifecycle engine error types.

use chitfund_core::error::ChitFundError;
use chitfund_core::month::{MonthError, YearMonth};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("chit not found: {0}")]
    ChitNotFound(Uuid),

    #[error("no user matches {0}")]
    UserNotFound(String),

    #[error("no invitation found")]
    NoInvitationFound { chit_id: Uuid, user_id: Uuid },

    #[error("member not found")]
    MemberNotFound { chit_id: Uuid, user_id: Uuid },

    #[error("chit not open")]
    ChitNotOpen,

    #[error("chit not active")]
    ChitNotActive,

    #[error("chit is active")]
    ChitActive,

    #[error("member limit reached")]
    MemberLimitReached,

    #[error("already invited")]
    AlreadyInvited,

    #[error("already joined")]
    AlreadyJoined,

    #[error("already approved")]
    AlreadyApproved,

    #[error("invitation rejected")]
    InvitationRejected,

    #[error("member has not joined")]
    NotJoined,

    #[error("insufficient approved members")]
    InsufficientApprovedMembers,

    #[error("chit term not ended")]
    TermNotEnded,

    #[error("chit not settled")]
    NotSettled,

    #[error("member not approved")]
    MemberNotApproved,

    #[error("month {0} is outside the chit term")]
    MonthOutsideTerm(YearMonth),

    #[error("payment already recorded")]
    PaymentAlreadyRecorded,

    #[error("payout already scheduled")]
    PayoutAlreadyScheduled,

    #[error("payout method requires a vote")]
    VoteRequired,

    #[error("no eligible payout recipient")]
    NoEligibleRecipient,

    #[error("cannot move from {from} to {to}")]
    InvalidStatusTransition { from: &'static str, to: &'static str },

    #[error("member count and tenure must both be non-zero")]
    DivisionInvalid,

    #[error("tenure must be at least one month")]
    ZeroTenure,

    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("amount overflows")]
    AmountOverflow,

    #[error(transparent)]
    Month(#[from] MonthError),
}

impl From<LifecycleError> for ChitFundError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::ChitNotFound(id) => ChitFundError::not_found("chit", id),
            LifecycleError::UserNotFound(identity) => ChitFundError::not_found("user", identity),
            LifecycleError::NoInvitationFound { chit_id, user_id }
            | LifecycleError::MemberNotFound { chit_id, user_id } => {
                ChitFundError::not_found("member", format!("{chit_id}/{user_id}"))
            }
            LifecycleError::DivisionInvalid
            | LifecycleError::ZeroTenure
            | LifecycleError::NonPositiveAmount
            | LifecycleError::AmountOverflow
            | LifecycleError::Month(_) => ChitFundError::validation(err.to_string()),
            LifecycleError::ChitNotOpen
            | LifecycleError::ChitNotActive
            | LifecycleError::ChitActive
            | LifecycleError::MemberLimitReached
            | LifecycleError::AlreadyInvited
            | LifecycleError::AlreadyJoined
            | LifecycleError::AlreadyApproved
            | LifecycleError::InvitationRejected
            | LifecycleError::NotJoined
            | LifecycleError::InsufficientApprovedMembers
            | LifecycleError::TermNotEnded
            | LifecycleError::NotSettled
            | LifecycleError::MemberNotApproved
            | LifecycleError::MonthOutsideTerm(_)
            | LifecycleError::PaymentAlreadyRecorded
            | LifecycleError::PayoutAlreadyScheduled
            | LifecycleError::VoteRequired
            | LifecycleError::NoEligibleRecipient
            | LifecycleError::InvalidStatusTransition { .. } => {
                ChitFundError::conflict(err.to_string())
            }
        }
    }
}
