//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups that identify a single
//! record by key return [`ChitFundError::NotFound`](crate::error::ChitFundError)
//! when it is absent; `find*` lookups return `Option` instead.

use uuid::Uuid;

use crate::error::ChitFundResult;
use crate::models::{
    chit::{Chit, ChitStatus, CreateChit},
    member::{CreateMember, Member, MemberStatus},
    payment::{CreatePayment, Payment, PaymentStatus},
    payout::{CreatePayout, Payout, PayoutStatus},
    refresh_token::{CreateRefreshToken, RefreshToken},
    user::{CreateUser, UpdateUser, User},
};
use crate::month::YearMonth;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = ChitFundResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ChitFundResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = ChitFundResult<User>> + Send;
    fn get_by_mobile(&self, mobile: &str) -> impl Future<Output = ChitFundResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = ChitFundResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Chits
// ---------------------------------------------------------------------------

pub trait ChitRepository: Send + Sync {
    /// Insert a new chit in status OPEN.
    fn create(&self, input: CreateChit) -> impl Future<Output = ChitFundResult<Chit>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ChitFundResult<Chit>> + Send;
    fn update_status(
        &self,
        id: Uuid,
        status: ChitStatus,
    ) -> impl Future<Output = ChitFundResult<Chit>> + Send;
    /// Chits the user moderates or holds a membership in (any status).
    fn list_for_user(&self, user_id: Uuid) -> impl Future<Output = ChitFundResult<Vec<Chit>>> + Send;
    /// Delete a chit together with its members, payments and payouts.
    fn delete(&self, id: Uuid) -> impl Future<Output = ChitFundResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Memberships (scoped to a chit)
// ---------------------------------------------------------------------------

pub trait MemberRepository: Send + Sync {
    fn find(
        &self,
        chit_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = ChitFundResult<Option<Member>>> + Send;
    fn insert(&self, input: CreateMember) -> impl Future<Output = ChitFundResult<Member>> + Send;
    fn update_status(
        &self,
        chit_id: Uuid,
        user_id: Uuid,
        status: MemberStatus,
    ) -> impl Future<Output = ChitFundResult<Member>> + Send;
    /// Memberships holding a seat in the chit: every status but REJECTED.
    fn count_active_for_chit(
        &self,
        chit_id: Uuid,
    ) -> impl Future<Output = ChitFundResult<u64>> + Send;
    fn list_for_chit(&self, chit_id: Uuid) -> impl Future<Output = ChitFundResult<Vec<Member>>> + Send;
}

// ---------------------------------------------------------------------------
// Ledger (scoped to a chit)
// ---------------------------------------------------------------------------

pub trait PaymentRepository: Send + Sync {
    /// Insert a new payment in status PENDING.
    fn create(&self, input: CreatePayment) -> impl Future<Output = ChitFundResult<Payment>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ChitFundResult<Payment>> + Send;
    fn find(
        &self,
        chit_id: Uuid,
        member_id: Uuid,
        month: YearMonth,
    ) -> impl Future<Output = ChitFundResult<Option<Payment>>> + Send;
    /// Set the status; moving to PAID stamps `paid_at`.
    fn update_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> impl Future<Output = ChitFundResult<Payment>> + Send;
    fn list_for_chit(&self, chit_id: Uuid) -> impl Future<Output = ChitFundResult<Vec<Payment>>> + Send;
}

pub trait PayoutRepository: Send + Sync {
    /// Insert a new payout in status PENDING.
    fn create(&self, input: CreatePayout) -> impl Future<Output = ChitFundResult<Payout>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ChitFundResult<Payout>> + Send;
    fn find_by_month(
        &self,
        chit_id: Uuid,
        month: YearMonth,
    ) -> impl Future<Output = ChitFundResult<Option<Payout>>> + Send;
    /// Set the status; moving to PAID stamps `paid_at`.
    fn update_status(
        &self,
        id: Uuid,
        status: PayoutStatus,
    ) -> impl Future<Output = ChitFundResult<Payout>> + Send;
    fn list_for_chit(&self, chit_id: Uuid) -> impl Future<Output = ChitFundResult<Vec<Payout>>> + Send;
}

// ---------------------------------------------------------------------------
// Refresh tokens
// ---------------------------------------------------------------------------

pub trait RefreshTokenRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRefreshToken,
    ) -> impl Future<Output = ChitFundResult<RefreshToken>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = ChitFundResult<RefreshToken>> + Send;
    /// Revoke a single token. Returns `false` if no such token was live.
    fn revoke(&self, id: Uuid) -> impl Future<Output = ChitFundResult<bool>> + Send;
    /// Revoke every token issued to the user.
    fn revoke_all_for_user(&self, user_id: Uuid) -> impl Future<Output = ChitFundResult<()>> + Send;
    /// Remove all expired tokens, returning how many were removed.
    fn cleanup_expired(&self) -> impl Future<Output = ChitFundResult<u64>> + Send;
}
