//! Service wiring over one SurrealDB session.

use std::sync::Arc;

use chitfund_auth::{AuthConfig, AuthService, InMemoryOtpStore, ProfileService, TracingCodeDelivery};
use chitfund_core::error::ChitFundResult;
use chitfund_core::repository::RefreshTokenRepository;
use chitfund_db::repository::{
    SurrealChitRepository, SurrealMemberRepository, SurrealPaymentRepository,
    SurrealPayoutRepository, SurrealRefreshTokenRepository, SurrealUserRepository,
};
use chitfund_lifecycle::{ChitService, LedgerService};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};

pub type Auth<C> = AuthService<
    SurrealUserRepository<C>,
    SurrealRefreshTokenRepository<C>,
    Arc<InMemoryOtpStore>,
    TracingCodeDelivery,
>;

pub type Chits<C> =
    ChitService<SurrealChitRepository<C>, SurrealMemberRepository<C>, SurrealUserRepository<C>>;

pub type Ledger<C> = LedgerService<
    SurrealChitRepository<C>,
    SurrealMemberRepository<C>,
    SurrealPaymentRepository<C>,
    SurrealPayoutRepository<C>,
>;

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sweep {
    pub refresh_tokens: u64,
    pub one_time_codes: usize,
}

/// Every service the request layer is built on, sharing one session
/// and one process-local OTP store.
pub struct Services<C>
where
    C: Connection + Clone,
{
    pub auth: Auth<C>,
    pub profiles: ProfileService<SurrealUserRepository<C>>,
    pub chits: Chits<C>,
    pub ledger: Ledger<C>,
    refresh_tokens: SurrealRefreshTokenRepository<C>,
    otp_store: Arc<InMemoryOtpStore>,
}

impl<C> Services<C>
where
    C: Connection + Clone,
{
    pub fn new(db: Surreal<C>, auth_config: AuthConfig) -> Self {
        let users = SurrealUserRepository::new(db.clone());
        let refresh_tokens = SurrealRefreshTokenRepository::new(db.clone());
        let chits = SurrealChitRepository::new(db.clone());
        let members = SurrealMemberRepository::new(db.clone());
        let otp_store = Arc::new(InMemoryOtpStore::new());

        Self {
            auth: AuthService::new(
                users.clone(),
                refresh_tokens.clone(),
                Arc::clone(&otp_store),
                TracingCodeDelivery,
                auth_config,
            ),
            profiles: ProfileService::new(users.clone()),
            chits: ChitService::new(chits.clone(), members.clone(), users),
            ledger: LedgerService::new(
                chits,
                members,
                SurrealPaymentRepository::new(db.clone()),
                SurrealPayoutRepository::new(db),
            ),
            refresh_tokens,
            otp_store,
        }
    }

    /// Drop refresh tokens and one-time codes that have expired by `now`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> ChitFundResult<Sweep> {
        let refresh_tokens = self.refresh_tokens.cleanup_expired().await?;
        let one_time_codes = self.otp_store.purge_expired(now);
        Ok(Sweep {
            refresh_tokens,
            one_time_codes,
        })
    }
}
