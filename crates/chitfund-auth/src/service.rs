//! Authentication service: OTP login, token issuance and refresh
//! rotation.

use chitfund_core::error::{ChitFundError, ChitFundResult};
use chitfund_core::models::refresh_token::CreateRefreshToken;
use chitfund_core::models::user::{CreateUser, Identity, UpdateUser, User};
use chitfund_core::repository::{RefreshTokenRepository, UserRepository};
use chitfund_core::validation;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::delivery::CodeDelivery;
use crate::error::AuthError;
use crate::otp::{self, OtpEntry, OtpStore, OtpVerdict};
use crate::token::{self, TokenPair, TokenType};

/// Acknowledgement returned by [`AuthService::initiate_login`]. It is
/// the same whether or not the identity belongs to a registered user.
#[derive(Debug, Clone)]
pub struct OtpIssued {
    pub expires_at: DateTime<Utc>,
}

/// Result of [`AuthService::revoke_refresh_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    Revoked,
    NotFound,
}

/// Authentication service.
///
/// Generic over repository, store and delivery implementations so the
/// auth layer has no dependency on the database crate.
pub struct AuthService<U, R, S, D>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    S: OtpStore,
    D: CodeDelivery,
{
    user_repo: U,
    refresh_repo: R,
    otp_store: S,
    delivery: D,
    config: AuthConfig,
}

impl<U, R, S, D> AuthService<U, R, S, D>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    S: OtpStore,
    D: CodeDelivery,
{
    pub fn new(user_repo: U, refresh_repo: R, otp_store: S, delivery: D, config: AuthConfig) -> Self {
        Self {
            user_repo,
            refresh_repo,
            otp_store,
            delivery,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Issue a one-time code for the identity and hand it to the
    /// delivery channel.
    pub async fn initiate_login(&self, identity: &Identity) -> ChitFundResult<OtpIssued> {
        let (email, mobile) = parts(identity);
        validation::validate_login(email, mobile).into_result()?;

        let code = otp::generate_code();
        let entry = OtpEntry::new(
            &code,
            Utc::now(),
            Duration::seconds(self.config.otp_lifetime_secs as i64),
        );
        let expires_at = entry.expires_at;
        self.otp_store.put(identity.key(), entry).await?;

        if let Err(err) = self.delivery.deliver(identity, &code).await {
            // An undeliverable code must not stay redeemable.
            self.otp_store.remove(identity.key()).await?;
            return Err(err);
        }

        info!(identity = identity.key(), %expires_at, "One-time code issued");
        Ok(OtpIssued { expires_at })
    }

    /// Verify a submitted code and log the user in, creating the user
    /// record on first login.
    pub async fn verify_otp(&self, identity: &Identity, code: &str) -> ChitFundResult<TokenPair> {
        self.verify_otp_at(identity, code, Utc::now()).await
    }

    /// [`Self::verify_otp`] against an explicit clock.
    pub async fn verify_otp_at(
        &self,
        identity: &Identity,
        code: &str,
        now: DateTime<Utc>,
    ) -> ChitFundResult<TokenPair> {
        // 1. Validate request shape.
        let (email, mobile) = parts(identity);
        validation::validate_otp_verification(email, mobile, code).into_result()?;

        // 2. Check and consume the stored code.
        match self
            .otp_store
            .compare_and_evict(identity.key(), code, now)
            .await?
        {
            OtpVerdict::Verified => {}
            OtpVerdict::NotFound => {
                return Err(AuthError::OtpNotFound(identity.key().to_string()).into());
            }
            OtpVerdict::Expired => return Err(AuthError::OtpExpired.into()),
            OtpVerdict::Mismatch => {
                warn!(identity = identity.key(), "One-time code mismatch");
                return Err(AuthError::OtpMismatch.into());
            }
        }

        // 3. Load or create the user, marking the channel verified.
        let user = self.upsert_verified_user(identity).await?;

        // 4. Issue tokens.
        let pair = self.generate_token_pair(&user).await?;
        info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// Issue an access/refresh pair for the user and track the refresh
    /// token server-side.
    pub async fn generate_token_pair(&self, user: &User) -> ChitFundResult<TokenPair> {
        let (access_token, access_claims) =
            token::issue_token(user.id, TokenType::Access, &self.config)?;
        let (refresh_token, refresh_claims) =
            token::issue_token(user.id, TokenType::Refresh, &self.config)?;

        let refresh_expires_at = refresh_claims.expires_at();
        self.refresh_repo
            .create(CreateRefreshToken {
                user_id: user.id,
                token_hash: token::hash_refresh_token(&refresh_token),
                expires_at: refresh_expires_at,
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at: access_claims.expires_at(),
            refresh_expires_at,
        })
    }

    /// Rotate a refresh token: revoke the presented token and issue a
    /// new pair. Each refresh token is single-use.
    pub async fn refresh_access_token(&self, raw_refresh_token: &str) -> ChitFundResult<TokenPair> {
        // 1. Verify signature, type and claims.
        let claims = match token::decode_token(raw_refresh_token, &self.config) {
            Ok(claims) => claims,
            Err(AuthError::TokenExpired) => {
                self.discard(raw_refresh_token).await?;
                return Err(AuthError::RefreshTokenExpired.into());
            }
            Err(AuthError::Crypto(msg)) => return Err(ChitFundError::Crypto(msg)),
            Err(_) => return Err(AuthError::InvalidRefreshToken.into()),
        };
        if claims.typ != TokenType::Refresh {
            return Err(AuthError::InvalidRefreshToken.into());
        }

        // 2. Look up the tracked record.
        let token_hash = token::hash_refresh_token(raw_refresh_token);
        let record = self
            .refresh_repo
            .get_by_token_hash(&token_hash)
            .await
            .map_err(|e| match e {
                ChitFundError::NotFound { .. } => AuthError::InvalidRefreshToken.into(),
                other => other,
            })?;

        // 3. Check server-side expiry.
        if record.expires_at <= Utc::now() {
            self.refresh_repo.revoke(record.id).await?;
            return Err(AuthError::RefreshTokenExpired.into());
        }

        // 4. Revoke (single-use guarantee). A concurrent rotation that
        //    got there first leaves nothing to revoke.
        if !self.refresh_repo.revoke(record.id).await? {
            return Err(AuthError::InvalidRefreshToken.into());
        }

        // 5. Verify the user still exists.
        let user = self
            .user_repo
            .get_by_id(record.user_id)
            .await
            .map_err(|e| match e {
                ChitFundError::NotFound { .. } => AuthError::InvalidRefreshToken.into(),
                other => other,
            })?;

        // 6. Issue the new pair.
        let pair = self.generate_token_pair(&user).await?;
        info!(user_id = %user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Revoke a single refresh token.
    pub async fn revoke_refresh_token(&self, raw_refresh_token: &str) -> ChitFundResult<Revocation> {
        let token_hash = token::hash_refresh_token(raw_refresh_token);
        let record = match self.refresh_repo.get_by_token_hash(&token_hash).await {
            Ok(record) => record,
            Err(ChitFundError::NotFound { .. }) => return Ok(Revocation::NotFound),
            Err(e) => return Err(e),
        };

        if self.refresh_repo.revoke(record.id).await? {
            info!(user_id = %record.user_id, "Refresh token revoked");
            Ok(Revocation::Revoked)
        } else {
            Ok(Revocation::NotFound)
        }
    }

    /// Revoke every refresh token issued to the user.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> ChitFundResult<()> {
        self.refresh_repo.revoke_all_for_user(user_id).await?;
        info!(%user_id, "All refresh tokens revoked");
        Ok(())
    }

    async fn discard(&self, raw_refresh_token: &str) -> ChitFundResult<()> {
        let token_hash = token::hash_refresh_token(raw_refresh_token);
        match self.refresh_repo.get_by_token_hash(&token_hash).await {
            Ok(record) => {
                self.refresh_repo.revoke(record.id).await?;
                Ok(())
            }
            Err(ChitFundError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn upsert_verified_user(&self, identity: &Identity) -> ChitFundResult<User> {
        let existing = match identity {
            Identity::Email(email) => self.user_repo.get_by_email(email).await,
            Identity::Mobile(mobile) => self.user_repo.get_by_mobile(mobile).await,
        };

        match existing {
            Ok(user) => {
                let update = match identity {
                    Identity::Email(_) if !user.is_email_verified => UpdateUser {
                        is_email_verified: Some(true),
                        ..Default::default()
                    },
                    Identity::Mobile(_) if !user.is_mobile_verified => UpdateUser {
                        is_mobile_verified: Some(true),
                        ..Default::default()
                    },
                    _ => return Ok(user),
                };
                self.user_repo.update(user.id, update).await
            }
            Err(ChitFundError::NotFound { .. }) => {
                let (email, mobile) = parts(identity);
                let user = self
                    .user_repo
                    .create(CreateUser {
                        email: email.map(str::to_string),
                        mobile: mobile.map(str::to_string),
                        name: identity.default_name(),
                        is_email_verified: email.is_some(),
                        is_mobile_verified: mobile.is_some(),
                    })
                    .await?;
                info!(user_id = %user.id, "User registered on first login");
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }
}

fn parts(identity: &Identity) -> (Option<&str>, Option<&str>) {
    match identity {
        Identity::Email(email) => (Some(email.as_str()), None),
        Identity::Mobile(mobile) => (None, Some(mobile.as_str())),
    }
}
