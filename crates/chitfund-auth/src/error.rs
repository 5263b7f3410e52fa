//! Authentication error types.

use chitfund_core::error::ChitFundError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no one-time code issued for {0}")]
    OtpNotFound(String),

    #[error("one-time code has expired")]
    OtpExpired,

    #[error("otp mismatch")]
    OtpMismatch,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("refresh token has expired")]
    RefreshTokenExpired,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for ChitFundError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::OtpNotFound(key) => ChitFundError::NotFound {
                entity: "otp".into(),
                id: key,
            },
            AuthError::OtpExpired => ChitFundError::Expired { what: "otp".into() },
            AuthError::RefreshTokenExpired => ChitFundError::Expired {
                what: "refresh token".into(),
            },
            AuthError::TokenExpired => ChitFundError::Expired {
                what: "access token".into(),
            },
            AuthError::OtpMismatch
            | AuthError::InvalidRefreshToken
            | AuthError::TokenInvalid(_) => ChitFundError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => ChitFundError::Crypto(msg),
        }
    }
}
