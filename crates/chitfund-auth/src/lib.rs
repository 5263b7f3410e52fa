//! Chit-fund auth: passwordless OTP login, JWT token pairs and
//! refresh-token rotation.

pub mod config;
pub mod delivery;
pub mod error;
pub mod otp;
pub mod profile;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use delivery::{CodeDelivery, TracingCodeDelivery};
pub use error::AuthError;
pub use otp::{InMemoryOtpStore, OtpEntry, OtpStore, OtpVerdict};
pub use profile::{ProfileService, UpdateProfile};
pub use service::{AuthService, OtpIssued, Revocation};
pub use token::{TokenClaims, TokenPair, TokenType, validate_access_token};
