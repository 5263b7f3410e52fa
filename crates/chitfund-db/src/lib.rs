//! SurrealDB persistence for the chit-fund service.
//!
//! [`DbManager`] opens the session and brings the schema up to date,
//! and [`repository`] implements the `chitfund-core` repository traits
//! for users, chits, memberships, the payment/payout ledger and
//! refresh tokens. Failures surface as [`DbError`] and convert into
//! `ChitFundError` at the crate boundary.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
