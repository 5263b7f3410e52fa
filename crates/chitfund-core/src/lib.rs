//! Chit-fund core: domain models, month arithmetic, request
//! validation, repository traits and the shared error type.

pub mod error;
pub mod models;
pub mod month;
pub mod repository;
pub mod validation;

pub use error::{ChitFundError, ChitFundResult, ErrorKind};
pub use month::YearMonth;
