//! Chit-fund lifecycle engine: derived chit fields, the chit and
//! membership state machines, and the payment/payout ledger.

pub mod error;
pub mod ledger;
pub mod schedule;
pub mod service;

pub use error::LifecycleError;
pub use ledger::{LedgerService, MonthSettlement, SettlementSummary};
pub use service::ChitService;
