//! Chit-fund server library.
//!
//! Configuration parsing and service wiring shared by the
//! `chitfund-server` binary and anything that mounts a request layer
//! over the services.

pub mod bootstrap;
pub mod config;

pub use bootstrap::{Services, Sweep};
pub use config::{Cli, LogFormat};
