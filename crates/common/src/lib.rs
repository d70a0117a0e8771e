//! Common types and utilities for Carbon Karma

pub mod config;
pub mod error;
pub mod ledger;
pub mod models;

#[cfg(test)]
mod ledger_test;

pub use config::Config;
pub use error::{Error, Result};
pub use ledger::ProgressionState;
