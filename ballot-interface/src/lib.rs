//! This crate defines the data model and the service traits shared by every part of the
//! ballot client. The synchronizer, the transaction submitter and the presentation layer are
//! written against these interfaces only, which allows the same client logic to run against a
//! live EVM node or against the in-memory chain used in tests.

#![deny(missing_docs)]

pub mod address;
pub mod chains;
pub mod display;
mod model;
pub mod revert;
pub mod services;

pub use ethers_core::types::{Address, TxHash, U256};
pub use model::*;
