//! An in-memory voting contract behind the
//! [`ChainReader`](ballot_interface::services::chain::ChainReader) and
//! [`Wallet`](ballot_interface::services::wallet::Wallet) interfaces.
//!
//! Besides following the contract rules, the mock lets tests hold individual calls open and
//! inject failures, which makes interleavings of concurrent reads deterministic.
#![deny(missing_docs)]

mod contract;
mod gate;
mod service;
mod wallet;

pub use contract::MockContract;
pub use gate::HeldCall;
pub use service::*;
pub use wallet::MockWallet;
