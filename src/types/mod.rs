//! Relay types.

pub mod abi;

pub mod relay_hub;

mod transaction;
pub use transaction::{LegacyTransaction, SignedTransaction};
