//! # Post-quantum Relay
//!
//! Library for a JSON-RPC relay that wraps signed transactions into relay hub calls carrying a
//! post-quantum signature next to the sender's ECDSA signature.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod rpc;
pub mod signers;
pub mod spawn;
pub mod types;
pub mod upstream;
