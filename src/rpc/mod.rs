//! RPC modules.

mod relay;

pub use relay::*;
