//! Relay constants.

/// The method whose raw transaction is wrapped into a relay hub call.
pub const SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";

/// The method answered with the nonce tracked by the relay hub.
pub const GET_TRANSACTION_COUNT: &str = "eth_getTransactionCount";

/// The method used to read the relay hub nonce.
pub const ETH_CALL: &str = "eth_call";

/// The block tag every upstream query is made against.
pub const LATEST_BLOCK: &str = "latest";

/// Gas price of the transactions sent to the relay hub.
pub const DEFAULT_OUTER_GAS_PRICE: u64 = 0xFFFFF;

/// Gas limit of the transactions sent to the relay hub.
pub const DEFAULT_OUTER_GAS_LIMIT: u64 = 0xFF_FFFF_FFFF;

/// The default port to serve the RPC on.
pub const DEFAULT_PORT: u16 = 9119;

/// The default port of the upstream node.
pub const DEFAULT_UPSTREAM_PORT: u16 = 8545;
