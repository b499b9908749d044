//! Default configuration values for teardown runs
//!
//! The timing values mirror the pauses operators have historically relied on
//! when tearing a network down by hand.

/// Literal phrase an operator must type to authorize a teardown
pub const DEFAULT_CONFIRMATION_PHRASE: &str = "DELETE";

/// Wait after replacing a route table's rules (seconds)
pub const DEFAULT_ROUTE_SETTLE_DELAY_SECS: u64 = 2;

/// Pause after each accepted delete request (milliseconds)
pub const DEFAULT_DELETE_PACING_MILLIS: u64 = 1000;

/// Interval between subnet drain checks (seconds)
pub const DEFAULT_SUBNET_POLL_INTERVAL_SECS: u64 = 2;

/// Upper bound on the subnet drain barrier (seconds)
pub const DEFAULT_SUBNET_DRAIN_TIMEOUT_SECS: u64 = 60;

/// Unconditional wait before deleting the network itself (seconds)
pub const DEFAULT_FINAL_SETTLE_SECS: u64 = 10;

/// Maximum concurrent instance lookups during impact discovery
pub const DEFAULT_DISCOVERY_CONCURRENCY: usize = 8;

/// Display-name prefix of provider-created default tables and lists.
///
/// Only consulted when the provider exposes no authoritative default flag.
pub const DEFAULT_NAME_PREFIX: &str = "Default";

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-2";
