//! Configuration types for teardown runs

use crate::wait::PollConfig;
use net_teardown_common::defaults::{
    DEFAULT_CONFIRMATION_PHRASE, DEFAULT_DELETE_PACING_MILLIS, DEFAULT_DISCOVERY_CONCURRENCY,
    DEFAULT_FINAL_SETTLE_SECS, DEFAULT_NAME_PREFIX, DEFAULT_ROUTE_SETTLE_DELAY_SECS,
    DEFAULT_SUBNET_DRAIN_TIMEOUT_SECS, DEFAULT_SUBNET_POLL_INTERVAL_SECS,
};
use std::time::Duration;

/// AWS connection settings
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Knobs of a single teardown run
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    /// Literal phrase the caller must echo back to authorize the run
    pub confirmation_phrase: String,
    /// Wait after clearing a route table's rules
    pub route_settle_delay: Duration,
    /// Pause after each accepted delete request
    pub delete_pacing: Duration,
    /// Subnet drain barrier bounds
    pub subnet_drain: PollConfig,
    /// Unconditional wait before deleting the network
    pub final_settle_delay: Duration,
    /// Maximum concurrent instance lookups during impact discovery
    pub discovery_concurrency: usize,
    /// Display-name prefix treated as "provider default" when the provider
    /// has no authoritative flag
    pub default_name_prefix: String,
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            confirmation_phrase: DEFAULT_CONFIRMATION_PHRASE.to_string(),
            route_settle_delay: Duration::from_secs(DEFAULT_ROUTE_SETTLE_DELAY_SECS),
            delete_pacing: Duration::from_millis(DEFAULT_DELETE_PACING_MILLIS),
            subnet_drain: PollConfig::new(
                Duration::from_secs(DEFAULT_SUBNET_POLL_INTERVAL_SECS),
                Duration::from_secs(DEFAULT_SUBNET_DRAIN_TIMEOUT_SECS),
            ),
            final_settle_delay: Duration::from_secs(DEFAULT_FINAL_SETTLE_SECS),
            discovery_concurrency: DEFAULT_DISCOVERY_CONCURRENCY,
            default_name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }
}

impl TeardownConfig {
    /// Configuration with every wait set to zero, for simulations and tests
    pub fn without_delays() -> Self {
        Self {
            route_settle_delay: Duration::ZERO,
            delete_pacing: Duration::ZERO,
            subnet_drain: PollConfig::new(Duration::ZERO, Duration::ZERO),
            final_settle_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_confirmation_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.confirmation_phrase = phrase.into();
        self
    }

    pub fn with_subnet_drain(mut self, interval: Duration, timeout: Duration) -> Self {
        self.subnet_drain = PollConfig::new(interval, timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TeardownConfig::default();
        assert_eq!(config.confirmation_phrase, "DELETE");
        assert_eq!(config.route_settle_delay, Duration::from_secs(2));
        assert_eq!(config.delete_pacing, Duration::from_secs(1));
        assert_eq!(config.subnet_drain.interval, Duration::from_secs(2));
        assert_eq!(config.subnet_drain.timeout, Duration::from_secs(60));
        assert_eq!(config.final_settle_delay, Duration::from_secs(10));
        assert_eq!(config.default_name_prefix, "Default");
    }

    #[test]
    fn test_without_delays_keeps_phrase() {
        let config = TeardownConfig::without_delays().with_confirmation_phrase("DELETAR");
        assert_eq!(config.confirmation_phrase, "DELETAR");
        assert_eq!(config.final_settle_delay, Duration::ZERO);
        assert_eq!(config.subnet_drain.timeout, Duration::ZERO);
    }
}
