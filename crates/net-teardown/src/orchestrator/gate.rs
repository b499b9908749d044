//! Operator decision when instances still use the network

use net_teardown_common::{DependentResource, NetworkResource};

/// Decides whether a teardown continues after impact discovery found
/// instances attached to the network.
pub trait InUseGate: Send + Sync {
    fn proceed(&self, network: &NetworkResource, in_use: &[DependentResource]) -> bool;
}

/// Fixed answer, for non-interactive callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InUsePolicy {
    /// Continue even though instances will lose connectivity
    Proceed,
    /// Stop before any mutation
    Abort,
}

impl InUseGate for InUsePolicy {
    fn proceed(&self, _network: &NetworkResource, _in_use: &[DependentResource]) -> bool {
        *self == InUsePolicy::Proceed
    }
}

impl<F> InUseGate for F
where
    F: Fn(&NetworkResource, &[DependentResource]) -> bool + Send + Sync,
{
    fn proceed(&self, network: &NetworkResource, in_use: &[DependentResource]) -> bool {
        self(network, in_use)
    }
}
