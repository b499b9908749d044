//! The fixed teardown phase sequence

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the network teardown, in execution order.
///
/// The derived ordering is the execution order; phases never run out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ImpactDiscovery,
    RouteRuleClearing,
    SubnetDeletion,
    SubnetDrain,
    GatewayDeletion,
    SecurityGroupDeletion,
    RouteTableDeletion,
    SecurityListDeletion,
    Settle,
    NetworkDeletion,
}

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::ImpactDiscovery,
        Phase::RouteRuleClearing,
        Phase::SubnetDeletion,
        Phase::SubnetDrain,
        Phase::GatewayDeletion,
        Phase::SecurityGroupDeletion,
        Phase::RouteTableDeletion,
        Phase::SecurityListDeletion,
        Phase::Settle,
        Phase::NetworkDeletion,
    ];

    /// 1-based step number, as shown to operators
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::ImpactDiscovery => "impact discovery",
            Phase::RouteRuleClearing => "route rule clearing",
            Phase::SubnetDeletion => "subnet deletion",
            Phase::SubnetDrain => "subnet drain",
            Phase::GatewayDeletion => "gateway deletion",
            Phase::SecurityGroupDeletion => "security group deletion",
            Phase::RouteTableDeletion => "route table deletion",
            Phase::SecurityListDeletion => "security list deletion",
            Phase::Settle => "settle",
            Phase::NetworkDeletion => "network deletion",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/10 {}", self.number(), self.description())
    }
}
