//! Dependent resource kinds and teardown ordering
//!
//! Provides the single source of truth for which kinds block deletion of a
//! network and in what order they must be removed.

use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of resources that reference, and therefore block deletion of, a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Compute instance with an interface in one of the network's subnets
    Instance,
    /// Subnet (must be gone before gateways can be deleted)
    Subnet,
    /// Internet gateway
    InternetGateway,
    /// NAT gateway
    NatGateway,
    /// Service gateway / VPC endpoint
    ServiceGateway,
    /// Network security group
    SecurityGroup,
    /// Route table (rules must be cleared before deletion)
    RouteTable,
    /// Security list / network ACL
    SecurityList,
}

impl ResourceKind {
    /// Network-scoped kinds in the order the teardown deletes them.
    ///
    /// Instances are not listed: they are discovered through interfaces and
    /// never deleted by the teardown.
    pub const DELETION_ORDER: [ResourceKind; 7] = [
        ResourceKind::Subnet,
        ResourceKind::InternetGateway,
        ResourceKind::NatGateway,
        ResourceKind::ServiceGateway,
        ResourceKind::SecurityGroup,
        ResourceKind::RouteTable,
        ResourceKind::SecurityList,
    ];

    /// Phase in which resources of this kind are handled
    pub fn phase(self) -> Phase {
        match self {
            ResourceKind::Instance => Phase::ImpactDiscovery,
            ResourceKind::Subnet => Phase::SubnetDeletion,
            ResourceKind::InternetGateway
            | ResourceKind::NatGateway
            | ResourceKind::ServiceGateway => Phase::GatewayDeletion,
            ResourceKind::SecurityGroup => Phase::SecurityGroupDeletion,
            ResourceKind::RouteTable => Phase::RouteTableDeletion,
            ResourceKind::SecurityList => Phase::SecurityListDeletion,
        }
    }

    /// Whether the provider creates a default resource of this kind with
    /// every network (deleted by the provider together with the network).
    pub fn has_provider_default(self) -> bool {
        matches!(
            self,
            ResourceKind::SecurityGroup | ResourceKind::RouteTable | ResourceKind::SecurityList
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Instance => "instance",
            ResourceKind::Subnet => "subnet",
            ResourceKind::InternetGateway => "internet_gateway",
            ResourceKind::NatGateway => "nat_gateway",
            ResourceKind::ServiceGateway => "service_gateway",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::RouteTable => "route_table",
            ResourceKind::SecurityList => "security_list",
        }
    }

    /// Human readable label for tables and prompts
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Instance => "Instance",
            ResourceKind::Subnet => "Subnet",
            ResourceKind::InternetGateway => "Internet Gateway",
            ResourceKind::NatGateway => "NAT Gateway",
            ResourceKind::ServiceGateway => "Service Gateway",
            ResourceKind::SecurityGroup => "Security Group",
            ResourceKind::RouteTable => "Route Table",
            ResourceKind::SecurityList => "Security List",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
