//! Provider-independent resource model
//!
//! The orchestrator only ever sees these shapes; provider bindings translate
//! their SDK types into them.

use crate::lifecycle::LifecycleState;
use crate::power::PowerState;
use crate::resource_kind::ResourceKind;
use serde::{Deserialize, Serialize};

/// The virtual network being torn down
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkResource {
    pub id: String,
    pub display_name: String,
    pub cidr_block: Option<String>,
    pub state: LifecycleState,
}

/// Compute instance as listed in the provider scope (not yet tied to a network)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub id: String,
    pub display_name: String,
    pub state: LifecycleState,
    #[serde(default)]
    pub power: PowerState,
}

/// Fields shared by every dependent resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: String,
    pub display_name: String,
    pub state: LifecycleState,
    /// Owning network (by id, not ownership)
    pub network_id: String,
    /// Authoritative provider flag marking the network's default resource.
    ///
    /// `None` when the provider does not expose such a flag.
    pub is_default: Option<bool>,
}

impl ResourceInfo {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        network_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            state: LifecycleState::Available,
            network_id: network_id.into(),
            is_default: None,
        }
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }

    pub fn with_default_flag(mut self, is_default: bool) -> Self {
        self.is_default = Some(is_default);
        self
    }
}

/// A forwarding rule inside a route table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteRule {
    /// Destination CIDR (or provider prefix-list id)
    pub destination: String,
    /// Target resource id (gateway, interface, peering connection, ...)
    pub target: String,
}

impl RouteRule {
    pub fn new(destination: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            target: target.into(),
        }
    }
}

/// A resource whose existence blocks deletion of its network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependentResource {
    Instance(ResourceInfo),
    Subnet(ResourceInfo),
    InternetGateway(ResourceInfo),
    NatGateway(ResourceInfo),
    ServiceGateway(ResourceInfo),
    SecurityGroup(ResourceInfo),
    RouteTable {
        #[serde(flatten)]
        info: ResourceInfo,
        rules: Vec<RouteRule>,
    },
    SecurityList(ResourceInfo),
}

impl DependentResource {
    /// Wrap `info` in the variant for `kind`. Route tables start without rules.
    pub fn from_info(kind: ResourceKind, info: ResourceInfo) -> Self {
        match kind {
            ResourceKind::Instance => Self::Instance(info),
            ResourceKind::Subnet => Self::Subnet(info),
            ResourceKind::InternetGateway => Self::InternetGateway(info),
            ResourceKind::NatGateway => Self::NatGateway(info),
            ResourceKind::ServiceGateway => Self::ServiceGateway(info),
            ResourceKind::SecurityGroup => Self::SecurityGroup(info),
            ResourceKind::RouteTable => Self::RouteTable {
                info,
                rules: Vec::new(),
            },
            ResourceKind::SecurityList => Self::SecurityList(info),
        }
    }

    pub fn route_table(info: ResourceInfo, rules: Vec<RouteRule>) -> Self {
        Self::RouteTable { info, rules }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Instance(_) => ResourceKind::Instance,
            Self::Subnet(_) => ResourceKind::Subnet,
            Self::InternetGateway(_) => ResourceKind::InternetGateway,
            Self::NatGateway(_) => ResourceKind::NatGateway,
            Self::ServiceGateway(_) => ResourceKind::ServiceGateway,
            Self::SecurityGroup(_) => ResourceKind::SecurityGroup,
            Self::RouteTable { .. } => ResourceKind::RouteTable,
            Self::SecurityList(_) => ResourceKind::SecurityList,
        }
    }

    pub fn info(&self) -> &ResourceInfo {
        match self {
            Self::Instance(info)
            | Self::Subnet(info)
            | Self::InternetGateway(info)
            | Self::NatGateway(info)
            | Self::ServiceGateway(info)
            | Self::SecurityGroup(info)
            | Self::SecurityList(info) => info,
            Self::RouteTable { info, .. } => info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn display_name(&self) -> &str {
        &self.info().display_name
    }

    pub fn network_id(&self) -> &str {
        &self.info().network_id
    }

    pub fn state(&self) -> &LifecycleState {
        &self.info().state
    }

    /// Route rules, for route tables only
    pub fn route_rules(&self) -> Option<&[RouteRule]> {
        match self {
            Self::RouteTable { rules, .. } => Some(rules),
            _ => None,
        }
    }

    pub fn to_ref(&self) -> ResourceRef {
        ResourceRef {
            kind: self.kind(),
            id: self.id().to_string(),
            display_name: self.display_name().to_string(),
        }
    }
}

/// Lightweight reference to a resource, used in results and reports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
    pub display_name: String,
}

/// State of an interface attachment on an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentState {
    Attaching,
    Attached,
    Detaching,
    Detached,
    Unknown,
}

impl AttachmentState {
    /// Attachments that still tie the instance to the interface's subnet
    pub fn is_active(self) -> bool {
        matches!(self, Self::Attaching | Self::Attached)
    }
}

/// Attachment of a network interface to an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAttachment {
    pub instance_id: String,
    pub interface_id: String,
    pub state: AttachmentState,
}

/// A network interface, as far as teardown cares about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: String,
    pub subnet_id: String,
}

/// Subnet lookup result used to walk interface -> subnet -> network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetInfo {
    pub id: String,
    pub display_name: String,
    pub network_id: String,
}
