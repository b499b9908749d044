//! Constructors for test resources

use net_teardown_common::{
    DependentResource, InstanceInfo, LifecycleState, NetworkResource, PortRange, PowerState,
    Protocol, ResourceInfo, ResourceKind, RouteRule, RuleDirection, SecurityRule,
};

pub fn network(id: &str, name: &str) -> NetworkResource {
    NetworkResource {
        id: id.to_string(),
        display_name: name.to_string(),
        cidr_block: Some("10.0.0.0/16".to_string()),
        state: LifecycleState::Available,
    }
}

/// A running instance
pub fn instance(id: &str, name: &str) -> InstanceInfo {
    InstanceInfo {
        id: id.to_string(),
        display_name: name.to_string(),
        state: LifecycleState::Available,
        power: PowerState::Running,
    }
}

pub fn stopped_instance(id: &str, name: &str) -> InstanceInfo {
    InstanceInfo {
        power: PowerState::Stopped,
        ..instance(id, name)
    }
}

/// A dependent of `kind` named after its id, with no default flag
pub fn dependent(kind: ResourceKind, id: &str, network_id: &str) -> DependentResource {
    DependentResource::from_info(kind, ResourceInfo::new(id, id, network_id))
}

pub fn subnet(id: &str, network_id: &str) -> DependentResource {
    dependent(ResourceKind::Subnet, id, network_id)
}

pub fn route_table(
    id: &str,
    name: &str,
    network_id: &str,
    rules: Vec<RouteRule>,
) -> DependentResource {
    DependentResource::route_table(ResourceInfo::new(id, name, network_id), rules)
}

pub fn security_list(id: &str, name: &str, network_id: &str) -> DependentResource {
    DependentResource::from_info(
        ResourceKind::SecurityList,
        ResourceInfo::new(id, name, network_id),
    )
}

/// `count` rules pointing at `target`
pub fn rules(count: usize, target: &str) -> Vec<RouteRule> {
    (0..count)
        .map(|i| RouteRule::new(format!("10.{}.0.0/16", 100 + i), target))
        .collect()
}

/// TCP ingress rule for `ports` ("22" or "8000-8080") from `cidr`
pub fn tcp_ingress(cidr: &str, ports: &str) -> SecurityRule {
    let ports: PortRange = ports.parse().expect("valid port range");
    SecurityRule::tcp_ingress(cidr, ports)
}

/// Allow-all egress rule, as providers create by default
pub fn allow_all_egress() -> SecurityRule {
    SecurityRule {
        direction: RuleDirection::Egress,
        protocol: Protocol::All,
        cidr: "0.0.0.0/0".to_string(),
        ports: None,
        description: None,
    }
}
