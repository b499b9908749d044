//! Recording in-memory network provider
//!
//! Holds a small provider scope in memory, applies deletes and route updates
//! to it, and logs every call in order so tests can assert on sequencing.

use anyhow::Result;
use net_teardown::{NetworkProvider, ProviderError};
use net_teardown_common::{
    AttachmentState, DependentResource, InstanceAction, InstanceInfo, InterfaceAttachment,
    LifecycleState, NetworkInterface, NetworkResource, PowerState, ResourceInfo, ResourceKind,
    RouteRule, SecurityRule, SubnetInfo,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// One provider call, as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetNetwork(String),
    ListNetworks,
    ListInstances,
    ListAttachments(String),
    GetInterface(String),
    GetSubnet(String),
    ListDependents(ResourceKind, String),
    UpdateRouteRules { route_table_id: String, rules: usize },
    DeleteDependent(ResourceKind, String),
    DeleteNetwork(String),
    InstanceAction(String, InstanceAction),
    ListSecurityRules(String),
    AddIngressRule(String),
}

impl Call {
    /// True for calls that change provider state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::UpdateRouteRules { .. }
                | Call::DeleteDependent(..)
                | Call::DeleteNetwork(_)
                | Call::InstanceAction(..)
                | Call::AddIngressRule(_)
        )
    }
}

/// Failure injected for a resource id
#[derive(Debug, Clone)]
enum Injected {
    Error(String),
    NotFound,
}

#[derive(Default)]
struct State {
    networks: Vec<NetworkResource>,
    instances: Vec<InstanceInfo>,
    attachments: HashMap<String, Vec<InterfaceAttachment>>,
    interfaces: HashMap<String, NetworkInterface>,
    subnets: HashMap<String, SubnetInfo>,
    dependents: Vec<DependentResource>,
    security_rules: HashMap<String, Vec<SecurityRule>>,
    injected: HashMap<String, Injected>,
    failing_listings: HashSet<ResourceKind>,
    /// Deleted subnets keep showing up (terminating) for this many listings
    subnet_linger: usize,
    lingering: Vec<DependentResource>,
    enforce_dependencies: bool,
    /// subnet id -> gateway whose interface lives in it
    subnet_holders: HashMap<String, String>,
    calls: Vec<Call>,
}

/// In-memory [`NetworkProvider`] for orchestrator tests.
///
/// # Example
/// ```
/// use net_teardown_test_utils::{FakeProvider, fixtures};
///
/// let provider = FakeProvider::new()
///     .with_network(fixtures::network("vcn-1", "main"))
///     .with_dependent(fixtures::subnet("subnet-1", "vcn-1"));
/// assert_eq!(provider.remaining("vcn-1").len(), 1);
/// ```
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<State>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake provider state poisoned")
    }

    pub fn with_network(self, network: NetworkResource) -> Self {
        self.state().networks.push(network);
        self
    }

    /// Add a dependent. Subnets also become resolvable through `get_subnet`.
    pub fn with_dependent(self, resource: DependentResource) -> Self {
        {
            let mut state = self.state();
            if let DependentResource::Subnet(info) = &resource {
                state.subnets.insert(
                    info.id.clone(),
                    SubnetInfo {
                        id: info.id.clone(),
                        display_name: info.display_name.clone(),
                        network_id: info.network_id.clone(),
                    },
                );
            }
            state.dependents.push(resource);
        }
        self
    }

    /// Make a subnet resolvable without listing it as a dependent
    pub fn with_subnet_info(self, subnet_id: &str, network_id: &str) -> Self {
        self.state().subnets.insert(
            subnet_id.to_string(),
            SubnetInfo {
                id: subnet_id.to_string(),
                display_name: subnet_id.to_string(),
                network_id: network_id.to_string(),
            },
        );
        self
    }

    pub fn with_instance(self, instance: InstanceInfo) -> Self {
        self.state().instances.push(instance);
        self
    }

    /// Give a security list a rule. The list need not be a known dependent.
    pub fn with_security_rule(self, security_list_id: &str, rule: SecurityRule) -> Self {
        self.state()
            .security_rules
            .entry(security_list_id.to_string())
            .or_default()
            .push(rule);
        self
    }

    /// Attach a new interface in `subnet_id` to `instance_id`
    pub fn with_attachment(
        self,
        instance_id: &str,
        interface_id: &str,
        subnet_id: &str,
        state: AttachmentState,
    ) -> Self {
        {
            let mut s = self.state();
            s.attachments
                .entry(instance_id.to_string())
                .or_default()
                .push(InterfaceAttachment {
                    instance_id: instance_id.to_string(),
                    interface_id: interface_id.to_string(),
                    state,
                });
            s.interfaces.insert(
                interface_id.to_string(),
                NetworkInterface {
                    id: interface_id.to_string(),
                    subnet_id: subnet_id.to_string(),
                },
            );
        }
        self
    }

    /// Every call touching `id` (lookups, updates, deletes) fails
    pub fn failing(self, id: &str, message: &str) -> Self {
        self.state()
            .injected
            .insert(id.to_string(), Injected::Error(message.to_string()));
        self
    }

    /// Deleting `id` reports it as already gone
    pub fn vanishing(self, id: &str) -> Self {
        self.state()
            .injected
            .insert(id.to_string(), Injected::NotFound);
        self
    }

    /// Listing dependents of `kind` fails
    pub fn failing_listing(self, kind: ResourceKind) -> Self {
        self.state().failing_listings.insert(kind);
        self
    }

    /// Deleted subnets stay listed as terminating for `listings` subnet listings
    pub fn with_subnet_linger(self, listings: usize) -> Self {
        self.state().subnet_linger = listings;
        self
    }

    /// Refuse to delete a network that still has non-default dependents
    pub fn enforcing_dependencies(self) -> Self {
        self.state().enforce_dependencies = true;
        self
    }

    /// `gateway_id` keeps an interface in `subnet_id`: deleting the subnet
    /// fails with a dependency violation while the gateway exists
    pub fn with_gateway_in_subnet(self, gateway_id: &str, subnet_id: &str) -> Self {
        self.state()
            .subnet_holders
            .insert(subnet_id.to_string(), gateway_id.to_string());
        self
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Only the calls that change state
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    /// Position of `call` in the log
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.state().calls.iter().position(|c| c == call)
    }

    /// Dependents of a network still present
    pub fn remaining(&self, network_id: &str) -> Vec<DependentResource> {
        self.state()
            .dependents
            .iter()
            .filter(|d| d.network_id() == network_id)
            .cloned()
            .collect()
    }

    pub fn has_network(&self, network_id: &str) -> bool {
        self.state().networks.iter().any(|n| n.id == network_id)
    }

    /// Current power state of an instance
    pub fn power_state(&self, instance_id: &str) -> Option<PowerState> {
        self.state()
            .instances
            .iter()
            .find(|i| i.id == instance_id)
            .map(|i| i.power)
    }

    /// Rules of a security list as they stand now
    pub fn security_rules(&self, security_list_id: &str) -> Vec<SecurityRule> {
        self.state()
            .security_rules
            .get(security_list_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    fn check_injected(&self, id: &str, resource_type: &'static str) -> Result<()> {
        match self.state().injected.get(id) {
            Some(Injected::Error(message)) => Err(ProviderError::Sdk {
                code: Some("InjectedFailure".to_string()),
                message: message.clone(),
            }
            .into()),
            Some(Injected::NotFound) => Err(ProviderError::not_found(resource_type, id).into()),
            None => Ok(()),
        }
    }
}

fn is_default(resource: &DependentResource) -> bool {
    resource.info().is_default == Some(true)
}

fn has_security_list(state: &State, security_list_id: &str) -> bool {
    state.security_rules.contains_key(security_list_id)
        || state
            .dependents
            .iter()
            .any(|d| d.kind() == ResourceKind::SecurityList && d.id() == security_list_id)
}

impl NetworkProvider for FakeProvider {
    async fn get_network(&self, network_id: &str) -> Result<Option<NetworkResource>> {
        self.record(Call::GetNetwork(network_id.to_string()));
        Ok(self
            .state()
            .networks
            .iter()
            .find(|n| n.id == network_id)
            .cloned())
    }

    async fn list_networks(&self) -> Result<Vec<NetworkResource>> {
        self.record(Call::ListNetworks);
        Ok(self.state().networks.clone())
    }

    async fn list_instances(&self) -> Result<Vec<InstanceInfo>> {
        self.record(Call::ListInstances);
        Ok(self.state().instances.clone())
    }

    async fn list_interface_attachments(
        &self,
        instance_id: &str,
    ) -> Result<Vec<InterfaceAttachment>> {
        self.record(Call::ListAttachments(instance_id.to_string()));
        self.check_injected(instance_id, "instance")?;
        Ok(self
            .state()
            .attachments
            .get(instance_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_interface(&self, interface_id: &str) -> Result<NetworkInterface> {
        self.record(Call::GetInterface(interface_id.to_string()));
        self.check_injected(interface_id, "network interface")?;
        self.state()
            .interfaces
            .get(interface_id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found("network interface", interface_id).into())
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<SubnetInfo> {
        self.record(Call::GetSubnet(subnet_id.to_string()));
        self.state()
            .subnets
            .get(subnet_id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found("subnet", subnet_id).into())
    }

    async fn list_dependents(
        &self,
        kind: ResourceKind,
        network_id: &str,
    ) -> Result<Vec<DependentResource>> {
        self.record(Call::ListDependents(kind, network_id.to_string()));
        let mut state = self.state();
        if state.failing_listings.contains(&kind) {
            anyhow::bail!("listing {kind} failed");
        }

        let mut found: Vec<DependentResource> = state
            .dependents
            .iter()
            .filter(|d| d.kind() == kind && d.network_id() == network_id)
            .cloned()
            .collect();

        if kind == ResourceKind::Subnet && state.subnet_linger > 0 {
            state.subnet_linger -= 1;
            found.extend(
                state
                    .lingering
                    .iter()
                    .filter(|d| d.network_id() == network_id)
                    .cloned(),
            );
        }

        Ok(found)
    }

    async fn update_route_rules(&self, route_table_id: &str, rules: &[RouteRule]) -> Result<()> {
        self.record(Call::UpdateRouteRules {
            route_table_id: route_table_id.to_string(),
            rules: rules.len(),
        });
        self.check_injected(route_table_id, "route table")?;

        let mut state = self.state();
        let table = state
            .dependents
            .iter_mut()
            .find_map(|d| match d {
                DependentResource::RouteTable { info, rules } if info.id == route_table_id => {
                    Some(rules)
                }
                _ => None,
            })
            .ok_or_else(|| ProviderError::not_found("route table", route_table_id))?;
        *table = rules.to_vec();
        Ok(())
    }

    async fn delete_dependent(&self, resource: &DependentResource) -> Result<()> {
        self.record(Call::DeleteDependent(
            resource.kind(),
            resource.id().to_string(),
        ));
        self.check_injected(resource.id(), resource.kind().as_str())?;

        let mut state = self.state();
        let holder = state.subnet_holders.get(resource.id()).filter(|gateway_id| {
            state.dependents.iter().any(|d| d.id() == gateway_id.as_str())
        });
        if let Some(gateway_id) = holder {
            return Err(ProviderError::DependencyViolation {
                message: format!(
                    "subnet '{}' has dependencies: interface of '{gateway_id}'",
                    resource.id()
                ),
            }
            .into());
        }
        let index = state
            .dependents
            .iter()
            .position(|d| d.id() == resource.id())
            .ok_or_else(|| ProviderError::not_found(resource.kind().as_str(), resource.id()))?;
        let removed = state.dependents.remove(index);

        if removed.kind() == ResourceKind::Subnet && state.subnet_linger > 0 {
            let info = removed.info().clone();
            state.lingering.push(DependentResource::Subnet(ResourceInfo {
                state: LifecycleState::Terminating,
                ..info
            }));
        }
        Ok(())
    }

    async fn delete_network(&self, network_id: &str) -> Result<()> {
        self.record(Call::DeleteNetwork(network_id.to_string()));
        self.check_injected(network_id, "network")?;

        let mut state = self.state();
        if state.enforce_dependencies
            && state
                .dependents
                .iter()
                .any(|d| d.network_id() == network_id && !is_default(d))
        {
            return Err(ProviderError::DependencyViolation {
                message: format!("network '{network_id}' has dependencies"),
            }
            .into());
        }

        let before = state.networks.len();
        state.networks.retain(|n| n.id != network_id);
        if state.networks.len() == before {
            return Err(ProviderError::not_found("network", network_id).into());
        }
        state.dependents.retain(|d| d.network_id() != network_id);
        Ok(())
    }

    async fn instance_action(&self, instance_id: &str, action: InstanceAction) -> Result<()> {
        self.record(Call::InstanceAction(instance_id.to_string(), action));
        self.check_injected(instance_id, "instance")?;

        let mut state = self.state();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.id == instance_id)
            .ok_or_else(|| ProviderError::not_found("instance", instance_id))?;
        instance.power = match action {
            InstanceAction::Start | InstanceAction::SoftReset => PowerState::Running,
            InstanceAction::Stop => PowerState::Stopped,
        };
        Ok(())
    }

    async fn list_security_rules(&self, security_list_id: &str) -> Result<Vec<SecurityRule>> {
        self.record(Call::ListSecurityRules(security_list_id.to_string()));
        self.check_injected(security_list_id, "security list")?;

        let state = self.state();
        if !has_security_list(&state, security_list_id) {
            return Err(ProviderError::not_found("security list", security_list_id).into());
        }
        Ok(state
            .security_rules
            .get(security_list_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_ingress_rule(&self, security_list_id: &str, rule: &SecurityRule) -> Result<()> {
        self.record(Call::AddIngressRule(security_list_id.to_string()));
        self.check_injected(security_list_id, "security list")?;

        let mut state = self.state();
        if !has_security_list(&state, security_list_id) {
            return Err(ProviderError::not_found("security list", security_list_id).into());
        }
        state
            .security_rules
            .entry(security_list_id.to_string())
            .or_default()
            .push(rule.clone());
        Ok(())
    }
}
