//! [`NetworkProvider`] over the EC2 VPC API
//!
//! | kind              | AWS resource        |
//! |-------------------|---------------------|
//! | network           | VPC                 |
//! | subnet            | subnet              |
//! | internet gateway  | internet gateway    |
//! | NAT gateway       | NAT gateway         |
//! | service gateway   | VPC endpoint        |
//! | security group    | security group      |
//! | route table       | route table         |
//! | security list     | network ACL         |

use super::context::{AwsContext, FromAwsContext};
use super::error::{
    GATEWAY_NOT_ATTACHED, classify_aws_error, classify_sdk_error, error_code, sdk_error,
};
use crate::error::ProviderError;
use crate::provider::NetworkProvider;
use anyhow::{Context, Result, bail};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::operation::create_route::builders::CreateRouteFluentBuilder;
use aws_sdk_ec2::operation::delete_route::builders::DeleteRouteFluentBuilder;
use aws_sdk_ec2::types::{
    AttachmentStatus, Filter, NetworkAcl, NetworkAclEntry, PortRange as AclPortRange, Route,
    RouteOrigin, RuleAction, Tag, Vpc,
};
use net_teardown_common::{
    AttachmentState, DependentResource, InstanceAction, InstanceInfo, InterfaceAttachment,
    LifecycleState, NetworkInterface, NetworkResource, PortRange, PowerState, Protocol,
    ResourceInfo, ResourceKind, RouteRule, RuleDirection, SecurityRule, SubnetInfo,
};
use tracing::{debug, info};

/// Instance states that can still hold a network interface
const LIVE_INSTANCE_STATES: &[&str] = &[
    "pending",
    "running",
    "shutting-down",
    "stopping",
    "stopped",
];

/// Reserved name of the security group AWS creates with every VPC
const DEFAULT_SECURITY_GROUP_NAME: &str = "default";

/// Rule number of the catch-all deny entry every network ACL ends with
const ACL_CATCH_ALL_RULE: i32 = 32767;

/// Gap between rule numbers of appended ACL entries
const ACL_RULE_STEP: i32 = 100;

/// EC2 client scoped to VPC networking
#[derive(Debug, Clone)]
pub struct Ec2NetworkClient {
    client: Client,
}

impl Ec2NetworkClient {
    /// Create a client for `region` using the default credential chain
    pub async fn new(region: &str) -> Self {
        let ctx = AwsContext::new(region).await;
        Self::from_context(&ctx)
    }

    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<DependentResource>> {
        let output = self
            .client
            .describe_subnets()
            .filters(name_filter("vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc", vpc_id))
            .context("Failed to describe subnets")?;

        Ok(output
            .subnets()
            .iter()
            .filter_map(|subnet| {
                let id = subnet.subnet_id()?;
                let info = ResourceInfo::new(id, display_name(subnet.tags(), id), vpc_id)
                    .with_state(state_of(subnet.state().map(|s| s.as_str())));
                Some(DependentResource::from_info(ResourceKind::Subnet, info))
            })
            .collect())
    }

    async fn list_internet_gateways(&self, vpc_id: &str) -> Result<Vec<DependentResource>> {
        let output = self
            .client
            .describe_internet_gateways()
            .filters(name_filter("attachment.vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc", vpc_id))
            .context("Failed to describe internet gateways")?;

        Ok(output
            .internet_gateways()
            .iter()
            .filter_map(|igw| {
                let id = igw.internet_gateway_id()?;
                let info = ResourceInfo::new(id, display_name(igw.tags(), id), vpc_id);
                Some(DependentResource::from_info(ResourceKind::InternetGateway, info))
            })
            .collect())
    }

    async fn list_nat_gateways(&self, vpc_id: &str) -> Result<Vec<DependentResource>> {
        let output = self
            .client
            .describe_nat_gateways()
            .filter(name_filter("vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc", vpc_id))
            .context("Failed to describe NAT gateways")?;

        Ok(output
            .nat_gateways()
            .iter()
            .filter_map(|nat| {
                let id = nat.nat_gateway_id()?;
                let state = state_of(nat.state().map(|s| s.as_str()));
                if state == LifecycleState::Terminated {
                    return None;
                }
                let info =
                    ResourceInfo::new(id, display_name(nat.tags(), id), vpc_id).with_state(state);
                Some(DependentResource::from_info(ResourceKind::NatGateway, info))
            })
            .collect())
    }

    async fn list_vpc_endpoints(&self, vpc_id: &str) -> Result<Vec<DependentResource>> {
        let output = self
            .client
            .describe_vpc_endpoints()
            .filters(name_filter("vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc", vpc_id))
            .context("Failed to describe VPC endpoints")?;

        Ok(output
            .vpc_endpoints()
            .iter()
            .filter_map(|endpoint| {
                let id = endpoint.vpc_endpoint_id()?;
                let state = state_of(endpoint.state().map(|s| s.as_str()));
                if state == LifecycleState::Terminated {
                    return None;
                }
                let name = name_tag(endpoint.tags())
                    .or(endpoint.service_name())
                    .unwrap_or(id);
                let info = ResourceInfo::new(id, name, vpc_id).with_state(state);
                Some(DependentResource::from_info(ResourceKind::ServiceGateway, info))
            })
            .collect())
    }

    async fn list_security_groups(&self, vpc_id: &str) -> Result<Vec<DependentResource>> {
        let output = self
            .client
            .describe_security_groups()
            .filters(name_filter("vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc", vpc_id))
            .context("Failed to describe security groups")?;

        Ok(output
            .security_groups()
            .iter()
            .filter_map(|sg| {
                let id = sg.group_id()?;
                let group_name = sg.group_name().unwrap_or(id);
                let info = ResourceInfo::new(id, group_name, vpc_id)
                    .with_default_flag(group_name == DEFAULT_SECURITY_GROUP_NAME);
                Some(DependentResource::from_info(ResourceKind::SecurityGroup, info))
            })
            .collect())
    }

    async fn list_route_tables(&self, vpc_id: &str) -> Result<Vec<DependentResource>> {
        let output = self
            .client
            .describe_route_tables()
            .filters(name_filter("vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc", vpc_id))
            .context("Failed to describe route tables")?;

        Ok(output
            .route_tables()
            .iter()
            .filter_map(|table| {
                let id = table.route_table_id()?;
                let is_main = table
                    .associations()
                    .iter()
                    .any(|assoc| assoc.main() == Some(true));
                let info = ResourceInfo::new(id, display_name(table.tags(), id), vpc_id)
                    .with_default_flag(is_main);
                Some(DependentResource::route_table(
                    info,
                    route_rules(table.routes()),
                ))
            })
            .collect())
    }

    async fn list_network_acls(&self, vpc_id: &str) -> Result<Vec<DependentResource>> {
        let output = self
            .client
            .describe_network_acls()
            .filters(name_filter("vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc", vpc_id))
            .context("Failed to describe network ACLs")?;

        Ok(output
            .network_acls()
            .iter()
            .filter_map(|acl| {
                let id = acl.network_acl_id()?;
                let mut info = ResourceInfo::new(id, display_name(acl.tags(), id), vpc_id);
                info.is_default = acl.is_default();
                Some(DependentResource::from_info(ResourceKind::SecurityList, info))
            })
            .collect())
    }

    async fn current_route_rules(&self, route_table_id: &str) -> Result<Vec<RouteRule>> {
        let output = self
            .client
            .describe_route_tables()
            .route_table_ids(route_table_id)
            .send()
            .await
            .map_err(|e| sdk_error(e, "route table", route_table_id))
            .context("Failed to describe route table")?;

        let table = output
            .route_tables()
            .first()
            .ok_or_else(|| ProviderError::not_found("route table", route_table_id))?;
        Ok(route_rules(table.routes()))
    }

    async fn delete_route(&self, route_table_id: &str, rule: &RouteRule) -> Result<()> {
        let request = self.client.delete_route().route_table_id(route_table_id);
        delete_route_destination(request, &rule.destination)
            .send()
            .await
            .map_err(|e| sdk_error(e, "route", &rule.destination))
            .with_context(|| {
                format!(
                    "Failed to delete route {} from {route_table_id}",
                    rule.destination
                )
            })?;
        debug!(route_table_id = %route_table_id, destination = %rule.destination, "Route deleted");
        Ok(())
    }

    async fn create_route(&self, route_table_id: &str, rule: &RouteRule) -> Result<()> {
        let request = self.client.create_route().route_table_id(route_table_id);
        let request = if rule.destination.starts_with("pl-") {
            request.destination_prefix_list_id(&rule.destination)
        } else if rule.destination.contains(':') {
            request.destination_ipv6_cidr_block(&rule.destination)
        } else {
            request.destination_cidr_block(&rule.destination)
        };

        with_route_target(request, &rule.target)?
            .send()
            .await
            .map_err(|e| sdk_error(e, "route table", route_table_id))
            .with_context(|| {
                format!(
                    "Failed to create route {} -> {} in {route_table_id}",
                    rule.destination, rule.target
                )
            })?;
        debug!(route_table_id = %route_table_id, destination = %rule.destination, target = %rule.target, "Route created");
        Ok(())
    }

    async fn delete_internet_gateway(&self, info: &ResourceInfo) -> Result<()> {
        let id = info.id.as_str();

        // The gateway must be detached from its VPC before it can be deleted
        if let Err(e) = self
            .client
            .detach_internet_gateway()
            .internet_gateway_id(id)
            .vpc_id(&info.network_id)
            .send()
            .await
        {
            let err = classify_sdk_error(&e, "internet gateway", id);
            if error_code(&err) == Some(GATEWAY_NOT_ATTACHED) {
                debug!(igw_id = %id, "Internet gateway already detached");
            } else {
                return Err(anyhow::Error::new(err))
                    .with_context(|| format!("Failed to detach internet gateway {id}"));
            }
        }

        self.client
            .delete_internet_gateway()
            .internet_gateway_id(id)
            .send()
            .await
            .map_err(|e| sdk_error(e, "internet gateway", id))
            .with_context(|| format!("Failed to delete internet gateway {id}"))?;
        Ok(())
    }

    async fn delete_vpc_endpoint(&self, id: &str) -> Result<()> {
        let output = self
            .client
            .delete_vpc_endpoints()
            .vpc_endpoint_ids(id)
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc endpoint", id))
            .with_context(|| format!("Failed to delete VPC endpoint {id}"))?;

        // Per-endpoint failures come back in the response body, not as an error
        if let Some(item) = output.unsuccessful().first() {
            let (code, message) = item
                .error()
                .map(|e| (e.code(), e.message()))
                .unwrap_or((None, None));
            return Err(anyhow::Error::new(classify_aws_error(
                code,
                message,
                "vpc endpoint",
                id,
            )))
            .with_context(|| format!("Failed to delete VPC endpoint {id}"));
        }
        Ok(())
    }
}

impl Ec2NetworkClient {
    async fn describe_network_acl(&self, acl_id: &str) -> Result<NetworkAcl> {
        let output = self
            .client
            .describe_network_acls()
            .network_acl_ids(acl_id)
            .send()
            .await
            .map_err(|e| sdk_error(e, "network acl", acl_id))
            .context("Failed to describe network ACL")?;

        output
            .network_acls()
            .first()
            .cloned()
            .ok_or_else(|| ProviderError::not_found("network acl", acl_id).into())
    }
}

impl FromAwsContext for Ec2NetworkClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }
}

impl NetworkProvider for Ec2NetworkClient {
    async fn get_network(&self, network_id: &str) -> Result<Option<NetworkResource>> {
        match self.client.describe_vpcs().vpc_ids(network_id).send().await {
            Ok(output) => Ok(output.vpcs().first().map(network_from_vpc)),
            Err(e) => {
                let err = classify_sdk_error(&e, "vpc", network_id);
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(anyhow::Error::new(err)).context("Failed to describe VPC")
                }
            }
        }
    }

    async fn list_networks(&self) -> Result<Vec<NetworkResource>> {
        let mut networks = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_vpcs()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(e, "vpc", "*"))
                .context("Failed to describe VPCs")?;

            networks.extend(output.vpcs().iter().map(network_from_vpc));

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(networks)
    }

    async fn list_instances(&self) -> Result<Vec<InstanceInfo>> {
        let mut instances = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_instances()
                .filters(
                    Filter::builder()
                        .name("instance-state-name")
                        .set_values(Some(
                            LIVE_INSTANCE_STATES.iter().map(|s| s.to_string()).collect(),
                        ))
                        .build(),
                )
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(e, "instance", "*"))
                .context("Failed to describe instances")?;

            for instance in output.reservations().iter().flat_map(|r| r.instances()) {
                let Some(id) = instance.instance_id() else {
                    continue;
                };
                let state_name = instance
                    .state()
                    .and_then(|s| s.name())
                    .map(|n| n.as_str());
                instances.push(InstanceInfo {
                    id: id.to_string(),
                    display_name: display_name(instance.tags(), id),
                    state: state_of(state_name),
                    power: state_name.map(PowerState::from_provider).unwrap_or_default(),
                });
            }

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        debug!(count = instances.len(), "Listed instances");
        Ok(instances)
    }

    async fn list_interface_attachments(
        &self,
        instance_id: &str,
    ) -> Result<Vec<InterfaceAttachment>> {
        let output = self
            .client
            .describe_network_interfaces()
            .filters(name_filter("attachment.instance-id", instance_id))
            .send()
            .await
            .map_err(|e| sdk_error(e, "instance", instance_id))
            .with_context(|| format!("Failed to describe interfaces of {instance_id}"))?;

        Ok(output
            .network_interfaces()
            .iter()
            .filter_map(|eni| {
                let attachment = eni.attachment()?;
                Some(InterfaceAttachment {
                    instance_id: instance_id.to_string(),
                    interface_id: eni.network_interface_id()?.to_string(),
                    state: attachment_state(attachment.status()),
                })
            })
            .collect())
    }

    async fn get_interface(&self, interface_id: &str) -> Result<NetworkInterface> {
        let output = self
            .client
            .describe_network_interfaces()
            .network_interface_ids(interface_id)
            .send()
            .await
            .map_err(|e| sdk_error(e, "network interface", interface_id))
            .context("Failed to describe network interface")?;

        let eni = output
            .network_interfaces()
            .first()
            .ok_or_else(|| ProviderError::not_found("network interface", interface_id))?;
        let subnet_id = eni
            .subnet_id()
            .with_context(|| format!("Network interface {interface_id} has no subnet"))?;

        Ok(NetworkInterface {
            id: interface_id.to_string(),
            subnet_id: subnet_id.to_string(),
        })
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<SubnetInfo> {
        let output = self
            .client
            .describe_subnets()
            .subnet_ids(subnet_id)
            .send()
            .await
            .map_err(|e| sdk_error(e, "subnet", subnet_id))
            .context("Failed to describe subnet")?;

        let subnet = output
            .subnets()
            .first()
            .ok_or_else(|| ProviderError::not_found("subnet", subnet_id))?;

        Ok(SubnetInfo {
            id: subnet_id.to_string(),
            display_name: display_name(subnet.tags(), subnet_id),
            network_id: subnet.vpc_id().unwrap_or_default().to_string(),
        })
    }

    async fn list_dependents(
        &self,
        kind: ResourceKind,
        network_id: &str,
    ) -> Result<Vec<DependentResource>> {
        match kind {
            ResourceKind::Instance => {
                bail!("Instances are found through their interfaces, not listed per VPC")
            }
            ResourceKind::Subnet => self.list_subnets(network_id).await,
            ResourceKind::InternetGateway => self.list_internet_gateways(network_id).await,
            ResourceKind::NatGateway => self.list_nat_gateways(network_id).await,
            ResourceKind::ServiceGateway => self.list_vpc_endpoints(network_id).await,
            ResourceKind::SecurityGroup => self.list_security_groups(network_id).await,
            ResourceKind::RouteTable => self.list_route_tables(network_id).await,
            ResourceKind::SecurityList => self.list_network_acls(network_id).await,
        }
    }

    async fn update_route_rules(&self, route_table_id: &str, rules: &[RouteRule]) -> Result<()> {
        let current = self.current_route_rules(route_table_id).await?;

        for rule in current.iter().filter(|r| !rules.contains(r)) {
            self.delete_route(route_table_id, rule).await?;
        }
        for rule in rules.iter().filter(|r| !current.contains(r)) {
            self.create_route(route_table_id, rule).await?;
        }

        info!(route_table_id = %route_table_id, rules = rules.len(), "Route rules updated");
        Ok(())
    }

    async fn delete_dependent(&self, resource: &DependentResource) -> Result<()> {
        let id = resource.id();
        match resource {
            DependentResource::Instance(_) => {
                bail!("Refusing to terminate instance {id}: teardown never deletes instances")
            }
            DependentResource::Subnet(_) => {
                self.client
                    .delete_subnet()
                    .subnet_id(id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(e, "subnet", id))
                    .with_context(|| format!("Failed to delete subnet {id}"))?;
            }
            DependentResource::InternetGateway(info) => {
                self.delete_internet_gateway(info).await?;
            }
            DependentResource::NatGateway(_) => {
                self.client
                    .delete_nat_gateway()
                    .nat_gateway_id(id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(e, "nat gateway", id))
                    .with_context(|| format!("Failed to delete NAT gateway {id}"))?;
            }
            DependentResource::ServiceGateway(_) => {
                self.delete_vpc_endpoint(id).await?;
            }
            DependentResource::SecurityGroup(_) => {
                self.client
                    .delete_security_group()
                    .group_id(id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(e, "security group", id))
                    .with_context(|| format!("Failed to delete security group {id}"))?;
            }
            DependentResource::RouteTable { .. } => {
                self.client
                    .delete_route_table()
                    .route_table_id(id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(e, "route table", id))
                    .with_context(|| format!("Failed to delete route table {id}"))?;
            }
            DependentResource::SecurityList(_) => {
                self.client
                    .delete_network_acl()
                    .network_acl_id(id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(e, "network acl", id))
                    .with_context(|| format!("Failed to delete network ACL {id}"))?;
            }
        }
        Ok(())
    }

    async fn delete_network(&self, network_id: &str) -> Result<()> {
        self.client
            .delete_vpc()
            .vpc_id(network_id)
            .send()
            .await
            .map_err(|e| sdk_error(e, "vpc", network_id))
            .with_context(|| format!("Failed to delete VPC {network_id}"))?;
        Ok(())
    }

    async fn instance_action(&self, instance_id: &str, action: InstanceAction) -> Result<()> {
        match action {
            InstanceAction::Start => {
                self.client
                    .start_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(e, "instance", instance_id))
                    .with_context(|| format!("Failed to start instance {instance_id}"))?;
            }
            InstanceAction::Stop => {
                self.client
                    .stop_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(e, "instance", instance_id))
                    .with_context(|| format!("Failed to stop instance {instance_id}"))?;
            }
            InstanceAction::SoftReset => {
                // RebootInstances asks the OS to shut down cleanly first
                self.client
                    .reboot_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error(e, "instance", instance_id))
                    .with_context(|| format!("Failed to reboot instance {instance_id}"))?;
            }
        }
        info!(instance_id = %instance_id, action = %action, "Instance action requested");
        Ok(())
    }

    async fn list_security_rules(&self, security_list_id: &str) -> Result<Vec<SecurityRule>> {
        let acl = self.describe_network_acl(security_list_id).await?;
        let (ingress, egress): (Vec<_>, Vec<_>) = acl
            .entries()
            .iter()
            .filter_map(security_rule)
            .partition(|r| r.direction == RuleDirection::Ingress);
        Ok(ingress.into_iter().chain(egress).collect())
    }

    async fn add_ingress_rule(&self, security_list_id: &str, rule: &SecurityRule) -> Result<()> {
        if rule.direction != RuleDirection::Ingress {
            bail!("Refusing to add an egress entry to {security_list_id} as ingress");
        }

        let acl = self.describe_network_acl(security_list_id).await?;
        let taken: Vec<i32> = acl
            .entries()
            .iter()
            .filter(|e| e.egress() == Some(false))
            .filter_map(NetworkAclEntry::rule_number)
            .collect();
        let rule_number = next_rule_number(&taken).with_context(|| {
            format!("Network ACL {security_list_id} has no free ingress rule number")
        })?;

        let request = self
            .client
            .create_network_acl_entry()
            .network_acl_id(security_list_id)
            .rule_number(rule_number)
            .protocol(rule.protocol.number())
            .rule_action(RuleAction::Allow)
            .egress(false);
        let request = if rule.cidr.contains(':') {
            request.ipv6_cidr_block(&rule.cidr)
        } else {
            request.cidr_block(&rule.cidr)
        };
        let request = match rule.ports {
            Some(ports) if rule.protocol.has_ports() => request.port_range(
                AclPortRange::builder()
                    .from(i32::from(ports.min))
                    .to(i32::from(ports.max))
                    .build(),
            ),
            _ => request,
        };

        request
            .send()
            .await
            .map_err(|e| sdk_error(e, "network acl", security_list_id))
            .with_context(|| format!("Failed to add ingress entry to {security_list_id}"))?;

        if rule.description.is_some() {
            debug!(network_acl_id = %security_list_id, "Network ACL entries have no description; dropped");
        }
        info!(
            network_acl_id = %security_list_id,
            rule_number,
            protocol = %rule.protocol,
            cidr = %rule.cidr,
            ports = %rule.ports_label(),
            "Ingress entry added"
        );
        Ok(())
    }
}

fn name_filter(name: &str, value: &str) -> Filter {
    Filter::builder().name(name).values(value).build()
}

fn name_tag(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .find(|t| t.key() == Some("Name"))
        .and_then(|t| t.value())
}

/// `Name` tag, or the resource id when untagged
fn display_name(tags: &[Tag], id: &str) -> String {
    name_tag(tags).unwrap_or(id).to_string()
}

fn state_of(state: Option<&str>) -> LifecycleState {
    state
        .map(LifecycleState::from_provider)
        .unwrap_or(LifecycleState::Available)
}

/// Allow entries as rules. Deny entries (including the catch-all) are not
/// representable and are left out.
fn security_rule(entry: &NetworkAclEntry) -> Option<SecurityRule> {
    if entry.rule_number() == Some(ACL_CATCH_ALL_RULE)
        || entry.rule_action() != Some(&RuleAction::Allow)
    {
        return None;
    }

    let protocol = Protocol::from_provider(entry.protocol()?);
    let ports = entry
        .port_range()
        .filter(|_| protocol.has_ports())
        .and_then(|range| {
            let min = u16::try_from(range.from()?).ok()?;
            let max = u16::try_from(range.to()?).ok()?;
            PortRange::new(min, max).ok()
        });

    Some(SecurityRule {
        direction: if entry.egress() == Some(true) {
            RuleDirection::Egress
        } else {
            RuleDirection::Ingress
        },
        protocol,
        cidr: entry.cidr_block().or(entry.ipv6_cidr_block())?.to_string(),
        ports,
        description: None,
    })
}

/// Next rule number on the `ACL_RULE_STEP` grid above every taken one
fn next_rule_number(taken: &[i32]) -> Option<i32> {
    let highest = taken
        .iter()
        .copied()
        .filter(|n| *n < ACL_CATCH_ALL_RULE)
        .max()
        .unwrap_or(0);
    let next = (highest / ACL_RULE_STEP + 1) * ACL_RULE_STEP;
    (next < ACL_CATCH_ALL_RULE).then_some(next)
}

fn network_from_vpc(vpc: &Vpc) -> NetworkResource {
    let id = vpc.vpc_id().unwrap_or_default();
    NetworkResource {
        id: id.to_string(),
        display_name: display_name(vpc.tags(), id),
        cidr_block: vpc.cidr_block().map(str::to_string),
        state: state_of(vpc.state().map(|s| s.as_str())),
    }
}

fn attachment_state(status: Option<&AttachmentStatus>) -> AttachmentState {
    match status {
        Some(AttachmentStatus::Attaching) => AttachmentState::Attaching,
        Some(AttachmentStatus::Attached) => AttachmentState::Attached,
        Some(AttachmentStatus::Detaching) => AttachmentState::Detaching,
        Some(AttachmentStatus::Detached) => AttachmentState::Detached,
        _ => AttachmentState::Unknown,
    }
}

/// Routes that can be removed with `DeleteRoute`.
///
/// The implicit `local` route and VGW-propagated routes are managed by AWS.
fn is_removable(route: &Route) -> bool {
    !matches!(
        route.origin(),
        Some(RouteOrigin::CreateRouteTable | RouteOrigin::EnableVgwRoutePropagation)
    ) && route.gateway_id() != Some("local")
}

fn route_rules(routes: &[Route]) -> Vec<RouteRule> {
    routes
        .iter()
        .filter(|route| is_removable(route))
        .filter_map(|route| {
            let destination = route
                .destination_cidr_block()
                .or(route.destination_ipv6_cidr_block())
                .or(route.destination_prefix_list_id())?;
            let target = route
                .gateway_id()
                .or(route.nat_gateway_id())
                .or(route.transit_gateway_id())
                .or(route.vpc_peering_connection_id())
                .or(route.egress_only_internet_gateway_id())
                .or(route.network_interface_id())
                .or(route.instance_id())?;
            Some(RouteRule::new(destination, target))
        })
        .collect()
}

fn delete_route_destination(
    request: DeleteRouteFluentBuilder,
    destination: &str,
) -> DeleteRouteFluentBuilder {
    if destination.starts_with("pl-") {
        request.destination_prefix_list_id(destination)
    } else if destination.contains(':') {
        request.destination_ipv6_cidr_block(destination)
    } else {
        request.destination_cidr_block(destination)
    }
}

/// Set the target field matching the target id's prefix
fn with_route_target(
    request: CreateRouteFluentBuilder,
    target: &str,
) -> Result<CreateRouteFluentBuilder> {
    let request = match target.split_once('-').map(|(prefix, _)| prefix) {
        Some("igw" | "vgw") => request.gateway_id(target),
        Some("eigw") => request.egress_only_internet_gateway_id(target),
        Some("nat") => request.nat_gateway_id(target),
        Some("eni") => request.network_interface_id(target),
        Some("pcx") => request.vpc_peering_connection_id(target),
        Some("tgw") => request.transit_gateway_id(target),
        Some("i") => request.instance_id(target),
        _ => bail!("Unsupported route target: {target}"),
    };
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(cidr: &str, gateway: &str, origin: RouteOrigin) -> Route {
        Route::builder()
            .destination_cidr_block(cidr)
            .gateway_id(gateway)
            .origin(origin)
            .build()
    }

    #[test]
    fn local_and_propagated_routes_are_kept() {
        let routes = vec![
            route("10.0.0.0/16", "local", RouteOrigin::CreateRouteTable),
            route("0.0.0.0/0", "igw-1", RouteOrigin::CreateRoute),
            route("172.16.0.0/12", "vgw-1", RouteOrigin::EnableVgwRoutePropagation),
        ];

        assert_eq!(route_rules(&routes), vec![RouteRule::new("0.0.0.0/0", "igw-1")]);
    }

    #[test]
    fn route_targets_resolve_by_prefix() {
        let routes = vec![
            Route::builder()
                .destination_cidr_block("0.0.0.0/0")
                .nat_gateway_id("nat-1")
                .origin(RouteOrigin::CreateRoute)
                .build(),
            Route::builder()
                .destination_ipv6_cidr_block("::/0")
                .egress_only_internet_gateway_id("eigw-1")
                .origin(RouteOrigin::CreateRoute)
                .build(),
            Route::builder()
                .destination_prefix_list_id("pl-123")
                .vpc_peering_connection_id("pcx-1")
                .build(),
        ];

        assert_eq!(
            route_rules(&routes),
            vec![
                RouteRule::new("0.0.0.0/0", "nat-1"),
                RouteRule::new("::/0", "eigw-1"),
                RouteRule::new("pl-123", "pcx-1"),
            ]
        );
    }

    #[test]
    fn unsupported_route_target() {
        let client = aws_sdk_ec2::Client::from_conf(
            aws_sdk_ec2::Config::builder()
                .behavior_version(aws_sdk_ec2::config::BehaviorVersion::latest())
                .region(aws_sdk_ec2::config::Region::new("us-east-2"))
                .build(),
        );
        let request = client.create_route().route_table_id("rtb-1");
        assert!(with_route_target(request.clone(), "igw-1").is_ok());
        assert!(with_route_target(request.clone(), "lgw-1").is_err());
        assert!(with_route_target(request, "local").is_err());
    }

    #[test]
    fn attachment_states() {
        assert_eq!(
            attachment_state(Some(&AttachmentStatus::Attached)),
            AttachmentState::Attached
        );
        assert_eq!(
            attachment_state(Some(&AttachmentStatus::Detaching)),
            AttachmentState::Detaching
        );
        assert_eq!(attachment_state(None), AttachmentState::Unknown);
    }

    #[test]
    fn display_name_prefers_name_tag() {
        let tags = vec![
            Tag::builder().key("env").value("prod").build(),
            Tag::builder().key("Name").value("web").build(),
        ];
        assert_eq!(display_name(&tags, "vpc-1"), "web");
        assert_eq!(display_name(&[], "vpc-1"), "vpc-1");
    }

    fn acl_entry(rule_number: i32, action: RuleAction, egress: bool) -> NetworkAclEntry {
        NetworkAclEntry::builder()
            .rule_number(rule_number)
            .rule_action(action)
            .egress(egress)
            .protocol("6")
            .cidr_block("0.0.0.0/0")
            .port_range(AclPortRange::builder().from(22).to(22).build())
            .build()
    }

    #[test]
    fn acl_allow_entries_become_rules() {
        let rule = security_rule(&acl_entry(100, RuleAction::Allow, false)).unwrap();
        assert_eq!(rule.direction, RuleDirection::Ingress);
        assert_eq!(rule.protocol, Protocol::Tcp);
        assert_eq!(rule.ports, Some(PortRange::single(22)));
        assert!(rule.is_open_to_internet());

        let egress = security_rule(&acl_entry(100, RuleAction::Allow, true)).unwrap();
        assert_eq!(egress.direction, RuleDirection::Egress);
    }

    #[test]
    fn acl_deny_entries_are_skipped() {
        assert!(security_rule(&acl_entry(200, RuleAction::Deny, false)).is_none());
        assert!(security_rule(&acl_entry(ACL_CATCH_ALL_RULE, RuleAction::Allow, false)).is_none());
    }

    #[test]
    fn acl_all_traffic_has_no_ports() {
        let entry = NetworkAclEntry::builder()
            .rule_number(100)
            .rule_action(RuleAction::Allow)
            .egress(false)
            .protocol("-1")
            .ipv6_cidr_block("::/0")
            .build();
        let rule = security_rule(&entry).unwrap();
        assert_eq!(rule.protocol, Protocol::All);
        assert_eq!(rule.ports, None);
        assert_eq!(rule.cidr, "::/0");
    }

    #[test]
    fn rule_numbers_follow_the_grid() {
        assert_eq!(next_rule_number(&[]), Some(100));
        assert_eq!(next_rule_number(&[100, ACL_CATCH_ALL_RULE]), Some(200));
        assert_eq!(next_rule_number(&[100, 150]), Some(200));
        assert_eq!(next_rule_number(&[32700]), None);
    }

    #[test]
    fn network_from_vpc_maps_state() {
        let vpc = Vpc::builder()
            .vpc_id("vpc-1")
            .cidr_block("10.0.0.0/16")
            .state(aws_sdk_ec2::types::VpcState::Pending)
            .build();
        let network = network_from_vpc(&vpc);
        assert_eq!(network.id, "vpc-1");
        assert_eq!(network.cidr_block.as_deref(), Some("10.0.0.0/16"));
        assert_eq!(network.state, LifecycleState::Creating);
    }
}
