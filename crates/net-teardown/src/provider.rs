//! Network provider capability
//!
//! The orchestrator never reaches into ambient SDK state: every read and
//! mutation goes through an explicit [`NetworkProvider`] handed to it. The AWS
//! binding lives in [`crate::aws`]; tests use a recording in-memory double.

use anyhow::Result;
use net_teardown_common::{
    DependentResource, InstanceAction, InstanceInfo, InterfaceAttachment, NetworkInterface,
    NetworkResource, ResourceKind, RouteRule, SecurityRule, SubnetInfo,
};
use std::future::Future;

/// Capability over a network, its dependent resources and the instances
/// attached to it.
///
/// Errors that the teardown must branch on (not found, dependency violations)
/// are carried as [`crate::ProviderError`] inside the returned `anyhow::Error`.
pub trait NetworkProvider: Send + Sync {
    /// Look up a network. `Ok(None)` means it does not exist.
    fn get_network(
        &self,
        network_id: &str,
    ) -> impl Future<Output = Result<Option<NetworkResource>>> + Send;

    /// List every network in the provider scope
    fn list_networks(&self) -> impl Future<Output = Result<Vec<NetworkResource>>> + Send;

    /// List every compute instance in the provider scope
    fn list_instances(&self) -> impl Future<Output = Result<Vec<InstanceInfo>>> + Send;

    /// List interface attachments of an instance
    fn list_interface_attachments(
        &self,
        instance_id: &str,
    ) -> impl Future<Output = Result<Vec<InterfaceAttachment>>> + Send;

    /// Resolve a network interface
    fn get_interface(
        &self,
        interface_id: &str,
    ) -> impl Future<Output = Result<NetworkInterface>> + Send;

    /// Resolve a subnet to its owning network
    fn get_subnet(&self, subnet_id: &str) -> impl Future<Output = Result<SubnetInfo>> + Send;

    /// List the resources of `kind` that belong to a network
    fn list_dependents(
        &self,
        kind: ResourceKind,
        network_id: &str,
    ) -> impl Future<Output = Result<Vec<DependentResource>>> + Send;

    /// Replace the full rule set of a route table
    fn update_route_rules(
        &self,
        route_table_id: &str,
        rules: &[RouteRule],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Request deletion of a dependent resource
    fn delete_dependent(
        &self,
        resource: &DependentResource,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Request deletion of the network itself
    fn delete_network(&self, network_id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Request a power action on an instance. State checks are the caller's.
    fn instance_action(
        &self,
        instance_id: &str,
        action: InstanceAction,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Rules of a security list, both directions
    fn list_security_rules(
        &self,
        security_list_id: &str,
    ) -> impl Future<Output = Result<Vec<SecurityRule>>> + Send;

    /// Append one ingress rule to a security list, keeping the existing ones
    fn add_ingress_rule(
        &self,
        security_list_id: &str,
        rule: &SecurityRule,
    ) -> impl Future<Output = Result<()>> + Send;
}
