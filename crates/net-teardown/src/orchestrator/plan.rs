//! Teardown plan: what exists under a network, captured before any mutation

use super::result::{DeletionFailure, SkipReason};
use net_teardown_common::{DependentResource, NetworkResource, ResourceKind, ResourceRef};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// Resources of one kind discovered for the target network at plan time
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub kind: ResourceKind,
    pub resources: Vec<DependentResource>,
}

/// Ordered, per-kind inventory of a network, built fresh for every attempt.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownPlan {
    pub network: NetworkResource,
    /// Instances with an active interface in one of the network's subnets
    pub in_use: Vec<DependentResource>,
    /// One step per kind, in deletion order
    pub steps: Vec<PlannedStep>,
    /// Kinds that could not be listed
    pub listing_failures: Vec<DeletionFailure>,
    /// Resources treated as provider defaults only because of their name
    pub defaults_by_name: Vec<ResourceRef>,
    #[serde(skip)]
    default_name_prefix: String,
    #[serde(skip)]
    provider_defaults: HashSet<String>,
}

impl TeardownPlan {
    pub(crate) fn new(
        network: NetworkResource,
        in_use: Vec<DependentResource>,
        default_name_prefix: &str,
    ) -> Self {
        Self {
            network,
            in_use,
            steps: Vec::with_capacity(ResourceKind::DELETION_ORDER.len()),
            listing_failures: Vec::new(),
            defaults_by_name: Vec::new(),
            default_name_prefix: default_name_prefix.to_string(),
            provider_defaults: HashSet::new(),
        }
    }

    /// Add the listing for `kind`, classifying provider defaults as it goes
    pub(crate) fn push_step(&mut self, kind: ResourceKind, resources: Vec<DependentResource>) {
        for resource in &resources {
            match default_match(resource, &self.default_name_prefix) {
                Some(DefaultMatch::Flag) => {}
                Some(DefaultMatch::Name) => {
                    warn!(
                        kind = %kind,
                        id = %resource.id(),
                        name = %resource.display_name(),
                        "No default flag from provider; treating as default by name"
                    );
                    self.defaults_by_name.push(resource.to_ref());
                }
                None => continue,
            }
            self.provider_defaults.insert(resource.id().to_string());
        }
        self.steps.push(PlannedStep { kind, resources });
    }

    /// All discovered resources of `kind`
    pub fn resources(&self, kind: ResourceKind) -> &[DependentResource] {
        self.steps
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.resources.as_slice())
            .unwrap_or_default()
    }

    /// Route tables that still hold rules and must be emptied first
    pub fn route_tables_with_rules(&self) -> impl Iterator<Item = &DependentResource> {
        self.resources(ResourceKind::RouteTable)
            .iter()
            .filter(|rt| rt.route_rules().is_some_and(|rules| !rules.is_empty()))
    }

    /// Why a resource will not receive a delete request, if it won't
    pub fn skip_reason(&self, resource: &DependentResource) -> Option<SkipReason> {
        if self.provider_defaults.contains(resource.id()) {
            Some(SkipReason::ProviderDefault)
        } else if resource.state().is_going_away() {
            Some(SkipReason::AlreadyTerminating)
        } else {
            None
        }
    }

    /// Number of delete requests the plan will issue for dependents
    pub fn deletion_count(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| &s.resources)
            .filter(|r| self.skip_reason(r).is_none())
            .count()
    }

    /// True when nothing but the network itself is left to delete
    pub fn has_no_dependents(&self) -> bool {
        self.steps.iter().all(|s| s.resources.is_empty())
    }

    pub(crate) fn record_listing_failure(&mut self, kind: ResourceKind, error: &anyhow::Error) {
        self.listing_failures.push(DeletionFailure {
            phase: kind.phase(),
            kind,
            resource_id: self.network.id.clone(),
            error: format!("{error:#}"),
        });
    }
}

/// How a resource was recognised as a provider default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultMatch {
    Flag,
    Name,
}

/// Whether `resource` is the provider-created default of its kind.
///
/// An authoritative provider flag always wins. Without one, route tables and
/// security lists fall back to a display-name prefix match, which a custom
/// table named "Default-..." would also satisfy. Security groups are only
/// ever skipped on the provider's word.
fn default_match(resource: &DependentResource, name_prefix: &str) -> Option<DefaultMatch> {
    let kind = resource.kind();
    if !kind.has_provider_default() {
        return None;
    }

    match resource.info().is_default {
        Some(true) => Some(DefaultMatch::Flag),
        Some(false) => None,
        None if kind == ResourceKind::SecurityGroup => None,
        None => resource
            .display_name()
            .starts_with(name_prefix)
            .then_some(DefaultMatch::Name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_teardown_common::{LifecycleState, ResourceInfo, RouteRule};

    fn network() -> NetworkResource {
        NetworkResource {
            id: "vcn-1".into(),
            display_name: "main".into(),
            cidr_block: Some("10.0.0.0/16".into()),
            state: LifecycleState::Available,
        }
    }

    fn table(name: &str, is_default: Option<bool>, rules: usize) -> DependentResource {
        let mut info = ResourceInfo::new(format!("rt-{name}"), name, "vcn-1");
        info.is_default = is_default;
        let rules = (0..rules)
            .map(|i| RouteRule::new(format!("10.{i}.0.0/16"), "igw-1"))
            .collect();
        DependentResource::route_table(info, rules)
    }

    #[test]
    fn authoritative_flag_wins_over_name() {
        assert_eq!(default_match(&table("Default Route Table", Some(false), 0), "Default"), None);
        assert_eq!(
            default_match(&table("main", Some(true), 0), "Default"),
            Some(DefaultMatch::Flag)
        );
    }

    #[test]
    fn name_prefix_is_the_fallback() {
        assert_eq!(
            default_match(&table("Default Route Table for vcn-1", None, 2), "Default"),
            Some(DefaultMatch::Name)
        );
        assert_eq!(default_match(&table("custom", None, 2), "Default"), None);
    }

    #[test]
    fn security_groups_need_the_flag() {
        let unflagged = DependentResource::from_info(
            ResourceKind::SecurityGroup,
            ResourceInfo::new("sg-1", "Default-ish", "vcn-1"),
        );
        assert_eq!(default_match(&unflagged, "Default"), None);

        let flagged = DependentResource::from_info(
            ResourceKind::SecurityGroup,
            ResourceInfo::new("sg-2", "default", "vcn-1").with_default_flag(true),
        );
        assert_eq!(default_match(&flagged, "Default"), Some(DefaultMatch::Flag));
    }

    #[test]
    fn kinds_without_defaults_are_never_default() {
        let subnet = DependentResource::from_info(
            ResourceKind::Subnet,
            ResourceInfo::new("subnet-1", "Default subnet", "vcn-1").with_default_flag(true),
        );
        assert_eq!(default_match(&subnet, "Default"), None);
    }

    #[test]
    fn plan_queries() {
        let mut plan = TeardownPlan::new(network(), vec![], "Default");
        plan.push_step(
            ResourceKind::RouteTable,
            vec![
                table("Default Route Table", None, 1),
                table("custom", None, 2),
                table("empty", None, 0),
            ],
        );
        plan.push_step(
            ResourceKind::Subnet,
            vec![DependentResource::from_info(
                ResourceKind::Subnet,
                ResourceInfo::new("subnet-1", "a", "vcn-1").with_state(LifecycleState::Terminating),
            )],
        );

        assert_eq!(plan.route_tables_with_rules().count(), 2);
        assert_eq!(plan.resources(ResourceKind::SecurityList).len(), 0);
        // default table and terminating subnet are skipped
        assert_eq!(plan.deletion_count(), 2);
        assert!(!plan.has_no_dependents());
        assert_eq!(
            plan.skip_reason(&plan.resources(ResourceKind::Subnet)[0]),
            Some(SkipReason::AlreadyTerminating)
        );
    }

    #[test]
    fn name_matched_defaults_are_recorded_once() {
        let mut plan = TeardownPlan::new(network(), vec![], "Default");
        plan.push_step(
            ResourceKind::RouteTable,
            vec![
                table("Default Route Table", None, 1),
                table("flagged", Some(true), 0),
                table("custom", None, 2),
            ],
        );

        let default_table = &plan.resources(ResourceKind::RouteTable)[0];
        for _ in 0..3 {
            assert_eq!(plan.skip_reason(default_table), Some(SkipReason::ProviderDefault));
            assert_eq!(plan.deletion_count(), 1);
        }

        let ids: Vec<_> = plan.defaults_by_name.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rt-Default Route Table"]);
        assert_eq!(
            plan.skip_reason(&plan.resources(ResourceKind::RouteTable)[1]),
            Some(SkipReason::ProviderDefault)
        );
    }
}
