//! Ordered teardown of a network and its dependents
//!
//! A run always walks the same phases (see [`Phase`]). Reads happen up front
//! while building the [`TeardownPlan`]; after the operator has confirmed, the
//! mutating phases run strictly in order. Per-resource failures are recorded
//! and never stop the sequence; only the final network deletion can fail the
//! run as a whole.

mod discovery;
mod gate;
mod plan;
mod result;

pub use gate::{InUseGate, InUsePolicy};
pub use plan::{PlannedStep, TeardownPlan};
pub use result::{DeletionFailure, SkipReason, SkippedResource, TeardownOutcome, TeardownResult};

use crate::config::TeardownConfig;
use crate::error::{TeardownError, is_not_found};
use crate::provider::NetworkProvider;
use crate::wait::{sleep_or_cancel, wait_until_empty};
use net_teardown_common::{DependentResource, LifecycleState, Phase, ResourceKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives a network and its dependents to deletion through a provider.
pub struct TeardownOrchestrator<'a, P: NetworkProvider> {
    provider: &'a P,
    config: TeardownConfig,
    cancel: Option<CancellationToken>,
}

impl<'a, P: NetworkProvider> TeardownOrchestrator<'a, P> {
    pub fn new(provider: &'a P, config: TeardownConfig) -> Self {
        Self {
            provider,
            config,
            cancel: None,
        }
    }

    /// Stop between phases once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Inspect a network without changing anything.
    ///
    /// Runs impact discovery and lists every dependent kind. A kind that cannot
    /// be listed is recorded on the plan and treated as empty.
    pub async fn plan(&self, network_id: &str) -> Result<TeardownPlan, TeardownError> {
        let discovery_error = |source: anyhow::Error| TeardownError::Discovery {
            network_id: network_id.to_string(),
            source,
        };

        let network = self
            .provider
            .get_network(network_id)
            .await
            .map_err(discovery_error)?
            .ok_or_else(|| TeardownError::NotFound {
                network_id: network_id.to_string(),
            })?;

        info!(
            phase = %Phase::ImpactDiscovery,
            network_id = %network.id,
            name = %network.display_name,
            "Discovering instances attached to network"
        );
        let in_use = discovery::find_affected_instances(
            self.provider,
            &network.id,
            self.config.discovery_concurrency,
        )
        .await
        .map_err(discovery_error)?;

        let mut plan = TeardownPlan::new(network, in_use, &self.config.default_name_prefix);
        for kind in ResourceKind::DELETION_ORDER {
            match self.provider.list_dependents(kind, network_id).await {
                Ok(resources) => {
                    debug!(kind = %kind, count = resources.len(), "Listed dependents");
                    plan.push_step(kind, resources);
                }
                Err(e) => {
                    warn!(kind = %kind, network_id = %network_id, error = ?e, "Failed to list dependents");
                    plan.record_listing_failure(kind, &e);
                    plan.push_step(kind, Vec::new());
                }
            }
        }

        Ok(plan)
    }

    /// Tear down `network_id` and everything that blocks its deletion.
    ///
    /// `confirmation` must equal the configured phrase exactly; otherwise no
    /// provider call is made at all. When instances are still attached the
    /// `gate` decides whether to go on. Once mutation has begun the caller
    /// always receives a complete [`TeardownResult`].
    pub async fn teardown<G>(
        &self,
        network_id: &str,
        confirmation: &str,
        gate: &G,
    ) -> Result<TeardownResult, TeardownError>
    where
        G: InUseGate + ?Sized,
    {
        if confirmation != self.config.confirmation_phrase {
            return Err(TeardownError::NotConfirmed {
                expected: self.config.confirmation_phrase.clone(),
            });
        }

        let plan = self.plan(network_id).await?;

        if !plan.in_use.is_empty() {
            warn!(
                network_id = %network_id,
                count = plan.in_use.len(),
                "Instances are still attached to the network"
            );
            if !gate.proceed(&plan.network, &plan.in_use) {
                info!(network_id = %network_id, "Teardown declined");
                return Err(TeardownError::Aborted {
                    network_id: network_id.to_string(),
                    in_use: plan.in_use.iter().map(DependentResource::to_ref).collect(),
                });
            }
        }

        if self.is_cancelled() {
            return Err(TeardownError::Cancelled {
                network_id: network_id.to_string(),
            });
        }

        Ok(self.execute(&plan).await)
    }

    /// Run the mutating phases of a confirmed plan
    async fn execute(&self, plan: &TeardownPlan) -> TeardownResult {
        let network = &plan.network;
        let mut result = TeardownResult::new(
            &network.id,
            &network.display_name,
            plan.in_use.iter().map(DependentResource::to_ref).collect(),
        );
        result.failures.extend(plan.listing_failures.iter().cloned());

        info!(
            network_id = %network.id,
            deletions = plan.deletion_count(),
            "Starting teardown"
        );

        for phase in Phase::ALL.into_iter().skip(1) {
            if self.is_cancelled() {
                warn!(phase = %phase, "Teardown cancelled");
                result.cancelled_at = Some(phase);
                return result.finish();
            }

            match phase {
                Phase::ImpactDiscovery => {}
                Phase::RouteRuleClearing => self.clear_route_rules(plan, &mut result).await,
                Phase::SubnetDrain => self.drain_subnets(plan, &mut result).await,
                Phase::Settle => {
                    if !plan.has_no_dependents() {
                        info!(phase = %phase, delay = ?self.config.final_settle_delay, "Waiting for deletions to settle");
                        sleep_or_cancel(self.config.final_settle_delay, self.cancel.as_ref()).await;
                    }
                }
                Phase::NetworkDeletion => self.delete_network(plan, &mut result).await,
                Phase::SubnetDeletion
                | Phase::GatewayDeletion
                | Phase::SecurityGroupDeletion
                | Phase::RouteTableDeletion
                | Phase::SecurityListDeletion => {
                    self.delete_phase(phase, plan, &mut result).await
                }
            }
        }

        let result = result.finish();
        info!(
            network_id = %result.network_id,
            outcome = result.outcome().as_str(),
            deleted = result.deleted.len(),
            failures = result.failures.len(),
            "Teardown finished"
        );
        result
    }

    async fn clear_route_rules(&self, plan: &TeardownPlan, result: &mut TeardownResult) {
        for table in plan.route_tables_with_rules() {
            let rule_count = table.route_rules().map_or(0, <[_]>::len);
            info!(
                phase = %Phase::RouteRuleClearing,
                route_table_id = %table.id(),
                rules = rule_count,
                "Clearing route rules"
            );

            match self.provider.update_route_rules(table.id(), &[]).await {
                Ok(()) => {
                    result.cleared_route_tables.push(table.id().to_string());
                    sleep_or_cancel(self.config.route_settle_delay, self.cancel.as_ref()).await;
                }
                Err(e) if is_not_found(&e) => {
                    debug!(route_table_id = %table.id(), "Route table already gone");
                }
                Err(e) => {
                    warn!(route_table_id = %table.id(), error = ?e, "Failed to clear route rules");
                    result.record_failure(
                        Phase::RouteRuleClearing,
                        ResourceKind::RouteTable,
                        table.id(),
                        &e,
                    );
                }
            }
        }
    }

    /// Delete every planned resource whose kind belongs to `phase`
    async fn delete_phase(&self, phase: Phase, plan: &TeardownPlan, result: &mut TeardownResult) {
        for kind in ResourceKind::DELETION_ORDER
            .into_iter()
            .filter(|k| k.phase() == phase)
        {
            let resources = plan.resources(kind);
            if resources.is_empty() {
                continue;
            }

            info!(phase = %phase, kind = %kind, count = resources.len(), "Deleting resources");
            for resource in resources {
                self.delete_one(phase, plan, resource, result).await;
            }
        }
    }

    async fn delete_one(
        &self,
        phase: Phase,
        plan: &TeardownPlan,
        resource: &DependentResource,
        result: &mut TeardownResult,
    ) {
        if let Some(reason) = plan.skip_reason(resource) {
            debug!(kind = %resource.kind(), id = %resource.id(), reason = reason.as_str(), "Skipping");
            result.record_skip(resource.to_ref(), reason);
            return;
        }

        match self.provider.delete_dependent(resource).await {
            Ok(()) => {
                info!(kind = %resource.kind(), id = %resource.id(), "Deleted");
                result.deleted.push(resource.to_ref());
                sleep_or_cancel(self.config.delete_pacing, self.cancel.as_ref()).await;
            }
            Err(e) if is_not_found(&e) => {
                debug!(kind = %resource.kind(), id = %resource.id(), "Already deleted");
                result.record_skip(resource.to_ref(), SkipReason::AlreadyDeleted);
            }
            Err(e) => {
                warn!(kind = %resource.kind(), id = %resource.id(), error = ?e, "Failed to delete");
                result.record_failure(phase, resource.kind(), resource.id(), &e);
            }
        }
    }

    /// Wait for the provider to stop listing subnets. A timeout only warns.
    async fn drain_subnets(&self, plan: &TeardownPlan, result: &mut TeardownResult) {
        let provider = self.provider;
        let network_id = plan.network.id.as_str();
        let label = format!("subnets of {network_id}");

        let drained = wait_until_empty(
            self.config.subnet_drain,
            self.cancel.as_ref(),
            move || async move {
                let subnets = provider
                    .list_dependents(ResourceKind::Subnet, network_id)
                    .await?;
                Ok(subnets
                    .iter()
                    .filter(|s| *s.state() != LifecycleState::Terminated)
                    .count())
            },
            &label,
        )
        .await;

        if !drained && !self.is_cancelled() {
            warn!(
                phase = %Phase::SubnetDrain,
                network_id = %network_id,
                timeout = ?self.config.subnet_drain.timeout,
                "Subnets still present after timeout, continuing"
            );
            result.subnet_drain_timed_out = true;
        }
    }

    async fn delete_network(&self, plan: &TeardownPlan, result: &mut TeardownResult) {
        let network_id = plan.network.id.as_str();
        info!(phase = %Phase::NetworkDeletion, network_id = %network_id, "Deleting network");

        match self.provider.delete_network(network_id).await {
            Ok(()) => {
                info!(network_id = %network_id, "Network deleted");
                result.network_deleted = true;
            }
            Err(e) if is_not_found(&e) => {
                warn!(network_id = %network_id, "Network already gone");
                result.network_deleted = true;
            }
            Err(e) => {
                error!(network_id = %network_id, error = ?e, "Failed to delete network");
                result.terminal_error = Some(format!("{e:#}"));
            }
        }
    }
}
