//! Impact discovery: which instances still have an interface in the network

use crate::provider::NetworkProvider;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use net_teardown_common::{
    DependentResource, InstanceInfo, LifecycleState, ResourceInfo, ResourceKind,
};
use tracing::{debug, warn};

/// Find every instance with an active interface attachment in one of the
/// network's subnets.
///
/// Only the instance listing itself can fail the discovery. A lookup failure
/// for a single instance is logged and that instance is left out. Lookups run
/// with at most `concurrency` instances in flight; results keep listing order.
pub(crate) async fn find_affected_instances<P: NetworkProvider>(
    provider: &P,
    network_id: &str,
    concurrency: usize,
) -> Result<Vec<DependentResource>> {
    let instances = provider
        .list_instances()
        .await
        .context("Failed to list instances")?;

    let candidates: Vec<InstanceInfo> = instances
        .into_iter()
        .filter(|i| i.state != LifecycleState::Terminated)
        .collect();
    debug!(count = candidates.len(), network_id = %network_id, "Checking instances for attachments");

    let affected = stream::iter(candidates)
        .map(|instance| async move {
            match instance_uses_network(provider, &instance.id, network_id).await {
                Ok(true) => Some(instance),
                Ok(false) => None,
                Err(e) => {
                    warn!(
                        instance_id = %instance.id,
                        error = ?e,
                        "Could not resolve instance attachments, skipping"
                    );
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .filter_map(|found| async move { found })
        .map(|instance| {
            DependentResource::from_info(
                ResourceKind::Instance,
                ResourceInfo::new(instance.id, instance.display_name, network_id)
                    .with_state(instance.state),
            )
        })
        .collect::<Vec<_>>()
        .await;

    Ok(affected)
}

/// Walk attachment -> interface -> subnet for one instance
async fn instance_uses_network<P: NetworkProvider>(
    provider: &P,
    instance_id: &str,
    network_id: &str,
) -> Result<bool> {
    let attachments = provider
        .list_interface_attachments(instance_id)
        .await
        .with_context(|| format!("Failed to list attachments of {instance_id}"))?;

    for attachment in attachments.iter().filter(|a| a.state.is_active()) {
        let interface = provider
            .get_interface(&attachment.interface_id)
            .await
            .with_context(|| format!("Failed to get interface {}", attachment.interface_id))?;
        let subnet = provider
            .get_subnet(&interface.subnet_id)
            .await
            .with_context(|| format!("Failed to get subnet {}", interface.subnet_id))?;

        if subnet.network_id == network_id {
            debug!(
                instance_id = %instance_id,
                interface_id = %interface.id,
                subnet_id = %subnet.id,
                "Instance attached to network"
            );
            return Ok(true);
        }
    }

    Ok(false)
}
