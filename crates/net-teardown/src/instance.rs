//! Instance power management: start, stop and soft reset

use crate::error::{InstanceActionError, is_not_found};
use crate::provider::NetworkProvider;
use net_teardown_common::{InstanceAction, InstanceInfo};
use tracing::{info, warn};

/// Look up one instance in the provider scope
pub async fn find_instance<P: NetworkProvider>(
    provider: &P,
    instance_id: &str,
) -> anyhow::Result<Option<InstanceInfo>> {
    let instances = provider.list_instances().await?;
    Ok(instances.into_iter().find(|i| i.id == instance_id))
}

/// Apply `action` to an instance if its power state allows it.
///
/// Start only applies to a stopped instance; stop and soft reset only to a
/// running one. Actions that need confirmation call `confirm` after the state
/// check and before anything is sent. Returns the instance as it was before
/// the action.
pub async fn apply_instance_action<P, C>(
    provider: &P,
    instance_id: &str,
    action: InstanceAction,
    confirm: C,
) -> Result<InstanceInfo, InstanceActionError>
where
    P: NetworkProvider,
    C: FnOnce(&InstanceInfo) -> bool,
{
    let provider_failure = |source: anyhow::Error| InstanceActionError::Provider {
        instance_id: instance_id.to_string(),
        action,
        source,
    };

    let instance = find_instance(provider, instance_id)
        .await
        .map_err(provider_failure)?
        .ok_or_else(|| InstanceActionError::NotFound {
            instance_id: instance_id.to_string(),
        })?;

    if !action.applies_to(instance.power) {
        warn!(
            instance_id = %instance_id,
            action = %action,
            state = %instance.power,
            "Action not applicable to current state"
        );
        return Err(InstanceActionError::NotApplicable {
            instance_id: instance_id.to_string(),
            action,
            state: instance.power,
        });
    }

    if action.needs_confirmation() && !confirm(&instance) {
        info!(instance_id = %instance_id, action = %action, "Instance action declined");
        return Err(InstanceActionError::Declined {
            instance_id: instance_id.to_string(),
            action,
        });
    }

    match provider.instance_action(instance_id, action).await {
        Ok(()) => {
            info!(
                instance_id = %instance_id,
                name = %instance.display_name,
                action = %action,
                "Instance action sent"
            );
            Ok(instance)
        }
        // Gone between the listing and the request
        Err(e) if is_not_found(&e) => Err(InstanceActionError::NotFound {
            instance_id: instance_id.to_string(),
        }),
        Err(e) => Err(provider_failure(e)),
    }
}
