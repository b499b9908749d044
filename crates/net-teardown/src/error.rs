//! Error types for providers and the teardown workflow

use net_teardown_common::{InstanceAction, PowerState, ResourceRef, RuleDirection};
use thiserror::Error;

/// Provider failure categories the teardown branches on.
///
/// Provider bindings return these inside an `anyhow::Error` chain; use
/// [`provider_error`] to recover the typed value.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Resource was not found (already deleted, or never existed)
    #[error("Resource not found: {resource_type} '{resource_id}'")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    /// Resource still has dependent objects
    #[error("Resource has dependent objects: {message}")]
    DependencyViolation { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Any other provider error, with its code when one was returned
    #[error("Provider error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    pub fn not_found(resource_type: &'static str, resource_id: impl Into<String>) -> Self {
        ProviderError::NotFound {
            resource_type,
            resource_id: resource_id.into(),
        }
    }
}

/// Find the first [`ProviderError`] in an error chain.
pub fn provider_error(error: &anyhow::Error) -> Option<&ProviderError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ProviderError>())
}

/// Check if an error chain carries a "not found" provider error
pub fn is_not_found(error: &anyhow::Error) -> bool {
    provider_error(error).is_some_and(ProviderError::is_not_found)
}

/// Coarse error taxonomy shared by hard stops and completed runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The confirmation phrase did not match; nothing was touched
    NotConfirmed,
    /// The target network does not exist
    NotFound,
    /// The operator declined to proceed with instances still attached
    Aborted,
    /// Some dependent deletions failed but the teardown ran to the end
    PartialFailure,
    /// Deleting the network itself failed
    TerminalFailure,
    /// A cancellation request stopped the teardown
    Cancelled,
}

/// Hard stops raised before (or instead of) the mutation sequence
#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("Teardown not confirmed: type {expected:?} exactly to proceed")]
    NotConfirmed { expected: String },

    #[error("Network '{network_id}' not found")]
    NotFound { network_id: String },

    #[error(
        "Teardown of '{network_id}' aborted: {} instance(s) still attached",
        .in_use.len()
    )]
    Aborted {
        network_id: String,
        in_use: Vec<ResourceRef>,
    },

    #[error("Teardown of '{network_id}' cancelled before any change was made")]
    Cancelled { network_id: String },

    #[error("Failed to inspect network '{network_id}'")]
    Discovery {
        network_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl TeardownError {
    /// Map onto the shared taxonomy. Discovery failures surface as `NotFound`
    /// only when the provider said so; otherwise they count as aborted runs.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TeardownError::NotConfirmed { .. } => ErrorKind::NotConfirmed,
            TeardownError::NotFound { .. } => ErrorKind::NotFound,
            TeardownError::Aborted { .. } => ErrorKind::Aborted,
            TeardownError::Cancelled { .. } => ErrorKind::Cancelled,
            TeardownError::Discovery { source, .. } if is_not_found(source) => ErrorKind::NotFound,
            TeardownError::Discovery { .. } => ErrorKind::Aborted,
        }
    }
}

/// Why a power action was not sent
#[derive(Debug, Error)]
pub enum InstanceActionError {
    #[error("Instance '{instance_id}' not found")]
    NotFound { instance_id: String },

    #[error(
        "Cannot {action} instance '{instance_id}' while it is {state} (must be {})",
        .action.required_state()
    )]
    NotApplicable {
        instance_id: String,
        action: InstanceAction,
        state: PowerState,
    },

    #[error("{action} of instance '{instance_id}' declined")]
    Declined {
        instance_id: String,
        action: InstanceAction,
    },

    #[error("Failed to {action} instance '{instance_id}'")]
    Provider {
        instance_id: String,
        action: InstanceAction,
        #[source]
        source: anyhow::Error,
    },
}

/// Why a security list rule could not be read or added
#[derive(Debug, Error)]
pub enum SecurityRuleError {
    #[error("Security list '{security_list_id}' not found")]
    NotFound { security_list_id: String },

    #[error("Only ingress rules can be added, got {direction}")]
    NotIngress { direction: RuleDirection },

    #[error("Invalid CIDR block '{0}'")]
    InvalidCidr(String),

    #[error("Failed to update security list '{security_list_id}'")]
    Provider {
        security_list_id: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn provider_error_survives_context() {
        let err: anyhow::Result<()> =
            Err(ProviderError::not_found("subnet", "subnet-1")).context("Failed to delete subnet");
        let err = err.unwrap_err();
        assert!(is_not_found(&err));
        assert!(matches!(
            provider_error(&err),
            Some(ProviderError::NotFound { resource_id, .. }) if resource_id == "subnet-1"
        ));
    }

    #[test]
    fn plain_errors_are_not_classified() {
        let err = anyhow::anyhow!("connection refused");
        assert!(provider_error(&err).is_none());
        assert!(!is_not_found(&err));
    }

    #[test]
    fn teardown_error_kinds() {
        assert_eq!(
            TeardownError::NotConfirmed {
                expected: "DELETE".into()
            }
            .kind(),
            ErrorKind::NotConfirmed
        );
        assert_eq!(
            TeardownError::NotFound {
                network_id: "vpc-1".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            TeardownError::Aborted {
                network_id: "vpc-1".into(),
                in_use: vec![]
            }
            .kind(),
            ErrorKind::Aborted
        );
        let discovery = TeardownError::Discovery {
            network_id: "vpc-1".into(),
            source: anyhow::Error::new(ProviderError::not_found("vpc", "vpc-1")),
        };
        assert_eq!(discovery.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn not_applicable_names_the_required_state() {
        let err = InstanceActionError::NotApplicable {
            instance_id: "i-1".into(),
            action: InstanceAction::Start,
            state: PowerState::Running,
        };
        assert_eq!(
            err.to_string(),
            "Cannot start instance 'i-1' while it is running (must be stopped)"
        );
    }

    #[test]
    fn aborted_message_counts_instances() {
        let err = TeardownError::Aborted {
            network_id: "vpc-1".into(),
            in_use: vec![
                ResourceRef {
                    kind: net_teardown_common::ResourceKind::Instance,
                    id: "i-1".into(),
                    display_name: "web".into(),
                },
                ResourceRef {
                    kind: net_teardown_common::ResourceKind::Instance,
                    id: "i-2".into(),
                    display_name: "db".into(),
                },
            ],
        };
        assert!(err.to_string().contains("2 instance(s)"));
    }
}
