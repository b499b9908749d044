//! Outcome of a teardown run

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use net_teardown_common::{Phase, ResourceKind, ResourceRef};
use serde::Serialize;

/// Why a discovered resource did not receive a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Created by the provider with the network and removed together with it
    ProviderDefault,
    /// Already terminating or terminated
    AlreadyTerminating,
    /// Delete reported the resource as not found
    AlreadyDeleted,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::ProviderDefault => "provider default",
            SkipReason::AlreadyTerminating => "already terminating",
            SkipReason::AlreadyDeleted => "already deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedResource {
    pub resource: ResourceRef,
    pub reason: SkipReason,
}

/// A non-fatal per-resource failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub phase: Phase,
    pub kind: ResourceKind,
    pub resource_id: String,
    pub error: String,
}

/// Classification of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownOutcome {
    /// Every dependent handled and the network deleted
    Success,
    /// The network was deleted but some dependents failed along the way
    PartialFailure,
    /// Deleting the network itself failed
    TerminalFailure,
    /// Stopped between phases after mutation had begun
    Cancelled,
}

impl TeardownOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TeardownOutcome::Success => "success",
            TeardownOutcome::PartialFailure => "partial failure",
            TeardownOutcome::TerminalFailure => "terminal failure",
            TeardownOutcome::Cancelled => "cancelled",
        }
    }
}

/// Complete record of a teardown that reached the mutation phases.
///
/// Returned even when the final network deletion fails, so callers always
/// see what was already removed.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownResult {
    pub network_id: String,
    pub network_name: String,
    pub success: bool,
    /// Instances that were attached when the operator chose to proceed
    pub in_use: Vec<ResourceRef>,
    pub cleared_route_tables: Vec<String>,
    pub deleted: Vec<ResourceRef>,
    pub skipped: Vec<SkippedResource>,
    pub failures: Vec<DeletionFailure>,
    pub subnet_drain_timed_out: bool,
    pub network_deleted: bool,
    pub terminal_error: Option<String>,
    pub cancelled_at: Option<Phase>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TeardownResult {
    pub(crate) fn new(network_id: &str, network_name: &str, in_use: Vec<ResourceRef>) -> Self {
        let now = Utc::now();
        Self {
            network_id: network_id.to_string(),
            network_name: network_name.to_string(),
            success: false,
            in_use,
            cleared_route_tables: Vec::new(),
            deleted: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
            subnet_drain_timed_out: false,
            network_deleted: false,
            terminal_error: None,
            cancelled_at: None,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn record_skip(&mut self, resource: ResourceRef, reason: SkipReason) {
        self.skipped.push(SkippedResource { resource, reason });
    }

    pub(crate) fn record_failure(
        &mut self,
        phase: Phase,
        kind: ResourceKind,
        resource_id: &str,
        error: &anyhow::Error,
    ) {
        self.failures.push(DeletionFailure {
            phase,
            kind,
            resource_id: resource_id.to_string(),
            error: format!("{error:#}"),
        });
    }

    /// Seal the result once the last phase has run (or was skipped).
    pub(crate) fn finish(mut self) -> Self {
        self.success = self.network_deleted && self.failures.is_empty();
        self.finished_at = Utc::now();
        self
    }

    pub fn outcome(&self) -> TeardownOutcome {
        if self.cancelled_at.is_some() {
            TeardownOutcome::Cancelled
        } else if !self.network_deleted {
            TeardownOutcome::TerminalFailure
        } else if self.failures.is_empty() {
            TeardownOutcome::Success
        } else {
            TeardownOutcome::PartialFailure
        }
    }

    /// Error taxonomy entry for unsuccessful runs
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.outcome() {
            TeardownOutcome::Success => None,
            TeardownOutcome::PartialFailure => Some(ErrorKind::PartialFailure),
            TeardownOutcome::TerminalFailure => Some(ErrorKind::TerminalFailure),
            TeardownOutcome::Cancelled => Some(ErrorKind::Cancelled),
        }
    }

    /// Deleted resources of one kind
    pub fn deleted_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceRef> {
        self.deleted.iter().filter(move |r| r.kind == kind)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet_ref(id: &str) -> ResourceRef {
        ResourceRef {
            kind: ResourceKind::Subnet,
            id: id.to_string(),
            display_name: id.to_string(),
        }
    }

    #[test]
    fn test_outcome_success() {
        let mut result = TeardownResult::new("vpc-1", "main", vec![]);
        result.network_deleted = true;
        let result = result.finish();

        assert!(result.success);
        assert_eq!(result.outcome(), TeardownOutcome::Success);
        assert_eq!(result.error_kind(), None);
    }

    #[test]
    fn test_outcome_partial_failure() {
        let mut result = TeardownResult::new("vpc-1", "main", vec![]);
        result.deleted.push(subnet_ref("subnet-2"));
        result.record_failure(
            Phase::SubnetDeletion,
            ResourceKind::Subnet,
            "subnet-1",
            &anyhow::anyhow!("in use"),
        );
        result.network_deleted = true;
        let result = result.finish();

        assert!(!result.success);
        assert_eq!(result.outcome(), TeardownOutcome::PartialFailure);
        assert_eq!(result.error_kind(), Some(ErrorKind::PartialFailure));
        assert_eq!(result.deleted_of(ResourceKind::Subnet).count(), 1);
    }

    #[test]
    fn test_outcome_terminal_and_cancelled() {
        let mut result = TeardownResult::new("vpc-1", "main", vec![]);
        result.terminal_error = Some("DependencyViolation".into());
        let result = result.finish();
        assert_eq!(result.outcome(), TeardownOutcome::TerminalFailure);

        let mut result = TeardownResult::new("vpc-1", "main", vec![]);
        result.cancelled_at = Some(Phase::GatewayDeletion);
        let result = result.finish();
        assert!(!result.success);
        assert_eq!(result.outcome(), TeardownOutcome::Cancelled);
        assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    }

    #[test]
    fn test_serializes_to_json() {
        let mut result = TeardownResult::new("vpc-1", "main", vec![]);
        result.record_skip(subnet_ref("subnet-1"), SkipReason::AlreadyDeleted);
        let json = serde_json::to_value(result.finish()).unwrap();

        assert_eq!(json["network_id"], "vpc-1");
        assert_eq!(json["skipped"][0]["reason"], "already_deleted");
        assert_eq!(json["skipped"][0]["resource"]["kind"], "subnet");
    }
}
