//! Normalized resource lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a provider resource, normalized across resource types.
///
/// Providers report many spellings ("pending", "provisioning", "shutting-down",
/// ...); anything that does not map onto the four common states is kept
/// verbatim in [`LifecycleState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Creating,
    Available,
    Terminating,
    Terminated,
    /// Provider-specific state (including error states)
    Other(String),
}

impl LifecycleState {
    /// Map a provider state string onto the normalized states.
    pub fn from_provider(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "creating" | "pending" | "provisioning" | "starting" | "attaching" => Self::Creating,
            "available" | "running" | "active" | "attached" | "stopped" | "stopping" => {
                Self::Available
            }
            "terminating" | "deleting" | "shutting-down" | "detaching" => Self::Terminating,
            "terminated" | "deleted" | "detached" => Self::Terminated,
            _ => Self::Other(state.to_string()),
        }
    }

    /// True once the provider has started (or finished) removing the resource
    pub fn is_going_away(&self) -> bool {
        matches!(self, Self::Terminating | Self::Terminated)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Available => "AVAILABLE",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_spellings() {
        assert_eq!(LifecycleState::from_provider("pending"), LifecycleState::Creating);
        assert_eq!(LifecycleState::from_provider("AVAILABLE"), LifecycleState::Available);
        assert_eq!(LifecycleState::from_provider("running"), LifecycleState::Available);
        assert_eq!(
            LifecycleState::from_provider("shutting-down"),
            LifecycleState::Terminating
        );
        assert_eq!(LifecycleState::from_provider("deleted"), LifecycleState::Terminated);
    }

    #[test]
    fn test_unknown_state_is_preserved() {
        let state = LifecycleState::from_provider("failed");
        assert_eq!(state, LifecycleState::Other("failed".to_string()));
        assert_eq!(state.to_string(), "failed");
        assert!(!state.is_going_away());
    }

    #[test]
    fn test_going_away() {
        assert!(LifecycleState::Terminating.is_going_away());
        assert!(LifecycleState::Terminated.is_going_away());
        assert!(!LifecycleState::Available.is_going_away());
        assert!(!LifecycleState::Creating.is_going_away());
    }
}
