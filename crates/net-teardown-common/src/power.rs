//! Instance power states and the actions that move between them

use serde::{Deserialize, Serialize};

/// Power state of a compute instance.
///
/// Separate from [`crate::LifecycleState`], which folds running and stopped
/// instances together because either one can hold a network interface.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    #[strum(to_string = "starting", serialize = "pending")]
    Starting,
    #[strum(serialize = "running")]
    Running,
    #[strum(serialize = "stopping")]
    Stopping,
    #[strum(serialize = "stopped")]
    Stopped,
    /// Anything else (terminating, terminated, provider-specific)
    #[default]
    #[strum(serialize = "unknown")]
    Unknown,
}

impl PowerState {
    /// Map a provider state string, falling back to `Unknown`
    pub fn from_provider(state: &str) -> Self {
        state.parse().unwrap_or_default()
    }
}

/// Power action that can be requested on an instance
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum InstanceAction {
    #[strum(serialize = "start")]
    Start,
    #[strum(serialize = "stop")]
    Stop,
    /// Graceful reboot, letting the OS shut down cleanly
    #[strum(to_string = "soft-reset", serialize = "reset")]
    SoftReset,
}

impl InstanceAction {
    /// The only power state this action is accepted from
    pub fn required_state(self) -> PowerState {
        match self {
            Self::Start => PowerState::Stopped,
            Self::Stop | Self::SoftReset => PowerState::Running,
        }
    }

    pub fn applies_to(self, state: PowerState) -> bool {
        state == self.required_state()
    }

    /// Stopping takes a service down, so it asks first
    pub fn needs_confirmation(self) -> bool {
        matches!(self, Self::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_state_spellings() {
        assert_eq!(PowerState::from_provider("RUNNING"), PowerState::Running);
        assert_eq!(PowerState::from_provider("pending"), PowerState::Starting);
        assert_eq!(PowerState::from_provider("stopped"), PowerState::Stopped);
        assert_eq!(PowerState::from_provider("shutting-down"), PowerState::Unknown);
        assert_eq!(PowerState::Stopping.to_string(), "stopping");
    }

    #[test]
    fn test_actions_follow_state() {
        assert!(InstanceAction::Start.applies_to(PowerState::Stopped));
        assert!(!InstanceAction::Start.applies_to(PowerState::Running));
        assert!(InstanceAction::Stop.applies_to(PowerState::Running));
        assert!(!InstanceAction::Stop.applies_to(PowerState::Stopping));
        assert!(InstanceAction::SoftReset.applies_to(PowerState::Running));
        assert!(!InstanceAction::SoftReset.applies_to(PowerState::Stopped));
    }

    #[test]
    fn test_only_stop_asks() {
        assert!(InstanceAction::Stop.needs_confirmation());
        assert!(!InstanceAction::Start.needs_confirmation());
        assert!(!InstanceAction::SoftReset.needs_confirmation());
    }

    #[test]
    fn test_action_names() {
        assert_eq!("reset".parse::<InstanceAction>().unwrap(), InstanceAction::SoftReset);
        assert_eq!(InstanceAction::SoftReset.to_string(), "soft-reset");
        assert!("reboot".parse::<InstanceAction>().is_err());
    }
}
