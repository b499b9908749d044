//! net-teardown-common - Shared types for network teardown
//!
//! This crate holds the provider-independent resource model used by the
//! orchestrator and by provider bindings, without any cloud SDK dependencies.
//!
//! ## Modules
//!
//! - [`defaults`]: Default timing and confirmation values
//! - [`lifecycle`]: Normalized lifecycle states
//! - [`model`]: Networks, dependent resources, route rules and interfaces
//! - [`phase`]: The fixed teardown phase sequence
//! - [`power`]: Instance power states and actions
//! - [`resource_kind`]: Dependent resource kinds and their deletion order
//! - [`security_rule`]: Security list rules and well-known services

pub mod defaults;
pub mod lifecycle;
pub mod model;
pub mod phase;
pub mod power;
pub mod resource_kind;
pub mod security_rule;

// Re-export commonly used types
pub use lifecycle::LifecycleState;
pub use model::{
    AttachmentState, DependentResource, InstanceInfo, InterfaceAttachment, NetworkInterface,
    NetworkResource, ResourceInfo, ResourceRef, RouteRule, SubnetInfo,
};
pub use phase::Phase;
pub use power::{InstanceAction, PowerState};
pub use resource_kind::ResourceKind;
pub use security_rule::{
    CommonService, PortRange, PortRangeError, Protocol, RuleDirection, SecurityRule,
};
