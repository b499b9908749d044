//! net-teardown - ordered teardown of a virtual network
//!
//! This crate removes a virtual network together with everything that blocks
//! its deletion: route rules, subnets, gateways, security groups, custom route
//! tables and custom security lists. The cloud API is reached through the
//! [`provider::NetworkProvider`] capability; [`aws`] binds it to AWS VPC.
//!
//! The same capability backs two smaller tools: [`instance`] power actions
//! and [`security_list`] ingress rules.

pub mod aws;
pub mod config;
pub mod error;
pub mod instance;
pub mod orchestrator;
pub mod provider;
pub mod report;
pub mod security_list;
pub mod wait;

pub use config::TeardownConfig;
pub use error::{
    ErrorKind, InstanceActionError, ProviderError, SecurityRuleError, TeardownError,
};
pub use orchestrator::{
    InUseGate, InUsePolicy, TeardownOrchestrator, TeardownOutcome, TeardownPlan, TeardownResult,
};
pub use provider::NetworkProvider;
