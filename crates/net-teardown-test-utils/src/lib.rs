//! Shared test utilities for net-teardown
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique test names
//! - [`fake`]: In-memory [`net_teardown::NetworkProvider`] that records every call
//! - [`fixtures`]: Small constructors for networks and dependent resources

pub mod aws;
pub mod fake;
pub mod fixtures;

// Re-export commonly used items
pub use aws::{get_test_region, test_name};
pub use fake::{Call, FakeProvider};
