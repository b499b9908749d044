//! AWS test utilities
//!
//! Region detection and unique resource names for AWS integration tests.

use chrono::Utc;

/// Get the AWS region for tests.
///
/// Checks `AWS_REGION`, then `AWS_DEFAULT_REGION`, then falls back to
/// us-east-2.
///
/// # Example
///
/// ```
/// use net_teardown_test_utils::aws::get_test_region;
///
/// let region = get_test_region();
/// assert!(!region.is_empty());
/// ```
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| "us-east-2".to_string())
}

/// Unique `Name` tag for resources created by a test.
///
/// Format: `net-teardown-test-{timestamp_ms}-{counter}`
///
/// # Example
///
/// ```
/// use net_teardown_test_utils::aws::test_name;
///
/// assert!(test_name().starts_with("net-teardown-test-"));
/// ```
pub fn test_name() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("net-teardown-test-{ts}-{counter}")
}
