//! AWS binding for the teardown
//!
//! - [`context`]: shared SDK configuration
//! - [`error`]: EC2 error code classification
//! - [`vpc`]: [`crate::NetworkProvider`] over VPCs and their dependents

pub mod context;
pub mod error;
pub mod vpc;

pub use context::{AwsContext, FromAwsContext};
pub use error::{classify_aws_error, classify_sdk_error};
pub use vpc::Ec2NetworkClient;
