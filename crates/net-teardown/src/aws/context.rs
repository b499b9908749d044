//! Shared AWS configuration context
//!
//! Loads the SDK configuration once so every client built from it shares
//! credentials and region.

use crate::config::AwsConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;

/// Loaded AWS SDK configuration for one region (and optionally one profile).
///
/// # Example
/// ```ignore
/// let aws = AwsContext::new("us-east-2").await;
/// let provider = Ec2NetworkClient::from_context(&aws);
/// ```
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Load AWS configuration for the specified region from the environment,
    /// shared config files and instance roles.
    pub async fn new(region: &str) -> Self {
        Self::load(region, None).await
    }

    pub async fn from_config(config: &AwsConfig) -> Self {
        Self::load(&config.region, config.aws_profile.as_deref()).await
    }

    async fn load(region: &str, profile: Option<&str>) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }

        Self {
            config: Arc::new(loader.load().await),
            region: region.to_string(),
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Create an EC2 client from this context.
    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Types that can be built from a loaded [`AwsContext`]
pub trait FromAwsContext: Sized {
    fn from_context(ctx: &AwsContext) -> Self;
}
