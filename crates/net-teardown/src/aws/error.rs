//! AWS error classification
//!
//! Maps EC2 error codes (via `ProvideErrorMetadata::code()`) onto
//! [`ProviderError`] so the orchestrator can branch on "not found" without
//! knowing anything about the SDK.

use crate::error::ProviderError;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};

/// EC2 error codes for "not found" conditions on the resources we touch
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidVpcID.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidInternetGatewayID.NotFound",
    "NatGatewayNotFound",
    "InvalidNatGatewayID.NotFound",
    "InvalidVpcEndpointId.NotFound",
    "InvalidGroup.NotFound",
    "InvalidGroupId.NotFound",
    "InvalidNetworkAclID.NotFound",
    "InvalidNetworkInterfaceID.NotFound",
    "InvalidInstanceID.NotFound",
    "InvalidRoute.NotFound",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known AWS error codes for dependency violations (resource still in use)
const DEPENDENCY_CODES: &[&str] = &["DependencyViolation", "InvalidGroup.InUse"];

/// Returned when detaching a gateway that is no longer attached
pub(crate) const GATEWAY_NOT_ATTACHED: &str = "Gateway.NotAttached";

/// Classify an EC2 error from its code and message.
pub fn classify_aws_error(
    code: Option<&str>,
    message: Option<&str>,
    resource_type: &'static str,
    resource_id: &str,
) -> ProviderError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => {
            ProviderError::not_found(resource_type, resource_id)
        }
        Some(c) if THROTTLING_CODES.contains(&c) => ProviderError::Throttled,
        Some(c) if DEPENDENCY_CODES.contains(&c) => ProviderError::DependencyViolation { message },
        _ => ProviderError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an SDK operation error. Errors without service metadata (timeouts,
/// dispatch failures) keep their full display chain as the message.
pub fn classify_sdk_error<E>(err: &E, resource_type: &'static str, resource_id: &str) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match err.code() {
        Some(code) => classify_aws_error(Some(code), err.message(), resource_type, resource_id),
        None => ProviderError::Sdk {
            code: None,
            message: DisplayErrorContext(err).to_string(),
        },
    }
}

/// Convert an SDK error into an `anyhow::Error` carrying a [`ProviderError`].
pub(crate) fn sdk_error<E>(err: E, resource_type: &'static str, resource_id: &str) -> anyhow::Error
where
    E: ProvideErrorMetadata + std::error::Error,
{
    anyhow::Error::new(classify_sdk_error(&err, resource_type, resource_id))
}

/// Error code carried by a classified error, if any
pub(crate) fn error_code(err: &ProviderError) -> Option<&str> {
    match err {
        ProviderError::Sdk { code, .. } => code.as_deref(),
        _ => None,
    }
}
