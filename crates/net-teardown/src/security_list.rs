//! Security list rules: list them and open TCP ports

use crate::error::{SecurityRuleError, is_not_found};
use crate::provider::NetworkProvider;
use anyhow::Context;
use net_teardown_common::{
    CommonService, PortRange, ResourceKind, ResourceRef, RuleDirection, SecurityRule,
};
use serde::Serialize;
use std::net::IpAddr;
use tracing::{debug, info};

/// Source used when none is given
pub const DEFAULT_SOURCE: &str = "0.0.0.0/0";

/// What [`add_ingress_rule`] did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AddRuleOutcome {
    Added { rule: SecurityRule },
    /// An existing rule already admits the same traffic; nothing was sent
    AlreadyCovered { existing: SecurityRule },
}

/// Rule counts of one security list
#[derive(Debug, Clone, Serialize)]
pub struct SecurityListSummary {
    pub security_list: ResourceRef,
    pub is_default: Option<bool>,
    pub ingress: usize,
    pub egress: usize,
    /// `PROTOCOL:ports` of ingress rules reachable from anywhere
    pub open_to_internet: Vec<String>,
}

/// TCP ingress for a well-known service
pub fn service_rule(service: CommonService, source: &str) -> SecurityRule {
    SecurityRule::tcp_ingress(source, PortRange::single(service.port()))
        .with_description(format!("{} access from {source}", service.label()))
}

/// TCP ingress for an arbitrary port range
pub fn custom_rule(ports: PortRange, source: &str, description: Option<&str>) -> SecurityRule {
    let description = match description {
        Some(d) if !d.trim().is_empty() => d.trim().to_string(),
        _ => format!("TCP {ports} access from {source}"),
    };
    SecurityRule::tcp_ingress(source, ports).with_description(description)
}

/// Check `cidr` is an address followed by a prefix length that fits it
pub fn validate_cidr(cidr: &str) -> Result<(), SecurityRuleError> {
    let invalid = || SecurityRuleError::InvalidCidr(cidr.to_string());
    let (address, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    let address: IpAddr = address.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    let max = if address.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(invalid());
    }
    Ok(())
}

fn rule_error(security_list_id: &str, source: anyhow::Error) -> SecurityRuleError {
    if is_not_found(&source) {
        SecurityRuleError::NotFound {
            security_list_id: security_list_id.to_string(),
        }
    } else {
        SecurityRuleError::Provider {
            security_list_id: security_list_id.to_string(),
            source,
        }
    }
}

/// All rules of a security list, ingress first
pub async fn list_rules<P: NetworkProvider>(
    provider: &P,
    security_list_id: &str,
) -> Result<Vec<SecurityRule>, SecurityRuleError> {
    let mut rules = provider
        .list_security_rules(security_list_id)
        .await
        .map_err(|e| rule_error(security_list_id, e))?;
    rules.sort_by_key(|r| r.direction != RuleDirection::Ingress);
    Ok(rules)
}

/// Every security list of a network with its rule counts
pub async fn summarize<P: NetworkProvider>(
    provider: &P,
    network_id: &str,
) -> anyhow::Result<Vec<SecurityListSummary>> {
    let lists = provider
        .list_dependents(ResourceKind::SecurityList, network_id)
        .await
        .with_context(|| format!("Failed to list security lists of {network_id}"))?;

    let mut summaries = Vec::with_capacity(lists.len());
    for list in &lists {
        let rules = list_rules(provider, list.id()).await?;
        let ingress = rules
            .iter()
            .filter(|r| r.direction == RuleDirection::Ingress)
            .count();
        summaries.push(SecurityListSummary {
            security_list: list.to_ref(),
            is_default: list.info().is_default,
            ingress,
            egress: rules.len() - ingress,
            open_to_internet: rules
                .iter()
                .filter(|r| r.is_open_to_internet() && r.protocol.has_ports())
                .map(|r| format!("{}:{}", r.protocol, r.ports_label()))
                .collect(),
        });
    }
    Ok(summaries)
}

/// Append an ingress rule unless an existing one already covers it.
///
/// The rule is validated first; a rule covered by an existing one (same
/// source and protocol, ports inside its range) is reported, not re-added.
pub async fn add_ingress_rule<P: NetworkProvider>(
    provider: &P,
    security_list_id: &str,
    rule: SecurityRule,
) -> Result<AddRuleOutcome, SecurityRuleError> {
    if rule.direction != RuleDirection::Ingress {
        return Err(SecurityRuleError::NotIngress {
            direction: rule.direction,
        });
    }
    validate_cidr(&rule.cidr)?;

    let existing = list_rules(provider, security_list_id).await?;
    if let Some(covering) = existing.into_iter().find(|r| r.covers(&rule)) {
        debug!(
            security_list_id = %security_list_id,
            cidr = %rule.cidr,
            ports = %rule.ports_label(),
            "Ingress already allowed"
        );
        return Ok(AddRuleOutcome::AlreadyCovered { existing: covering });
    }

    provider
        .add_ingress_rule(security_list_id, &rule)
        .await
        .map_err(|e| rule_error(security_list_id, e))?;

    info!(
        security_list_id = %security_list_id,
        protocol = %rule.protocol,
        cidr = %rule.cidr,
        ports = %rule.ports_label(),
        open_to_internet = rule.is_open_to_internet(),
        "Ingress rule added"
    );
    Ok(AddRuleOutcome::Added { rule })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_rules_describe_themselves() {
        let rule = service_rule(CommonService::Ssh, "203.0.113.0/24");
        assert_eq!(rule.ports, Some(PortRange::single(22)));
        assert_eq!(
            rule.description.as_deref(),
            Some("SSH access from 203.0.113.0/24")
        );
    }

    #[test]
    fn custom_rule_description_falls_back() {
        let ports = PortRange::new(8000, 8080).unwrap();
        assert_eq!(
            custom_rule(ports, DEFAULT_SOURCE, None).description.as_deref(),
            Some("TCP 8000-8080 access from 0.0.0.0/0")
        );
        assert_eq!(
            custom_rule(ports, DEFAULT_SOURCE, Some("  ")).description.as_deref(),
            Some("TCP 8000-8080 access from 0.0.0.0/0")
        );
        assert_eq!(
            custom_rule(ports, DEFAULT_SOURCE, Some("metrics")).description.as_deref(),
            Some("metrics")
        );
    }

    #[test]
    fn cidr_validation() {
        assert!(validate_cidr("0.0.0.0/0").is_ok());
        assert!(validate_cidr("10.0.0.0/8").is_ok());
        assert!(validate_cidr("2001:db8::/32").is_ok());
        assert!(validate_cidr("10.0.0.0").is_err());
        assert!(validate_cidr("10.0.0.0/33").is_err());
        assert!(validate_cidr("anywhere/0").is_err());
    }
}
