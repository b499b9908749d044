//! Security list rules
//!
//! A security list is a stateless, subnet-level packet filter. Only the
//! fields needed to show rules and to open TCP ports are modelled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// CIDRs that mean "anywhere on the internet"
pub const ANYWHERE: &[&str] = &["0.0.0.0/0", "::/0"];

/// IP protocol of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    All,
    /// Protocol number with no name here
    Other(String),
}

impl Protocol {
    /// Parse an IANA protocol number (or a provider's name for it)
    pub fn from_provider(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "6" | "tcp" => Self::Tcp,
            "17" | "udp" => Self::Udp,
            "1" | "icmp" => Self::Icmp,
            "-1" | "all" => Self::All,
            _ => Self::Other(value.to_string()),
        }
    }

    /// IANA protocol number as the providers expect it
    pub fn number(&self) -> &str {
        match self {
            Self::Tcp => "6",
            Self::Udp => "17",
            Self::Icmp => "1",
            Self::All => "-1",
            Self::Other(n) => n,
        }
    }

    /// Whether rules of this protocol carry a port range
    pub fn has_ports(&self) -> bool {
        matches!(self, Self::Tcp | Self::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("TCP"),
            Self::Udp => f.write_str("UDP"),
            Self::Icmp => f.write_str("ICMP"),
            Self::All => f.write_str("ALL"),
            Self::Other(n) => f.write_str(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortRangeError {
    #[error("Invalid port '{0}': expected a number between 1 and 65535")]
    InvalidPort(String),
    #[error("Invalid port range {min}-{max}: start is after end")]
    Reversed { min: u16, max: u16 },
}

/// Inclusive destination port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            min: port,
            max: port,
        }
    }

    pub fn new(min: u16, max: u16) -> Result<Self, PortRangeError> {
        if min == 0 {
            return Err(PortRangeError::InvalidPort(min.to_string()));
        }
        if max == 0 {
            return Err(PortRangeError::InvalidPort(max.to_string()));
        }
        if min > max {
            return Err(PortRangeError::Reversed { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, other: &PortRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }
}

impl FromStr for PortRange {
    type Err = PortRangeError;

    /// `"443"` or `"8000-8080"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let port = |p: &str| {
            p.trim()
                .parse::<u16>()
                .map_err(|_| PortRangeError::InvalidPort(p.trim().to_string()))
        };
        match s.split_once('-') {
            Some((min, max)) => Self::new(port(min)?, port(max)?),
            None => {
                let p = port(s)?;
                Self::new(p, p)
            }
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuleDirection {
    Ingress,
    Egress,
}

/// One rule of a security list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub direction: RuleDirection,
    pub protocol: Protocol,
    /// Source CIDR for ingress, destination CIDR for egress
    pub cidr: String,
    /// Destination ports; `None` means every port
    pub ports: Option<PortRange>,
    pub description: Option<String>,
}

impl SecurityRule {
    pub fn tcp_ingress(cidr: impl Into<String>, ports: PortRange) -> Self {
        Self {
            direction: RuleDirection::Ingress,
            protocol: Protocol::Tcp,
            cidr: cidr.into(),
            ports: Some(ports),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Ingress rule reachable from any address
    pub fn is_open_to_internet(&self) -> bool {
        self.direction == RuleDirection::Ingress && ANYWHERE.contains(&self.cidr.as_str())
    }

    /// True when this rule already admits all traffic `other` would.
    ///
    /// Descriptions are ignored.
    pub fn covers(&self, other: &SecurityRule) -> bool {
        if self.direction != other.direction || self.cidr != other.cidr {
            return false;
        }
        if self.protocol == Protocol::All {
            return true;
        }
        if self.protocol != other.protocol {
            return false;
        }
        match (self.ports, other.ports) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => mine.contains(&theirs),
        }
    }

    /// Ports as shown to operators: `ALL` when unrestricted
    pub fn ports_label(&self) -> String {
        match self.ports {
            Some(ports) => ports.to_string(),
            None => "ALL".to_string(),
        }
    }
}

/// Well-known TCP services that can be opened by name
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CommonService {
    Http,
    Https,
    Ssh,
    Rdp,
    Mysql,
    #[strum(to_string = "postgresql", serialize = "postgres")]
    Postgresql,
    #[strum(to_string = "mongodb", serialize = "mongo")]
    Mongodb,
    Redis,
}

impl CommonService {
    pub fn port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
            Self::Ssh => 22,
            Self::Rdp => 3389,
            Self::Mysql => 3306,
            Self::Postgresql => 5432,
            Self::Mongodb => 27017,
            Self::Redis => 6379,
        }
    }

    /// Name as used in rule descriptions
    pub fn label(self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
            Self::Ssh => "SSH",
            Self::Rdp => "RDP",
            Self::Mysql => "MySQL",
            Self::Postgresql => "PostgreSQL",
            Self::Mongodb => "MongoDB",
            Self::Redis => "Redis",
        }
    }
}
