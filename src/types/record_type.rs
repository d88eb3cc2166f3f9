//! DNS record type selection.
//!
//! A closed enum of the query types the scanner supports. Keeping this
//! closed (rather than passing raw strings through) means an unsupported
//! type is rejected at configuration time, before any network activity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Supported DNS record types for probe queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 host address.
    A,
    /// IPv6 host address.
    Aaaa,
    /// Mail exchange.
    Mx,
    /// Text record.
    Txt,
    /// Authoritative name server.
    Ns,
    /// Canonical name (alias).
    Cname,
    /// Start of authority.
    Soa,
    /// Reverse pointer.
    Ptr,
}

impl RecordType {
    /// The wire-format name of this record type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Cname => "CNAME",
            Self::Soa => "SOA",
            Self::Ptr => "PTR",
        }
    }
}

impl Default for RecordType {
    fn default() -> Self {
        Self::A
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "CNAME" => Ok(Self::Cname),
            "SOA" => Ok(Self::Soa),
            "PTR" => Ok(Self::Ptr),
            other => Err(ConfigError::UnsupportedRecordType(other.to_string())),
        }
    }
}
