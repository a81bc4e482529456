//! Caller identifiers

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Who is making a request.
///
/// The rendered form (`ip:..`, `fp:..`, `user:..`) is the storage key
/// suffix, so identifiers of different kinds never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identifier {
    /// Client address
    Ip(String),
    /// Browser fingerprint, possibly shared by several tabs
    Fingerprint(String),
    /// Authenticated user
    User(String),
    /// Already-rendered key used as is
    Raw(String),
}

impl Identifier {
    pub fn ip(value: impl Into<String>) -> Self {
        Self::Ip(value.into())
    }

    pub fn fingerprint(value: impl Into<String>) -> Self {
        Self::Fingerprint(value.into())
    }

    pub fn user(value: impl Into<String>) -> Self {
        Self::User(value.into())
    }

    /// Fingerprints skip burst checks: several legitimate tabs can share one
    pub fn skips_burst(&self) -> bool {
        matches!(self, Self::Fingerprint(_))
    }

    /// Parse a rendered identifier, falling back to [`Identifier::Raw`]
    pub fn parse(value: &str) -> Self {
        if let Some(rest) = value.strip_prefix("ip:") {
            Self::Ip(rest.to_string())
        } else if let Some(rest) = value.strip_prefix("fp:") {
            Self::Fingerprint(rest.to_string())
        } else if let Some(rest) = value.strip_prefix("user:") {
            Self::User(rest.to_string())
        } else {
            Self::Raw(value.to_string())
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(value) => write!(f, "ip:{}", value),
            Self::Fingerprint(value) => write!(f, "fp:{}", value),
            Self::User(value) => write!(f, "user:{}", value),
            Self::Raw(value) => f.write_str(value),
        }
    }
}

impl FromStr for Identifier {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(value))
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<&Identifier> for Identifier {
    fn from(value: &Identifier) -> Self {
        value.clone()
    }
}
