//! Account session types
//!
//! One broker session is live per user context. The account class governs
//! symbol resolution (proprietary/funded accounts trade the raw-feed symbol
//! variants) and robot scoping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broker account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    Demo,
    Live,
    Prop,
}

impl AccountClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountClass::Demo => "demo",
            AccountClass::Live => "live",
            AccountClass::Prop => "prop",
        }
    }
}

impl std::str::FromStr for AccountClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "demo" => Ok(AccountClass::Demo),
            "live" => Ok(AccountClass::Live),
            "prop" | "funded" => Ok(AccountClass::Prop),
            other => Err(format!("unknown account class: {}", other)),
        }
    }
}

/// Opaque bearer credential for one broker session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never log the raw credential.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"<REDACTED>").finish()
    }
}

/// Account snapshot from the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_number: String,
    pub server: String,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
    pub currency: String,
}

/// A two-sided price snapshot. Quote failure is non-fatal to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
    pub time: DateTime<Utc>,
}
