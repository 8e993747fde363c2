//! Signal entity
//!
//! A signal is a single trading intent, delivered either by an external
//! webhook or by interactive user action. Once persisted it is an immutable
//! ledger entry except for the one-way `Pending -> Executed | Failed`
//! transition applied by the execution engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the signal asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Close,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "buy",
            SignalAction::Sell => "sell",
            SignalAction::Close => "close",
        }
    }

    /// True for actions that open a position (counted as trades).
    pub fn is_trade(&self) -> bool {
        matches!(self, SignalAction::Buy | SignalAction::Sell)
    }
}

impl std::str::FromStr for SignalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(SignalAction::Buy),
            "sell" => Ok(SignalAction::Sell),
            "close" => Ok(SignalAction::Close),
            other => Err(format!("unknown signal action: {}", other)),
        }
    }
}

/// Where the intent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    External,
    Manual,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::External => "external",
            SignalSource::Manual => "manual",
        }
    }
}

impl std::str::FromStr for SignalSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "external" => Ok(SignalSource::External),
            "manual" => Ok(SignalSource::Manual),
            other => Err(format!("unknown signal source: {}", other)),
        }
    }
}

/// Execution status. Terminal states are never left once entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Pending,
    Executed,
    Failed,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Pending => "pending",
            SignalStatus::Executed => "executed",
            SignalStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SignalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(SignalStatus::Pending),
            "executed" => Ok(SignalStatus::Executed),
            "failed" => Ok(SignalStatus::Failed),
            other => Err(format!("unknown signal status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: Uuid,
    pub symbol: String,
    pub action: SignalAction,
    pub volume: f64,
    pub price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// Targets a specific position for `Close`.
    pub ticket: Option<i64>,
    /// Targets a specific robot for attribution.
    pub bot_token: Option<String>,
    pub source: SignalSource,
    pub status: SignalStatus,
    /// Realized result captured from the broker on close, when available.
    /// The sole input to performance aggregation.
    pub profit_loss: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// A fresh pending signal with a generated id.
    pub fn pending(
        symbol: impl Into<String>,
        action: SignalAction,
        volume: f64,
        source: SignalSource,
    ) -> Self {
        Signal {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            action,
            volume,
            price: None,
            stop_loss: None,
            take_profit: None,
            ticket: None,
            bot_token: None,
            source,
            status: SignalStatus::Pending,
            profit_loss: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = Some(token.into());
        self
    }

    pub fn with_ticket(mut self, ticket: i64) -> Self {
        self.ticket = Some(ticket);
        self
    }
}
