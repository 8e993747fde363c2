//! Robot entity
//!
//! A robot is a named automated-trading configuration scoped to one broker
//! account and optionally one instrument. Its `performance` block is a
//! derived projection recomputed from the signal ledger, never the source
//! of truth.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// Derived trading statistics, replayed from the signal ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotPerformance {
    pub total_trades: i64,
    pub win_rate: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Robot {
    pub id: String,
    pub name: String,
    /// `None` means the robot handles all symbols.
    pub symbol: Option<String>,
    pub is_active: bool,
    pub strategy: String,
    pub risk_level: RiskLevel,
    pub max_lot_size: f64,
    /// Stop distance in pips applied to orders without an explicit stop.
    pub stop_loss_pips: f64,
    /// Target distance in pips applied to orders without an explicit target.
    pub take_profit_pips: f64,
    /// Unique opaque credential used by signals to target this robot.
    pub bot_token: String,
    /// The broker account session this robot belongs to. Robots from other
    /// scopes must never be addressable.
    pub account_scope: String,
    pub performance: RobotPerformance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_round_trip() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_performance_default_is_zeroed() {
        let perf = RobotPerformance::default();
        assert_eq!(perf.total_trades, 0);
        assert_eq!(perf.win_rate, 0.0);
        assert_eq!(perf.profit, 0.0);
    }
}
