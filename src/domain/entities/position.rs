use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an open position as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// An open position reported by the broker session.
///
/// The local copy is ephemeral: it must always be treatable as disposable and
/// rebuildable from the broker's open-position list. A ticket that the broker
/// no longer reports is gone, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Broker-assigned unique identifier.
    pub ticket: i64,
    pub symbol: String,
    pub side: Side,
    pub volume: f64,
    pub open_price: f64,
    pub current_price: f64,
    pub profit: f64,
    pub swap: f64,
    pub commission: f64,
    pub open_time: DateTime<Utc>,
    #[serde(default)]
    pub comment: String,
}

impl Position {
    /// Floating profit including financing and commission charges.
    pub fn net_profit(&self) -> f64 {
        self.profit + self.swap + self.commission
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Position {
        Position {
            ticket: 1001,
            symbol: "EURUSD".to_string(),
            side: Side::Buy,
            volume: 0.10,
            open_price: 1.0850,
            current_price: 1.0862,
            profit: 12.0,
            swap: -0.4,
            commission: -0.6,
            open_time: Utc::now(),
            comment: String::new(),
        }
    }

    #[test]
    fn test_net_profit_includes_swap_and_commission() {
        let position = sample();
        assert!((position.net_profit() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(Side::Sell.to_string(), "SELL");
    }
}
