//! Order request/result types exchanged with the broker session.

use serde::{Deserialize, Serialize};

use super::position::Side;

/// Retcode the broker reports for an accepted order.
pub const ORDER_DONE: i32 = 0;

/// A market order submission. `price` is advisory; the broker fills at
/// market when it is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub volume: f64,
    pub price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: Side, volume: f64) -> Self {
        OrderRequest {
            symbol: symbol.into(),
            side,
            volume,
            price: None,
            stop_loss: None,
            take_profit: None,
        }
    }
}

/// Outcome of an order or close call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    /// Realized profit, reported by the broker on position closes.
    pub profit: Option<f64>,
}

impl OrderResult {
    pub fn is_success(&self) -> bool {
        self.code == ORDER_DONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_result_success() {
        let ok = OrderResult { code: ORDER_DONE, message: String::new(), profit: None };
        assert!(ok.is_success());
        let rejected = OrderResult { code: 134, message: "not enough money".into(), profit: None };
        assert!(!rejected.is_success());
    }
}
