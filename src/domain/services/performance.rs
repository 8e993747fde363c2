//! Performance aggregator
//!
//! Replays a robot's signal history into its derived statistics. The win
//! rate divides by the number of signals carrying realized profit data, not
//! by total trades: not every trade signal has a realized outcome yet. This
//! mirrors the upstream ledger semantics and is preserved deliberately.

use crate::domain::entities::robot::RobotPerformance;
use crate::domain::entities::signal::Signal;

/// Recompute performance from a robot's signal slice. Idempotent and
/// side-effect free; callers persist the result.
pub fn compute(signals: &[Signal]) -> RobotPerformance {
    let total_trades = signals.iter().filter(|s| s.action.is_trade()).count() as i64;

    let realized: Vec<f64> = signals.iter().filter_map(|s| s.profit_loss).collect();
    let wins = realized.iter().filter(|p| **p > 0.0).count();
    let win_rate = if realized.is_empty() {
        0.0
    } else {
        wins as f64 / realized.len() as f64 * 100.0
    };
    let profit = realized.iter().sum();

    RobotPerformance {
        total_trades,
        win_rate,
        profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::signal::{Signal, SignalAction, SignalSource};

    fn signal(action: SignalAction, profit_loss: Option<f64>) -> Signal {
        let mut s = Signal::pending("EURUSD", action, 0.1, SignalSource::External);
        s.profit_loss = profit_loss;
        s
    }

    #[test]
    fn test_close_signals_excluded_from_trade_count() {
        let signals = vec![
            signal(SignalAction::Buy, None),
            signal(SignalAction::Sell, None),
            signal(SignalAction::Close, Some(12.0)),
            signal(SignalAction::Close, Some(-3.0)),
        ];
        let perf = compute(&signals);
        assert_eq!(perf.total_trades, 2);
    }

    #[test]
    fn test_win_rate_over_signals_with_profit_data() {
        let signals = vec![
            signal(SignalAction::Buy, Some(10.0)),
            signal(SignalAction::Buy, Some(-5.0)),
            signal(SignalAction::Buy, None), // still open, excluded
            signal(SignalAction::Close, Some(7.5)),
        ];
        let perf = compute(&signals);
        // 2 wins out of 3 realized outcomes, not out of 3 trades.
        assert!((perf.win_rate - 66.66666666666667).abs() < 1e-9);
        assert!((perf.profit - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_ledger_is_zeroed() {
        let perf = compute(&[]);
        assert_eq!(perf, RobotPerformance::default());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let signals = vec![signal(SignalAction::Buy, Some(4.0))];
        assert_eq!(compute(&signals), compute(&signals));
    }
}
