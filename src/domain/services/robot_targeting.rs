//! Robot targeting resolver
//!
//! Selects the robot responsible for an inbound signal, in deterministic
//! priority order:
//!
//! 1. exact `bot_token` match (wins over everything, active or not);
//! 2. active robots whose symbol matches the signal's after normalization;
//! 3. active all-symbols robots (`symbol == None`) as fallback.
//!
//! No eligible robot is not a failure: execution proceeds without
//! performance attribution.

use crate::domain::entities::robot::Robot;
use crate::domain::entities::signal::Signal;
use crate::domain::services::symbol_resolver;

pub fn resolve<'a>(signal: &Signal, robots: &'a [Robot]) -> Option<&'a Robot> {
    if let Some(token) = &signal.bot_token {
        if let Some(robot) = robots.iter().find(|r| &r.bot_token == token) {
            return Some(robot);
        }
        // Unknown token falls through to symbol matching.
    }

    let mut all_symbols_fallback = None;
    for robot in robots.iter().filter(|r| r.is_active) {
        match &robot.symbol {
            Some(symbol) if symbol_resolver::symbols_match(symbol, &signal.symbol) => {
                return Some(robot);
            }
            None if all_symbols_fallback.is_none() => all_symbols_fallback = Some(robot),
            _ => {}
        }
    }
    all_symbols_fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::robot::{RiskLevel, RobotPerformance};
    use crate::domain::entities::signal::{SignalAction, SignalSource};

    fn robot(id: &str, symbol: Option<&str>, token: &str, active: bool) -> Robot {
        Robot {
            id: id.to_string(),
            name: id.to_string(),
            symbol: symbol.map(|s| s.to_string()),
            is_active: active,
            strategy: "trend".to_string(),
            risk_level: RiskLevel::Medium,
            max_lot_size: 1.0,
            stop_loss_pips: 20.0,
            take_profit_pips: 40.0,
            bot_token: token.to_string(),
            account_scope: "acct-1".to_string(),
            performance: RobotPerformance::default(),
        }
    }

    fn signal(symbol: &str, token: Option<&str>) -> Signal {
        let mut s = Signal::pending(symbol, SignalAction::Buy, 0.1, SignalSource::External);
        s.bot_token = token.map(|t| t.to_string());
        s
    }

    #[test]
    fn test_token_match_beats_symbol_match() {
        let robots = vec![
            robot("symbol-bot", Some("EURUSD"), "bot_eur", true),
            robot("token-bot", Some("GBPUSD"), "bot_abc", true),
        ];
        let selected = resolve(&signal("EURUSD", Some("bot_abc")), &robots).unwrap();
        assert_eq!(selected.id, "token-bot");
    }

    #[test]
    fn test_unknown_token_falls_through_to_symbol() {
        let robots = vec![robot("symbol-bot", Some("EURUSD"), "bot_eur", true)];
        let selected = resolve(&signal("EURUSD", Some("bot_missing")), &robots).unwrap();
        assert_eq!(selected.id, "symbol-bot");
    }

    #[test]
    fn test_symbol_specific_beats_all_symbols() {
        let robots = vec![
            robot("catch-all", None, "bot_all", true),
            robot("symbol-bot", Some("EURUSD"), "bot_eur", true),
        ];
        let selected = resolve(&signal("EURUSD", None), &robots).unwrap();
        assert_eq!(selected.id, "symbol-bot");
    }

    #[test]
    fn test_suffixed_signal_symbol_matches_unsuffixed_robot() {
        let robots = vec![robot("symbol-bot", Some("EURUSD"), "bot_eur", true)];
        let selected = resolve(&signal("EURUSD.raw", None), &robots).unwrap();
        assert_eq!(selected.id, "symbol-bot");
    }

    #[test]
    fn test_inactive_robots_skipped_for_symbol_match() {
        let robots = vec![
            robot("sleeping", Some("EURUSD"), "bot_eur", false),
            robot("catch-all", None, "bot_all", true),
        ];
        let selected = resolve(&signal("EURUSD", None), &robots).unwrap();
        assert_eq!(selected.id, "catch-all");
    }

    #[test]
    fn test_no_eligible_robot_is_none() {
        let robots = vec![robot("other", Some("GBPUSD"), "bot_gbp", true)];
        assert!(resolve(&signal("EURUSD", None), &robots).is_none());
    }
}
