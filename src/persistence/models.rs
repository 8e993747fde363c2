//! Row models for the signal and robot tables, with conversions to and from
//! the domain entities. Enum columns are stored as lowercase TEXT backed by
//! CHECK constraints; a row that fails to parse is a data defect surfaced as
//! a `QueryError`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DatabaseError;
use crate::domain::entities::robot::{Robot, RobotPerformance};
use crate::domain::entities::signal::Signal;

#[derive(Debug, Clone, FromRow)]
pub struct SignalRecord {
    pub id: String,
    pub symbol: String,
    pub action: String,
    pub volume: f64,
    pub price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub ticket: Option<i64>,
    pub bot_token: Option<String>,
    pub source: String,
    pub status: String,
    pub profit_loss: Option<f64>,
    pub account_scope: String,
    pub created_at: DateTime<Utc>,
}

impl SignalRecord {
    pub fn from_signal(signal: &Signal, account_scope: &str) -> Self {
        SignalRecord {
            id: signal.id.to_string(),
            symbol: signal.symbol.clone(),
            action: signal.action.as_str().to_string(),
            volume: signal.volume,
            price: signal.price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            ticket: signal.ticket,
            bot_token: signal.bot_token.clone(),
            source: signal.source.as_str().to_string(),
            status: signal.status.as_str().to_string(),
            profit_loss: signal.profit_loss,
            account_scope: account_scope.to_string(),
            created_at: signal.timestamp,
        }
    }

    pub fn into_signal(self) -> Result<Signal, DatabaseError> {
        let bad_row = |field: &str, detail: String| {
            DatabaseError::QueryError(format!("signal row {}: bad {}: {}", self.id, field, detail))
        };
        Ok(Signal {
            id: Uuid::parse_str(&self.id).map_err(|e| bad_row("id", e.to_string()))?,
            symbol: self.symbol.clone(),
            action: self
                .action
                .parse()
                .map_err(|e: String| bad_row("action", e))?,
            volume: self.volume,
            price: self.price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            ticket: self.ticket,
            bot_token: self.bot_token.clone(),
            source: self
                .source
                .parse()
                .map_err(|e: String| bad_row("source", e))?,
            status: self
                .status
                .parse()
                .map_err(|e: String| bad_row("status", e))?,
            profit_loss: self.profit_loss,
            timestamp: self.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RobotRecord {
    pub id: String,
    pub name: String,
    pub symbol: Option<String>,
    pub is_active: bool,
    pub strategy: String,
    pub risk_level: String,
    pub max_lot_size: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    pub bot_token: String,
    pub account_scope: String,
    pub total_trades: i64,
    pub win_rate: f64,
    pub profit: f64,
    pub created_at: DateTime<Utc>,
}

impl RobotRecord {
    pub fn from_robot(robot: &Robot) -> Self {
        RobotRecord {
            id: robot.id.clone(),
            name: robot.name.clone(),
            symbol: robot.symbol.clone(),
            is_active: robot.is_active,
            strategy: robot.strategy.clone(),
            risk_level: robot.risk_level.as_str().to_string(),
            max_lot_size: robot.max_lot_size,
            stop_loss_pips: robot.stop_loss_pips,
            take_profit_pips: robot.take_profit_pips,
            bot_token: robot.bot_token.clone(),
            account_scope: robot.account_scope.clone(),
            total_trades: robot.performance.total_trades,
            win_rate: robot.performance.win_rate,
            profit: robot.performance.profit,
            created_at: Utc::now(),
        }
    }

    pub fn into_robot(self) -> Result<Robot, DatabaseError> {
        let risk_level = self.risk_level.parse().map_err(|e: String| {
            DatabaseError::QueryError(format!("robot row {}: bad risk_level: {}", self.id, e))
        })?;
        Ok(Robot {
            id: self.id,
            name: self.name,
            symbol: self.symbol,
            is_active: self.is_active,
            strategy: self.strategy,
            risk_level,
            max_lot_size: self.max_lot_size,
            stop_loss_pips: self.stop_loss_pips,
            take_profit_pips: self.take_profit_pips,
            bot_token: self.bot_token,
            account_scope: self.account_scope,
            performance: RobotPerformance {
                total_trades: self.total_trades,
                win_rate: self.win_rate,
                profit: self.profit,
            },
        })
    }
}
