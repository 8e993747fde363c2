//! Repositories for the signal ledger and robot configurations.

use sqlx::Row;
use tracing::{debug, error};
use uuid::Uuid;

use super::feed::{SignalEvent, SignalFeed};
use super::models::{RobotRecord, SignalRecord};
use super::{DatabaseError, DbPool};
use crate::domain::entities::robot::{Robot, RobotPerformance};
use crate::domain::entities::signal::{Signal, SignalStatus};

/// Signal ledger repository. Every insert and terminal update is published
/// on the feed.
#[derive(Clone)]
pub struct SignalRepository {
    pool: DbPool,
    feed: SignalFeed,
}

impl SignalRepository {
    pub fn new(pool: DbPool, feed: SignalFeed) -> Self {
        Self { pool, feed }
    }

    pub fn feed(&self) -> &SignalFeed {
        &self.feed
    }

    pub async fn insert(&self, signal: &Signal, account_scope: &str) -> Result<(), DatabaseError> {
        let record = SignalRecord::from_signal(signal, account_scope);
        sqlx::query(
            r#"
            INSERT INTO signals (
                id, symbol, action, volume, price, stop_loss, take_profit,
                ticket, bot_token, source, status, profit_loss, account_scope, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&record.id)
        .bind(&record.symbol)
        .bind(&record.action)
        .bind(record.volume)
        .bind(record.price)
        .bind(record.stop_loss)
        .bind(record.take_profit)
        .bind(record.ticket)
        .bind(&record.bot_token)
        .bind(&record.source)
        .bind(&record.status)
        .bind(record.profit_loss)
        .bind(&record.account_scope)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to insert signal {}: {}", record.id, e);
            DatabaseError::QueryError(format!("failed to insert signal: {}", e))
        })?;

        debug!("inserted signal {} ({})", record.id, record.symbol);
        self.feed.publish(SignalEvent::Inserted(signal.clone()));
        Ok(())
    }

    /// Apply the one-way terminal transition. Only pending signals move;
    /// a second attempt on the same signal is a `NotFound`.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: SignalStatus,
        profit_loss: Option<f64>,
    ) -> Result<Signal, DatabaseError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE signals
            SET status = ?1, profit_loss = COALESCE(?2, profit_loss)
            WHERE id = ?3 AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(profit_loss)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to update signal {}: {}", id, e);
            DatabaseError::QueryError(format!("failed to update signal: {}", e))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!(
                "pending signal {} not found",
                id
            )));
        }

        let signal = self
            .get(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("signal {} not found", id)))?;
        self.feed.publish(SignalEvent::Updated(signal.clone()));
        Ok(signal)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Signal>, DatabaseError> {
        let record = sqlx::query_as::<_, SignalRecord>("SELECT * FROM signals WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("failed to get signal: {}", e)))?;
        record.map(SignalRecord::into_signal).transpose()
    }

    pub async fn recent(
        &self,
        account_scope: &str,
        limit: i64,
    ) -> Result<Vec<Signal>, DatabaseError> {
        let records = sqlx::query_as::<_, SignalRecord>(
            r#"
            SELECT * FROM signals
            WHERE account_scope = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(account_scope)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("failed to get recent signals: {}", e)))?;
        records.into_iter().map(SignalRecord::into_signal).collect()
    }

    pub async fn by_bot_token(&self, bot_token: &str) -> Result<Vec<Signal>, DatabaseError> {
        let records = sqlx::query_as::<_, SignalRecord>(
            "SELECT * FROM signals WHERE bot_token = ?1 ORDER BY created_at ASC",
        )
        .bind(bot_token)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("failed to get signals by token: {}", e)))?;
        records.into_iter().map(SignalRecord::into_signal).collect()
    }
}

/// Robot configuration repository.
#[derive(Clone)]
pub struct RobotRepository {
    pool: DbPool,
}

impl RobotRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, robot: &Robot) -> Result<(), DatabaseError> {
        let record = RobotRecord::from_robot(robot);
        sqlx::query(
            r#"
            INSERT INTO robots (
                id, name, symbol, is_active, strategy, risk_level,
                max_lot_size, stop_loss_pips, take_profit_pips, bot_token,
                account_scope, total_trades, win_rate, profit, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.symbol)
        .bind(record.is_active)
        .bind(&record.strategy)
        .bind(&record.risk_level)
        .bind(record.max_lot_size)
        .bind(record.stop_loss_pips)
        .bind(record.take_profit_pips)
        .bind(&record.bot_token)
        .bind(&record.account_scope)
        .bind(record.total_trades)
        .bind(record.win_rate)
        .bind(record.profit)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to insert robot {}: {}", record.id, e);
            DatabaseError::QueryError(format!("failed to insert robot: {}", e))
        })?;

        debug!("inserted robot {} ({})", record.id, record.name);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Robot>, DatabaseError> {
        let record = sqlx::query_as::<_, RobotRecord>("SELECT * FROM robots WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("failed to get robot: {}", e)))?;
        record.map(RobotRecord::into_robot).transpose()
    }

    pub async fn list_for_scope(&self, account_scope: &str) -> Result<Vec<Robot>, DatabaseError> {
        let records = sqlx::query_as::<_, RobotRecord>(
            "SELECT * FROM robots WHERE account_scope = ?1 ORDER BY created_at ASC",
        )
        .bind(account_scope)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("failed to list robots: {}", e)))?;
        records.into_iter().map(RobotRecord::into_robot).collect()
    }

    /// Flip the active flag, returning the new value.
    pub async fn toggle(&self, id: &str) -> Result<bool, DatabaseError> {
        let row = sqlx::query(
            "UPDATE robots SET is_active = NOT is_active WHERE id = ?1 RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("failed to toggle robot: {}", e)))?
        .ok_or_else(|| DatabaseError::NotFound(format!("robot {} not found", id)))?;
        Ok(row.get("is_active"))
    }

    pub async fn update_performance(
        &self,
        id: &str,
        performance: &RobotPerformance,
    ) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            "UPDATE robots SET total_trades = ?1, win_rate = ?2, profit = ?3 WHERE id = ?4",
        )
        .bind(performance.total_trades)
        .bind(performance.win_rate)
        .bind(performance.profit)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("failed to update performance: {}", e)))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("robot {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM robots WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("failed to delete robot: {}", e)))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("robot {} not found", id)));
        }
        debug!("deleted robot {}", id);
        Ok(())
    }
}
