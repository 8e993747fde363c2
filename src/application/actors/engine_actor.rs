//! Engine Actor
//!
//! Single-writer actor owning the position cache, the account snapshot, the
//! robot list, and the recent-signal view. Every mutation flows through one
//! mailbox: user commands, webhook-driven signals, refresh ticks from the
//! scheduler, and ledger feed events. Serializing writers this way keeps an
//! optimistic removal from racing a concurrent full refresh without manual
//! locking.
//!
//! The broker is the source of truth. A full refresh replaces the position
//! cache wholesale and always wins over stale optimistic updates; the
//! optimistic path exists purely for latency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::actors::refresh_scheduler::RefreshScheduler;
use crate::domain::entities::account::{AccountClass, AccountInfo, Quote};
use crate::domain::entities::order::OrderRequest;
use crate::domain::entities::position::{Position, Side};
use crate::domain::entities::robot::{RiskLevel, Robot, RobotPerformance};
use crate::domain::entities::signal::{Signal, SignalAction, SignalStatus};
use crate::domain::errors::{BrokerError, EngineError};
use crate::domain::repositories::broker_session::BrokerSession;
use crate::domain::services::{calculator, performance, robot_targeting, symbol_resolver};
use crate::persistence::feed::SignalEvent;
use crate::persistence::repository::{RobotRepository, SignalRepository};

/// Mailbox capacity for the engine actor.
const ENGINE_CHANNEL_CAPACITY: usize = 128;

/// How many ledger entries the in-memory signal view keeps.
const RECENT_SIGNAL_LIMIT: i64 = 100;

/// User-supplied fields for a new robot. Token, id, and scope are assigned
/// by the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotSpec {
    pub name: String,
    pub symbol: Option<String>,
    pub strategy: String,
    pub risk_level: RiskLevel,
    pub max_lot_size: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
}

/// Engine counters exposed on the health surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub open_positions: usize,
    pub robots: usize,
    pub signals_executed: u64,
    pub signals_failed: u64,
    pub auto_refresh_running: bool,
    pub session_expired: bool,
}

/// Messages the engine actor accepts.
#[derive(Debug)]
pub enum EngineMessage {
    ExecuteSignal {
        signal: Signal,
        reply: mpsc::Sender<Result<Signal, EngineError>>,
    },
    ClosePosition {
        ticket: i64,
        reply: mpsc::Sender<Result<(), EngineError>>,
    },
    CloseAllPositions {
        reply: mpsc::Sender<Result<usize, EngineError>>,
    },
    GetQuote {
        symbol: String,
        reply: mpsc::Sender<Result<Option<Quote>, EngineError>>,
    },
    /// Fast-loop tick.
    RefreshPositions,
    /// Slow-loop tick.
    RefreshSignals,
    /// Immediate refresh with completion acknowledgement.
    RefreshNow {
        reply: mpsc::Sender<()>,
    },
    /// Ledger push feed event.
    LedgerEvent {
        event: SignalEvent,
    },
    GetPositions {
        reply: mpsc::Sender<Vec<Position>>,
    },
    GetAccountInfo {
        reply: mpsc::Sender<Option<AccountInfo>>,
    },
    GetSignals {
        reply: mpsc::Sender<Vec<Signal>>,
    },
    GetRobots {
        reply: mpsc::Sender<Vec<Robot>>,
    },
    GetStats {
        reply: mpsc::Sender<EngineStats>,
    },
    CreateRobot {
        spec: RobotSpec,
        reply: mpsc::Sender<Result<Robot, EngineError>>,
    },
    ToggleRobot {
        id: String,
        reply: mpsc::Sender<Result<bool, EngineError>>,
    },
    DeleteRobot {
        id: String,
        reply: mpsc::Sender<Result<(), EngineError>>,
    },
    StartAutoRefresh {
        reply: mpsc::Sender<()>,
    },
    StopAutoRefresh {
        reply: mpsc::Sender<()>,
    },
    Shutdown,
}

/// Static engine parameters.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub account_class: AccountClass,
    pub account_scope: String,
    pub fast_interval: Duration,
    pub slow_interval: Duration,
}

/// Engine Actor - see module docs.
pub struct EngineActor {
    broker: Arc<dyn BrokerSession>,
    signals: SignalRepository,
    robots_repo: RobotRepository,
    settings: EngineSettings,
    scheduler: RefreshScheduler,
    positions: HashMap<i64, Position>,
    account_info: Option<AccountInfo>,
    robots: Vec<Robot>,
    recent_signals: Vec<Signal>,
    session_expired: bool,
    signals_executed: u64,
    signals_failed: u64,
}

impl EngineActor {
    /// Spawn the actor plus the ledger feed bridge. Returns the handle used
    /// by the HTTP boundary and tests.
    pub fn spawn(
        broker: Arc<dyn BrokerSession>,
        signals: SignalRepository,
        robots_repo: RobotRepository,
        settings: EngineSettings,
    ) -> EngineHandle {
        let (tx, rx) = mpsc::channel(ENGINE_CHANNEL_CAPACITY);

        let mut feed_rx = signals.feed().subscribe();
        let feed_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match feed_rx.recv().await {
                    Ok(event) => {
                        if feed_tx.send(EngineMessage::LedgerEvent { event }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // The slow loop re-reads the ledger; dropped events heal there.
                        warn!(skipped, "signal feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let scheduler = RefreshScheduler::new(
            tx.clone(),
            settings.fast_interval,
            settings.slow_interval,
        );
        let actor = Self {
            broker,
            signals,
            robots_repo,
            settings,
            scheduler,
            positions: HashMap::new(),
            account_info: None,
            robots: Vec::new(),
            recent_signals: Vec::new(),
            session_expired: false,
            signals_executed: 0,
            signals_failed: 0,
        };

        tokio::spawn(async move {
            actor.run(rx).await;
        });

        info!("EngineActor spawned");
        EngineHandle { tx }
    }

    /// Main actor loop.
    async fn run(mut self, mut rx: mpsc::Receiver<EngineMessage>) {
        info!(scope = %self.settings.account_scope, "EngineActor started");
        self.bootstrap().await;

        while let Some(msg) = rx.recv().await {
            match msg {
                EngineMessage::ExecuteSignal { signal, reply } => {
                    let result = self.execute_signal(signal).await;
                    if let Err(e) = reply.send(result).await {
                        error!("failed to send ExecuteSignal reply: {:?}", e);
                    }
                }
                EngineMessage::ClosePosition { ticket, reply } => {
                    let result = self.close_position_command(ticket).await;
                    if let Err(e) = reply.send(result).await {
                        error!("failed to send ClosePosition reply: {:?}", e);
                    }
                }
                EngineMessage::CloseAllPositions { reply } => {
                    let result = self.close_all_command().await;
                    if let Err(e) = reply.send(result).await {
                        error!("failed to send CloseAllPositions reply: {:?}", e);
                    }
                }
                EngineMessage::GetQuote { symbol, reply } => {
                    let result = self.quote_command(&symbol).await;
                    let _ = reply.send(result).await;
                }
                EngineMessage::RefreshPositions => {
                    self.full_refresh().await;
                    self.refresh_active_robot_performance().await;
                }
                EngineMessage::RefreshSignals => {
                    self.refresh_signal_ledger().await;
                }
                EngineMessage::RefreshNow { reply } => {
                    self.full_refresh().await;
                    self.refresh_signal_ledger().await;
                    let _ = reply.send(()).await;
                }
                EngineMessage::LedgerEvent { event } => {
                    self.apply_ledger_event(event).await;
                }
                EngineMessage::GetPositions { reply } => {
                    let mut positions: Vec<Position> = self.positions.values().cloned().collect();
                    positions.sort_by_key(|p| p.ticket);
                    let _ = reply.send(positions).await;
                }
                EngineMessage::GetAccountInfo { reply } => {
                    let _ = reply.send(self.account_info.clone()).await;
                }
                EngineMessage::GetSignals { reply } => {
                    let _ = reply.send(self.recent_signals.clone()).await;
                }
                EngineMessage::GetRobots { reply } => {
                    let _ = reply.send(self.robots.clone()).await;
                }
                EngineMessage::GetStats { reply } => {
                    let _ = reply.send(self.stats()).await;
                }
                EngineMessage::CreateRobot { spec, reply } => {
                    let result = self.create_robot(spec).await;
                    let _ = reply.send(result).await;
                }
                EngineMessage::ToggleRobot { id, reply } => {
                    let result = self.toggle_robot(&id).await;
                    let _ = reply.send(result).await;
                }
                EngineMessage::DeleteRobot { id, reply } => {
                    let result = self.delete_robot(&id).await;
                    let _ = reply.send(result).await;
                }
                EngineMessage::StartAutoRefresh { reply } => {
                    self.scheduler.start();
                    let _ = reply.send(()).await;
                }
                EngineMessage::StopAutoRefresh { reply } => {
                    self.scheduler.stop();
                    let _ = reply.send(()).await;
                }
                EngineMessage::Shutdown => {
                    info!("EngineActor received shutdown signal");
                    self.scheduler.stop();
                    break;
                }
            }
        }

        info!("EngineActor stopped");
    }

    async fn bootstrap(&mut self) {
        match self.robots_repo.list_for_scope(&self.settings.account_scope).await {
            Ok(robots) => {
                info!(count = robots.len(), "loaded robots");
                self.robots = robots;
            }
            Err(e) => warn!("failed to load robots: {}", e),
        }
        self.refresh_signal_ledger().await;
        self.full_refresh().await;
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            open_positions: self.positions.len(),
            robots: self.robots.len(),
            signals_executed: self.signals_executed,
            signals_failed: self.signals_failed,
            auto_refresh_running: self.scheduler.is_running(),
            session_expired: self.session_expired,
        }
    }

    // ----- signal execution -----

    /// Full lifecycle of a trading intent: persist pending, validate,
    /// resolve robot and symbol, submit, persist terminal status, refresh,
    /// recompute performance.
    async fn execute_signal(&mut self, signal: Signal) -> Result<Signal, EngineError> {
        if self.session_expired {
            return Err(BrokerError::AuthExpired.into());
        }

        self.signals.insert(&signal, &self.settings.account_scope).await?;
        info!(id = %signal.id, symbol = %signal.symbol, action = signal.action.as_str(), "signal accepted");

        if signal.action.is_trade() && signal.volume <= 0.0 {
            self.signals_failed += 1;
            if let Err(e) = self.signals.set_status(signal.id, SignalStatus::Failed, None).await {
                error!("failed to record signal failure: {}", e);
            }
            return Err(EngineError::Validation(format!(
                "volume must be positive, got {}",
                signal.volume
            )));
        }

        let robot = robot_targeting::resolve(&signal, &self.robots).cloned();
        if let Some(robot) = &robot {
            debug!(id = %signal.id, robot = %robot.name, "signal routed to robot");
        }

        let outcome = match signal.action {
            SignalAction::Close => self.execute_close(&signal).await,
            SignalAction::Buy | SignalAction::Sell => {
                self.execute_open(&signal, robot.as_ref()).await
            }
        };

        match outcome {
            Ok(profit) => {
                let updated = self
                    .signals
                    .set_status(signal.id, SignalStatus::Executed, profit)
                    .await?;
                self.signals_executed += 1;
                self.full_refresh().await;
                if let Some(robot) = robot {
                    self.recompute_performance(&robot.id, &robot.bot_token).await;
                }
                Ok(updated)
            }
            Err(e) if e.is_auth_expired() => {
                // The signal stays pending; re-authentication is the outer
                // session flow's job, and a retried signal must not be
                // double-failed here.
                self.expire_session().await;
                Err(e)
            }
            Err(e) => {
                self.signals_failed += 1;
                if let Err(db) = self.signals.set_status(signal.id, SignalStatus::Failed, None).await {
                    error!("failed to record signal failure: {}", db);
                }
                Err(e)
            }
        }
    }

    async fn execute_open(
        &mut self,
        signal: &Signal,
        robot: Option<&Robot>,
    ) -> Result<Option<f64>, EngineError> {
        let side = match signal.action {
            SignalAction::Buy => Side::Buy,
            SignalAction::Sell => Side::Sell,
            SignalAction::Close => {
                return Err(EngineError::Validation(
                    "close signal routed to order path".to_string(),
                ))
            }
        };
        let broker_symbol =
            symbol_resolver::to_broker_symbol(&signal.symbol, self.settings.account_class);

        let mut volume = signal.volume;
        if let Some(robot) = robot {
            if robot.max_lot_size > 0.0 && volume > robot.max_lot_size {
                debug!(
                    requested = volume,
                    cap = robot.max_lot_size,
                    "volume capped by robot lot limit"
                );
                volume = robot.max_lot_size;
            }
        }

        let mut request = OrderRequest {
            symbol: broker_symbol,
            side,
            volume,
            price: signal.price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
        };
        if let Some(robot) = robot {
            self.apply_robot_stops(&mut request, robot).await;
        }

        let result = self.broker.send_order(&request).await?;
        info!(symbol = %request.symbol, side = %side, volume, "order accepted");
        Ok(result.profit)
    }

    /// Derive stop/target prices from the robot's pip distances when the
    /// signal carries none. A missing quote leaves the order bare.
    async fn apply_robot_stops(&self, request: &mut OrderRequest, robot: &Robot) {
        let need_stop = request.stop_loss.is_none() && robot.stop_loss_pips > 0.0;
        let need_target = request.take_profit.is_none() && robot.take_profit_pips > 0.0;
        if !need_stop && !need_target {
            return;
        }
        let quote = match self.broker.quote(&request.symbol).await {
            Ok(Some(quote)) => quote,
            Ok(None) => return,
            Err(e) => {
                debug!(symbol = %request.symbol, "quote unavailable: {}", e);
                return;
            }
        };
        let pip = calculator::pip_value(&request.symbol);
        let (entry, direction) = match request.side {
            Side::Buy => (quote.ask, 1.0),
            Side::Sell => (quote.bid, -1.0),
        };
        if need_stop {
            request.stop_loss = Some(entry - direction * robot.stop_loss_pips * pip);
        }
        if need_target {
            request.take_profit = Some(entry + direction * robot.take_profit_pips * pip);
        }
    }

    async fn execute_close(&mut self, signal: &Signal) -> Result<Option<f64>, EngineError> {
        if let Some(ticket) = signal.ticket {
            return self.close_ticket(ticket).await;
        }

        let broker_symbol =
            symbol_resolver::to_broker_symbol(&signal.symbol, self.settings.account_class);
        let targets: Vec<i64> = self
            .positions
            .values()
            .filter(|p| symbol_resolver::symbols_match(&p.symbol, &broker_symbol))
            .map(|p| p.ticket)
            .collect();
        if targets.is_empty() {
            // Nothing open for the symbol; a racing close already finished
            // the job. Idempotent success.
            debug!(symbol = %signal.symbol, "close signal with no matching positions");
            return Ok(None);
        }

        let mut closed = 0usize;
        let mut realized: Option<f64> = None;
        let mut last_err: Option<EngineError> = None;
        for ticket in targets {
            match self.close_ticket(ticket).await {
                Ok(profit) => {
                    closed += 1;
                    if let Some(p) = profit {
                        *realized.get_or_insert(0.0) += p;
                    }
                }
                Err(e) if e.is_auth_expired() => return Err(e),
                Err(e) => {
                    warn!(ticket, "close failed: {}", e);
                    last_err = Some(e);
                }
            }
        }
        if closed > 0 {
            Ok(realized)
        } else {
            Err(last_err
                .unwrap_or_else(|| EngineError::Validation("no positions closed".to_string())))
        }
    }

    // ----- position cache & reconciliation -----

    /// Targeted close with existence verification.
    ///
    /// The ticket is removed optimistically so the exposed view reflects the
    /// intent immediately; the broker's live list then decides what really
    /// happens. Absent ticket is idempotent success with no close RPC. Any
    /// failure forces a full resync so the optimistic removal is never left
    /// unresolved.
    async fn close_ticket(&mut self, ticket: i64) -> Result<Option<f64>, EngineError> {
        self.positions.remove(&ticket);

        let open = match self.broker.open_positions().await {
            Ok(open) => open,
            Err(e) => {
                self.full_refresh().await;
                return Err(e.into());
            }
        };
        if !open.iter().any(|p| p.ticket == ticket) {
            debug!(ticket, "already closed on broker");
            return Ok(None);
        }

        match self.broker.close_position(ticket, None).await {
            Ok(result) => {
                info!(ticket, "position closed");
                Ok(result.profit)
            }
            // Raced a manual close between the check and the call.
            Err(BrokerError::NotFound) => Ok(None),
            Err(e) => {
                self.full_refresh().await;
                Err(e.into())
            }
        }
    }

    async fn close_position_command(&mut self, ticket: i64) -> Result<(), EngineError> {
        if self.session_expired {
            return Err(BrokerError::AuthExpired.into());
        }
        match self.close_ticket(ticket).await {
            Ok(_) => {
                self.full_refresh().await;
                Ok(())
            }
            Err(e) => {
                if e.is_auth_expired() {
                    self.expire_session().await;
                }
                Err(e)
            }
        }
    }

    async fn close_all_command(&mut self) -> Result<usize, EngineError> {
        if self.session_expired {
            return Err(BrokerError::AuthExpired.into());
        }
        let tickets: Vec<i64> = self.positions.keys().copied().collect();
        let mut closed = 0usize;
        for ticket in tickets {
            match self.close_ticket(ticket).await {
                Ok(_) => closed += 1,
                Err(e) if e.is_auth_expired() => {
                    self.expire_session().await;
                    return Err(e);
                }
                Err(e) => warn!(ticket, "close-all: {}", e),
            }
        }
        self.full_refresh().await;
        Ok(closed)
    }

    async fn quote_command(&mut self, symbol: &str) -> Result<Option<Quote>, EngineError> {
        let broker_symbol = symbol_resolver::to_broker_symbol(symbol, self.settings.account_class);
        match self.broker.quote(&broker_symbol).await {
            Ok(quote) => Ok(quote),
            Err(BrokerError::AuthExpired) => {
                self.expire_session().await;
                Err(BrokerError::AuthExpired.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wholesale cache replacement from the broker's authoritative state.
    /// Tickets no longer reported are silently dropped. Transient failures
    /// are logged and swallowed; the next tick retries.
    async fn full_refresh(&mut self) {
        if self.session_expired {
            return;
        }
        match self.broker.open_positions().await {
            Ok(open) => {
                self.positions = open.into_iter().map(|p| (p.ticket, p)).collect();
            }
            Err(BrokerError::AuthExpired) => {
                self.expire_session().await;
                return;
            }
            Err(e) => warn!("position refresh failed: {}", e),
        }
        match self.broker.account_info().await {
            Ok(info) => self.account_info = Some(info),
            Err(BrokerError::AuthExpired) => self.expire_session().await,
            Err(e) => warn!("account refresh failed: {}", e),
        }
    }

    async fn refresh_signal_ledger(&mut self) {
        match self
            .signals
            .recent(&self.settings.account_scope, RECENT_SIGNAL_LIMIT)
            .await
        {
            Ok(signals) => self.recent_signals = signals,
            Err(e) => warn!("signal ledger refresh failed: {}", e),
        }
    }

    async fn apply_ledger_event(&mut self, event: SignalEvent) {
        let signal = match event {
            SignalEvent::Inserted(signal) | SignalEvent::Updated(signal) => signal,
        };
        match self.recent_signals.iter_mut().find(|s| s.id == signal.id) {
            Some(existing) => *existing = signal.clone(),
            None => self.recent_signals.insert(0, signal.clone()),
        }
        self.recent_signals.truncate(RECENT_SIGNAL_LIMIT as usize);

        if let Some(token) = signal.bot_token {
            let target = self
                .robots
                .iter()
                .find(|r| r.bot_token == token)
                .map(|r| (r.id.clone(), r.bot_token.clone()));
            if let Some((id, token)) = target {
                self.recompute_performance(&id, &token).await;
            }
        }
    }

    /// One-time teardown on session expiry: stop both loops, drop cached
    /// broker state, clear the token. Later observations are no-ops.
    async fn expire_session(&mut self) {
        if self.session_expired {
            return;
        }
        self.session_expired = true;
        self.scheduler.stop();
        self.positions.clear();
        self.account_info = None;
        self.broker.disconnect().await;
        warn!("broker session expired; auto refresh stopped and caches cleared");
    }

    // ----- robots & performance -----

    async fn refresh_active_robot_performance(&mut self) {
        let targets: Vec<(String, String)> = self
            .robots
            .iter()
            .filter(|r| r.is_active)
            .map(|r| (r.id.clone(), r.bot_token.clone()))
            .collect();
        for (id, token) in targets {
            self.recompute_performance(&id, &token).await;
        }
    }

    async fn recompute_performance(&mut self, robot_id: &str, bot_token: &str) {
        let history = match self.signals.by_bot_token(bot_token).await {
            Ok(history) => history,
            Err(e) => {
                warn!(robot_id, "performance fetch failed: {}", e);
                return;
            }
        };
        let perf = performance::compute(&history);
        let changed = match self.robots.iter_mut().find(|r| r.id == robot_id) {
            Some(robot) if robot.performance != perf => {
                robot.performance = perf;
                true
            }
            Some(_) => false,
            None => return,
        };
        if changed {
            if let Err(e) = self.robots_repo.update_performance(robot_id, &perf).await {
                warn!(robot_id, "performance persist failed: {}", e);
            }
        }
    }

    async fn create_robot(&mut self, spec: RobotSpec) -> Result<Robot, EngineError> {
        if spec.name.trim().is_empty() {
            return Err(EngineError::Validation("robot name must not be empty".to_string()));
        }
        if spec.max_lot_size <= 0.0 {
            return Err(EngineError::Validation(format!(
                "max lot size must be positive, got {}",
                spec.max_lot_size
            )));
        }
        let robot = Robot {
            id: Uuid::new_v4().to_string(),
            name: spec.name,
            symbol: spec.symbol.map(|s| symbol_resolver::normalize(&s)),
            is_active: true,
            strategy: spec.strategy,
            risk_level: spec.risk_level,
            max_lot_size: spec.max_lot_size,
            stop_loss_pips: spec.stop_loss_pips,
            take_profit_pips: spec.take_profit_pips,
            bot_token: format!("bot_{}", Uuid::new_v4().simple()),
            account_scope: self.settings.account_scope.clone(),
            performance: RobotPerformance::default(),
        };
        self.robots_repo.insert(&robot).await?;
        self.robots.push(robot.clone());
        info!(robot = %robot.name, "robot created");
        Ok(robot)
    }

    /// Robots outside this actor's account scope are never addressable: the
    /// in-memory list is the scope boundary.
    async fn toggle_robot(&mut self, id: &str) -> Result<bool, EngineError> {
        if !self.robots.iter().any(|r| r.id == id) {
            return Err(EngineError::RobotNotFound(id.to_string()));
        }
        let active = self.robots_repo.toggle(id).await?;
        if let Some(robot) = self.robots.iter_mut().find(|r| r.id == id) {
            robot.is_active = active;
        }
        info!(robot_id = id, active, "robot toggled");
        Ok(active)
    }

    async fn delete_robot(&mut self, id: &str) -> Result<(), EngineError> {
        if !self.robots.iter().any(|r| r.id == id) {
            return Err(EngineError::RobotNotFound(id.to_string()));
        }
        self.robots_repo.delete(id).await?;
        self.robots.retain(|r| r.id != id);
        info!(robot_id = id, "robot deleted");
        Ok(())
    }
}

/// Cloneable handle to the engine actor, used by the HTTP boundary and
/// tests. Each call is a message round-trip over the mailbox.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<T>) -> EngineMessage,
    ) -> Result<T, EngineError> {
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        self.tx.send(build(reply_tx)).await?;
        reply_rx
            .recv()
            .await
            .ok_or_else(|| EngineError::ChannelClosed("no reply from engine".to_string()))
    }

    pub async fn execute_signal(&self, signal: Signal) -> Result<Signal, EngineError> {
        self.request(|reply| EngineMessage::ExecuteSignal { signal, reply })
            .await?
    }

    pub async fn close_position(&self, ticket: i64) -> Result<(), EngineError> {
        self.request(|reply| EngineMessage::ClosePosition { ticket, reply })
            .await?
    }

    pub async fn close_all_positions(&self) -> Result<usize, EngineError> {
        self.request(|reply| EngineMessage::CloseAllPositions { reply })
            .await?
    }

    pub async fn quote(&self, symbol: String) -> Result<Option<Quote>, EngineError> {
        self.request(|reply| EngineMessage::GetQuote { symbol, reply })
            .await?
    }

    pub async fn positions(&self) -> Result<Vec<Position>, EngineError> {
        self.request(|reply| EngineMessage::GetPositions { reply }).await
    }

    pub async fn account_info(&self) -> Result<Option<AccountInfo>, EngineError> {
        self.request(|reply| EngineMessage::GetAccountInfo { reply }).await
    }

    pub async fn signals(&self) -> Result<Vec<Signal>, EngineError> {
        self.request(|reply| EngineMessage::GetSignals { reply }).await
    }

    pub async fn robots(&self) -> Result<Vec<Robot>, EngineError> {
        self.request(|reply| EngineMessage::GetRobots { reply }).await
    }

    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        self.request(|reply| EngineMessage::GetStats { reply }).await
    }

    pub async fn create_robot(&self, spec: RobotSpec) -> Result<Robot, EngineError> {
        self.request(|reply| EngineMessage::CreateRobot { spec, reply })
            .await?
    }

    pub async fn toggle_robot(&self, id: String) -> Result<bool, EngineError> {
        self.request(|reply| EngineMessage::ToggleRobot { id, reply })
            .await?
    }

    pub async fn delete_robot(&self, id: String) -> Result<(), EngineError> {
        self.request(|reply| EngineMessage::DeleteRobot { id, reply })
            .await?
    }

    pub async fn start_auto_refresh(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineMessage::StartAutoRefresh { reply }).await
    }

    pub async fn stop_auto_refresh(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineMessage::StopAutoRefresh { reply }).await
    }

    /// Immediate positions + account + ledger refresh, acknowledged.
    pub async fn refresh_now(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineMessage::RefreshNow { reply }).await
    }

    /// Fire-and-forget; the actor stops its loops and exits.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(EngineMessage::Shutdown).await;
    }
}
