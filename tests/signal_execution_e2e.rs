//! End-to-end engine tests against a scripted broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use tradedesk::application::actors::engine_actor::{EngineActor, EngineHandle, EngineSettings};
use tradedesk::domain::entities::account::{AccountClass, AccountInfo, Quote, SessionToken};
use tradedesk::domain::entities::order::{OrderRequest, OrderResult, ORDER_DONE};
use tradedesk::domain::entities::position::{Position, Side};
use tradedesk::domain::entities::robot::{RiskLevel, Robot, RobotPerformance};
use tradedesk::domain::entities::signal::{Signal, SignalAction, SignalSource, SignalStatus};
use tradedesk::domain::errors::BrokerError;
use tradedesk::domain::repositories::broker_session::{BrokerResult, BrokerSession};
use tradedesk::persistence::feed::SignalFeed;
use tradedesk::persistence::init_database;
use tradedesk::persistence::repository::{RobotRepository, SignalRepository};

const SCOPE: &str = "10001@Test-Server";

/// Scripted broker. Positions are mutated by close calls the way the real
/// server would; `expired` makes every call fail with `AuthExpired`.
struct MockBroker {
    positions: Mutex<Vec<Position>>,
    orders: Mutex<Vec<OrderRequest>>,
    closes: Mutex<Vec<i64>>,
    reject_orders: AtomicBool,
    expired: AtomicBool,
    disconnected: AtomicBool,
}

impl MockBroker {
    fn new(positions: Vec<Position>) -> Arc<Self> {
        Arc::new(Self {
            positions: Mutex::new(positions),
            orders: Mutex::new(Vec::new()),
            closes: Mutex::new(Vec::new()),
            reject_orders: AtomicBool::new(false),
            expired: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        })
    }

    fn guard(&self) -> BrokerResult<()> {
        if self.expired.load(Ordering::SeqCst) {
            Err(BrokerError::AuthExpired)
        } else {
            Ok(())
        }
    }

    fn recorded_orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    fn recorded_closes(&self) -> Vec<i64> {
        self.closes.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerSession for MockBroker {
    async fn connect(&self, _: &str, _: &str, _: &str) -> BrokerResult<SessionToken> {
        Ok(SessionToken("mock-token".to_string()))
    }

    async fn account_info(&self) -> BrokerResult<AccountInfo> {
        self.guard()?;
        Ok(AccountInfo {
            account_number: "10001".to_string(),
            server: "Test-Server".to_string(),
            balance: 10_000.0,
            equity: 10_050.0,
            margin: 120.0,
            free_margin: 9_930.0,
            currency: "USD".to_string(),
        })
    }

    async fn open_positions(&self) -> BrokerResult<Vec<Position>> {
        self.guard()?;
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn quote(&self, _symbol: &str) -> BrokerResult<Option<Quote>> {
        self.guard()?;
        Ok(Some(Quote {
            bid: 1.0848,
            ask: 1.0850,
            time: Utc::now(),
        }))
    }

    async fn send_order(&self, request: &OrderRequest) -> BrokerResult<OrderResult> {
        self.guard()?;
        self.orders.lock().unwrap().push(request.clone());
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(BrokerError::Rejected {
                code: 134,
                message: "not enough money".to_string(),
            });
        }
        Ok(OrderResult {
            code: ORDER_DONE,
            message: String::new(),
            profit: None,
        })
    }

    async fn close_position(&self, ticket: i64, _volume: Option<f64>) -> BrokerResult<OrderResult> {
        self.guard()?;
        self.closes.lock().unwrap().push(ticket);
        let mut positions = self.positions.lock().unwrap();
        let before = positions.len();
        positions.retain(|p| p.ticket != ticket);
        if positions.len() == before {
            return Err(BrokerError::NotFound);
        }
        Ok(OrderResult {
            code: ORDER_DONE,
            message: String::new(),
            profit: Some(15.0),
        })
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

fn open_position(ticket: i64, symbol: &str) -> Position {
    Position {
        ticket,
        symbol: symbol.to_string(),
        side: Side::Buy,
        volume: 0.10,
        open_price: 1.0850,
        current_price: 1.0862,
        profit: 12.0,
        swap: 0.0,
        commission: 0.0,
        open_time: Utc::now(),
        comment: String::new(),
    }
}

fn robot(token: &str, symbol: Option<&str>) -> Robot {
    Robot {
        id: format!("robot-{}", token),
        name: "Trend follower".to_string(),
        symbol: symbol.map(str::to_string),
        is_active: true,
        strategy: "trend".to_string(),
        risk_level: RiskLevel::Medium,
        max_lot_size: 0.5,
        stop_loss_pips: 0.0,
        take_profit_pips: 0.0,
        bot_token: token.to_string(),
        account_scope: SCOPE.to_string(),
        performance: RobotPerformance::default(),
    }
}

struct Harness {
    engine: EngineHandle,
    broker: Arc<MockBroker>,
    signals: SignalRepository,
}

async fn start(broker: Arc<MockBroker>, robots: Vec<Robot>, class: AccountClass) -> Harness {
    let pool = init_database("sqlite::memory:").await.unwrap();
    let signals = SignalRepository::new(pool.clone(), SignalFeed::default());
    let robots_repo = RobotRepository::new(pool);
    for robot in &robots {
        robots_repo.insert(robot).await.unwrap();
    }

    let session: Arc<dyn BrokerSession> = broker.clone();
    let engine = EngineActor::spawn(
        session,
        signals.clone(),
        robots_repo,
        EngineSettings {
            account_class: class,
            account_scope: SCOPE.to_string(),
            fast_interval: Duration::from_secs(3600),
            slow_interval: Duration::from_secs(3600),
        },
    );
    // Bootstrap runs before the first message is handled, so this ack means
    // robots and caches are loaded.
    engine.refresh_now().await.unwrap();
    Harness {
        engine,
        broker,
        signals,
    }
}

#[tokio::test]
async fn test_prop_account_buy_uses_raw_symbol_and_executes() {
    let broker = MockBroker::new(vec![]);
    let h = start(broker, vec![robot("bot_alpha", Some("EURUSD"))], AccountClass::Prop).await;

    let signal = Signal::pending("EURUSD", SignalAction::Buy, 0.10, SignalSource::External)
        .with_bot_token("bot_alpha");
    let executed = h.engine.execute_signal(signal).await.unwrap();
    assert_eq!(executed.status, SignalStatus::Executed);

    let orders = h.broker.recorded_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].symbol, "EURUSD.raw");
    assert_eq!(orders[0].side, Side::Buy);
    assert!((orders[0].volume - 0.10).abs() < 1e-9);

    // Attribution lands on the targeted robot's derived stats.
    let robots = h.engine.robots().await.unwrap();
    assert_eq!(robots[0].performance.total_trades, 1);
}

#[tokio::test]
async fn test_robot_lot_cap_applies() {
    let broker = MockBroker::new(vec![]);
    let h = start(broker, vec![robot("bot_alpha", Some("EURUSD"))], AccountClass::Demo).await;

    let signal = Signal::pending("EURUSD", SignalAction::Buy, 2.0, SignalSource::External)
        .with_bot_token("bot_alpha");
    h.engine.execute_signal(signal).await.unwrap();

    let orders = h.broker.recorded_orders();
    assert!((orders[0].volume - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_close_of_absent_ticket_is_idempotent_success() {
    let broker = MockBroker::new(vec![open_position(1001, "EURUSD")]);
    let h = start(broker, vec![], AccountClass::Demo).await;

    let signal = Signal::pending("EURUSD", SignalAction::Close, 0.0, SignalSource::Manual)
        .with_ticket(555);
    let executed = h.engine.execute_signal(signal).await.unwrap();
    assert_eq!(executed.status, SignalStatus::Executed);
    // No close RPC was issued for a ticket the broker does not report.
    assert!(h.broker.recorded_closes().is_empty());
}

#[tokio::test]
async fn test_close_by_symbol_closes_all_matching_positions() {
    let broker = MockBroker::new(vec![
        open_position(1001, "EURUSD.raw"),
        open_position(1002, "EURUSD.raw"),
        open_position(2001, "GBPUSD.raw"),
    ]);
    let h = start(broker, vec![], AccountClass::Prop).await;

    let signal = Signal::pending("EURUSD", SignalAction::Close, 0.0, SignalSource::External);
    let executed = h.engine.execute_signal(signal).await.unwrap();
    assert_eq!(executed.status, SignalStatus::Executed);
    assert_eq!(executed.profit_loss, Some(30.0));

    let mut closes = h.broker.recorded_closes();
    closes.sort_unstable();
    assert_eq!(closes, vec![1001, 1002]);

    let remaining = h.engine.positions().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].ticket, 2001);
}

#[tokio::test]
async fn test_cache_converges_to_broker_state() {
    let broker = MockBroker::new(vec![open_position(1001, "EURUSD")]);
    let h = start(broker.clone(), vec![], AccountClass::Demo).await;

    assert_eq!(h.engine.positions().await.unwrap().len(), 1);

    // Positions change out-of-band (manual close plus a new fill).
    {
        let mut positions = broker.positions.lock().unwrap();
        positions.clear();
        positions.push(open_position(3001, "USDJPY"));
    }
    h.engine.refresh_now().await.unwrap();

    let cached = h.engine.positions().await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].ticket, 3001);
}

#[tokio::test]
async fn test_rejected_order_marks_signal_failed() {
    let broker = MockBroker::new(vec![]);
    broker.reject_orders.store(true, Ordering::SeqCst);
    let h = start(broker, vec![], AccountClass::Demo).await;

    let signal = Signal::pending("EURUSD", SignalAction::Buy, 0.10, SignalSource::External);
    let id = signal.id;
    let err = h.engine.execute_signal(signal).await.unwrap_err();
    assert!(err.to_string().contains("134"));

    let stored = h.signals.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Failed);
}

#[tokio::test]
async fn test_zero_volume_trade_is_rejected_before_broker_call() {
    let broker = MockBroker::new(vec![]);
    let h = start(broker, vec![], AccountClass::Demo).await;

    let signal = Signal::pending("EURUSD", SignalAction::Buy, 0.0, SignalSource::Manual);
    let id = signal.id;
    assert!(h.engine.execute_signal(signal).await.is_err());

    assert!(h.broker.recorded_orders().is_empty());
    let stored = h.signals.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Failed);
}

#[tokio::test]
async fn test_auth_expiry_cascades_once_and_leaves_signal_pending() {
    let broker = MockBroker::new(vec![open_position(1001, "EURUSD")]);
    let h = start(broker.clone(), vec![], AccountClass::Demo).await;

    broker.expired.store(true, Ordering::SeqCst);
    let signal = Signal::pending("EURUSD", SignalAction::Buy, 0.10, SignalSource::Manual);
    let id = signal.id;
    let err = h.engine.execute_signal(signal).await.unwrap_err();
    assert!(err.is_auth_expired());

    // The signal is retryable after re-auth, so it must not be failed.
    let stored = h.signals.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Pending);

    let stats = h.engine.stats().await.unwrap();
    assert!(stats.session_expired);
    assert!(!stats.auto_refresh_running);
    assert_eq!(stats.open_positions, 0);
    assert!(broker.disconnected.load(Ordering::SeqCst));

    // The expired session rejects further commands without broker calls.
    let orders_before = h.broker.recorded_orders().len();
    let retry = Signal::pending("EURUSD", SignalAction::Sell, 0.10, SignalSource::Manual);
    assert!(h.engine.execute_signal(retry).await.unwrap_err().is_auth_expired());
    assert_eq!(h.broker.recorded_orders().len(), orders_before);
}

#[tokio::test]
async fn test_robot_lifecycle_is_scoped_to_account() {
    let broker = MockBroker::new(vec![]);
    let h = start(broker, vec![robot("bot_alpha", None)], AccountClass::Demo).await;

    let toggled = h.engine.toggle_robot("robot-bot_alpha".to_string()).await.unwrap();
    assert!(!toggled);

    let err = h.engine.toggle_robot("robot-from-another-scope".to_string()).await;
    assert!(err.is_err());

    h.engine.delete_robot("robot-bot_alpha".to_string()).await.unwrap();
    assert!(h.engine.robots().await.unwrap().is_empty());
}
