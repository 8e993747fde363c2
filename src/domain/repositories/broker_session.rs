//! Broker session trait
//!
//! Common interface for the remote trading-session RPC boundary. The
//! abstraction keeps the engine independent of the HTTP implementation and
//! lets tests run against a scripted mock broker.
//!
//! Implementations own at most one live session token; `connect` creates it
//! and `disconnect` clears it. Every call must surface an expired session as
//! `BrokerError::AuthExpired`, distinct from generic connection failure,
//! because that condition triggers a process-wide teardown cascade.

use async_trait::async_trait;

use crate::domain::entities::account::{AccountInfo, Quote, SessionToken};
use crate::domain::entities::order::{OrderRequest, OrderResult};
use crate::domain::entities::position::Position;
use crate::domain::errors::BrokerError;

pub type BrokerResult<T> = Result<T, BrokerError>;

#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Open a session. On success the implementation stores the token as its
    /// one live session.
    async fn connect(
        &self,
        account_number: &str,
        password: &str,
        server: &str,
    ) -> BrokerResult<SessionToken>;

    async fn account_info(&self) -> BrokerResult<AccountInfo>;

    /// The authoritative open-position list. The local cache is always
    /// rebuildable from this call.
    async fn open_positions(&self) -> BrokerResult<Vec<Position>>;

    /// Current quote. `None` when the broker has no price; quote failure is
    /// non-fatal to callers.
    async fn quote(&self, symbol: &str) -> BrokerResult<Option<Quote>>;

    async fn send_order(&self, request: &OrderRequest) -> BrokerResult<OrderResult>;

    /// Close a position, fully or partially when `volume` is given.
    async fn close_position(&self, ticket: i64, volume: Option<f64>) -> BrokerResult<OrderResult>;

    /// Drop the live session token. Safe to call when not connected.
    async fn disconnect(&self);
}
