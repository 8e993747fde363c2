//! # Broker Session HTTP Client
//!
//! reqwest implementation of the [`BrokerSession`] trait against the remote
//! trading-server session API. The session token is held in an explicit
//! session context on the client instance: created by `connect`, cleared by
//! `disconnect` or on expiry, never ambient global state.
//!
//! ## Error mapping
//!
//! - transport failure       -> `BrokerError::Connection`
//! - HTTP 401                -> `BrokerError::AuthExpired`
//! - HTTP 404 on close       -> `BrokerError::NotFound`
//! - non-success order code  -> `BrokerError::Rejected`
//! - undecodable body        -> `BrokerError::InvalidResponse`

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::entities::account::{AccountInfo, Quote, SessionToken};
use crate::domain::entities::order::{OrderRequest, OrderResult};
use crate::domain::entities::position::Position;
use crate::domain::errors::BrokerError;
use crate::domain::repositories::broker_session::{BrokerResult, BrokerSession};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectRequest<'a> {
    account_number: &'a str,
    password: &'a str,
    server: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloseRequest {
    ticket: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<f64>,
}

/// HTTP client for the broker session protocol.
pub struct HttpBrokerClient {
    http: Client,
    base_url: String,
    session: RwLock<Option<SessionToken>>,
}

impl std::fmt::Debug for HttpBrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBrokerClient")
            .field("base_url", &self.base_url)
            .field("session", &"<REDACTED>")
            .finish()
    }
}

impl HttpBrokerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn bearer(&self) -> BrokerResult<String> {
        let guard = self.session.read().await;
        guard
            .as_ref()
            .map(|t| t.as_str().to_string())
            .ok_or(BrokerError::NotConnected)
    }

    /// Map a non-success response to the taxonomy, clearing the session on
    /// expiry so later calls fail fast with `NotConnected` semantics.
    async fn check(&self, response: Response) -> BrokerResult<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => {
                self.session.write().await.take();
                Err(BrokerError::AuthExpired)
            }
            StatusCode::NOT_FOUND => Err(BrokerError::NotFound),
            status => Err(BrokerError::Connection(format!(
                "unexpected status {}",
                status
            ))),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> BrokerResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| BrokerError::InvalidResponse(e.to_string()))
    }

    async fn get_authorized(&self, path: &str) -> BrokerResult<Response> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        self.check(response).await
    }

    async fn post_authorized<B: Serialize>(&self, path: &str, body: &B) -> BrokerResult<Response> {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        self.check(response).await
    }
}

#[async_trait]
impl BrokerSession for HttpBrokerClient {
    async fn connect(
        &self,
        account_number: &str,
        password: &str,
        server: &str,
    ) -> BrokerResult<SessionToken> {
        let body = ConnectRequest {
            account_number,
            password,
            server,
        };
        let response = self
            .http
            .post(self.url("/session/connect"))
            .json(&body)
            .send()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        let response = self.check(response).await?;
        let connected: ConnectResponse = Self::decode(response).await?;
        let token = SessionToken(connected.token);
        *self.session.write().await = Some(token.clone());
        info!(account = account_number, server, "broker session opened");
        Ok(token)
    }

    async fn account_info(&self) -> BrokerResult<AccountInfo> {
        let response = self.get_authorized("/session/account").await?;
        Self::decode(response).await
    }

    async fn open_positions(&self) -> BrokerResult<Vec<Position>> {
        let response = self.get_authorized("/session/positions").await?;
        let positions: Vec<Position> = Self::decode(response).await?;
        debug!(count = positions.len(), "fetched open positions");
        Ok(positions)
    }

    async fn quote(&self, symbol: &str) -> BrokerResult<Option<Quote>> {
        let path = format!("/session/quote/{}", symbol);
        match self.get_authorized(&path).await {
            Ok(response) => Ok(Some(Self::decode(response).await?)),
            // No price for the symbol is a soft miss, not a failure.
            Err(BrokerError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn send_order(&self, request: &OrderRequest) -> BrokerResult<OrderResult> {
        let response = self.post_authorized("/session/orders", request).await?;
        let result: OrderResult = Self::decode(response).await?;
        if !result.is_success() {
            warn!(symbol = %request.symbol, code = result.code, "order rejected");
            return Err(BrokerError::Rejected {
                code: result.code,
                message: result.message,
            });
        }
        Ok(result)
    }

    async fn close_position(&self, ticket: i64, volume: Option<f64>) -> BrokerResult<OrderResult> {
        let body = CloseRequest { ticket, volume };
        let response = self.post_authorized("/session/close", &body).await?;
        let result: OrderResult = Self::decode(response).await?;
        if !result.is_success() {
            warn!(ticket, code = result.code, "close rejected");
            return Err(BrokerError::Rejected {
                code: result.code,
                message: result.message,
            });
        }
        Ok(result)
    }

    async fn disconnect(&self) {
        if self.session.write().await.take().is_some() {
            info!("broker session cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_calls_without_session_fail_fast() {
        let client = HttpBrokerClient::new("http://localhost:9");
        let err = client.account_info().await.unwrap_err();
        assert_eq!(err, BrokerError::NotConnected);
    }

    #[tokio::test]
    async fn test_disconnect_without_session_is_noop() {
        let client = HttpBrokerClient::new("http://localhost:9");
        client.disconnect().await;
        client.disconnect().await;
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpBrokerClient::new("http://broker.example/");
        assert_eq!(client.url("/session/account"), "http://broker.example/session/account");
    }

    #[test]
    fn test_debug_redacts_session() {
        let client = HttpBrokerClient::new("http://broker.example");
        assert!(!format!("{:?}", client).contains("token"));
    }
}
