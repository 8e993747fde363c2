//! HTTP API handlers
//!
//! Thin boundary over the engine handle: parse, forward, map errors. No
//! trading decisions are made here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::actors::engine_actor::{EngineHandle, EngineStats, RobotSpec};
use crate::domain::entities::signal::{Signal, SignalSource};
use crate::domain::errors::{BrokerError, EngineError};

/// Error body returned on every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::RobotNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Broker(BrokerError::AuthExpired)
            | EngineError::Broker(BrokerError::NotConnected) => StatusCode::UNAUTHORIZED,
            EngineError::Broker(BrokerError::Rejected { .. }) => StatusCode::CONFLICT,
            EngineError::Broker(_) => StatusCode::BAD_GATEWAY,
            EngineError::Database(_) | EngineError::ChannelClosed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

/// Incoming trading intent, shared by the manual and webhook routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRequest {
    pub symbol: String,
    pub action: String,
    #[serde(default)]
    pub volume: f64,
    pub price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub ticket: Option<i64>,
    pub bot_token: Option<String>,
}

impl SignalRequest {
    fn into_signal(self, source: SignalSource) -> Result<Signal, EngineError> {
        if self.symbol.trim().is_empty() {
            return Err(EngineError::Validation("symbol must not be empty".to_string()));
        }
        let action = self
            .action
            .parse()
            .map_err(EngineError::Validation)?;
        let mut signal = Signal::pending(self.symbol.trim(), action, self.volume, source);
        signal.price = self.price;
        signal.stop_loss = self.stop_loss;
        signal.take_profit = self.take_profit;
        signal.ticket = self.ticket;
        signal.bot_token = self.bot_token;
        Ok(signal)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedResponse {
    pub closed: usize,
}

pub fn router(engine: EngineHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/positions", get(get_positions))
        .route("/positions/:ticket/close", post(close_position))
        .route("/positions/close-all", post(close_all_positions))
        .route("/account", get(get_account))
        .route("/quotes/:symbol", get(get_quote))
        .route("/signals", get(get_signals))
        .route("/signals/execute", post(execute_signal))
        .route("/webhook/signal", post(webhook_signal))
        .route("/robots", get(get_robots).post(create_robot))
        .route("/robots/:id", delete(delete_robot))
        .route("/robots/:id/toggle", post(toggle_robot))
        .route("/refresh/start", post(start_refresh))
        .route("/refresh/stop", post(stop_refresh))
        .with_state(engine)
}

async fn health(State(engine): State<EngineHandle>) -> Result<Json<EngineStats>, ApiError> {
    Ok(Json(engine.stats().await?))
}

async fn get_positions(State(engine): State<EngineHandle>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(engine.positions().await?))
}

async fn get_account(State(engine): State<EngineHandle>) -> Result<Response, ApiError> {
    match engine.account_info().await? {
        Some(info) => Ok(Json(info).into_response()),
        None => Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "account snapshot not available yet".to_string(),
            }),
        )
            .into_response()),
    }
}

async fn get_quote(
    State(engine): State<EngineHandle>,
    Path(symbol): Path<String>,
) -> Result<Response, ApiError> {
    match engine.quote(symbol.clone()).await? {
        Some(quote) => Ok(Json(quote).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no quote for {}", symbol),
            }),
        )
            .into_response()),
    }
}

async fn get_signals(State(engine): State<EngineHandle>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(engine.signals().await?))
}

/// Interactive execution from the dashboard.
async fn execute_signal(
    State(engine): State<EngineHandle>,
    Json(request): Json<SignalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signal = request.into_signal(SignalSource::Manual)?;
    let executed = engine.execute_signal(signal).await?;
    Ok((StatusCode::CREATED, Json(executed)))
}

/// External webhook delivery (TradingView-style alert).
async fn webhook_signal(
    State(engine): State<EngineHandle>,
    Json(request): Json<SignalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(symbol = %request.symbol, action = %request.action, "webhook signal received");
    let signal = request.into_signal(SignalSource::External)?;
    let executed = engine.execute_signal(signal).await?;
    Ok((StatusCode::CREATED, Json(executed)))
}

async fn close_position(
    State(engine): State<EngineHandle>,
    Path(ticket): Path<i64>,
) -> Result<StatusCode, ApiError> {
    engine.close_position(ticket).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn close_all_positions(
    State(engine): State<EngineHandle>,
) -> Result<Json<ClosedResponse>, ApiError> {
    let closed = engine.close_all_positions().await?;
    Ok(Json(ClosedResponse { closed }))
}

async fn get_robots(State(engine): State<EngineHandle>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(engine.robots().await?))
}

async fn create_robot(
    State(engine): State<EngineHandle>,
    Json(spec): Json<RobotSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let robot = engine.create_robot(spec).await?;
    Ok((StatusCode::CREATED, Json(robot)))
}

async fn toggle_robot(
    State(engine): State<EngineHandle>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let active = engine.toggle_robot(id).await?;
    Ok(Json(serde_json::json!({ "isActive": active })))
}

async fn delete_robot(
    State(engine): State<EngineHandle>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    engine.delete_robot(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_refresh(State(engine): State<EngineHandle>) -> Result<StatusCode, ApiError> {
    engine.start_auto_refresh().await?;
    Ok(StatusCode::ACCEPTED)
}

async fn stop_refresh(State(engine): State<EngineHandle>) -> Result<StatusCode, ApiError> {
    engine.stop_auto_refresh().await?;
    Ok(StatusCode::ACCEPTED)
}
