use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradedesk::application::actors::engine_actor::{EngineActor, EngineSettings};
use tradedesk::application::handlers::api;
use tradedesk::config::AppConfig;
use tradedesk::domain::repositories::broker_session::BrokerSession;
use tradedesk::infrastructure::broker_client::HttpBrokerClient;
use tradedesk::persistence::feed::SignalFeed;
use tradedesk::persistence::init_database;
use tradedesk::persistence::repository::{RobotRepository, SignalRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradedesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    info!(
        scope = %config.account_scope(),
        class = config.account_class.as_str(),
        "tradedesk starting"
    );

    let pool = init_database(&config.database_url).await?;
    let feed = SignalFeed::default();
    let signals = SignalRepository::new(pool.clone(), feed);
    let robots = RobotRepository::new(pool);

    let broker: Arc<dyn BrokerSession> =
        Arc::new(HttpBrokerClient::new(config.broker_base_url.clone()));
    match broker
        .connect(
            &config.broker_account,
            &config.broker_password,
            &config.broker_server,
        )
        .await
    {
        Ok(_) => info!("broker session established"),
        // The engine still serves ledger reads; refresh loops will surface
        // broker errors until a restart with working credentials.
        Err(e) => warn!("broker connect failed: {}", e),
    }

    let engine = EngineActor::spawn(
        broker,
        signals,
        robots,
        EngineSettings {
            account_class: config.account_class,
            account_scope: config.account_scope(),
            fast_interval: Duration::from_millis(config.fast_refresh_ms),
            slow_interval: Duration::from_millis(config.slow_refresh_ms),
        },
    );
    if let Err(e) = engine.start_auto_refresh().await {
        error!("failed to start auto refresh: {}", e);
    }

    let app = api::router(engine.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    let shutdown_signal = async {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutting down gracefully...");
    engine.shutdown().await;
    Ok(())
}
