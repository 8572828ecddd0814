use skyseat_api::{app, state::engine_policy, AppState, AuthConfig};
use skyseat_booking::ReservationEngine;
use skyseat_core::events::EventSink;
use skyseat_store::app_config::Config;
use skyseat_store::{DbClient, PostgresReservationStore, PostgresUserDirectory, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyseat_api=debug,skyseat_booking=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting SkySeat API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections).await?;
    db.migrate().await?;
    let store = Arc::new(PostgresReservationStore::new(db.pool.clone()));
    let users = Arc::new(PostgresUserDirectory::new(db.pool.clone()));

    // Redis, optional
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(RedisClient::new(&redis.url).await?)),
        None => {
            tracing::warn!("No Redis configured: availability cache and rate limiting disabled");
            None
        }
    };

    let engine = Arc::new(ReservationEngine::new(
        store.clone(),
        users.clone(),
        event_sink(&config)?,
        engine_policy(&config.reservation),
    ));

    let app_state = AppState {
        engine,
        store,
        users,
        redis,
        auth: AuthConfig { secret: config.auth.jwt_secret.clone() },
        rate_limit_per_minute: config.server.rate_limit_per_minute,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app(app_state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[cfg(feature = "kafka")]
fn event_sink(config: &Config) -> anyhow::Result<Arc<dyn EventSink>> {
    let sink: Arc<dyn EventSink> = match &config.kafka {
        Some(kafka) => Arc::new(skyseat_store::EventProducer::new(&kafka.brokers)?),
        None => Arc::new(skyseat_core::events::LogEventSink),
    };
    Ok(sink)
}

#[cfg(not(feature = "kafka"))]
fn event_sink(config: &Config) -> anyhow::Result<Arc<dyn EventSink>> {
    if config.kafka.is_some() {
        tracing::warn!("Kafka configured but the `kafka` feature is off; events go to the log");
    }
    let sink: Arc<dyn EventSink> = Arc::new(skyseat_core::events::LogEventSink);
    Ok(sink)
}
