use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trademill::api::{self, AppState};
use trademill::{
    Config, LogEmailSink, OutcomeEngine, PortfolioLedger, PriceCache, PushHub, SettlementEngine,
    SettlementScheduler, SimulatedFeed, SqliteStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trademill=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(?config, "starting trademill");

    let store = Arc::new(SqliteStore::new(&config.db_path)?);
    let prices = Arc::new(PriceCache::new());
    let push = Arc::new(PushHub::new());

    let ledger = PortfolioLedger::new(store.clone(), config.default_balance);
    let outcome = OutcomeEngine::new(store.clone());
    let engine = Arc::new(SettlementEngine::new(
        store.clone(),
        prices.clone(),
        ledger,
        outcome,
        push.clone(),
        Arc::new(LogEmailSink),
    ));

    let feed = SimulatedFeed::new(prices.clone(), config.feed_symbols.clone());
    feed.start(Duration::from_millis(config.feed_interval_ms));

    let scheduler = SettlementScheduler::new(engine.clone());
    scheduler
        .start(Duration::from_millis(config.settle_interval_ms))
        .await;

    let state = AppState {
        engine,
        store,
        prices,
        push,
    };
    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
