mod api;
mod db;
mod roster;
mod router;
mod state;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use triage_core::Config;
use triage_geocoder::{FallbackProvider, GeocodeProvider, GeocodingCache, PrimaryProvider};
use triage_llm::providers::{create_classifier_provider, create_sentiment_provider};
use triage_llm::{SentimentClassifier, TicketClassifier};
use triage_orchestrator::BatchOrchestrator;
use triage_progress::{ProgressBus, ProgressStore};
use triage_store::{InMemoryStore, PgTicketStore, TicketStore};

use state::AppState;

fn load_config() -> Config {
    triage_core::config::load_dotenv();
    Config::from_env()
}

/// `DATABASE_URL` selects a real Postgres-backed store; otherwise fall back to
/// the in-memory reference implementation, which is enough to exercise the
/// pipeline end to end against fixture tickets without a database.
async fn build_store(config: &Config) -> Arc<dyn TicketStore> {
    match &config.database_url {
        Some(url) => match db::connect(url).await {
            Ok(pool) => {
                info!("connected to PostgreSQL");
                Arc::new(PgTicketStore::new(pool))
            }
            Err(e) => {
                warn!(error = %e, "failed to connect to PostgreSQL, falling back to in-memory store");
                Arc::new(InMemoryStore::new())
            }
        },
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    }
}

fn geocode_providers(config: &Config) -> (Box<dyn GeocodeProvider>, Box<dyn GeocodeProvider>) {
    let primary: Box<dyn GeocodeProvider> = match &config.geocoder.primary_key {
        Some(key) => Box::new(PrimaryProvider::new(config.geocoder.primary_url.clone(), key.clone())),
        None => {
            warn!("PRIMARY_GEOCODER_KEY not set, primary geocoder calls will fail open");
            Box::new(PrimaryProvider::new(config.geocoder.primary_url.clone(), String::new()))
        }
    };
    let fallback: Box<dyn GeocodeProvider> = Box::new(FallbackProvider::new(config.geocoder.fallback_url.clone()));
    (primary, fallback)
}

async fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = build_store(&config).await;
    let (managers, offices) = roster::load(&config.data_dir);
    info!("loaded roster: {} managers, {} offices", managers.len(), offices.len());

    let classifier_provider = create_classifier_provider(&config.llm)?;
    let sentiment_provider = create_sentiment_provider(&config.sentiment)?;
    let spam_provider = create_classifier_provider(&config.llm)?;
    let (geocode_primary, geocode_fallback) = geocode_providers(&config);

    let classifier = TicketClassifier::new(classifier_provider, config.llm.temperature, config.llm.max_tokens);
    let sentiment_classifier = SentimentClassifier::new(sentiment_provider);

    let progress_bus = Arc::new(ProgressBus::new());
    let progress_store = Arc::new(ProgressStore::new());

    let orchestrator = Arc::new(BatchOrchestrator::new(
        store.clone(),
        progress_bus.clone(),
        progress_store.clone(),
        classifier,
        sentiment_classifier,
        spam_provider,
        geocode_primary,
        geocode_fallback,
        GeocodingCache::new(1024),
        config.clone(),
    ));

    Ok(Arc::new(AppState {
        store,
        orchestrator,
        progress_bus,
        progress_store,
        managers: RwLock::new(managers),
        offices: RwLock::new(offices),
        config,
    }))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.log_summary();
    let state = build_state(config).await?;
    let app = router::build_router(state.clone());

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).with_level(true).init();

    let config = load_config();
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("serve") | None => serve(config).await?,
        _ => {
            println!("triage-server v0.1.0");
            println!("Usage: server [serve]");
        }
    }

    Ok(())
}
