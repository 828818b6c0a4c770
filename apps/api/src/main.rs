mod challenge;
mod config;
mod errors;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::challenge::catalog::StaticCatalog;
use crate::challenge::machine::GameStateMachine;
use crate::challenge::scoring::{AccuracySource, ScoringEngine};
use crate::challenge::store::SessionStore;
use crate::config::Config;
use crate::llm_client::{LlmClient, LlmJudge};
use crate::routes::build_router;
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Prompt Challenge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Scoring engine; the judge is only wired in when accuracy comes from it
    let mut engine = ScoringEngine::new(config.scoring.clone());
    if config.scoring.accuracy == AccuracySource::Judge {
        let parser = config.judge_format.parser();
        let judge = LlmJudge::new(llm.clone(), parser.format_instruction());
        engine = engine.with_judge(Arc::new(judge), parser);
        info!("Accuracy judged by LLM ({:?} replies)", config.judge_format);
    }
    info!(
        "Scoring: {:?}, floor {:?}, max {} per round",
        config.scoring.policy,
        config.scoring.floor,
        engine.max_total()
    );

    let machine = GameStateMachine::new(Arc::new(StaticCatalog), Arc::new(llm.clone()), engine)
        .with_rounds(config.rounds_total)
        .with_seed(config.round_seed);
    info!("{} rounds per game", config.rounds_total);

    // Session store, swept for idle games
    let sessions = SessionStore::new();
    sessions.spawn_sweeper(config.session_ttl, config.session_ttl.min(SWEEP_INTERVAL));
    info!("Idle sessions expire after {}s", config.session_ttl.as_secs());

    // Build app state
    let state = AppState {
        llm,
        config: config.clone(),
        machine: Arc::new(machine),
        sessions,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once a frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
