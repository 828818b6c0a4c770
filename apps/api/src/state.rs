use std::sync::Arc;

use crate::challenge::machine::GameStateMachine;
use crate::challenge::store::SessionStore;
use crate::config::Config;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub config: Config,
    pub machine: Arc<GameStateMachine>,
    pub sessions: SessionStore,
}
