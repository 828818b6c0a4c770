pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::challenge::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Challenge API
        .route("/api/v1/sessions", post(handlers::handle_start))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route("/api/v1/sessions/:id/start", post(handlers::handle_restart))
        .route("/api/v1/sessions/:id/submit", post(handlers::handle_submit))
        .route("/api/v1/sessions/:id/advance", post(handlers::handle_advance))
        .route(
            "/api/v1/sessions/:id/navigate",
            post(handlers::handle_navigate),
        )
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .route("/api/v1/models", get(handlers::handle_list_models))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use rand::RngCore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::challenge::boundary::{GenerationError, TextGenerator};
    use crate::challenge::catalog::{Round, RoundCatalog, RoundKind};
    use crate::challenge::machine::GameStateMachine;
    use crate::challenge::parser::JudgeFormat;
    use crate::challenge::scoring::{ScoringConfig, ScoringEngine};
    use crate::challenge::store::SessionStore;
    use crate::config::Config;
    use crate::llm_client::LlmClient;

    struct CannedGenerator;

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _prompt_text: &str) -> Result<String, GenerationError> {
            Ok("Green leaves turn light into sugar.".to_string())
        }
    }

    struct PhotosynthesisCatalog;

    impl RoundCatalog for PhotosynthesisCatalog {
        fn select_round(&self, kind: RoundKind, _rng: &mut dyn RngCore) -> Round {
            Round::new(
                kind,
                "Explain what photosynthesis is.",
                vec!["sunlight".to_string(), "plants".to_string()],
            )
        }
    }

    fn test_app() -> Router {
        let config = Config {
            anthropic_api_key: "test-key".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            scoring: ScoringConfig::default(),
            judge_format: JudgeFormat::default(),
            rounds_total: 1,
            round_seed: Some(1),
            session_ttl: std::time::Duration::from_secs(3600),
        };
        let machine = GameStateMachine::new(
            Arc::new(PhotosynthesisCatalog),
            Arc::new(CannedGenerator),
            ScoringEngine::new(config.scoring.clone()),
        )
        .with_rounds(config.rounds_total)
        .with_seed(config.round_seed);

        build_router(AppState {
            llm: LlmClient::new(config.anthropic_api_key.clone()).unwrap(),
            config,
            machine: Arc::new(machine),
            sessions: SessionStore::new(),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn test_full_game_over_http() {
        let app = test_app();

        let (status, view) = send(&app, "POST", "/api/v1/sessions", Some(json!({"player_id": "ada"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view["state"], "round");
        assert_eq!(view["round"]["index"], 1);
        let id = view["session_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/submit"),
            Some(json!({"text": "Why is SUNLIGHT needed?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["outcome"], "rejected");
        assert_eq!(body["outcome"]["reason"]["word"], "sunlight");
        assert_eq!(body["view"]["total_score"], 0);

        let (status, body) = send(&app, "POST", &format!("/api/v1/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/submit"),
            Some(json!({"text": "How do green leaves make food?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["outcome"], "accepted");
        assert_eq!(body["view"]["history"].as_array().unwrap().len(), 1);

        let (status, view) = send(&app, "POST", &format!("/api/v1/sessions/{id}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "results");

        let (status, view) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/navigate"),
            Some(json!({"target": "review"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "review");

        let (status, view) = send(&app, "POST", &format!("/api/v1/sessions/{id}/reset"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["state"], "idle");
        assert_eq!(view["total_score"], 0);

        let (status, view) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/start"),
            Some(json!({"player_id": "ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["round"]["index"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_blank_player_id_is_a_validation_error() {
        let app = test_app();
        let (status, body) = send(&app, "POST", "/api/v1/sessions", Some(json!({"player_id": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_oversized_submission_is_rejected() {
        let app = test_app();
        let (_, view) = send(&app, "POST", "/api/v1/sessions", Some(json!({"player_id": "ada"}))).await;
        let id = view["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/submit"),
            Some(json!({"text": "a".repeat(2_001)})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
