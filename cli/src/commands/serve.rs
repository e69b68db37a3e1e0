//! HTTP adapter exposing the guidance engine.
//!
//! Thin by design: deserialize the request, call the engine, serialize the
//! result. All pipeline failures map to a 500 with the error detail.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use counsel_guidance::pipeline::GuidanceEngine;
use counsel_guidance::types::GuidanceResult;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::exit_codes::*;
use crate::runtime;

pub struct ServeArgs {
    pub addr: String,
    pub top_k: usize,
}

#[derive(Clone)]
struct AppState {
    engine: Arc<GuidanceEngine>,
}

#[derive(Debug, Deserialize)]
struct GuidanceRequest {
    user_input: String,
    #[serde(default)]
    patient_profile: Option<BTreeMap<String, String>>,
    #[serde(default)]
    conversation_history: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct RootResponse {
    service: &'static str,
    endpoints: [&'static str; 2],
}

pub async fn execute(args: ServeArgs) -> Result<i32> {
    let config = Config::load()?;
    let engine = match runtime::build_engine(&config, args.top_k).await {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return Ok(EXIT_CONFIG_ERROR);
        }
    };

    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    log::info!("Listening on {}", args.addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(EXIT_SUCCESS)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/guidance", post(guidance))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        service: "counsel",
        endpoints: ["/health", "/guidance"],
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn guidance(
    State(state): State<AppState>,
    Json(request): Json<GuidanceRequest>,
) -> Result<Json<GuidanceResult>, (StatusCode, String)> {
    let result = state
        .engine
        .generate_guidance(
            &request.user_input,
            request.patient_profile.as_ref(),
            &request.conversation_history,
        )
        .await
        .map_err(|e| {
            log::error!("Guidance request failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fills_optional_fields() {
        let request: GuidanceRequest =
            serde_json::from_str(r#"{"user_input": "I feel stuck"}"#).unwrap();
        assert_eq!(request.user_input, "I feel stuck");
        assert!(request.patient_profile.is_none());
        assert!(request.conversation_history.is_empty());
    }

    #[test]
    fn test_request_with_profile_and_history() {
        let request: GuidanceRequest = serde_json::from_str(
            r#"{
                "user_input": "I feel stuck",
                "patient_profile": {"age": "34"},
                "conversation_history": "Counselor: hi\n"
            }"#,
        )
        .unwrap();
        assert_eq!(
            request.patient_profile.unwrap().get("age").unwrap(),
            "34"
        );
        assert!(!request.conversation_history.is_empty());
    }

    #[test]
    fn test_request_requires_user_input() {
        assert!(serde_json::from_str::<GuidanceRequest>("{}").is_err());
    }
}
