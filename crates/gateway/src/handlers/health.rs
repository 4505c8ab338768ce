//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - checks all dependencies
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let db_check = match state.db.ping().await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    let all_healthy = db_check.status == "up";

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks { database: db_check },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_router, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use deepscout_common::config::AppConfig;
    use deepscout_common::db::DbPool;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config.database.min_connections = 1;
        config.rate_limit.enabled = false;
        config.auth.link_secret = Some("test-secret".to_string());

        let db = DbPool::new(&config.database).await.unwrap();
        db.bootstrap().await.unwrap();
        let signer = deepscout_common::token::LinkSigner::from_config(&config.auth).unwrap();

        AppState {
            config: Arc::new(config),
            db,
            signer,
        }
    }

    async fn get(state: &AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_health_reports_healthy() {
        let state = test_state().await;

        let (status, json) = get(&state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_database_up() {
        let state = test_state().await;

        let (status, json) = get(&state, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ready");
        assert_eq!(json["checks"]["database"]["status"], "up");
        assert!(json["checks"]["database"]["latency_ms"].is_u64());
        assert!(json["checks"]["database"].get("error").is_none());
    }
}
