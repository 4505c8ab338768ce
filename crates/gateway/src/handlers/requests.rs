//! Research request status handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use deepscout_common::{
    db::Repository,
    errors::{AppError, Result},
};

/// Request status response
#[derive(Serialize)]
pub struct RequestStatusResponse {
    pub request_id: Uuid,
    pub area_of_interest: String,
    pub requested_by: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Get the current state of a research request
pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<RequestStatusResponse>> {
    let repo = Repository::new(state.db.clone());

    let request = repo
        .find_request_by_id(request_id)
        .await?
        .ok_or_else(|| AppError::RequestNotFound {
            id: request_id.to_string(),
        })?;

    Ok(Json(RequestStatusResponse {
        request_id: request.id,
        area_of_interest: request.area_of_interest,
        requested_by: request.requested_by,
        status: request.status,
        result: request.result,
        created_at: request.created_at.to_rfc3339(),
        updated_at: request.updated_at.to_rfc3339(),
    }))
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
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_get_pending_request() {
        let state = test_state().await;
        let repo = Repository::new(state.db.clone());
        let id = Uuid::new_v4();
        repo.insert_request(id, "rust".into(), "alice@example.com".into())
            .await
            .unwrap();

        let (status, json) = get(&state, &format!("/research/requests/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["request_id"], id.to_string());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["area_of_interest"], "rust");
        assert!(json.get("result").is_none());
    }

    #[tokio::test]
    async fn test_get_complete_request_includes_result() {
        let state = test_state().await;
        let repo = Repository::new(state.db.clone());
        let id = Uuid::new_v4();
        repo.insert_request(id, "rust".into(), "alice@example.com".into())
            .await
            .unwrap();
        repo.complete_request(id, "Report A".into()).await.unwrap();

        let (status, json) = get(&state, &format!("/research/requests/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "complete");
        assert_eq!(json["result"], "Report A");
    }

    #[tokio::test]
    async fn test_get_unknown_request_is_not_found() {
        let state = test_state().await;
        let (status, json) = get(
            &state,
            &format!("/research/requests/{}", Uuid::new_v4()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "REQUEST_NOT_FOUND");
    }
}
