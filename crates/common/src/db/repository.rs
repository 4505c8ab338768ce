//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations on research
//! requests. Status strings in SQL always come from [`RequestStatus`] so the
//! lifecycle vocabulary lives in one place.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Request Operations
    // ========================================================================

    /// Insert a new pending research request
    ///
    /// The caller supplies the id. Every insert is a fresh row; a repeated id
    /// surfaces as [`AppError::DuplicateRequest`] rather than an upsert.
    pub async fn insert_request(
        &self,
        id: Uuid,
        area_of_interest: String,
        requested_by: String,
    ) -> Result<ResearchRequest> {
        let now = chrono::Utc::now();

        let request = ResearchRequestActiveModel {
            id: Set(id),
            area_of_interest: Set(area_of_interest),
            requested_by: Set(requested_by),
            status: Set(RequestStatus::Pending.into()),
            result: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match request.insert(self.conn()).await {
            Ok(model) => Ok(model),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(AppError::DuplicateRequest {
                    id: id.to_string(),
                }),
                _ => Err(err.into()),
            },
        }
    }

    /// Find a request by ID
    pub async fn find_request_by_id(&self, id: Uuid) -> Result<Option<ResearchRequest>> {
        ResearchRequestEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find all requests in a given status, oldest first
    pub async fn find_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<ResearchRequest>> {
        ResearchRequestEntity::find()
            .filter(ResearchRequestColumn::Status.eq(status.as_str()))
            .order_by_asc(ResearchRequestColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Move a batch of pending requests to `in_progress` in one statement
    ///
    /// Only rows still pending are touched, so a row another worker already
    /// claimed is skipped rather than claimed twice. Returns the number of
    /// rows actually reserved.
    pub async fn reserve_requests(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

        let result = ResearchRequestEntity::update_many()
            .col_expr(
                ResearchRequestColumn::Status,
                Expr::value(RequestStatus::InProgress.as_str()),
            )
            .col_expr(ResearchRequestColumn::UpdatedAt, Expr::value(now))
            .filter(ResearchRequestColumn::Id.is_in(ids.iter().copied()))
            .filter(ResearchRequestColumn::Status.eq(RequestStatus::Pending.as_str()))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected)
    }

    /// Mark a request complete and store its report
    pub async fn complete_request(&self, id: Uuid, result: String) -> Result<ResearchRequest> {
        if result.trim().is_empty() {
            return Err(AppError::Validation {
                message: "a complete request must carry a non-empty result".to_string(),
                field: Some("result".to_string()),
            });
        }

        let mut request: ResearchRequestActiveModel = self
            .find_request_by_id(id)
            .await?
            .ok_or_else(|| AppError::RequestNotFound { id: id.to_string() })?
            .into();

        request.status = Set(RequestStatus::Complete.into());
        request.result = Set(Some(result));
        request.updated_at = Set(chrono::Utc::now().into());

        request.update(self.conn()).await.map_err(Into::into)
    }

    /// Mark a request failed
    ///
    /// Clears any partial result so only complete requests carry one.
    pub async fn fail_request(&self, id: Uuid) -> Result<ResearchRequest> {
        let mut request: ResearchRequestActiveModel = self
            .find_request_by_id(id)
            .await?
            .ok_or_else(|| AppError::RequestNotFound { id: id.to_string() })?
            .into();

        request.status = Set(RequestStatus::Error.into());
        request.result = Set(None);
        request.updated_at = Set(chrono::Utc::now().into());

        request.update(self.conn()).await.map_err(Into::into)
    }
}
