//! Research request entity, one row per clicked link

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Request lifecycle status
///
/// Requests move `pending -> in_progress -> complete | error` and never
/// leave a terminal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Complete,
    Error,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Complete => "complete",
            RequestStatus::Error => "error",
        }
    }
}

impl From<String> for RequestStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => RequestStatus::Pending,
            "in_progress" => RequestStatus::InProgress,
            "complete" => RequestStatus::Complete,
            "error" => RequestStatus::Error,
            _ => RequestStatus::Pending,
        }
    }
}

impl From<RequestStatus> for String {
    fn from(status: RequestStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "research_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub area_of_interest: String,

    #[sea_orm(column_type = "Text")]
    pub requested_by: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub result: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the request status as an enum
    pub fn request_status(&self) -> RequestStatus {
        RequestStatus::from(self.status.clone())
    }

    /// Check if the request is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.request_status(),
            RequestStatus::Complete | RequestStatus::Error
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::InProgress,
            RequestStatus::Complete,
            RequestStatus::Error,
        ] {
            let s = String::from(status.clone());
            assert_eq!(RequestStatus::from(s), status);
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_pending() {
        assert_eq!(
            RequestStatus::from("archived".to_string()),
            RequestStatus::Pending
        );
    }

    #[test]
    fn test_terminal_states() {
        let mut row = Model {
            id: Uuid::new_v4(),
            area_of_interest: "quantum batteries".to_string(),
            requested_by: "alice@example.com".to_string(),
            status: "pending".to_string(),
            result: None,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        };
        assert!(!row.is_terminal());

        row.status = "in_progress".to_string();
        assert!(!row.is_terminal());

        row.status = "complete".to_string();
        assert!(row.is_terminal());

        row.status = "error".to_string();
        assert!(row.is_terminal());
    }
}
