// src/models/complaint.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::transition::StatusAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "complaint_status")]
pub enum ComplaintStatus {
    Open,
    #[sqlx(rename = "In-Progress")]
    #[serde(rename = "In-Progress")]
    InProgress,
    Solved,
    Reopened,
    Closed,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Open => "Open",
            ComplaintStatus::InProgress => "In-Progress",
            ComplaintStatus::Solved => "Solved",
            ComplaintStatus::Reopened => "Reopened",
            ComplaintStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintAction {
    MarkInProgress,
    Resolve,
    Reopen,
    Close,
}

impl StatusAction for ComplaintAction {
    type Status = ComplaintStatus;

    fn name(&self) -> &'static str {
        match self {
            ComplaintAction::MarkInProgress => "in-progress",
            ComplaintAction::Resolve => "resolve",
            ComplaintAction::Reopen => "reopen",
            ComplaintAction::Close => "close",
        }
    }

    fn allowed_from(&self) -> &'static [ComplaintStatus] {
        use ComplaintStatus::*;
        match self {
            ComplaintAction::MarkInProgress => &[Open, Reopened],
            ComplaintAction::Resolve => &[Open, InProgress, Reopened],
            ComplaintAction::Reopen => &[Solved],
            ComplaintAction::Close => &[Open, InProgress, Solved, Reopened],
        }
    }

    fn target(&self) -> ComplaintStatus {
        match self {
            ComplaintAction::MarkInProgress => ComplaintStatus::InProgress,
            ComplaintAction::Resolve => ComplaintStatus::Solved,
            ComplaintAction::Reopen => ComplaintStatus::Reopened,
            ComplaintAction::Close => ComplaintStatus::Closed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    #[schema(example = "Qualidade do serviço")]
    pub category: String,
    pub subject: String,
    pub description: String,
    pub response: Option<String>,
    pub reopen_reason: Option<String>,
    pub status: ComplaintStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Histórico para auditoria (uma linha por mudança de status)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintHistoryEntry {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub status: ComplaintStatus,
    pub note: Option<String>,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDetail {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub status_history: Vec<ComplaintHistoryEntry>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintPayload {
    pub booking_id: Option<Uuid>,
    #[validate(length(min = 2, max = 60, message = "Categoria inválida."))]
    pub category: String,
    #[validate(length(min = 3, max = 150, message = "Informe o assunto."))]
    pub subject: String,
    #[validate(length(min = 10, message = "Descreva o problema com pelo menos 10 caracteres."))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResolveComplaintPayload {
    #[validate(length(min = 10, message = "A resposta deve ter pelo menos 10 caracteres."))]
    pub response: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReopenComplaintPayload {
    #[validate(length(min = 5, message = "Informe o motivo da reabertura."))]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct ComplaintNotePayload {
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopen_only_from_solved() {
        assert_eq!(ComplaintAction::Reopen.apply(ComplaintStatus::Solved).unwrap(), ComplaintStatus::Reopened);
        for status in [ComplaintStatus::Open, ComplaintStatus::InProgress, ComplaintStatus::Reopened, ComplaintStatus::Closed] {
            assert!(ComplaintAction::Reopen.apply(status).is_err());
        }
    }

    #[test]
    fn reopened_ticket_can_be_solved_again() {
        let status = ComplaintAction::Resolve.apply(ComplaintStatus::Open).unwrap();
        let status = ComplaintAction::Reopen.apply(status).unwrap();
        let status = ComplaintAction::MarkInProgress.apply(status).unwrap();
        assert_eq!(ComplaintAction::Resolve.apply(status).unwrap(), ComplaintStatus::Solved);
    }

    #[test]
    fn closed_is_terminal() {
        for action in [ComplaintAction::MarkInProgress, ComplaintAction::Resolve, ComplaintAction::Reopen, ComplaintAction::Close] {
            assert!(action.apply(ComplaintStatus::Closed).is_err());
        }
    }

    #[test]
    fn resolve_requires_minimum_response() {
        let short = ResolveComplaintPayload { response: "ok".into() };
        assert!(short.validate().is_err());
        let long = ResolveComplaintPayload { response: "Técnico enviado novamente.".into() };
        assert!(long.validate().is_ok());
    }

    #[test]
    fn status_serializes_with_hyphen() {
        assert_eq!(serde_json::to_string(&ComplaintStatus::InProgress).unwrap(), "\"In-Progress\"");
    }
}
