// src/models/booking.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::transition::StatusAction;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::InProgress => "in-progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ações que movem uma reserva pelo ciclo de vida.
///
/// `pending -> accepted -> in-progress -> completed`, e `cancelled` a partir
/// de qualquer status não terminal. O reagendamento forçado pelo admin é a
/// única volta permitida e não passa por esta tabela.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Accept,
    Reject,
    Start,
    Complete,
    Cancel,
}

impl BookingAction {
    pub const ALL: [BookingAction; 5] = [
        BookingAction::Accept,
        BookingAction::Reject,
        BookingAction::Start,
        BookingAction::Complete,
        BookingAction::Cancel,
    ];
}

impl StatusAction for BookingAction {
    type Status = BookingStatus;

    fn name(&self) -> &'static str {
        match self {
            BookingAction::Accept => "accept",
            BookingAction::Reject => "reject",
            BookingAction::Start => "start",
            BookingAction::Complete => "complete",
            BookingAction::Cancel => "cancel",
        }
    }

    fn allowed_from(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            BookingAction::Accept => &[Pending],
            BookingAction::Reject => &[Pending, Accepted],
            BookingAction::Start => &[Accepted],
            BookingAction::Complete => &[InProgress],
            BookingAction::Cancel => &[Pending, Accepted, InProgress],
        }
    }

    fn target(&self) -> BookingStatus {
        match self {
            BookingAction::Accept => BookingStatus::Accepted,
            BookingAction::Start => BookingStatus::InProgress,
            BookingAction::Complete => BookingStatus::Completed,
            BookingAction::Reject | BookingAction::Cancel => BookingStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Option<Uuid>,
    #[schema(example = "Rua das Flores, 123 - Centro")]
    pub address: String,
    pub scheduled_date: NaiveDate,
    #[schema(value_type = String, example = "14:30:00")]
    pub scheduled_time: NaiveTime,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[schema(example = "180.00")]
    pub total_amount: Decimal,
    /// Taxa base usada na comissão (preenchida na conclusão)
    pub commission_rate: Option<Decimal>,
    pub commission_amount: Decimal,
    pub cancellation_reason: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Linha de serviço da reserva (nome e preço congelados na criação)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingServiceLine {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    #[schema(example = "100.00")]
    pub price: Decimal,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(example = "20.00")]
    pub discount_amount: Decimal,
}

impl BookingServiceLine {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity) - self.discount_amount
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub services: Vec<BookingServiceLine>,
}

// Linha já resolvida contra o catálogo, pronta para inserir
#[derive(Debug, Clone)]
pub struct NewBookingLine {
    pub service_id: Uuid,
    pub service_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub discount_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub address: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
}

// --- Payloads ---

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingServiceInput {
    pub service_id: Uuid,
    #[validate(range(min = 1, max = 100, message = "A quantidade deve estar entre 1 e 100."))]
    pub quantity: i32,
    #[schema(example = "20.00")]
    pub discount_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
    #[validate(length(min = 1, message = "Selecione ao menos um serviço."), nested)]
    pub services: Vec<BookingServiceInput>,
    #[validate(length(min = 5, message = "O endereço é obrigatório."))]
    pub address: String,
    #[schema(example = "2026-11-03")]
    pub scheduled_date: NaiveDate,
    #[schema(value_type = String, example = "14:30:00")]
    pub scheduled_time: NaiveTime,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CancelBookingPayload {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectBookingPayload {
    #[validate(length(min = 3, message = "Informe o motivo da recusa."))]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignProviderPayload {
    pub provider_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleBookingPayload {
    pub scheduled_date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub scheduled_time: NaiveTime,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL_STATUSES: [BookingStatus; 5] = [Pending, Accepted, InProgress, Completed, Cancelled];

    // Alguma ação da tabela leva de `from` para `to`?
    fn reaches(from: BookingStatus, to: BookingStatus) -> bool {
        BookingAction::ALL
            .iter()
            .any(|action| action.target() == to && action.is_allowed_from(from))
    }

    #[test]
    fn happy_path_moves_forward() {
        let status = BookingAction::Accept.apply(Pending).unwrap();
        assert_eq!(status, Accepted);
        let status = BookingAction::Start.apply(status).unwrap();
        assert_eq!(status, InProgress);
        let status = BookingAction::Complete.apply(status).unwrap();
        assert_eq!(status, Completed);
    }

    #[test]
    fn accept_requires_pending() {
        for status in [Accepted, InProgress, Completed, Cancelled] {
            assert!(BookingAction::Accept.apply(status).is_err(), "accept from {status}");
        }
    }

    #[test]
    fn start_and_complete_guards() {
        assert!(BookingAction::Start.apply(Pending).is_err());
        assert!(BookingAction::Complete.apply(Accepted).is_err());
        assert!(BookingAction::Complete.apply(Pending).is_err());
    }

    #[test]
    fn terminal_statuses_have_no_exit() {
        for status in [Completed, Cancelled] {
            for action in BookingAction::ALL {
                assert!(action.apply(status).is_err(), "{} from {status}", action.name());
            }
        }
    }

    #[test]
    fn completed_never_goes_back_to_accepted() {
        assert!(!reaches(Completed, Accepted));
        assert!(!reaches(InProgress, Accepted));
        assert!(!reaches(Accepted, Pending));
    }

    #[test]
    fn cancel_is_reachable_from_every_open_status() {
        for status in [Pending, Accepted, InProgress] {
            assert!(reaches(status, Cancelled));
        }
        assert!(BookingAction::Reject.apply(InProgress).is_err());
    }

    #[test]
    fn graph_only_moves_forward() {
        let rank = |s: BookingStatus| match s {
            Pending => 0,
            Accepted => 1,
            InProgress => 2,
            Completed | Cancelled => 3,
        };
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                if reaches(from, to) {
                    assert!(rank(to) > rank(from), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn status_names_match_database_labels() {
        assert_eq!(BookingAction::Cancel.allowed_from_names(), vec!["pending", "accepted", "in-progress"]);
        let parsed: BookingStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(parsed, InProgress);
    }

    #[test]
    fn line_total_applies_discount() {
        let line = BookingServiceLine {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            service_name: "Limpeza".into(),
            price: Decimal::from(100),
            quantity: 2,
            discount_amount: Decimal::from(20),
        };
        assert_eq!(line.line_total(), Decimal::from(180));
    }

    #[test]
    fn booking_payload_needs_valid_services() {
        let empty: CreateBookingPayload = serde_json::from_value(serde_json::json!({
            "services": [],
            "address": "Rua das Flores, 100",
            "scheduledDate": "2026-11-03",
            "scheduledTime": "14:30:00"
        }))
        .unwrap();
        let errors = empty.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("services"));

        let too_many: CreateBookingPayload = serde_json::from_value(serde_json::json!({
            "services": [{ "serviceId": Uuid::new_v4(), "quantity": 101 }],
            "address": "Rua das Flores, 100",
            "scheduledDate": "2026-11-03",
            "scheduledTime": "14:30:00"
        }))
        .unwrap();
        assert!(too_many.validate().is_err());
    }
}
