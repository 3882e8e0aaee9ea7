// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::send_otp,
        handlers::auth::verify_otp,
        handlers::auth::get_me,

        // --- Catalog ---
        handlers::catalog::list_services,
        handlers::catalog::create_service,

        // --- Booking ---
        handlers::bookings::create_booking,
        handlers::bookings::list_customer_bookings,
        handlers::bookings::cancel_by_customer,
        handlers::bookings::get_booking,
        handlers::bookings::accept_booking,
        handlers::bookings::reject_booking,
        handlers::bookings::start_booking,
        handlers::bookings::complete_booking,
        handlers::bookings::list_provider_bookings,
        handlers::bookings::list_all_bookings,
        handlers::bookings::assign_provider,
        handlers::bookings::reschedule_booking,
        handlers::bookings::cancel_by_admin,
        handlers::bookings::delete_booking,

        // --- Invoice ---
        handlers::invoices::get_invoice,
        handlers::invoices::get_invoice_by_booking,
        handlers::invoices::list_invoices,
        handlers::invoices::add_product,
        handlers::invoices::replace_products,
        handlers::invoices::update_product,
        handlers::invoices::delete_product,
        handlers::invoices::update_payment,

        // --- Payment ---
        handlers::payments::get_earnings,
        handlers::payments::request_withdrawal,
        handlers::payments::list_my_withdrawals,
        handlers::payments::list_withdrawal_requests,
        handlers::payments::approve_withdrawal,
        handlers::payments::complete_withdrawal,
        handlers::payments::fail_withdrawal,
        handlers::payments::reject_withdrawal,

        // --- Complaint ---
        handlers::complaints::create_complaint,
        handlers::complaints::list_complaints,
        handlers::complaints::get_complaint,
        handlers::complaints::mark_in_progress,
        handlers::complaints::resolve_complaint,
        handlers::complaints::reopen_complaint,
        handlers::complaints::close_complaint,

        // --- Admin ---
        handlers::admin::list_providers,
        handlers::admin::update_commission,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::SendOtpPayload,
            models::auth::VerifyOtpPayload,
            models::auth::OtpSentResponse,
            models::auth::OtpVerifiedResponse,

            // --- Catalog / Providers ---
            models::catalog::CatalogService,
            models::catalog::CreateCatalogServicePayload,
            models::provider::CommissionType,
            models::provider::ProviderProfile,
            models::provider::ProviderSummary,
            models::provider::UpdateCommissionPayload,

            // --- Booking ---
            models::booking::BookingStatus,
            models::booking::PaymentMethod,
            models::booking::PaymentStatus,
            models::booking::Booking,
            models::booking::BookingServiceLine,
            models::booking::BookingDetail,
            models::booking::BookingServiceInput,
            models::booking::CreateBookingPayload,
            models::booking::CancelBookingPayload,
            models::booking::RejectBookingPayload,
            models::booking::AssignProviderPayload,
            models::booking::RescheduleBookingPayload,

            // --- Invoice ---
            models::invoice::Invoice,
            models::invoice::InvoiceProduct,
            models::invoice::InvoiceDetail,
            models::invoice::ProductLineInput,
            models::invoice::ReplaceProductsPayload,
            models::invoice::UpdateInvoicePaymentPayload,

            // --- Payment ---
            models::payment::WithdrawalStatus,
            models::payment::PayoutMethod,
            models::payment::Withdrawal,
            models::payment::EarningsSummary,
            models::payment::WithdrawalRequestPayload,
            models::payment::ApproveWithdrawalPayload,
            models::payment::CompleteWithdrawalPayload,
            models::payment::WithdrawalReasonPayload,

            // --- Complaint ---
            models::complaint::ComplaintStatus,
            models::complaint::Complaint,
            models::complaint::ComplaintHistoryEntry,
            models::complaint::ComplaintDetail,
            models::complaint::CreateComplaintPayload,
            models::complaint::ResolveComplaintPayload,
            models::complaint::ReopenComplaintPayload,
            models::complaint::ComplaintNotePayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, Registro e OTP"),
        (name = "Catalog", description = "Catálogo de Serviços"),
        (name = "Booking", description = "Ciclo de Vida das Reservas"),
        (name = "Invoice", description = "Faturas e Produtos Usados"),
        (name = "Payment", description = "Ganhos e Saques dos Prestadores"),
        (name = "Complaint", description = "Reclamações e Histórico"),
        (name = "Admin", description = "Gestão de Prestadores e Comissões")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/booking/provider/{id}/accept",
            "/api/invoice/{id}/products/{product_id}",
            "/api/payment/admin/withdrawal-request/{id}/approve",
            "/api/complaint/complaints/{id}/reopen",
            "/api/admin/providers/{id}/commission",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }
}
