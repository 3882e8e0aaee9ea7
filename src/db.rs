pub mod user_repo;
pub use user_repo::UserRepository;
pub mod provider_repo;
pub use provider_repo::ProviderRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod booking_repo;
pub use booking_repo::{BookingRepository, TransitionGuard};
pub mod invoice_repo;
pub use invoice_repo::InvoiceRepository;
pub mod payment_repo;
pub use payment_repo::PaymentRepository;
pub mod complaint_repo;
pub use complaint_repo::ComplaintRepository;
