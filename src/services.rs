pub mod auth;
pub mod booking_service;
pub mod catalog_service;
pub mod complaint_service;
pub mod invoice_service;
pub mod otp_store;
pub mod payment_service;
pub mod provider_service;
