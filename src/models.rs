pub mod auth;
pub mod booking;
pub mod catalog;
pub mod complaint;
pub mod invoice;
pub mod payment;
pub mod provider;
