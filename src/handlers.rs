pub mod admin;
pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod complaints;
pub mod invoices;
pub mod payments;
