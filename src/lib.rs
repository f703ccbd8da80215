//! sol-registrar - registration core for a Solana name service
//!
//! This crate provides the registration workflow (validation, pricing,
//! endpoint selection, wallet session, broadcast and confirmation) together
//! with the SQLite-backed analytics store used by the admin dashboard.

pub mod analytics;
pub mod error;
pub mod registrar;
pub mod types;

// Re-export main types for convenience
pub use error::RegistrationError;
pub use types::{Network, RegistrationReceipt};
