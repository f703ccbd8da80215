//! Analytics backend for the admin dashboard: the registrations table and
//! its aggregate summary queries.

pub mod sqlite_store;
pub mod storage;

pub use sqlite_store::SqliteStore;
pub use storage::{
    RegistrationRecord, RegistrationStatus, RegistrationStore, SummaryQuery, SummaryRow,
};
