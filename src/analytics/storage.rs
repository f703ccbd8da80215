//! Storage contract for the admin analytics backend.
//!
//! Defines the formal persistence interface over the registrations table,
//! keeping the dashboard queries independent of the database engine.

use crate::types::Network;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a stored registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Broadcast but not yet confirmed
    Pending,
    /// Confirmed on chain
    Confirmed,
    /// Terminal failure
    Failed,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStatus::Pending => write!(f, "pending"),
            RegistrationStatus::Confirmed => write!(f, "confirmed"),
            RegistrationStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "failed" => Ok(RegistrationStatus::Failed),
            other => Err(format!("unknown registration status: {other}")),
        }
    }
}

/// One row of the registrations table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Database record ID (set by the store)
    pub id: Option<i64>,
    pub name: String,
    /// Transaction signature, present once broadcast
    pub signature: Option<String>,
    pub network: Network,
    pub status: RegistrationStatus,
    /// Total paid, in SOL
    pub cost_sol: f64,
    pub registered_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Filters for the dashboard's aggregate query. All fields optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub network: Option<Network>,
    pub status: Option<RegistrationStatus>,
}

/// One aggregate bucket: registrations for a day/status/network combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// ISO date, e.g. "2026-08-24"
    pub day: String,
    pub status: RegistrationStatus,
    pub network: Network,
    pub registrations: i64,
    pub total_sol: f64,
}

/// Formal contract for the registrations store.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Save a new registration record; returns its database ID.
    async fn insert(&self, record: &RegistrationRecord) -> Result<i64>;

    /// Update the status of a record identified by its signature.
    async fn update_status(
        &self,
        signature: &str,
        status: RegistrationStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Fetch a record by its transaction signature.
    async fn get_by_signature(&self, signature: &str) -> Result<Option<RegistrationRecord>>;

    /// Aggregate counts and SOL totals grouped by day, status, and network.
    async fn summarize(&self, query: &SummaryQuery) -> Result<Vec<SummaryRow>>;

    /// Total number of stored records.
    async fn record_count(&self) -> Result<i64>;

    /// Health check for the storage backend.
    async fn health_check(&self) -> Result<bool>;
}
