//! SQLite implementation of the registrations store.
//!
//! Backs the admin dashboard's aggregate queries with a single
//! registrations table and parameterized SQL.

use crate::analytics::storage::{
    RegistrationRecord, RegistrationStatus, RegistrationStore, SummaryQuery, SummaryRow,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, Pool, Sqlite};
use tracing::{debug, info};

const DB_FILE: &str = "./registrations.db";

#[derive(FromRow)]
struct RegistrationRow {
    id: i64,
    name: String,
    signature: Option<String>,
    network: String,
    status: String,
    cost_sol: f64,
    registered_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl RegistrationRow {
    fn into_record(self) -> Result<RegistrationRecord> {
        Ok(RegistrationRecord {
            id: Some(self.id),
            name: self.name,
            signature: self.signature,
            network: self.network.parse().map_err(|e| anyhow!("{e}"))?,
            status: self.status.parse().map_err(|e| anyhow!("{e}"))?,
            cost_sol: self.cost_sol,
            registered_at: self.registered_at,
            confirmed_at: self.confirmed_at,
        })
    }
}

#[derive(FromRow)]
struct SummaryRowDb {
    day: String,
    status: String,
    network: String,
    registrations: i64,
    total_sol: f64,
}

/// SQLite-backed registrations store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Connect to the given sqlx database URL and create the schema.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to connect to SQLite database")?;

        Self::create_schema(&pool).await?;
        info!("registrations store connected to {database_url}");
        Ok(Self { pool })
    }

    /// Open the default on-disk database file.
    pub async fn open_default() -> Result<Self> {
        Self::new(&format!("sqlite:{DB_FILE}?mode=rwc")).await
    }

    async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS registrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                signature TEXT UNIQUE,
                network TEXT NOT NULL,
                status TEXT NOT NULL,
                cost_sol REAL NOT NULL,
                registered_at TEXT NOT NULL,
                confirmed_at TEXT
            );
            "#,
        )
        .execute(pool)
        .await
        .context("failed to create registrations table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_registrations_registered_at
             ON registrations (registered_at);",
        )
        .execute(pool)
        .await
        .context("failed to create registrations index")?;

        Ok(())
    }

    /// The underlying pool, for collaborators issuing their own queries.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl RegistrationStore for SqliteStore {
    async fn insert(&self, record: &RegistrationRecord) -> Result<i64> {
        debug!("inserting registration record for name: {}", record.name);
        let id = sqlx::query(
            r#"
            INSERT INTO registrations
                (name, signature, network, status, cost_sol, registered_at, confirmed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?);
            "#,
        )
        .bind(&record.name)
        .bind(&record.signature)
        .bind(record.network.to_string())
        .bind(record.status.to_string())
        .bind(record.cost_sol)
        .bind(record.registered_at)
        .bind(record.confirmed_at)
        .execute(&self.pool)
        .await
        .context("failed to insert registration record")?
        .last_insert_rowid();
        Ok(id)
    }

    async fn update_status(
        &self,
        signature: &str,
        status: RegistrationStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        debug!("updating status for signature: {signature}");
        sqlx::query(
            r#"
            UPDATE registrations
            SET status = ?, confirmed_at = COALESCE(?, confirmed_at)
            WHERE signature = ?;
            "#,
        )
        .bind(status.to_string())
        .bind(confirmed_at)
        .bind(signature)
        .execute(&self.pool)
        .await
        .context("failed to update registration status")?;
        Ok(())
    }

    async fn get_by_signature(&self, signature: &str) -> Result<Option<RegistrationRecord>> {
        let row: Option<RegistrationRow> =
            sqlx::query_as("SELECT * FROM registrations WHERE signature = ?;")
                .bind(signature)
                .fetch_optional(&self.pool)
                .await
                .context("failed to fetch registration by signature")?;
        row.map(RegistrationRow::into_record).transpose()
    }

    async fn summarize(&self, query: &SummaryQuery) -> Result<Vec<SummaryRow>> {
        let start = query.start_date.map(|d| d.to_string());
        let end = query.end_date.map(|d| d.to_string());
        let network = query.network.map(|n| n.to_string());
        let status = query.status.map(|s| s.to_string());

        let rows: Vec<SummaryRowDb> = sqlx::query_as(
            r#"
            SELECT date(registered_at) AS day, status, network,
                   COUNT(*) AS registrations,
                   COALESCE(SUM(cost_sol), 0.0) AS total_sol
            FROM registrations
            WHERE (? IS NULL OR date(registered_at) >= ?)
              AND (? IS NULL OR date(registered_at) <= ?)
              AND (? IS NULL OR network = ?)
              AND (? IS NULL OR status = ?)
            GROUP BY day, status, network
            ORDER BY day ASC, status ASC;
            "#,
        )
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .bind(&network)
        .bind(&network)
        .bind(&status)
        .bind(&status)
        .fetch_all(&self.pool)
        .await
        .context("failed to run summary query")?;

        rows.into_iter()
            .map(|row| {
                Ok(SummaryRow {
                    day: row.day,
                    status: row.status.parse().map_err(|e| anyhow!("{e}"))?,
                    network: row.network.parse().map_err(|e| anyhow!("{e}"))?,
                    registrations: row.registrations,
                    total_sol: row.total_sol,
                })
            })
            .collect()
    }

    async fn record_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations;")
            .fetch_one(&self.pool)
            .await
            .context("failed to count registrations")?;
        Ok(count)
    }

    async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1;")
            .execute(&self.pool)
            .await
            .context("storage health check failed")?;
        Ok(true)
    }
}
