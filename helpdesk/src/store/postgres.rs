//! `PostgreSQL` ticket store.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tickets (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     user_id UUID NOT NULL,
//!     subject TEXT NOT NULL CHECK (subject <> ''),
//!     description TEXT NOT NULL CHECK (description <> ''),
//!     status TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL,
//!     CHECK (created_at <= updated_at)
//! );
//! CREATE INDEX idx_tickets_user_created ON tickets (user_id, created_at DESC);
//! ```

use super::{StorageError, StoreFuture, TicketStore};
use crate::config::DatabaseConfig;
use crate::types::{NewTicket, OwnerId, Ticket, TicketId, TicketStatus};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: [&str; 2] = [
    r"
    CREATE TABLE IF NOT EXISTS tickets (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL,
        subject TEXT NOT NULL CHECK (subject <> ''),
        description TEXT NOT NULL CHECK (description <> ''),
        status TEXT NOT NULL
            CHECK (status IN ('Open', 'In Progress', 'On Hold', 'Resolved', 'Closed')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (created_at <= updated_at)
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_tickets_user_created ON tickets (user_id, created_at DESC)",
];

const TICKET_COLUMNS: &str = "id, user_id, subject, description, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    user_id: Uuid,
    subject: String,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StorageError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status = TicketStatus::from_str(&row.status)
            .map_err(|e| StorageError::Corrupt(format!("ticket {}: {e}", row.id)))?;

        Ok(Self {
            id: TicketId::from_uuid(row.id),
            owner_id: OwnerId::from_uuid(row.user_id),
            subject: row.subject,
            description: row.description,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn storage_error(context: &str, error: sqlx::Error) -> StorageError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StorageError::Unavailable(format!("{context}: {error}"))
        },
        other => StorageError::Query(format!("{context}: {other}")),
    }
}

/// Ticket store on a `PostgreSQL` connection pool
///
/// The pool is injected; whoever built it closes it at shutdown.
#[derive(Debug, Clone)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Wrap an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool from configuration and wrap it
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the URL or SSL mode is invalid
    /// or no connection can be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let ssl_mode = PgSslMode::from_str(&config.ssl_mode)
            .map_err(|e| StorageError::Unavailable(format!("Invalid SSL mode: {e}")))?;
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| StorageError::Unavailable(format!("Invalid database URL: {e}")))?
            .ssl_mode(ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Unavailable(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to ticket database"
        );
        Ok(Self::new(pool))
    }

    /// Create the `tickets` table and its index if they don't exist
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if a DDL statement fails.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error("Migration failed", e))?;
        }
        tracing::debug!("Ticket schema up to date");
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl TicketStore for PostgresTicketStore {
    fn insert(&self, ticket: NewTicket) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            let query = format!(
                "INSERT INTO tickets (user_id, subject, description, status, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {TICKET_COLUMNS}"
            );

            let row: TicketRow = sqlx::query_as(&query)
                .bind(ticket.owner_id.as_uuid())
                .bind(&ticket.subject)
                .bind(&ticket.description)
                .bind(ticket.status.as_str())
                .bind(ticket.created_at)
                .bind(ticket.updated_at)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage_error("Failed to insert ticket", e))?;

            Ticket::try_from(row)
        })
    }

    fn list_by_owner(&self, owner: OwnerId) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = $1 ORDER BY created_at DESC"
            );

            let rows: Vec<TicketRow> = sqlx::query_as(&query)
                .bind(owner.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| storage_error("Failed to list tickets", e))?;

            rows.into_iter().map(Ticket::try_from).collect()
        })
    }

    fn get(&self, owner: OwnerId, id: TicketId) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let query =
                format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 AND user_id = $2");

            let row: Option<TicketRow> = sqlx::query_as(&query)
                .bind(id.as_uuid())
                .bind(owner.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error("Failed to fetch ticket", e))?;

            row.map(Ticket::try_from).transpose()
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Unavailable(format!("Ping failed: {e}")))?;
            Ok(())
        })
    }
}
