use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::filter::FilterError;

/// Errors from the storage layer, shared by every `Store` implementation
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Bad filter: {0}")]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

/// Unique constraints the services translate into their own messages.
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const INVOICE_NUMBER_KEY: &str = "invoices_tenant_id_invoice_number_key";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl DatabaseError {
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, DatabaseError::Conflict(name) if name == constraint)
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned());
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => {
                        DatabaseError::Conflict(db_err.constraint().unwrap_or_else(|| db_err.message()).to_string())
                    }
                    _ => DatabaseError::Sqlx(sqlx::Error::Database(db_err)),
                }
            }
            other @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_)) => {
                DatabaseError::ConnectionError(other.to_string())
            }
            other => DatabaseError::Sqlx(other),
        }
    }
}

/// Connection pool setup for the Postgres store
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| DatabaseError::ConnectionError("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool for: {}", Self::redacted_url(url)?);
        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Connection string with the password masked, for logs.
    pub fn redacted_url(url: &str) -> Result<String, DatabaseError> {
        let mut parsed = url::Url::parse(url)
            .map_err(|e| DatabaseError::ConnectionError(format!("Invalid database URL: {}", e)))?;
        if parsed.password().is_some() {
            // set_password only fails for URLs that cannot carry credentials
            let _ = parsed.set_password(Some("****"));
        }
        Ok(parsed.into())
    }
}
