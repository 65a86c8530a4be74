use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::{PgArguments, PgPoolOptions}, PgPool, Postgres, Row, Transaction};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::query::{QueryError, QueryResults, Session, SessionFactory};
use crate::database::schema;
use crate::database::statement::Statement;

/// Errors from connecting to or preparing the database
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Session factory over an explicitly constructed Postgres pool.
///
/// Construct one per process and share it behind an `Arc`; every query service
/// opens its own transaction from it.
#[derive(Clone)]
pub struct PgSessionFactory {
    pool: PgPool,
    log_statements: bool,
}

impl PgSessionFactory {
    pub fn new(pool: PgPool, log_statements: bool) -> Self {
        Self { pool, log_statements }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let url = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url.as_str())
            .await?;

        info!("Created database pool for: {}", url.path().trim_start_matches('/'));
        Ok(Self::new(pool, config.enable_query_logging))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create any missing tables
    pub async fn apply_schema(&self) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        for ddl in schema::STATEMENTS {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        info!("Applied schema ({} statements)", schema::STATEMENTS.len());
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    async fn open(&self) -> Result<Box<dyn Session>, QueryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx: Some(tx), log_statements: self.log_statements }))
    }
}

struct PgSession {
    tx: Option<Transaction<'static, Postgres>>,
    log_statements: bool,
}

#[async_trait]
impl Session for PgSession {
    async fn execute(&mut self, statement: &Statement) -> Result<QueryResults, QueryError> {
        let tx = self.tx.as_mut().ok_or(QueryError::NoSession)?;
        let sql = statement.to_row_query();
        if self.log_statements {
            tracing::debug!("SQL [{}]: {}", statement.name(), sql.query);
        }

        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }

        let rows = q.fetch_all(&mut **tx).await?;
        let rows = rows
            .iter()
            .map(|row| row.try_get::<Value, _>("row"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResults::new(rows))
    }

    async fn commit(&mut self) -> Result<(), QueryError> {
        let tx = self.tx.take().ok_or(QueryError::NoSession)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), QueryError> {
        let tx = self.tx.take().ok_or(QueryError::NoSession)?;
        tx.rollback().await?;
        Ok(())
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays and objects both travel as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_requires_a_url() {
        let config = DatabaseConfig {
            url: None,
            max_connections: 1,
            connection_timeout: 1,
            enable_query_logging: false,
        };
        let err = PgSessionFactory::connect(&config).await.err().unwrap();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[tokio::test]
    async fn connect_rejects_malformed_urls() {
        let config = DatabaseConfig {
            url: Some("not a url".to_string()),
            max_connections: 1,
            connection_timeout: 1,
            enable_query_logging: false,
        };
        let err = PgSessionFactory::connect(&config).await.err().unwrap();
        assert!(matches!(err, DatabaseError::InvalidDatabaseUrl));
    }
}
