use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::database::statement::Statement;

/// Errors raised by the query service and the storage backends beneath it
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("No session to query on")]
    NoSession,

    #[error("No query queued to run")]
    NoQueryQueued,

    #[error("A transaction is already open on this query service")]
    SessionActive,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("No result found")]
    NoResult,

    #[error("Expected exactly one result, found {0}")]
    MultipleResults(usize),

    #[error("Statement '{0}' is not supported by this backend")]
    Unsupported(&'static str),

    #[error("Failed to decode result row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::Database(ref db) => {
                let detail = db.message().to_string();
                match db.kind() {
                    ErrorKind::UniqueViolation => QueryError::Duplicate(detail),
                    ErrorKind::ForeignKeyViolation => QueryError::InvalidReference(detail),
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        QueryError::Constraint(detail)
                    }
                    _ => QueryError::Database(err),
                }
            }
            sqlx::Error::RowNotFound => QueryError::NoResult,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                QueryError::Connection(err.to_string())
            }
            other => QueryError::Database(other),
        }
    }
}

impl QueryError {
    /// Transport and decoding failures cannot be classified into a domain outcome
    pub fn is_transport(&self) -> bool {
        matches!(self, QueryError::Connection(_) | QueryError::Database(_) | QueryError::Decode(_))
    }
}

/// Rows produced by the last executed statement, one JSON object per row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    rows: Vec<Value>,
}

impl QueryResults {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn one<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        match self.rows.len() {
            0 => Err(QueryError::NoResult),
            1 => Ok(serde_json::from_value(self.rows[0].clone())?),
            n => Err(QueryError::MultipleResults(n)),
        }
    }

    pub fn optional<T: DeserializeOwned>(&self) -> Result<Option<T>, QueryError> {
        match self.one() {
            Ok(row) => Ok(Some(row)),
            Err(QueryError::NoResult) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn all<T: DeserializeOwned>(&self) -> Result<Vec<T>, QueryError> {
        self.rows
            .iter()
            .map(|row| serde_json::from_value(row.clone()).map_err(QueryError::from))
            .collect()
    }
}

/// One open unit of work against a backend
#[async_trait]
pub trait Session: Send + Sync {
    async fn execute(&mut self, statement: &Statement) -> Result<QueryResults, QueryError>;

    async fn commit(&mut self) -> Result<(), QueryError>;

    async fn rollback(&mut self) -> Result<(), QueryError>;
}

/// Process-wide source of sessions, shared by every query service
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Session>, QueryError>;

    /// Opens and immediately discards a session
    async fn health_check(&self) -> Result<(), QueryError> {
        let mut session = self.open().await?;
        session.execute(&Statement::Ping).await?;
        session.rollback().await
    }
}

/// Buffers statements and runs them, one at a time, inside a scoped transaction.
pub struct QueryService {
    sessions: Arc<dyn SessionFactory>,
    buffer: VecDeque<Statement>,
    session: Option<Box<dyn Session>>,
    results: Option<QueryResults>,
}

impl QueryService {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions,
            buffer: VecDeque::new(),
            session: None,
            results: None,
        }
    }

    /// Queue a statement. Allowed outside a transaction so work can be prepared early.
    pub fn add_query(&mut self, statement: Statement) {
        debug!("Queued statement {}", statement.name());
        self.buffer.push_back(statement);
    }

    pub fn queued(&self) -> usize {
        self.buffer.len()
    }

    pub fn in_transaction(&self) -> bool {
        self.session.is_some()
    }

    /// Run the oldest queued statement against the open session
    pub async fn exec_next(&mut self) -> Result<(), QueryError> {
        let session = self.session.as_mut().ok_or(QueryError::NoSession)?;
        let statement = self.buffer.pop_front().ok_or(QueryError::NoQueryQueued)?;

        debug!("Executing statement {}", statement.name());
        let results = session.execute(&statement).await?;
        self.results = Some(results);
        Ok(())
    }

    /// Last stored result set
    pub fn results(&self) -> Option<&QueryResults> {
        if !self.buffer.is_empty() {
            warn!("Reading results with {} statement(s) still queued", self.buffer.len());
        }
        self.results.as_ref()
    }

    pub fn one<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        self.results().ok_or(QueryError::NoResult)?.one()
    }

    pub fn optional<T: DeserializeOwned>(&self) -> Result<Option<T>, QueryError> {
        match self.results() {
            Some(results) => results.optional(),
            None => Ok(None),
        }
    }

    pub fn all<T: DeserializeOwned>(&self) -> Result<Vec<T>, QueryError> {
        match self.results() {
            Some(results) => results.all(),
            None => Ok(Vec::new()),
        }
    }

    /// Run `work` inside a fresh session.
    ///
    /// The session commits when `work` returns `Ok` and rolls back when it returns
    /// `Err`. Either way it is closed and cleared before this returns. A panic inside
    /// `work` drops the session, which backends treat as a rollback.
    pub async fn transaction<F, R, E>(&mut self, work: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(&'c mut QueryService) -> BoxFuture<'c, Result<R, E>> + Send,
        R: Send,
        E: From<QueryError> + Send,
    {
        if self.session.is_some() {
            return Err(QueryError::SessionActive.into());
        }

        let session = self.sessions.open().await?;
        debug!("Session opened");
        self.session = Some(session);

        let outcome = work(&mut *self).await;

        let Some(mut session) = self.session.take() else {
            return outcome;
        };

        match outcome {
            Ok(value) => {
                session.commit().await?;
                debug!("Session committed");
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = session.rollback().await {
                    warn!("Rollback failed: {}", rollback_err);
                } else {
                    debug!("Session rolled back");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::models::{AccountCreated, AuthenticationInfo};

    fn account(name: &str) -> Statement {
        Statement::CreateAccount {
            display_name: name.to_string(),
            biography: format!("{} hasn't added a bio.", name),
            password_hash: "hash".to_string(),
            salt_value: "salt".to_string(),
        }
    }

    fn lookup(name: &str) -> Statement {
        Statement::FetchAuthentication { display_name: name.to_string() }
    }

    #[tokio::test]
    async fn exec_next_outside_transaction_has_no_session() {
        let mut service = QueryService::new(Arc::new(MemoryStore::new()));
        service.add_query(account("alice"));

        let err = service.exec_next().await.unwrap_err();
        assert!(matches!(err, QueryError::NoSession));
        assert_eq!(service.queued(), 1);
    }

    #[tokio::test]
    async fn exec_next_with_empty_buffer_has_no_query() {
        let mut service = QueryService::new(Arc::new(MemoryStore::new()));

        let outcome: Result<(), QueryError> = service
            .transaction(|tx| Box::pin(async move { tx.exec_next().await }))
            .await;

        assert!(matches!(outcome, Err(QueryError::NoQueryQueued)));
        assert!(!service.in_transaction());
    }

    #[tokio::test]
    async fn buffer_drains_one_statement_per_exec() {
        let mut service = QueryService::new(Arc::new(MemoryStore::new()));
        for name in ["alice", "bobby", "carol"] {
            service.add_query(account(name));
        }
        assert_eq!(service.queued(), 3);

        let drained: Result<Vec<usize>, QueryError> = service
            .transaction(|tx| {
                Box::pin(async move {
                    let mut remaining = Vec::new();
                    while tx.queued() > 0 {
                        tx.exec_next().await?;
                        remaining.push(tx.queued());
                    }
                    Ok(remaining)
                })
            })
            .await;

        assert_eq!(drained.unwrap(), vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn statements_run_in_queue_order() {
        let store = Arc::new(MemoryStore::new());
        let mut service = QueryService::new(store.clone());

        let found: Result<AuthenticationInfo, QueryError> = service
            .transaction(|tx| {
                Box::pin(async move {
                    tx.add_query(account("alice"));
                    tx.add_query(lookup("alice"));
                    tx.exec_next().await?;
                    let created: AccountCreated = tx.one()?;
                    assert_eq!(created.display_name, "alice");
                    tx.exec_next().await?;
                    tx.one()
                })
            })
            .await;

        assert_eq!(found.unwrap().salt_value, "salt");
    }

    #[tokio::test]
    async fn failed_work_rolls_back() {
        let store = Arc::new(MemoryStore::new());
        let mut service = QueryService::new(store.clone());

        let outcome: Result<(), QueryError> = service
            .transaction(|tx| {
                Box::pin(async move {
                    tx.add_query(account("alice"));
                    tx.exec_next().await?;
                    Err(QueryError::NoResult)
                })
            })
            .await;
        assert!(outcome.is_err());
        assert!(!service.in_transaction());

        let after: Result<Option<AuthenticationInfo>, QueryError> = service
            .transaction(|tx| {
                Box::pin(async move {
                    tx.add_query(lookup("alice"));
                    tx.exec_next().await?;
                    tx.optional()
                })
            })
            .await;
        assert_eq!(after.unwrap(), None);
    }

    #[tokio::test]
    async fn successful_work_commits() {
        let store = Arc::new(MemoryStore::new());
        let mut first = QueryService::new(store.clone());
        let mut second = QueryService::new(store.clone());

        let created: Result<(), QueryError> = first
            .transaction(|tx| {
                Box::pin(async move {
                    tx.add_query(account("alice"));
                    tx.exec_next().await
                })
            })
            .await;
        created.unwrap();

        let found: Result<AuthenticationInfo, QueryError> = second
            .transaction(|tx| {
                Box::pin(async move {
                    tx.add_query(lookup("alice"));
                    tx.exec_next().await?;
                    tx.one()
                })
            })
            .await;
        assert_eq!(found.unwrap().display_name, "alice");
        assert_eq!(store.sessions_opened(), 2);
    }

    #[tokio::test]
    async fn nested_transactions_are_rejected() {
        let mut service = QueryService::new(Arc::new(MemoryStore::new()));

        let outcome: Result<(), QueryError> = service
            .transaction(|tx| {
                Box::pin(async move {
                    tx.transaction(|inner| Box::pin(async move { inner.exec_next().await }))
                        .await
                })
            })
            .await;

        assert!(matches!(outcome, Err(QueryError::SessionActive)));
    }

    #[test]
    fn sessions_can_be_shared_across_awaits() {
        fn assert_send_sync<T: ?Sized + Send + Sync>() {}
        assert_send_sync::<dyn Session>();
        assert_send_sync::<QueryService>();
    }

    #[test]
    fn optional_rejects_multiple_rows() {
        let results = QueryResults::new(vec![
            serde_json::json!({"display_name": "a"}),
            serde_json::json!({"display_name": "b"}),
        ]);
        let err = results.optional::<AccountCreated>().unwrap_err();
        assert!(matches!(err, QueryError::MultipleResults(2)));
        assert_eq!(results.all::<AccountCreated>().unwrap().len(), 2);
    }
}
