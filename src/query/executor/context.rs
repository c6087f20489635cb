// Execution Context
//
// Per-query state handed to every operator when it is opened: the backend
// session, the connection's values for information functions, the engine
// configuration, the cancellation token and the stack of outer rows that
// correlated subqueries read from.

use std::sync::Arc;

use crate::common::cancel::CancellationToken;
use crate::common::config::EngineConfig;
use crate::query::executor::result::{QueryError, QueryResult, Row};
use crate::store::Session;

/// Connection values exposed through information functions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionInfo {
    pub connection_id: u32,
    pub last_insert_id: u64,
    pub affected_rows: i64,
}

#[derive(Clone)]
pub struct ExecutionContext {
    session: Arc<dyn Session>,
    database: String,
    connection: ConnectionInfo,
    config: EngineConfig,
    cancel: CancellationToken,
    /// Rows of enclosing queries, innermost last
    outer: Vec<Row>,
}

impl ExecutionContext {
    pub fn new(session: Arc<dyn Session>, database: impl Into<String>, config: EngineConfig) -> Self {
        ExecutionContext {
            session,
            database: database.into(),
            connection: ConnectionInfo::default(),
            config,
            cancel: CancellationToken::new(),
            outer: Vec::new(),
        }
    }

    pub fn with_connection(mut self, connection: ConnectionInfo) -> Self {
        self.connection = connection;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Database selected for the statement
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn check_cancelled(&self) -> QueryResult<()> {
        if self.cancel.is_cancelled() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Row of the query `depth` levels out; depth 1 is the direct parent
    pub fn outer_row(&self, depth: usize) -> Option<&Row> {
        self.outer.len().checked_sub(depth).and_then(|i| self.outer.get(i))
    }

    /// Context for a subquery evaluated on behalf of `row`
    pub fn correlated(&self, row: &Row) -> Arc<ExecutionContext> {
        let mut child = self.clone();
        child.outer.push(row.clone());
        Arc::new(child)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("database", &self.database)
            .field("connection", &self.connection)
            .field("config", &self.config)
            .field("outer_rows", &self.outer.len())
            .finish()
    }
}
