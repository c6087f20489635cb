//! Query Evaluation Facade
//!
//! `Evaluator::evaluate` runs the whole pipeline for one statement: parse
//! (unless a parsed statement is supplied), resolve names, plan, build the
//! operator tree and open it. The caller gets the output column labels and
//! a [`RowIter`] over the rows.

use std::sync::Arc;

use log::debug;

use crate::catalog::Schema;
use crate::common::cancel::CancellationToken;
use crate::common::config::EngineConfig;
use crate::query::algebrizer::algebrize;
use crate::query::executor::context::{ConnectionInfo, ExecutionContext};
use crate::query::executor::engine::RowIter;
use crate::query::executor::result::QueryResult;
use crate::query::parser::{parse, Statement};
use crate::query::planner::{LogicalPlan, Planner};
use crate::store::Session;

/// What the engine needs to know about the client connection
pub trait ConnectionContext {
    /// Backend session used to read collections
    fn session(&self) -> Arc<dyn Session>;

    /// Database selected on the connection, if any
    fn current_database(&self) -> Option<String>;

    fn last_insert_id(&self) -> u64;

    fn affected_rows(&self) -> i64;

    fn connection_id(&self) -> u32;
}

/// A connection described by plain values
#[derive(Clone)]
pub struct SimpleConnection {
    session: Arc<dyn Session>,
    database: Option<String>,
    info: ConnectionInfo,
}

impl SimpleConnection {
    pub fn new(session: Arc<dyn Session>) -> Self {
        SimpleConnection {
            session,
            database: None,
            info: ConnectionInfo::default(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_info(mut self, info: ConnectionInfo) -> Self {
        self.info = info;
        self
    }

    /// Change the selected database, as `USE db` would
    pub fn set_database(&mut self, database: impl Into<String>) {
        self.database = Some(database.into());
    }
}

impl ConnectionContext for SimpleConnection {
    fn session(&self) -> Arc<dyn Session> {
        Arc::clone(&self.session)
    }

    fn current_database(&self) -> Option<String> {
        self.database.clone()
    }

    fn last_insert_id(&self) -> u64 {
        self.info.last_insert_id
    }

    fn affected_rows(&self) -> i64 {
        self.info.affected_rows
    }

    fn connection_id(&self) -> u32 {
        self.info.connection_id
    }
}

/// Compiles and runs SELECT statements against a schema
pub struct Evaluator {
    schema: Arc<Schema>,
    config: EngineConfig,
}

impl Evaluator {
    pub fn new(schema: Arc<Schema>, config: EngineConfig) -> Self {
        Evaluator { schema, config }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate a query. `database` may be empty, in which case the
    /// connection's current database is used for unqualified tables.
    pub fn evaluate(
        &self,
        database: &str,
        query: &str,
        statement: Option<Statement>,
        conn: &dyn ConnectionContext,
    ) -> QueryResult<(Vec<String>, RowIter)> {
        self.evaluate_cancellable(database, query, statement, conn, CancellationToken::new())
    }

    /// Like [`Evaluator::evaluate`], stopping with `Cancelled` once `cancel`
    /// is triggered
    pub fn evaluate_cancellable(
        &self,
        database: &str,
        query: &str,
        statement: Option<Statement>,
        conn: &dyn ConnectionContext,
        cancel: CancellationToken,
    ) -> QueryResult<(Vec<String>, RowIter)> {
        let database = self.database_for(database, conn);
        let plan = self.compile(&database, query, statement)?;

        let info = ConnectionInfo {
            connection_id: conn.connection_id(),
            last_insert_id: conn.last_insert_id(),
            affected_rows: conn.affected_rows(),
        };
        let ctx = ExecutionContext::new(conn.session(), database, self.config.clone())
            .with_connection(info)
            .with_cancellation(cancel);
        let rows = RowIter::open(&plan, Arc::new(ctx))?;
        Ok((rows.labels(), rows))
    }

    /// Plan a query without running it
    pub fn explain(&self, database: &str, query: &str, conn: &dyn ConnectionContext) -> QueryResult<LogicalPlan> {
        let database = self.database_for(database, conn);
        self.compile(&database, query, None)
    }

    fn database_for(&self, database: &str, conn: &dyn ConnectionContext) -> String {
        if database.is_empty() {
            conn.current_database().unwrap_or_default()
        } else {
            database.to_string()
        }
    }

    fn compile(&self, database: &str, query: &str, statement: Option<Statement>) -> QueryResult<LogicalPlan> {
        let mut statement = match statement {
            Some(statement) => statement,
            None => parse(query)?,
        };
        algebrize(&mut statement, &self.schema, database)?;
        let plan = Planner::new(&self.schema, &self.config).plan(&statement)?;
        debug!("Logical plan:\n{}", plan);
        Ok(plan)
    }
}
