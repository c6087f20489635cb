// Collection Scan Operator
//
// Reads the documents of one collection through a backend cursor and turns
// each into a row of the scanned table, one value per declared column.

use std::sync::Arc;

use bson::Document;
use log::debug;

use crate::catalog::Table;
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::operators::{not_open, Operator};
use crate::query::executor::result::{QueryResult, Row, TableRow};
use crate::query::executor::value::SqlValue;
use crate::store::filter::lookup_path;
use crate::store::Cursor;

/// Scans a collection, optionally through a filter document
pub struct ScanOperator {
    alias: String,
    database: String,
    table: Table,
    filter: Document,
    cursor: Option<Box<dyn Cursor>>,
}

impl ScanOperator {
    pub fn new(alias: impl Into<String>, database: impl Into<String>, table: Table, filter: Option<Document>) -> Self {
        ScanOperator {
            alias: alias.into(),
            database: database.into(),
            table,
            filter: filter.unwrap_or_default(),
            cursor: None,
        }
    }

    fn to_row(&self, document: &Document) -> Row {
        let mut table_row = TableRow::new(self.alias.clone());
        table_row.collection = Some(self.table.collection().to_string());
        for column in self.table.columns() {
            let value = SqlValue::from_bson(lookup_path(document, column.field())).coerce_to(column.sql_type());
            table_row.push(column.name(), value);
        }
        Row::new(vec![table_row])
    }
}

impl Operator for ScanOperator {
    fn open(&mut self, ctx: &Arc<ExecutionContext>) -> QueryResult<()> {
        let database = if self.database.is_empty() {
            ctx.database()
        } else {
            &self.database
        };
        debug!(
            "Scanning {}.{} as {} with filter {}",
            database,
            self.table.collection(),
            self.alias,
            self.filter
        );
        let cursor = ctx.session().find(database, self.table.collection(), &self.filter)?;
        self.cursor = Some(cursor);
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        let cursor = self.cursor.as_mut().ok_or_else(|| not_open("scan"))?;
        match cursor.next_document() {
            Some(document) => Ok(Some(self.to_row(&document?))),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> QueryResult<()> {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close()?;
        }
        Ok(())
    }
}
