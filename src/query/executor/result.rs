// Query Results
//
// Rows flowing between operators, the column descriptors every plan node
// exposes, the engine-wide error type and a collected result set.

use std::fmt;

use thiserror::Error;

use crate::catalog::SqlType;
use crate::query::executor::value::SqlValue;
use crate::query::parser::ParseError;
use crate::store::StoreError;

/// Describes one output column of a plan node
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Table alias the column belongs to; empty for computed columns
    pub table: String,
    /// Column name used for lookups within the owning table
    pub name: String,
    /// Display label presented to clients
    pub label: String,
    pub sql_type: SqlType,
}

impl ColumnDescriptor {
    pub fn new(table: impl Into<String>, name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        ColumnDescriptor {
            table: table.into(),
            label: name.clone(),
            name,
            sql_type,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// The values a row carries for one source table
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Table alias
    pub table: String,
    /// Ordered column/value pairs
    pub values: Vec<(String, SqlValue)>,
    /// Backend collection the values came from, when they came from a scan
    pub collection: Option<String>,
}

impl TableRow {
    pub fn new(table: impl Into<String>) -> Self {
        TableRow {
            table: table.into(),
            values: Vec::new(),
            collection: None,
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.values.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }
}

/// A row in flight: one table-row per contributing table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub data: Vec<TableRow>,
    /// Rows of the group this row represents, set by the grouping operator
    pub group: Option<Vec<Row>>,
}

impl Row {
    pub fn new(data: Vec<TableRow>) -> Self {
        Row { data, group: None }
    }

    /// Build a row from column descriptors and positional values, splitting
    /// the values into table-rows by owning table
    pub fn from_columns(columns: &[ColumnDescriptor], values: Vec<SqlValue>) -> Self {
        let mut data: Vec<TableRow> = Vec::new();
        for (column, value) in columns.iter().zip(values) {
            match data.last_mut() {
                Some(last) if last.table == column.table => last.push(column.name.clone(), value),
                _ => {
                    let mut table_row = TableRow::new(column.table.clone());
                    table_row.push(column.name.clone(), value);
                    data.push(table_row);
                }
            }
        }
        Row::new(data)
    }

    /// Row of absent values shaped like the given columns, used to pad
    /// the unmatched side of an outer join
    pub fn absent(columns: &[ColumnDescriptor]) -> Self {
        Row::from_columns(columns, vec![SqlValue::NoValue; columns.len()])
    }

    /// Concatenate two rows
    pub fn join(left: &Row, right: &Row) -> Self {
        let mut data = left.data.clone();
        data.extend(right.data.iter().cloned());
        Row::new(data)
    }

    pub fn table_row(&self, table: &str) -> Option<&TableRow> {
        self.data.iter().find(|t| t.table.eq_ignore_ascii_case(table))
    }

    /// Look up a value by table alias and column name
    pub fn get(&self, table: &str, column: &str) -> Option<&SqlValue> {
        self.data
            .iter()
            .filter(|t| t.table.eq_ignore_ascii_case(table))
            .find_map(|t| t.get(column))
    }

    /// All values in order
    pub fn values(&self) -> Vec<&SqlValue> {
        self.data.iter().flat_map(|t| t.values.iter().map(|(_, v)| v)).collect()
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.data
            .into_iter()
            .flat_map(|t| t.values.into_iter().map(|(_, v)| v))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|t| t.values.is_empty())
    }
}

/// Represents query compilation and execution errors
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    /// Query text could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// Table reference does not name a table in scope or in the schema
    #[error("Unknown table '{0}'")]
    UnknownTable(String),
    /// Column reference does not resolve
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
    /// Unqualified column matches several tables in the same scope
    #[error("Column '{0}' is ambiguous")]
    AmbiguousColumn(String),
    /// Derived table without an alias
    #[error("Every derived table must have its own alias")]
    DerivedTableAlias,
    /// Qualifier names a table hidden behind a derived table alias
    #[error("Table '{table}' is only visible inside derived table '{alias}'")]
    AliasMismatch { table: String, alias: String },
    /// The same alias is bound twice in one scope
    #[error("Not unique table/alias: '{0}'")]
    DuplicateAlias(String),
    /// Derived table exposes the same column name twice
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),
    /// Star or an empty table list without any source
    #[error("No tables used")]
    NoTablesUsed,
    /// No database given and none selected on the connection
    #[error("No database selected")]
    NoDatabaseSelected,
    /// GROUP BY term that does not resolve against the grouped source
    #[error("Group term not in scope: {0}")]
    GroupTermNotInScope(String),
    /// Recognised but unsupported construct
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    /// Operands of incompatible types
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Numeric overflow")]
    NumericOverflow,
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    /// Function called with the wrong number or kind of arguments
    #[error("Incorrect arguments to '{0}'")]
    WrongArgumentCount(String),
    /// Aggregate used where it is not allowed
    #[error("Invalid use of aggregate: {0}")]
    InvalidAggregate(String),
    /// Failure reported by the document store
    #[error("Backend error: {0}")]
    Backend(#[from] StoreError),
    /// Failure while producing rows
    #[error("Execution error: {0}")]
    Execution(String),
    /// The caller cancelled the query
    #[error("Query cancelled")]
    Cancelled,
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// A fully collected result
#[derive(Debug, Default)]
pub struct QueryResultSet {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<SqlValue>>,
}

impl QueryResultSet {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        QueryResultSet {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row.into_values());
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Display labels of the columns
    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column by position
    pub fn column_values(&self, index: usize) -> Vec<&SqlValue> {
        self.rows.iter().filter_map(|row| row.get(index)).collect()
    }

    /// Format the result set as a text table
    pub fn to_string_table(&self) -> String {
        if self.columns.is_empty() {
            return "Empty result".to_string();
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i).map(|c| c.len()))
                    .chain(std::iter::once(col.label.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut result = String::new();
        let separator: String = widths.iter().map(|w| format!("+{}", "-".repeat(w + 2))).collect::<String>() + "+\n";

        result.push_str(&separator);
        for (col, width) in self.columns.iter().zip(&widths) {
            result.push_str(&format!("| {:width$} ", col.label, width = width));
        }
        result.push_str("|\n");
        result.push_str(&separator);
        for row in &cells {
            for (cell, width) in row.iter().zip(&widths) {
                result.push_str(&format!("| {:width$} ", cell, width = width));
            }
            result.push_str("|\n");
        }
        result.push_str(&separator);
        result
    }
}

impl fmt::Display for QueryResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_table())
    }
}
