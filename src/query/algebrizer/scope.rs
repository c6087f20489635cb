// Resolution Scopes
//
// Scopes live in an arena owned by the algebrizer and refer to their parent
// by index. A statement's FROM clause fills its scope with table bindings;
// its select list adds column bindings that later clauses may reference.

use crate::catalog::Table;
use crate::query::parser::ast::Expression;

pub type ScopeId = usize;

/// What a table binding reads from
#[derive(Debug, Clone)]
pub enum BindingSource {
    /// A schema table backed by a collection
    Collection(Table),
    /// A derived table resolved in its own scope
    Derived {
        scope: ScopeId,
        /// Output labels of the derived query, in order
        columns: Vec<String>,
        /// Table names and aliases bound inside the derived query
        source_tables: Vec<String>,
    },
}

/// A table visible in a scope under `alias`
#[derive(Debug, Clone)]
pub struct TableBinding {
    pub alias: String,
    pub source: BindingSource,
}

impl TableBinding {
    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<String> {
        match &self.source {
            BindingSource::Collection(table) => table.columns().iter().map(|c| c.name().to_string()).collect(),
            BindingSource::Derived { columns, .. } => columns.clone(),
        }
    }

    /// Canonical spelling of a column, if the binding has it
    pub fn find_column(&self, name: &str) -> Option<String> {
        match &self.source {
            BindingSource::Collection(table) => table.column(name).map(|c| c.name().to_string()),
            BindingSource::Derived { columns, .. } => {
                columns.iter().find(|c| c.eq_ignore_ascii_case(name)).cloned()
            }
        }
    }
}

/// A select-list entry visible to GROUP BY, HAVING and ORDER BY
#[derive(Debug, Clone)]
pub struct ColumnBinding {
    pub alias: String,
    /// The resolved select expression
    pub expr: Expression,
    /// Owning table when the expression is a plain column
    pub table: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub tables: Vec<TableBinding>,
    pub columns: Vec<ColumnBinding>,
    /// (alias, column) pairs merged away by USING or NATURAL joins
    pub hidden: Vec<(String, String)>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>) -> Self {
        Scope {
            parent,
            ..Default::default()
        }
    }

    pub fn table(&self, alias: &str) -> Option<&TableBinding> {
        self.tables.iter().find(|t| t.alias.eq_ignore_ascii_case(alias))
    }

    pub fn is_hidden(&self, alias: &str, column: &str) -> bool {
        self.hidden
            .iter()
            .any(|(t, c)| t.eq_ignore_ascii_case(alias) && c.eq_ignore_ascii_case(column))
    }

    pub fn column_binding(&self, alias: &str) -> Option<&ColumnBinding> {
        self.columns.iter().find(|c| c.alias.eq_ignore_ascii_case(alias))
    }
}
