//! Name Resolution
//!
//! The algebrizer walks a parsed statement and rewrites it in place so that
//! every table reference names its canonical table and collection, and every
//! column reference carries the alias of the table it belongs to plus the
//! number of scopes between the reference and that table. Stars are
//! expanded, USING/NATURAL joins become explicit ON equalities, and select
//! labels are fixed. Running the pass twice yields the same tree.

mod scope;

use std::collections::HashSet;

use log::debug;

use crate::catalog::Schema;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::parser::ast::{
    AggregateArg, ColumnReference, Expression, JoinClause, JoinConstraint, JoinType, Operator, SelectColumn,
    SelectStatement, Statement, TableExpression, TableName, Value,
};

pub use self::scope::{BindingSource, ColumnBinding, Scope, ScopeId, TableBinding};

/// Clause a resolved expression belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Select,
    On,
    Where,
    GroupBy,
    Having,
    OrderBy,
}

impl Clause {
    fn allows_aggregates(self) -> bool {
        matches!(self, Clause::Select | Clause::Having | Clause::OrderBy)
    }

    /// Select-list aliases are visible here
    fn sees_aliases(self) -> bool {
        matches!(self, Clause::Having | Clause::OrderBy)
    }

    fn name(self) -> &'static str {
        match self {
            Clause::Select => "field list",
            Clause::On => "on clause",
            Clause::Where => "where clause",
            Clause::GroupBy => "group statement",
            Clause::Having => "having clause",
            Clause::OrderBy => "order clause",
        }
    }
}

/// Resolve `statement` in place against `schema`, using `database` for
/// unqualified table names
pub fn algebrize(statement: &mut Statement, schema: &Schema, database: &str) -> QueryResult<()> {
    Algebrizer::new(schema, database).resolve(statement)
}

/// Resolution pass over one statement and its nested queries
pub struct Algebrizer<'a> {
    schema: &'a Schema,
    database: String,
    scopes: Vec<Scope>,
}

impl<'a> Algebrizer<'a> {
    pub fn new(schema: &'a Schema, database: &str) -> Self {
        Algebrizer {
            schema,
            database: database.to_string(),
            scopes: Vec::new(),
        }
    }

    pub fn resolve(mut self, statement: &mut Statement) -> QueryResult<()> {
        self.resolve_statement(statement, None)?;
        debug!("Resolved statement: {}", statement);
        Ok(())
    }

    /// Scopes created so far
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    fn push_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope::new(parent));
        self.scopes.len() - 1
    }

    fn resolve_statement(&mut self, statement: &mut Statement, parent: Option<ScopeId>) -> QueryResult<ScopeId> {
        match statement {
            Statement::Select(select) => self.resolve_select(select, parent),
            Statement::Union { left, right, .. } => {
                let scope = self.resolve_statement(left, parent)?;
                self.resolve_statement(right, parent)?;
                Ok(scope)
            }
        }
    }

    fn resolve_select(&mut self, select: &mut SelectStatement, parent: Option<ScopeId>) -> QueryResult<ScopeId> {
        let scope = self.push_scope(parent);

        for item in select.from.iter_mut() {
            self.bind_table_expression(item, scope)?;
        }

        self.expand_stars(select, scope)?;
        for column in select.columns.iter_mut() {
            if let SelectColumn::Expression { expr, alias } = column {
                let label = alias.get_or_insert_with(|| label_for(expr)).clone();
                self.resolve_expr(expr, scope, Clause::Select, false)?;
                let table = match expr {
                    Expression::Column(c) => c.table.clone(),
                    _ => None,
                };
                self.scopes[scope].columns.push(ColumnBinding {
                    alias: label,
                    expr: expr.clone(),
                    table,
                });
            }
        }

        if let Some(where_clause) = select.where_clause.as_mut() {
            self.resolve_expr(where_clause, scope, Clause::Where, false)?;
        }

        for term in select.group_by.iter_mut() {
            self.resolve_group_term(term, scope)?;
        }

        if let Some(having) = select.having.as_mut() {
            self.resolve_expr(having, scope, Clause::Having, false)?;
        }

        for item in select.order_by.iter_mut() {
            if let Some(position) = ordinal(&item.expr) {
                item.expr = self
                    .select_expression(scope, position)
                    .ok_or_else(|| QueryError::UnknownColumn(item.expr.to_string()))?;
                continue;
            }
            self.resolve_expr(&mut item.expr, scope, Clause::OrderBy, false)?;
        }

        Ok(scope)
    }

    /// The resolved expression of the 1-based select position
    fn select_expression(&self, scope: ScopeId, position: i64) -> Option<Expression> {
        let index = usize::try_from(position).ok()?.checked_sub(1)?;
        self.scopes[scope].columns.get(index).map(|c| c.expr.clone())
    }

    fn resolve_group_term(&mut self, term: &mut Expression, scope: ScopeId) -> QueryResult<()> {
        let text = term.to_string();
        let substitute = match ordinal(term) {
            Some(position) => Some(
                self.select_expression(scope, position)
                    .ok_or_else(|| QueryError::GroupTermNotInScope(text.clone()))?,
            ),
            None => match &*term {
                Expression::Column(c) if c.table.is_none() && c.depth == 0 => {
                    self.scopes[scope].column_binding(&c.name).map(|b| b.expr.clone())
                }
                _ => None,
            },
        };

        if let Some(expr) = substitute {
            if expr.contains_aggregate() {
                return Err(QueryError::InvalidAggregate(format!("can't group on '{}'", text)));
            }
            *term = expr;
            return Ok(());
        }

        self.resolve_expr(term, scope, Clause::GroupBy, false).map_err(|e| match e {
            QueryError::UnknownColumn(_) | QueryError::UnknownTable(_) | QueryError::AliasMismatch { .. } => {
                QueryError::GroupTermNotInScope(text)
            }
            other => other,
        })
    }

    // FROM clause

    fn bind_table_expression(&mut self, item: &mut TableExpression, scope: ScopeId) -> QueryResult<()> {
        match item {
            TableExpression::Table(table) => self.bind_table(table, scope),
            TableExpression::Join(join) => self.bind_join(join, scope),
            TableExpression::Parenthesized(items) => {
                if items.is_empty() {
                    return Err(QueryError::NoTablesUsed);
                }
                for item in items.iter_mut() {
                    self.bind_table_expression(item, scope)?;
                }
                Ok(())
            }
            TableExpression::Subquery { query, alias } => {
                let alias = alias.clone().ok_or(QueryError::DerivedTableAlias)?;
                let inner = self.resolve_statement(query, None)?;
                let columns = output_labels(query);
                let mut seen = HashSet::new();
                for column in &columns {
                    if !seen.insert(column.to_lowercase()) {
                        return Err(QueryError::DuplicateColumn(column.clone()));
                    }
                }
                let source_tables = self.visible_table_names(inner);
                self.add_binding(
                    scope,
                    TableBinding {
                        alias,
                        source: BindingSource::Derived {
                            scope: inner,
                            columns,
                            source_tables,
                        },
                    },
                )
            }
        }
    }

    fn bind_table(&mut self, table: &mut TableName, scope: ScopeId) -> QueryResult<()> {
        let database_name = match &table.database {
            Some(database) => database.clone(),
            None if self.database.is_empty() => return Err(QueryError::NoDatabaseSelected),
            None => self.database.clone(),
        };
        let database = self
            .schema
            .database(&database_name)
            .ok_or_else(|| QueryError::UnknownTable(format!("{}.{}", database_name, table.name)))?;
        let definition = database
            .table(&table.name)
            .ok_or_else(|| QueryError::UnknownTable(table.name.clone()))?
            .clone();

        table.database = Some(database.name.clone());
        table.name = definition.name().to_string();
        table.collection = Some(definition.collection().to_string());

        let alias = table.alias.clone().unwrap_or_else(|| definition.name().to_string());
        self.add_binding(
            scope,
            TableBinding {
                alias,
                source: BindingSource::Collection(definition),
            },
        )
    }

    fn add_binding(&mut self, scope: ScopeId, binding: TableBinding) -> QueryResult<()> {
        if self.scopes[scope].table(&binding.alias).is_some() {
            return Err(QueryError::DuplicateAlias(binding.alias));
        }
        self.scopes[scope].tables.push(binding);
        Ok(())
    }

    fn bind_join(&mut self, join: &mut JoinClause, scope: ScopeId) -> QueryResult<()> {
        let start = self.scopes[scope].tables.len();
        self.bind_table_expression(&mut join.left, scope)?;
        let split = self.scopes[scope].tables.len();
        self.bind_table_expression(&mut join.right, scope)?;
        let end = self.scopes[scope].tables.len();

        let shared = match &join.constraint {
            JoinConstraint::Using(columns) => Some(columns.clone()),
            JoinConstraint::None if join.kind == JoinType::Natural => {
                Some(self.common_columns(scope, start..split, split..end))
            }
            _ => None,
        };
        if let Some(columns) = shared {
            join.constraint = self.equijoin(scope, start..split, split..end, &columns, join.kind)?;
        }

        if let JoinConstraint::On(on) = &mut join.constraint {
            self.resolve_expr(on, scope, Clause::On, false)?;
        }
        Ok(())
    }

    /// Visible column names shared by both sides of a natural join, in
    /// left-side order
    fn common_columns(
        &self,
        scope: ScopeId,
        left: std::ops::Range<usize>,
        right: std::ops::Range<usize>,
    ) -> Vec<String> {
        let s = &self.scopes[scope];
        let visible = |range: std::ops::Range<usize>| -> Vec<String> {
            s.tables[range]
                .iter()
                .flat_map(|b| {
                    b.column_names()
                        .into_iter()
                        .filter(|c| !s.is_hidden(&b.alias, c))
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        let right_columns = visible(right);
        let mut shared: Vec<String> = Vec::new();
        for column in visible(left) {
            let on_right = right_columns.iter().any(|c| c.eq_ignore_ascii_case(&column));
            let seen = shared.iter().any(|c| c.eq_ignore_ascii_case(&column));
            if on_right && !seen {
                shared.push(column);
            }
        }
        shared
    }

    /// Build `left.c = right.c AND ...` for the shared columns and hide the
    /// duplicate side from star expansion and unqualified lookup
    fn equijoin(
        &mut self,
        scope: ScopeId,
        left: std::ops::Range<usize>,
        right: std::ops::Range<usize>,
        columns: &[String],
        kind: JoinType,
    ) -> QueryResult<JoinConstraint> {
        let mut condition: Option<Expression> = None;
        for name in columns {
            let (left_alias, left_name) = self.find_in_range(scope, left.clone(), name)?;
            let (right_alias, right_name) = self.find_in_range(scope, right.clone(), name)?;
            let equality = Expression::binary(
                Expression::column(Some(&left_alias), &left_name),
                Operator::Equals,
                Expression::column(Some(&right_alias), &right_name),
            );
            condition = Some(match condition {
                Some(c) => Expression::binary(c, Operator::And, equality),
                None => equality,
            });
            let hidden = if kind == JoinType::RightOuter {
                (left_alias, left_name)
            } else {
                (right_alias, right_name)
            };
            self.scopes[scope].hidden.push(hidden);
        }
        Ok(condition.map(JoinConstraint::On).unwrap_or(JoinConstraint::None))
    }

    fn find_in_range(&self, scope: ScopeId, range: std::ops::Range<usize>, name: &str) -> QueryResult<(String, String)> {
        let s = &self.scopes[scope];
        let mut found = s.tables[range].iter().filter_map(|b| {
            b.find_column(name)
                .filter(|c| !s.is_hidden(&b.alias, c))
                .map(|c| (b.alias.clone(), c))
        });
        let first = found.next().ok_or_else(|| QueryError::UnknownColumn(name.to_string()))?;
        if found.next().is_some() {
            return Err(QueryError::AmbiguousColumn(name.to_string()));
        }
        Ok(first)
    }

    /// Table names and aliases reachable inside a derived table's scope
    fn visible_table_names(&self, scope: ScopeId) -> Vec<String> {
        let mut names = Vec::new();
        for binding in &self.scopes[scope].tables {
            names.push(binding.alias.clone());
            match &binding.source {
                BindingSource::Collection(table) => names.push(table.name().to_string()),
                BindingSource::Derived { source_tables, .. } => names.extend(source_tables.iter().cloned()),
            }
        }
        names
    }

    // Select list

    fn expand_stars(&self, select: &mut SelectStatement, scope: ScopeId) -> QueryResult<()> {
        let has_star = select
            .columns
            .iter()
            .any(|c| matches!(c, SelectColumn::Wildcard | SelectColumn::QualifiedWildcard(_)));
        if !has_star {
            return Ok(());
        }

        let s = &self.scopes[scope];
        let mut expanded = Vec::with_capacity(select.columns.len());
        for column in std::mem::take(&mut select.columns) {
            match column {
                SelectColumn::Wildcard => {
                    if s.tables.is_empty() {
                        return Err(QueryError::NoTablesUsed);
                    }
                    for binding in &s.tables {
                        for name in binding.column_names() {
                            if !s.is_hidden(&binding.alias, &name) {
                                expanded.push(star_column(&binding.alias, name));
                            }
                        }
                    }
                }
                SelectColumn::QualifiedWildcard(table) => {
                    let binding = s.table(&table).ok_or_else(|| self.unknown_table(scope, &table))?;
                    for name in binding.column_names() {
                        expanded.push(star_column(&binding.alias, name));
                    }
                }
                other => expanded.push(other),
            }
        }
        select.columns = expanded;
        Ok(())
    }

    // Expressions

    fn resolve_expr(&mut self, expr: &mut Expression, scope: ScopeId, clause: Clause, in_aggregate: bool) -> QueryResult<()> {
        if let Expression::Column(column) = &*expr {
            if clause.sees_aliases() && !in_aggregate && column.table.is_none() && column.depth == 0 {
                if let Some(binding) = self.scopes[scope].column_binding(&column.name) {
                    *expr = binding.expr.clone();
                    return Ok(());
                }
            }
        }

        match expr {
            Expression::Literal(_) => Ok(()),
            Expression::Column(column) => self.resolve_column(column, scope),
            Expression::BinaryOp { left, right, .. } => {
                self.resolve_expr(left, scope, clause, in_aggregate)?;
                self.resolve_expr(right, scope, clause, in_aggregate)
            }
            Expression::UnaryOp { expr: inner, .. }
            | Expression::IsNull { expr: inner, .. }
            | Expression::IsBool { expr: inner, .. } => self.resolve_expr(inner, scope, clause, in_aggregate),
            Expression::Between { expr: inner, low, high, .. } => {
                self.resolve_expr(inner, scope, clause, in_aggregate)?;
                self.resolve_expr(low, scope, clause, in_aggregate)?;
                self.resolve_expr(high, scope, clause, in_aggregate)
            }
            Expression::InList { expr: inner, list, .. } => {
                self.resolve_expr(inner, scope, clause, in_aggregate)?;
                for item in list.iter_mut() {
                    self.resolve_expr(item, scope, clause, in_aggregate)?;
                }
                Ok(())
            }
            Expression::InSubquery { expr: inner, query, .. } => {
                self.resolve_expr(inner, scope, clause, in_aggregate)?;
                self.resolve_statement(query, Some(scope)).map(|_| ())
            }
            Expression::Exists { query, .. } | Expression::Subquery(query) => {
                self.resolve_statement(query, Some(scope)).map(|_| ())
            }
            Expression::Like { expr: inner, pattern, escape, .. } => {
                self.resolve_expr(inner, scope, clause, in_aggregate)?;
                self.resolve_expr(pattern, scope, clause, in_aggregate)?;
                if let Some(escape) = escape {
                    self.resolve_expr(escape, scope, clause, in_aggregate)?;
                }
                Ok(())
            }
            Expression::Function { args, .. } | Expression::Tuple(args) => {
                for arg in args.iter_mut() {
                    self.resolve_expr(arg, scope, clause, in_aggregate)?;
                }
                Ok(())
            }
            Expression::Aggregate { function, arg, .. } => {
                if !clause.allows_aggregates() {
                    return Err(QueryError::InvalidAggregate(format!(
                        "{}() in {}",
                        function.name(),
                        clause.name()
                    )));
                }
                if in_aggregate {
                    return Err(QueryError::InvalidAggregate(format!("nested {}()", function.name())));
                }
                match arg {
                    AggregateArg::Star => Ok(()),
                    AggregateArg::Expr(inner) => self.resolve_expr(inner, scope, clause, true),
                }
            }
            Expression::Case { operand, when_then, else_result } => {
                if let Some(operand) = operand {
                    self.resolve_expr(operand, scope, clause, in_aggregate)?;
                }
                for (when, then) in when_then.iter_mut() {
                    self.resolve_expr(when, scope, clause, in_aggregate)?;
                    self.resolve_expr(then, scope, clause, in_aggregate)?;
                }
                if let Some(else_result) = else_result {
                    self.resolve_expr(else_result, scope, clause, in_aggregate)?;
                }
                Ok(())
            }
        }
    }

    /// Walk outward from `scope` until a binding supplies the column
    fn resolve_column(&self, column: &mut ColumnReference, scope: ScopeId) -> QueryResult<()> {
        let mut current = Some(scope);
        let mut depth = 0;
        while let Some(id) = current {
            if let Some((alias, name)) = self.lookup(id, column)? {
                column.table = Some(alias);
                column.name = name;
                column.depth = depth;
                return Ok(());
            }
            current = self.scopes[id].parent;
            depth += 1;
        }

        match &column.table {
            Some(table) => Err(self.unknown_table(scope, table)),
            None => Err(QueryError::UnknownColumn(column.name.clone())),
        }
    }

    /// Resolve within one scope. `Ok(None)` sends the search outward.
    fn lookup(&self, scope: ScopeId, column: &ColumnReference) -> QueryResult<Option<(String, String)>> {
        let s = &self.scopes[scope];
        match &column.table {
            Some(table) => match s.table(table) {
                Some(binding) => binding
                    .find_column(&column.name)
                    .map(|name| Some((binding.alias.clone(), name)))
                    .ok_or_else(|| QueryError::UnknownColumn(format!("{}.{}", table, column.name))),
                None => Ok(None),
            },
            None => {
                let mut found = s.tables.iter().filter_map(|b| {
                    b.find_column(&column.name)
                        .filter(|c| !s.is_hidden(&b.alias, c))
                        .map(|c| (b.alias.clone(), c))
                });
                let first = found.next();
                if first.is_some() && found.next().is_some() {
                    return Err(QueryError::AmbiguousColumn(column.name.clone()));
                }
                Ok(first)
            }
        }
    }

    /// Error for a qualifier that names no table in scope
    fn unknown_table(&self, scope: ScopeId, table: &str) -> QueryError {
        let mut current = Some(scope);
        while let Some(id) = current {
            for binding in &self.scopes[id].tables {
                if let BindingSource::Derived { source_tables, .. } = &binding.source {
                    if source_tables.iter().any(|t| t.eq_ignore_ascii_case(table)) {
                        return QueryError::AliasMismatch {
                            table: table.to_string(),
                            alias: binding.alias.clone(),
                        };
                    }
                }
            }
            current = self.scopes[id].parent;
        }
        QueryError::UnknownTable(table.to_string())
    }
}

/// Label of an unaliased select expression, taken before resolution
fn label_for(expr: &Expression) -> String {
    match expr {
        Expression::Column(c) => c.name.clone(),
        other => other.to_string(),
    }
}

fn star_column(alias: &str, name: String) -> SelectColumn {
    SelectColumn::Expression {
        expr: Expression::Column(ColumnReference {
            table: Some(alias.to_string()),
            name: name.clone(),
            depth: 0,
        }),
        alias: Some(name),
    }
}

/// Integer literal used as a select-list position
fn ordinal(expr: &Expression) -> Option<i64> {
    match expr {
        Expression::Literal(Value::Integer(n)) => Some(*n),
        _ => None,
    }
}

/// Output labels of a resolved query
fn output_labels(statement: &Statement) -> Vec<String> {
    match statement {
        Statement::Select(select) => select
            .columns
            .iter()
            .filter_map(|c| match c {
                SelectColumn::Expression { alias, expr } => Some(alias.clone().unwrap_or_else(|| label_for(expr))),
                _ => None,
            })
            .collect(),
        Statement::Union { left, .. } => output_labels(left),
    }
}
