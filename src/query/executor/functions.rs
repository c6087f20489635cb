// Scalar Functions
//
// Built-in functions callable from expressions. Names are looked up
// case-insensitively when the expression tree is built; arity is checked
// there too, so evaluation only sees well-formed calls.

use std::collections::HashMap;

use chrono::{Timelike, Utc};
use once_cell::sync::Lazy;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::catalog::SqlType;
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::executor::value::{ArithmeticOp, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    Abs,
    Ceil,
    Floor,
    Round,
    Mod,
    Concat,
    ConcatWs,
    Lower,
    Upper,
    Length,
    CharLength,
    Trim,
    LTrim,
    RTrim,
    Substring,
    Coalesce,
    IfNull,
    NullIf,
    If,
    Database,
    LastInsertId,
    RowCount,
    ConnectionId,
    Version,
    CurrentDate,
    Now,
}

static FUNCTIONS: Lazy<HashMap<&'static str, ScalarFunction>> = Lazy::new(|| {
    use ScalarFunction::*;
    HashMap::from([
        ("abs", Abs),
        ("ceil", Ceil),
        ("ceiling", Ceil),
        ("floor", Floor),
        ("round", Round),
        ("mod", Mod),
        ("concat", Concat),
        ("concat_ws", ConcatWs),
        ("lower", Lower),
        ("lcase", Lower),
        ("upper", Upper),
        ("ucase", Upper),
        ("length", Length),
        ("char_length", CharLength),
        ("character_length", CharLength),
        ("trim", Trim),
        ("ltrim", LTrim),
        ("rtrim", RTrim),
        ("substring", Substring),
        ("substr", Substring),
        ("coalesce", Coalesce),
        ("ifnull", IfNull),
        ("nullif", NullIf),
        ("if", If),
        ("database", Database),
        ("schema", Database),
        ("last_insert_id", LastInsertId),
        ("row_count", RowCount),
        ("connection_id", ConnectionId),
        ("version", Version),
        ("current_date", CurrentDate),
        ("curdate", CurrentDate),
        ("now", Now),
        ("current_timestamp", Now),
    ])
});

impl ScalarFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        FUNCTIONS.get(name.to_lowercase().as_str()).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Abs => "abs",
            ScalarFunction::Ceil => "ceil",
            ScalarFunction::Floor => "floor",
            ScalarFunction::Round => "round",
            ScalarFunction::Mod => "mod",
            ScalarFunction::Concat => "concat",
            ScalarFunction::ConcatWs => "concat_ws",
            ScalarFunction::Lower => "lower",
            ScalarFunction::Upper => "upper",
            ScalarFunction::Length => "length",
            ScalarFunction::CharLength => "char_length",
            ScalarFunction::Trim => "trim",
            ScalarFunction::LTrim => "ltrim",
            ScalarFunction::RTrim => "rtrim",
            ScalarFunction::Substring => "substring",
            ScalarFunction::Coalesce => "coalesce",
            ScalarFunction::IfNull => "ifnull",
            ScalarFunction::NullIf => "nullif",
            ScalarFunction::If => "if",
            ScalarFunction::Database => "database",
            ScalarFunction::LastInsertId => "last_insert_id",
            ScalarFunction::RowCount => "row_count",
            ScalarFunction::ConnectionId => "connection_id",
            ScalarFunction::Version => "version",
            ScalarFunction::CurrentDate => "current_date",
            ScalarFunction::Now => "now",
        }
    }

    /// Minimum and optional maximum argument count
    fn arity(&self) -> (usize, Option<usize>) {
        use ScalarFunction::*;
        match self {
            Abs | Ceil | Floor | Lower | Upper | Length | CharLength | Trim | LTrim | RTrim => (1, Some(1)),
            Round => (1, Some(2)),
            Mod | IfNull | NullIf => (2, Some(2)),
            If => (3, Some(3)),
            Substring => (2, Some(3)),
            Concat | Coalesce => (1, None),
            ConcatWs => (2, None),
            Database | LastInsertId | RowCount | ConnectionId | Version | CurrentDate | Now => (0, Some(0)),
        }
    }

    pub fn check_arity(&self, count: usize) -> QueryResult<()> {
        let (min, max) = self.arity();
        if count < min || max.is_some_and(|max| count > max) {
            return Err(QueryError::WrongArgumentCount(self.name().to_string()));
        }
        Ok(())
    }

    /// Declared result type given the argument types
    pub fn result_type(&self, args: &[SqlType]) -> SqlType {
        use ScalarFunction::*;
        let first_known = || args.iter().copied().find(|t| *t != SqlType::Null).unwrap_or(SqlType::Null);
        match self {
            Abs | Ceil | Floor | Round | Mod => args.first().copied().unwrap_or(SqlType::Null),
            Concat | ConcatWs | Lower | Upper | Trim | LTrim | RTrim | Substring | Database | Version => {
                SqlType::Varchar
            }
            Length | CharLength | RowCount => SqlType::Int,
            LastInsertId | ConnectionId => SqlType::Uint,
            Coalesce | IfNull | NullIf => first_known(),
            If => args.iter().skip(1).copied().find(|t| *t != SqlType::Null).unwrap_or(SqlType::Null),
            CurrentDate => SqlType::Date,
            Now => SqlType::Timestamp,
        }
    }

    pub fn evaluate(&self, args: &[SqlValue], ctx: &ExecutionContext) -> QueryResult<SqlValue> {
        self.check_arity(args.len())?;
        match self {
            ScalarFunction::Abs => numeric(&args[0])?.map_or(Ok(SqlValue::Null), abs),
            ScalarFunction::Ceil => numeric(&args[0])?.map_or(Ok(SqlValue::Null), |v| round_with(v, f64::ceil, Decimal::ceil)),
            ScalarFunction::Floor => {
                numeric(&args[0])?.map_or(Ok(SqlValue::Null), |v| round_with(v, f64::floor, Decimal::floor))
            }
            ScalarFunction::Round => {
                let places = match args.get(1) {
                    Some(p) if p.is_null() => return Ok(SqlValue::Null),
                    Some(p) => p
                        .to_i64()
                        .ok_or_else(|| QueryError::TypeMismatch(format!("round() places must be numeric, got {}", p)))?,
                    None => 0,
                };
                numeric(&args[0])?.map_or(Ok(SqlValue::Null), |v| round(v, places))
            }
            ScalarFunction::Mod => args[0].arithmetic(ArithmeticOp::Modulo, &args[1]),
            ScalarFunction::Concat => {
                let mut out = String::new();
                for arg in args {
                    match arg.to_text() {
                        Some(text) => out.push_str(&text),
                        None => return Ok(SqlValue::Null),
                    }
                }
                Ok(SqlValue::Str(out))
            }
            ScalarFunction::ConcatWs => {
                let separator = match args[0].to_text() {
                    Some(s) => s,
                    None => return Ok(SqlValue::Null),
                };
                let parts: Vec<String> = args[1..].iter().filter_map(SqlValue::to_text).collect();
                Ok(SqlValue::Str(parts.join(&separator)))
            }
            ScalarFunction::Lower => Ok(text_map(&args[0], |s| SqlValue::Str(s.to_lowercase()))),
            ScalarFunction::Upper => Ok(text_map(&args[0], |s| SqlValue::Str(s.to_uppercase()))),
            ScalarFunction::Length => Ok(text_map(&args[0], |s| SqlValue::Int(s.len() as i64))),
            ScalarFunction::CharLength => Ok(text_map(&args[0], |s| SqlValue::Int(s.chars().count() as i64))),
            ScalarFunction::Trim => Ok(text_map(&args[0], |s| SqlValue::Str(s.trim_matches(' ').to_string()))),
            ScalarFunction::LTrim => Ok(text_map(&args[0], |s| SqlValue::Str(s.trim_start_matches(' ').to_string()))),
            ScalarFunction::RTrim => Ok(text_map(&args[0], |s| SqlValue::Str(s.trim_end_matches(' ').to_string()))),
            ScalarFunction::Substring => substring(args),
            ScalarFunction::Coalesce => Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(SqlValue::Null)),
            ScalarFunction::IfNull => Ok(if args[0].is_null() { args[1].clone() } else { args[0].clone() }),
            ScalarFunction::NullIf => match args[0].sql_compare(&args[1])? {
                Some(std::cmp::Ordering::Equal) => Ok(SqlValue::Null),
                _ => Ok(args[0].clone()),
            },
            ScalarFunction::If => {
                if args[0].to_bool()? == Some(true) {
                    Ok(args[1].clone())
                } else {
                    Ok(args[2].clone())
                }
            }
            ScalarFunction::Database => {
                if ctx.database().is_empty() {
                    Ok(SqlValue::Null)
                } else {
                    Ok(SqlValue::Str(ctx.database().to_string()))
                }
            }
            ScalarFunction::LastInsertId => Ok(SqlValue::Uint(ctx.connection().last_insert_id)),
            ScalarFunction::RowCount => Ok(SqlValue::Int(ctx.connection().affected_rows)),
            ScalarFunction::ConnectionId => Ok(SqlValue::Uint(ctx.connection().connection_id as u64)),
            ScalarFunction::Version => Ok(SqlValue::Str(format!("5.7.0-docsql-{}", env!("CARGO_PKG_VERSION")))),
            ScalarFunction::CurrentDate => Ok(SqlValue::Date(Utc::now().date_naive())),
            ScalarFunction::Now => {
                let now = Utc::now().naive_utc();
                Ok(SqlValue::Timestamp(now.with_nanosecond(0).unwrap_or(now)))
            }
        }
    }
}

/// Numeric view of an argument; strings are parsed, NULL gives `None`
fn numeric(value: &SqlValue) -> QueryResult<Option<SqlValue>> {
    match value {
        v if v.is_null() => Ok(None),
        v if v.is_numeric() => Ok(Some(v.clone())),
        SqlValue::Bool(b) => Ok(Some(SqlValue::Int(*b as i64))),
        SqlValue::Str(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(Some(SqlValue::Int(i)))
            } else if let Ok(f) = s.parse::<f64>() {
                Ok(Some(SqlValue::Float(f)))
            } else {
                Err(QueryError::TypeMismatch(format!("'{}' is not a number", s)))
            }
        }
        other => Err(QueryError::TypeMismatch(format!("expected a number, got {}", other.sql_type()))),
    }
}

fn abs(value: SqlValue) -> QueryResult<SqlValue> {
    match value {
        SqlValue::Int(i) => i.checked_abs().map(SqlValue::Int).ok_or(QueryError::NumericOverflow),
        SqlValue::Float(f) => Ok(SqlValue::Float(f.abs())),
        SqlValue::Decimal(d) => Ok(SqlValue::Decimal(d.abs())),
        other => Ok(other),
    }
}

fn round_with(value: SqlValue, float: fn(f64) -> f64, decimal: fn(&Decimal) -> Decimal) -> QueryResult<SqlValue> {
    match value {
        SqlValue::Float(f) => Ok(SqlValue::Float(float(f))),
        SqlValue::Decimal(d) => Ok(SqlValue::Decimal(decimal(&d).normalize())),
        other => Ok(other),
    }
}

fn round(value: SqlValue, places: i64) -> QueryResult<SqlValue> {
    match value {
        SqlValue::Float(f) => {
            let factor = 10f64.powi(places.clamp(-30, 30) as i32);
            Ok(SqlValue::Float((f * factor).round() / factor))
        }
        SqlValue::Decimal(d) if places >= 0 => Ok(SqlValue::Decimal(
            d.round_dp_with_strategy(places.min(28) as u32, RoundingStrategy::MidpointAwayFromZero),
        )),
        SqlValue::Int(i) if places < 0 => {
            let factor = 10i128.checked_pow(places.unsigned_abs().min(38) as u32).ok_or(QueryError::NumericOverflow)?;
            let i = i as i128;
            let rounded = (i + i.signum() * factor / 2) / factor * factor;
            i64::try_from(rounded).map(SqlValue::Int).map_err(|_| QueryError::NumericOverflow)
        }
        other => Ok(other),
    }
}

fn text_map(value: &SqlValue, f: impl Fn(&str) -> SqlValue) -> SqlValue {
    match value.to_text() {
        Some(text) => f(&text),
        None => SqlValue::Null,
    }
}

/// `substring(s, pos[, len])` with 1-based, possibly negative positions
fn substring(args: &[SqlValue]) -> QueryResult<SqlValue> {
    if args.iter().any(SqlValue::is_null) {
        return Ok(SqlValue::Null);
    }
    let text: Vec<char> = args[0].to_string().chars().collect();
    let position = args[1]
        .to_i64()
        .ok_or_else(|| QueryError::TypeMismatch("substring() position must be numeric".to_string()))?;
    let length = match args.get(2) {
        Some(l) => l
            .to_i64()
            .ok_or_else(|| QueryError::TypeMismatch("substring() length must be numeric".to_string()))?,
        None => i64::MAX,
    };

    let count = text.len() as i64;
    let start = match position {
        0 => return Ok(SqlValue::Str(String::new())),
        p if p > 0 => p - 1,
        p => count + p,
    };
    if start < 0 || start >= count || length <= 0 {
        return Ok(SqlValue::Str(String::new()));
    }
    let end = start.saturating_add(length).min(count);
    Ok(SqlValue::Str(text[start as usize..end as usize].iter().collect()))
}
