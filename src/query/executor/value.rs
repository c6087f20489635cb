// Scalar Value System
//
// `SqlValue` is the typed scalar flowing through the engine. Values are
// classified from BSON when a document is scanned and converted back to BSON
// when a predicate is rendered into a filter document.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use bson::oid::ObjectId;
use bson::{Bson, Decimal128};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::catalog::SqlType;
use crate::query::executor::result::{QueryError, QueryResult};

const DECIMAL128_EXPONENT_BIAS: i32 = 6176;
const DECIMAL_MAX_SCALE: i32 = 28;

/// A scalar value
#[derive(Debug, Clone)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// The field was absent from the document
    NoValue,
    Int(i64),
    Uint(u64),
    Float(f64),
    Decimal(Decimal),
    Bool(bool),
    Str(String),
    ObjectId(ObjectId),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// Row value such as `(a, b)`
    Tuple(Vec<SqlValue>),
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::IntDivide => "DIV",
            ArithmeticOp::Modulo => "%",
        };
        write!(f, "{}", symbol)
    }
}

/// Shared representation used to compare and combine numeric variants
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Dec(Decimal),
    Float(f64),
}

impl Numeric {
    fn to_decimal(self) -> Option<Decimal> {
        match self {
            Numeric::Int(i) => Decimal::from_i128(i),
            Numeric::Dec(d) => Some(d),
            Numeric::Float(f) => Decimal::from_f64(f),
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
            Numeric::Float(f) => f,
        }
    }

    fn into_value(self) -> QueryResult<SqlValue> {
        match self {
            Numeric::Int(i) => int_value(i),
            Numeric::Dec(d) => Ok(SqlValue::Decimal(d)),
            Numeric::Float(f) if f.is_finite() => Ok(SqlValue::Float(f)),
            Numeric::Float(_) => Err(QueryError::NumericOverflow),
        }
    }
}

fn int_value(i: i128) -> QueryResult<SqlValue> {
    if let Ok(v) = i64::try_from(i) {
        Ok(SqlValue::Int(v))
    } else if let Ok(v) = u64::try_from(i) {
        Ok(SqlValue::Uint(v))
    } else {
        Decimal::try_from_i128_with_scale(i, 0)
            .map(SqlValue::Decimal)
            .map_err(|_| QueryError::NumericOverflow)
    }
}

impl SqlValue {
    /// Classify a document field. `None` means the field was absent.
    pub fn from_bson(value: Option<&Bson>) -> SqlValue {
        let value = match value {
            Some(v) => v,
            None => return SqlValue::NoValue,
        };
        match value {
            Bson::Null | Bson::Undefined => SqlValue::Null,
            Bson::Int32(i) => SqlValue::Int(*i as i64),
            Bson::Int64(i) => SqlValue::Int(*i),
            Bson::Double(f) => SqlValue::Float(*f),
            Bson::Decimal128(d) => decode_decimal128(d),
            Bson::Boolean(b) => SqlValue::Bool(*b),
            Bson::String(s) | Bson::Symbol(s) => SqlValue::Str(s.clone()),
            Bson::ObjectId(oid) => SqlValue::ObjectId(*oid),
            Bson::DateTime(dt) => timestamp_from_millis(dt.timestamp_millis()),
            Bson::Timestamp(ts) => chrono::DateTime::from_timestamp(ts.time as i64, 0)
                .map(|dt| SqlValue::Timestamp(dt.naive_utc()))
                .unwrap_or(SqlValue::Null),
            Bson::Binary(bin) => SqlValue::Str(hex::encode(&bin.bytes)),
            other => SqlValue::Str(extended_json_text(other)),
        }
    }

    /// Convert back to BSON for filter documents. Absent values have no
    /// BSON form.
    pub fn to_bson(&self) -> Option<Bson> {
        let bson = match self {
            SqlValue::NoValue => return None,
            SqlValue::Null => Bson::Null,
            SqlValue::Int(i) => Bson::Int64(*i),
            SqlValue::Uint(u) => match i64::try_from(*u) {
                Ok(i) => Bson::Int64(i),
                Err(_) => Bson::Decimal128(encode_decimal128(&Decimal::from(*u))),
            },
            SqlValue::Float(f) => Bson::Double(*f),
            SqlValue::Decimal(d) => Bson::Decimal128(encode_decimal128(d)),
            SqlValue::Bool(b) => Bson::Boolean(*b),
            SqlValue::Str(s) => Bson::String(s.clone()),
            SqlValue::ObjectId(oid) => Bson::ObjectId(*oid),
            SqlValue::Date(d) => {
                let millis = d.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
                Bson::DateTime(bson::DateTime::from_millis(millis))
            }
            SqlValue::Timestamp(ts) => {
                Bson::DateTime(bson::DateTime::from_millis(ts.and_utc().timestamp_millis()))
            }
            SqlValue::Tuple(values) => Bson::Array(
                values.iter().map(|v| v.to_bson().unwrap_or(Bson::Null)).collect(),
            ),
        };
        Some(bson)
    }

    /// True for both NULL and an absent field
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null | SqlValue::NoValue)
    }

    pub fn is_no_value(&self) -> bool {
        matches!(self, SqlValue::NoValue)
    }

    pub fn sql_type(&self) -> SqlType {
        match self {
            SqlValue::Null | SqlValue::NoValue | SqlValue::Tuple(_) => SqlType::Null,
            SqlValue::Int(_) => SqlType::Int,
            SqlValue::Uint(_) => SqlType::Uint,
            SqlValue::Float(_) => SqlType::Float,
            SqlValue::Decimal(_) => SqlType::Decimal,
            SqlValue::Bool(_) => SqlType::Boolean,
            SqlValue::Str(_) => SqlType::Varchar,
            SqlValue::ObjectId(_) => SqlType::ObjectId,
            SqlValue::Date(_) => SqlType::Date,
            SqlValue::Timestamp(_) => SqlType::Timestamp,
        }
    }

    /// Adjust a scanned value to its declared column type
    pub fn coerce_to(self, sql_type: SqlType) -> SqlValue {
        match (sql_type, self) {
            (SqlType::Date, SqlValue::Timestamp(ts)) => SqlValue::Date(ts.date()),
            (SqlType::Date, SqlValue::Str(s)) => match parse_date(&s) {
                Some(d) => SqlValue::Date(d),
                None => SqlValue::Str(s),
            },
            (SqlType::Timestamp, SqlValue::Date(d)) => SqlValue::Timestamp(d.and_time(NaiveTime::MIN)),
            (SqlType::Timestamp, SqlValue::Str(s)) => match parse_timestamp(&s) {
                Some(ts) => SqlValue::Timestamp(ts),
                None => SqlValue::Str(s),
            },
            (SqlType::ObjectId, SqlValue::Str(s)) => match ObjectId::parse_str(&s) {
                Ok(oid) => SqlValue::ObjectId(oid),
                Err(_) => SqlValue::Str(s),
            },
            (_, value) => value,
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            SqlValue::Int(i) => Some(Numeric::Int(*i as i128)),
            SqlValue::Uint(u) => Some(Numeric::Int(*u as i128)),
            SqlValue::Bool(b) => Some(Numeric::Int(*b as i128)),
            SqlValue::Decimal(d) => Some(Numeric::Dec(*d)),
            SqlValue::Float(f) => Some(Numeric::Float(*f)),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlValue::Int(_) | SqlValue::Uint(_) | SqlValue::Float(_) | SqlValue::Decimal(_)
        )
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.numeric().map(Numeric::to_f64)
    }

    pub fn to_i64(&self) -> Option<i64> {
        match self.numeric()? {
            Numeric::Int(i) => i64::try_from(i).ok(),
            Numeric::Dec(d) => d.trunc().to_i64(),
            Numeric::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Numeric::Float(_) => None,
        }
    }

    /// Text form used by string functions; `None` for NULL
    pub fn to_text(&self) -> Option<String> {
        if self.is_null() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// SQL truthiness. `None` is UNKNOWN.
    pub fn to_bool(&self) -> QueryResult<Option<bool>> {
        match self {
            SqlValue::Null | SqlValue::NoValue => Ok(None),
            SqlValue::Bool(b) => Ok(Some(*b)),
            SqlValue::Int(i) => Ok(Some(*i != 0)),
            SqlValue::Uint(u) => Ok(Some(*u != 0)),
            SqlValue::Float(f) => Ok(Some(*f != 0.0)),
            SqlValue::Decimal(d) => Ok(Some(!d.is_zero())),
            SqlValue::Str(s) => Ok(Some(s.trim().parse::<f64>().map(|f| f != 0.0).unwrap_or(false))),
            SqlValue::ObjectId(_) | SqlValue::Date(_) | SqlValue::Timestamp(_) => Ok(Some(true)),
            SqlValue::Tuple(values) => Err(QueryError::TypeMismatch(format!(
                "operand should contain 1 column, got {}",
                values.len()
            ))),
        }
    }

    /// Ordering used for sorting, MIN/MAX and tuple comparison.
    /// NULL and absent values order first.
    pub fn compare(&self, other: &Self) -> QueryResult<Ordering> {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => return Ok(Ordering::Less),
            (false, true) => return Ok(Ordering::Greater),
            (false, false) => {}
        }

        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return Ok(compare_numeric(a, b));
        }

        match (self, other) {
            (SqlValue::Str(a), SqlValue::Str(b)) => Ok(a.cmp(b)),
            (SqlValue::ObjectId(a), SqlValue::ObjectId(b)) => Ok(a.bytes().cmp(&b.bytes())),
            (SqlValue::ObjectId(a), SqlValue::Str(s)) => {
                let b = parse_object_id(s)?;
                Ok(a.bytes().cmp(&b.bytes()))
            }
            (SqlValue::Str(s), SqlValue::ObjectId(b)) => {
                let a = parse_object_id(s)?;
                Ok(a.bytes().cmp(&b.bytes()))
            }
            (SqlValue::Date(a), SqlValue::Date(b)) => Ok(a.cmp(b)),
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => Ok(a.cmp(b)),
            (SqlValue::Date(a), SqlValue::Timestamp(b)) => Ok(a.and_time(NaiveTime::MIN).cmp(b)),
            (SqlValue::Timestamp(a), SqlValue::Date(b)) => Ok(a.cmp(&b.and_time(NaiveTime::MIN))),
            (SqlValue::Date(_) | SqlValue::Timestamp(_), SqlValue::Str(s)) => {
                let parsed = temporal_literal(s, self)?;
                self.compare(&parsed)
            }
            (SqlValue::Str(s), SqlValue::Date(_) | SqlValue::Timestamp(_)) => {
                let parsed = temporal_literal(s, other)?;
                parsed.compare(other)
            }
            (SqlValue::Tuple(a), SqlValue::Tuple(b)) => {
                check_tuple_arity(a, b)?;
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(Ordering::Equal)
            }
            (a, b) => Err(QueryError::TypeMismatch(format!(
                "cannot compare {} with {}",
                a.sql_type(),
                b.sql_type()
            ))),
        }
    }

    /// Three-valued comparison: `None` when either side is NULL or absent
    pub fn sql_compare(&self, other: &Self) -> QueryResult<Option<Ordering>> {
        match (self, other) {
            (SqlValue::Tuple(a), SqlValue::Tuple(b)) => {
                check_tuple_arity(a, b)?;
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.sql_compare(y)? {
                        Some(Ordering::Equal) => continue,
                        decided => return Ok(decided),
                    }
                }
                Ok(Some(Ordering::Equal))
            }
            (a, b) if a.is_null() || b.is_null() => Ok(None),
            (a, b) => a.compare(b).map(Some),
        }
    }

    /// Apply an arithmetic operator. NULL operands produce NULL.
    pub fn arithmetic(&self, op: ArithmeticOp, other: &Self) -> QueryResult<SqlValue> {
        if self.is_null() || other.is_null() {
            return Ok(SqlValue::Null);
        }
        let (a, b) = match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(QueryError::TypeMismatch(format!(
                    "cannot apply {} to {} and {}",
                    op,
                    self.sql_type(),
                    other.sql_type()
                )));
            }
        };

        match (a, b) {
            (Numeric::Float(_), _) | (_, Numeric::Float(_)) => float_arithmetic(op, a.to_f64(), b.to_f64()),
            (Numeric::Int(x), Numeric::Int(y)) => int_arithmetic(op, x, y),
            _ => {
                let x = a.to_decimal().ok_or(QueryError::NumericOverflow)?;
                let y = b.to_decimal().ok_or(QueryError::NumericOverflow)?;
                decimal_arithmetic(op, x, y)
            }
        }
    }

    /// Unary minus
    pub fn negate(&self) -> QueryResult<SqlValue> {
        match self {
            SqlValue::Null | SqlValue::NoValue => Ok(SqlValue::Null),
            SqlValue::Int(i) => i.checked_neg().map(SqlValue::Int).ok_or(QueryError::NumericOverflow),
            SqlValue::Uint(u) => int_value(-(*u as i128)),
            SqlValue::Bool(b) => Ok(SqlValue::Int(-(*b as i64))),
            SqlValue::Float(f) => Ok(SqlValue::Float(-f)),
            SqlValue::Decimal(d) => Ok(SqlValue::Decimal(-*d)),
            other => Err(QueryError::TypeMismatch(format!("cannot negate {}", other.sql_type()))),
        }
    }
}

fn compare_numeric(a: Numeric, b: Numeric) -> Ordering {
    match (a, b) {
        (Numeric::Int(x), Numeric::Int(y)) => x.cmp(&y),
        (Numeric::Float(_), _) | (_, Numeric::Float(_)) => a.to_f64().total_cmp(&b.to_f64()),
        _ => match (a.to_decimal(), b.to_decimal()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.to_f64().total_cmp(&b.to_f64()),
        },
    }
}

fn int_arithmetic(op: ArithmeticOp, x: i128, y: i128) -> QueryResult<SqlValue> {
    let result = match op {
        ArithmeticOp::Add => x.checked_add(y),
        ArithmeticOp::Subtract => x.checked_sub(y),
        ArithmeticOp::Multiply => x.checked_mul(y),
        ArithmeticOp::Divide => {
            if y == 0 {
                return Err(QueryError::DivisionByZero);
            }
            let x = Decimal::from_i128(x).ok_or(QueryError::NumericOverflow)?;
            let y = Decimal::from_i128(y).ok_or(QueryError::NumericOverflow)?;
            return decimal_arithmetic(ArithmeticOp::Divide, x, y);
        }
        ArithmeticOp::IntDivide => {
            if y == 0 {
                return Err(QueryError::DivisionByZero);
            }
            x.checked_div(y)
        }
        ArithmeticOp::Modulo => {
            if y == 0 {
                return Err(QueryError::DivisionByZero);
            }
            x.checked_rem(y)
        }
    };
    result.ok_or(QueryError::NumericOverflow).and_then(int_value)
}

fn decimal_arithmetic(op: ArithmeticOp, x: Decimal, y: Decimal) -> QueryResult<SqlValue> {
    if matches!(op, ArithmeticOp::Divide | ArithmeticOp::IntDivide | ArithmeticOp::Modulo) && y.is_zero() {
        return Err(QueryError::DivisionByZero);
    }
    let result = match op {
        ArithmeticOp::Add => x.checked_add(y),
        ArithmeticOp::Subtract => x.checked_sub(y),
        ArithmeticOp::Multiply => x.checked_mul(y),
        ArithmeticOp::Divide => x.checked_div(y),
        ArithmeticOp::IntDivide => {
            let quotient = x.checked_div(y).ok_or(QueryError::NumericOverflow)?;
            return quotient
                .trunc()
                .to_i128()
                .ok_or(QueryError::NumericOverflow)
                .and_then(int_value);
        }
        ArithmeticOp::Modulo => x.checked_rem(y),
    };
    result.map(|d| SqlValue::Decimal(d.normalize())).ok_or(QueryError::NumericOverflow)
}

fn float_arithmetic(op: ArithmeticOp, x: f64, y: f64) -> QueryResult<SqlValue> {
    if matches!(op, ArithmeticOp::Divide | ArithmeticOp::IntDivide | ArithmeticOp::Modulo) && y == 0.0 {
        return Err(QueryError::DivisionByZero);
    }
    match op {
        ArithmeticOp::Add => Numeric::Float(x + y).into_value(),
        ArithmeticOp::Subtract => Numeric::Float(x - y).into_value(),
        ArithmeticOp::Multiply => Numeric::Float(x * y).into_value(),
        ArithmeticOp::Divide => Numeric::Float(x / y).into_value(),
        ArithmeticOp::Modulo => Numeric::Float(x % y).into_value(),
        ArithmeticOp::IntDivide => {
            let quotient = (x / y).trunc();
            if quotient.is_finite() && quotient.abs() < 1.7e38 {
                int_value(quotient as i128)
            } else {
                Err(QueryError::NumericOverflow)
            }
        }
    }
}

fn check_tuple_arity(a: &[SqlValue], b: &[SqlValue]) -> QueryResult<()> {
    if a.len() != b.len() {
        return Err(QueryError::TypeMismatch(format!(
            "operand should contain {} column(s), got {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

fn parse_object_id(s: &str) -> QueryResult<ObjectId> {
    ObjectId::parse_str(s)
        .map_err(|_| QueryError::TypeMismatch(format!("'{}' is not a valid object id", s)))
}

/// Parse a string operand into the temporal type of the other side
fn temporal_literal(s: &str, like: &SqlValue) -> QueryResult<SqlValue> {
    let parsed = match like {
        SqlValue::Date(_) => parse_date(s).map(SqlValue::Date).or_else(|| parse_timestamp(s).map(SqlValue::Timestamp)),
        _ => parse_timestamp(s).map(SqlValue::Timestamp),
    };
    parsed.ok_or_else(|| QueryError::TypeMismatch(format!("'{}' is not a valid {}", s, like.sql_type())))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| parse_date(s).map(|d| d.and_time(NaiveTime::MIN)))
}

fn timestamp_from_millis(millis: i64) -> SqlValue {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| SqlValue::Timestamp(dt.naive_utc()))
        .unwrap_or(SqlValue::Null)
}

fn extended_json_text(value: &Bson) -> String {
    let json = value.clone().into_relaxed_extjson();
    serde_json::to_string(&json).unwrap_or_else(|_| json.to_string())
}

/// Decode a BID-encoded IEEE 754-2008 decimal128
fn decode_decimal128(value: &Decimal128) -> SqlValue {
    let bits = u128::from_le_bytes(value.bytes());
    let negative = bits >> 127 == 1;
    let combination = (bits >> 122) & 0x1f;

    if combination == 0x1e {
        return SqlValue::Float(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }
    if combination == 0x1f {
        return SqlValue::Float(f64::NAN);
    }

    let (exponent, coefficient) = if (bits >> 125) & 0b11 == 0b11 {
        // Coefficients in this form exceed 34 digits and are non-canonical
        (((bits >> 111) & 0x3fff) as i32, 0u128)
    } else {
        (((bits >> 113) & 0x3fff) as i32, bits & ((1u128 << 113) - 1))
    };
    let exponent = exponent - DECIMAL128_EXPONENT_BIAS;

    match decimal_from_parts(coefficient, exponent, negative) {
        Some(d) => SqlValue::Decimal(d),
        None => {
            let magnitude = coefficient as f64 * 10f64.powi(exponent);
            SqlValue::Float(if negative { -magnitude } else { magnitude })
        }
    }
}

fn decimal_from_parts(mut coefficient: u128, mut exponent: i32, negative: bool) -> Option<Decimal> {
    while exponent > 0 {
        coefficient = coefficient.checked_mul(10)?;
        exponent -= 1;
    }
    while -exponent > DECIMAL_MAX_SCALE && coefficient % 10 == 0 && coefficient != 0 {
        coefficient /= 10;
        exponent += 1;
    }
    if coefficient == 0 {
        return Some(Decimal::ZERO);
    }
    if -exponent > DECIMAL_MAX_SCALE {
        return None;
    }
    let signed = i128::try_from(coefficient).ok()?;
    let signed = if negative { -signed } else { signed };
    Decimal::try_from_i128_with_scale(signed, (-exponent) as u32).ok()
}

/// Encode a decimal as BID decimal128
fn encode_decimal128(value: &Decimal) -> Decimal128 {
    let mantissa = value.mantissa();
    let coefficient = mantissa.unsigned_abs();
    let exponent = (DECIMAL128_EXPONENT_BIAS - value.scale() as i32) as u128;
    let mut bits = (exponent << 113) | coefficient;
    if mantissa < 0 || (mantissa == 0 && value.is_sign_negative()) {
        bits |= 1u128 << 127;
    }
    Decimal128::from_bytes(bits.to_le_bytes())
}

/// Key used by grouping and DISTINCT. Numerically equal values of different
/// variants share a key and NULL shares one with an absent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NumericKey {
    Int(i128),
    Dec(Decimal),
    Float(u64),
}

fn numeric_key(n: Numeric) -> NumericKey {
    match n {
        Numeric::Int(i) => NumericKey::Int(i),
        Numeric::Dec(d) => {
            if d.fract().is_zero() {
                if let Some(i) = d.to_i128() {
                    return NumericKey::Int(i);
                }
            }
            NumericKey::Dec(d.normalize())
        }
        Numeric::Float(f) => {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e30 {
                NumericKey::Int(f as i128)
            } else if let Some(d) = Decimal::from_f64(f).filter(|_| f.is_finite()) {
                NumericKey::Dec(d.normalize())
            } else {
                NumericKey::Float(f.to_bits())
            }
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_null() || b.is_null() => a.is_null() && b.is_null(),
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a == b,
            (SqlValue::Tuple(a), SqlValue::Tuple(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.numeric(), b.numeric()) {
                (Some(x), Some(y)) => numeric_key(x) == numeric_key(y),
                _ => false,
            },
            (SqlValue::Str(a), SqlValue::Str(b)) => a == b,
            (SqlValue::ObjectId(a), SqlValue::ObjectId(b)) => a == b,
            (SqlValue::Date(a), SqlValue::Date(b)) => a == b,
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SqlValue {}

impl Hash for SqlValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            SqlValue::Null | SqlValue::NoValue => 0u8.hash(state),
            SqlValue::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            SqlValue::Int(_) | SqlValue::Uint(_) | SqlValue::Float(_) | SqlValue::Decimal(_) => {
                2u8.hash(state);
                if let Some(n) = self.numeric() {
                    numeric_key(n).hash(state);
                }
            }
            SqlValue::Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            SqlValue::ObjectId(oid) => {
                4u8.hash(state);
                oid.bytes().hash(state);
            }
            SqlValue::Date(d) => {
                5u8.hash(state);
                d.hash(state);
            }
            SqlValue::Timestamp(ts) => {
                6u8.hash(state);
                ts.hash(state);
            }
            SqlValue::Tuple(values) => {
                7u8.hash(state);
                values.hash(state);
            }
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null | SqlValue::NoValue => write!(f, "NULL"),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Uint(u) => write!(f, "{}", u),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            SqlValue::Str(s) => write!(f, "{}", s),
            SqlValue::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            SqlValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            SqlValue::Tuple(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Str(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Str(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}
