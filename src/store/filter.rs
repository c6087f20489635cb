// Filter Document Matching
//
// Evaluates the subset of query operators the planner renders: implicit
// equality, $eq $ne $gt $gte $lt $lte $in $nin $exists $regex and the
// logical $and $or $nor. A missing field matches `null` for $eq and $in,
// and so fails $ne/$nin against null.

use std::cmp::Ordering;

use bson::{Bson, Document};
use regex::Regex;

use super::StoreError;
use crate::query::executor::value::SqlValue;

/// Test a document against a filter document
pub fn matches(document: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => logical_operands(key, condition)?
                .iter()
                .map(|f| matches(document, f))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .all(|m| m),
            "$or" => logical_operands(key, condition)?
                .iter()
                .map(|f| matches(document, f))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .any(|m| m),
            "$nor" => !logical_operands(key, condition)?
                .iter()
                .map(|f| matches(document, f))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .any(|m| m),
            op if op.starts_with('$') => return Err(StoreError::UnsupportedOperator(op.to_string())),
            field => field_matches(lookup_path(document, field), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolve a dotted field path
pub fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = document.get(first)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

fn logical_operands<'a>(key: &str, value: &'a Bson) -> Result<Vec<&'a Document>, StoreError> {
    match value {
        Bson::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| match item {
                Bson::Document(d) => Ok(d),
                other => Err(StoreError::MalformedFilter(format!("{} expects documents, got {}", key, other))),
            })
            .collect(),
        _ => Err(StoreError::MalformedFilter(format!("{} expects a non-empty array", key))),
    }
}

fn is_operator_document(value: &Bson) -> Option<&Document> {
    match value {
        Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn field_matches(field: Option<&Bson>, condition: &Bson) -> Result<bool, StoreError> {
    let operators = match is_operator_document(condition) {
        Some(ops) => ops,
        None => return Ok(equals(field, condition)),
    };

    for (op, operand) in operators {
        let matched = match op.as_str() {
            "$eq" => equals(field, operand),
            "$ne" => !equals(field, operand),
            "$gt" => compare(field, operand) == Some(Ordering::Greater),
            "$gte" => matches!(compare(field, operand), Some(Ordering::Greater | Ordering::Equal)),
            "$lt" => compare(field, operand) == Some(Ordering::Less),
            "$lte" => matches!(compare(field, operand), Some(Ordering::Less | Ordering::Equal)),
            "$in" => in_list(field, operand, op)?,
            "$nin" => !in_list(field, operand, op)?,
            "$exists" => {
                let wanted = !matches!(operand, Bson::Boolean(false) | Bson::Int32(0) | Bson::Int64(0));
                field.is_some() == wanted
            }
            "$regex" => {
                let options = operators.get_str("$options").unwrap_or("");
                regex_matches(field, operand, options)?
            }
            "$options" => true,
            other => return Err(StoreError::UnsupportedOperator(other.to_string())),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(field: Option<&Bson>, operand: &Bson) -> bool {
    match (field, operand) {
        (None | Some(Bson::Null), Bson::Null) => true,
        (None, _) => false,
        (Some(value), _) => compare(Some(value), operand) == Some(Ordering::Equal),
    }
}

/// Compare through the engine's value ordering. Values of unrelated types
/// and nulls never compare.
fn compare(field: Option<&Bson>, operand: &Bson) -> Option<Ordering> {
    let left = SqlValue::from_bson(field);
    let right = SqlValue::from_bson(Some(operand));
    if left.is_null() || right.is_null() {
        return None;
    }
    if matches!((&left, &right), (SqlValue::Str(_), SqlValue::Date(_) | SqlValue::Timestamp(_) | SqlValue::ObjectId(_)))
        || matches!((&left, &right), (SqlValue::Date(_) | SqlValue::Timestamp(_) | SqlValue::ObjectId(_), SqlValue::Str(_)))
    {
        return None;
    }
    left.compare(&right).ok()
}

fn in_list(field: Option<&Bson>, operand: &Bson, op: &str) -> Result<bool, StoreError> {
    match operand {
        Bson::Array(items) => Ok(items.iter().any(|item| equals(field, item))),
        _ => Err(StoreError::MalformedFilter(format!("{} expects an array", op))),
    }
}

fn regex_matches(field: Option<&Bson>, operand: &Bson, options: &str) -> Result<bool, StoreError> {
    let (pattern, flags) = match operand {
        Bson::String(p) => (p.clone(), options.to_string()),
        Bson::RegularExpression(r) => (r.pattern.clone(), format!("{}{}", r.options, options)),
        other => return Err(StoreError::MalformedFilter(format!("$regex expects a pattern, got {}", other))),
    };
    let text = match field {
        Some(Bson::String(s)) => s,
        _ => return Ok(false),
    };
    let mut prefix = String::new();
    for flag in flags.chars().filter(|c| matches!(c, 'i' | 'm' | 's' | 'x')) {
        if !prefix.contains(flag) {
            prefix.push(flag);
        }
    }
    let pattern = if prefix.is_empty() { pattern } else { format!("(?{}){}", prefix, pattern) };
    let regex = Regex::new(&pattern).map_err(|e| StoreError::MalformedFilter(e.to_string()))?;
    Ok(regex.is_match(text))
}
