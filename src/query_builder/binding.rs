//! # Postgres Binding
//!
//! Converts a [`CompiledQuery`] into Postgres form: `%n` placeholders become
//! `$1..$k` in parameter order and every parameter is coerced to the Rust
//! type its hint names. With the `postgres` feature the result can be bound
//! onto an `sqlx` query; nothing here executes it.

use super::builder::CompiledQuery;
use super::conditions::Parameter;
use super::predicate::TypeHint;
use crate::error::{QueryError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y%m%d%H%M%S"];

/// A parameter value in the Rust type Postgres will receive
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl BindValue {
    /// Coerce a parameter according to its type hint
    pub fn coerce(parameter: &Parameter) -> Result<Self> {
        let fail = |message: &str| QueryError::ParameterType {
            index: parameter.index,
            type_hint: parameter.type_hint.to_string(),
            message: format!("{message}, found {}", parameter.value),
        };
        let value = &parameter.value;

        match &parameter.type_hint {
            TypeHint::Integer | TypeHint::Int => {
                as_i64(value).map(BindValue::Int).ok_or_else(|| fail("expected an integer"))
            }
            TypeHint::Positive => match as_i64(value) {
                Some(n) if n > 0 => Ok(BindValue::Int(n)),
                _ => Err(fail("expected a positive integer")),
            },
            TypeHint::Boolean => {
                as_bool(value).map(BindValue::Bool).ok_or_else(|| fail("expected a boolean"))
            }
            TypeHint::Float | TypeHint::Money => {
                as_f64(value).map(BindValue::Float).ok_or_else(|| fail("expected a number"))
            }
            TypeHint::Date => as_str(value)
                .and_then(parse_date)
                .map(BindValue::Date)
                .ok_or_else(|| fail("expected a date")),
            TypeHint::Timestamp => as_str(value)
                .and_then(parse_timestamp)
                .map(BindValue::Timestamp)
                .ok_or_else(|| fail("expected a timestamp")),
            _ => match value {
                Value::String(s) => Ok(BindValue::Text(s.clone())),
                Value::Number(n) => Ok(BindValue::Text(n.to_string())),
                Value::Bool(b) => Ok(BindValue::Text(b.to_string())),
                _ => Err(fail("expected a scalar")),
            },
        }
    }
}

fn as_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim)
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Statement text with `$n` placeholders and values in bind order
#[derive(Debug, Clone, PartialEq)]
pub struct PgStatement {
    pub sql: String,
    pub values: Vec<BindValue>,
}

impl CompiledQuery {
    /// Rewrite placeholders for Postgres and coerce every parameter
    pub fn to_postgres(&self) -> Result<PgStatement> {
        let positions: HashMap<usize, usize> = self
            .parameters
            .iter()
            .enumerate()
            .map(|(position, parameter)| (parameter.index, position + 1))
            .collect();

        let values = self
            .parameters
            .iter()
            .map(BindValue::coerce)
            .collect::<Result<Vec<_>>>()?;

        Ok(PgStatement {
            sql: rewrite_placeholders(&self.sql, &positions),
            values,
        })
    }
}

/// Replace `%n` with `$k` for every index in `positions`; other text is kept
fn rewrite_placeholders(sql: &str, positions: &HashMap<usize, usize>) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(at) = rest.find('%') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        let position = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|index| positions.get(&index));

        match position {
            Some(position) => {
                out.push('$');
                out.push_str(&position.to_string());
                rest = &after[digits..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(feature = "postgres")]
impl PgStatement {
    /// Bind every value onto an unexecuted `sqlx` query
    pub fn query(&self) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
        self.values
            .iter()
            .fold(sqlx::query(&self.sql), |query, value| match value {
                BindValue::Int(v) => query.bind(*v),
                BindValue::Float(v) => query.bind(*v),
                BindValue::Bool(v) => query.bind(*v),
                BindValue::Text(v) => query.bind(v.clone()),
                BindValue::Date(v) => query.bind(*v),
                BindValue::Timestamp(v) => query.bind(*v),
            })
    }
}
