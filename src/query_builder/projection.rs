//! # Return-Field Projection
//!
//! Shapes a fetched row into the fields a caller asked for. Requests are
//! either a bare field name or `field => alias`:
//!
//! ```rust
//! use serde_json::json;
//! use volunteer_search::query_builder::projection::{project_row, ReturnFields};
//!
//! let fields = ReturnFields::from_value(&json!({"0": "id", "title": "project_title"})).unwrap();
//! let row = json!({"id": 4, "title": "Food drive", "is_active": 1});
//! let projected = project_row(row.as_object().unwrap(), &fields);
//! assert_eq!(serde_json::Value::Object(projected), json!({"id": 4, "project_title": "Food drive"}));
//! ```

use crate::error::{QueryError, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnField {
    Plain(String),
    Aliased { field: String, alias: String },
}

impl ReturnField {
    pub fn field(&self) -> &str {
        match self {
            ReturnField::Plain(field) | ReturnField::Aliased { field, .. } => field,
        }
    }

    /// Key the value is returned under
    pub fn output_key(&self) -> &str {
        match self {
            ReturnField::Plain(field) => field,
            ReturnField::Aliased { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReturnFields(Vec<ReturnField>);

impl ReturnFields {
    pub fn new(fields: Vec<ReturnField>) -> Self {
        Self(fields)
    }

    /// Parse a list of names, or an object whose numeric keys mark plain
    /// fields and whose other keys map a field to its alias
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(field) => Ok(ReturnField::Plain(field.clone())),
                    other => Err(QueryError::Configuration(format!(
                        "return fields must be strings, found {other}"
                    ))),
                })
                .collect::<Result<_>>()?,
            Value::Object(map) => map
                .iter()
                .map(|(key, entry)| {
                    let Value::String(name) = entry else {
                        return Err(QueryError::Configuration(format!(
                            "return field '{key}' must map to a string, found {entry}"
                        )));
                    };
                    if key.parse::<usize>().is_ok() {
                        Ok(ReturnField::Plain(name.clone()))
                    } else {
                        Ok(ReturnField::Aliased {
                            field: key.clone(),
                            alias: name.clone(),
                        })
                    }
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(QueryError::Configuration(format!(
                    "return fields must be a list or object, found {other}"
                )))
            }
        };
        Ok(Self(fields))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReturnField> {
        self.0.iter()
    }
}

impl FromIterator<ReturnField> for ReturnFields {
    fn from_iter<I: IntoIterator<Item = ReturnField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Project `row` onto `fields`; missing fields come back as null and an
/// empty request returns the row unchanged
pub fn project_row(row: &Map<String, Value>, fields: &ReturnFields) -> Map<String, Value> {
    if fields.is_empty() {
        return row.clone();
    }

    fields
        .iter()
        .map(|field| {
            let value = row.get(field.field()).cloned().unwrap_or(Value::Null);
            (field.output_key().to_string(), value)
        })
        .collect()
}
