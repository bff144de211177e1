//! # Statement Parts
//!
//! The loosely-typed statement description used by callers that assemble
//! queries as data:
//!
//! ```json
//! {
//!   "SELECTS": {"civicrm_contact": ["id", "display_name"]},
//!   "JOINS": [{
//!     "left": "civicrm_contact",
//!     "right": "civicrm_value_organization_information_5",
//!     "join": "INNER JOIN",
//!     "on": "civicrm_contact.id = civicrm_value_organization_information_5.entity_id"
//!   }],
//!   "WHERES": [{"field": "civicrm_contact.is_deleted", "value": 0, "type": "Boolean"}],
//!   "ORDER_BYS": ["civicrm_contact.sort_name"]
//! }
//! ```
//!
//! At minimum `SELECTS` and one of `TABLES`/`JOINS` must be present.

use super::builder::{Column, CompiledQuery, QueryBuilder};
use super::joins::{Join, JoinSpec, JoinType, TableRef};
use super::normalize::Normalizer;
use crate::config::CompilerConfig;
use crate::error::{QueryError, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatementParts {
    pub selects: Option<Value>,
    pub tables: Option<Vec<String>>,
    pub joins: Option<Vec<Value>>,
    pub wheres: Value,
    pub group_bys: Vec<String>,
    pub order_bys: Vec<String>,
}

impl StatementParts {
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(QueryError::Configuration(format!(
                "statement parts must be an object, found {value}"
            )));
        };

        Ok(Self {
            selects: map.get("SELECTS").cloned(),
            tables: map.get("TABLES").map(|v| string_list(v, "TABLES")).transpose()?,
            joins: map.get("JOINS").map(|v| value_list(v, "JOINS")).transpose()?,
            wheres: map.get("WHERES").cloned().unwrap_or(Value::Null),
            group_bys: map
                .get("GROUP_BYS")
                .map(|v| string_list(v, "GROUP_BYS"))
                .transpose()?
                .unwrap_or_default(),
            order_bys: map
                .get("ORDER_BYS")
                .map(|v| string_list(v, "ORDER_BYS"))
                .transpose()?
                .unwrap_or_default(),
        })
    }

    /// Lower into a [`QueryBuilder`] configured from `config`
    pub fn into_builder(self, config: &CompilerConfig) -> Result<QueryBuilder> {
        let Some(selects) = self.selects else {
            return Err(QueryError::Configuration(
                "minimum components missing: SELECTS".to_string(),
            ));
        };
        if self.tables.is_none() && self.joins.is_none() {
            return Err(QueryError::Configuration(
                "minimum components missing: TABLES or JOINS".to_string(),
            ));
        }

        let mut builder = apply_selects(QueryBuilder::with_config(config), &selects)?;

        for table in self.tables.unwrap_or_default() {
            builder = builder.from(&table);
        }
        for entry in self.joins.unwrap_or_default() {
            builder = builder.join_spec(join_spec(&entry)?);
        }

        let tree = Normalizer::with_default_type(config.default_type_hint.clone())
            .normalize(&self.wheres)?;
        builder = builder.where_tree(tree);

        let group_bys: Vec<&str> = self.group_bys.iter().map(String::as_str).collect();
        builder = builder.group_by(&group_bys);
        for order in &self.order_bys {
            builder = builder.order_by(order, "");
        }

        Ok(builder)
    }

    pub fn compile(self, config: &CompilerConfig) -> Result<CompiledQuery> {
        self.into_builder(config)?.build()
    }
}

fn apply_selects(mut builder: QueryBuilder, selects: &Value) -> Result<QueryBuilder> {
    match selects {
        Value::String(list) => Ok(builder.select_raw(list)),
        Value::Object(tables) => {
            for (table, columns) in tables {
                builder = builder.select_columns(table, columns_of(table, columns)?);
            }
            Ok(builder)
        }
        other => Err(QueryError::Configuration(format!(
            "SELECTS must map tables to columns, found {other}"
        ))),
    }
}

fn columns_of(table: &str, columns: &Value) -> Result<Vec<Column>> {
    let Value::Array(items) = columns else {
        return Err(QueryError::Configuration(format!(
            "columns for '{table}' must be a list"
        )));
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(Column::Name(name.clone())),
            Value::Object(expr) => raw_column(table, expr),
            other => Err(QueryError::Configuration(format!(
                "unsupported column for '{table}': {other}"
            ))),
        })
        .collect()
}

fn raw_column(table: &str, expr: &Map<String, Value>) -> Result<Column> {
    match (expr.get("expr"), expr.get("alias")) {
        (Some(Value::String(sql)), None) => Ok(Column::raw(sql)),
        (Some(Value::String(sql)), Some(Value::String(alias))) => Ok(Column::aliased(sql, alias)),
        _ => Err(QueryError::Configuration(format!(
            "raw column for '{table}' needs a string 'expr' and optional 'alias'"
        ))),
    }
}

/// Interpret one `JOINS` entry
pub fn join_spec(entry: &Value) -> Result<JoinSpec> {
    match entry {
        Value::String(sql) => Ok(JoinSpec::Raw(sql.clone())),
        Value::Object(map) => {
            let right = match map.get("right") {
                Some(Value::String(right)) => right,
                _ => {
                    return Err(QueryError::UnsupportedShape(format!(
                        "join descriptor needs a string 'right' table: {entry}"
                    )))
                }
            };
            let join_type = join_text(map, "join")?
                .or(join_text(map, "join_kind")?)
                .map(JoinType::parse)
                .unwrap_or_default();

            Ok(JoinSpec::Descriptor(Join {
                join_type,
                left: join_text(map, "left")?.map(TableRef::parse),
                right: TableRef::parse(right),
                on_condition: join_text(map, "on")?.unwrap_or_default().trim().to_string(),
            }))
        }
        other => Err(QueryError::UnsupportedShape(format!(
            "join entries must be descriptors or SQL strings, found {other}"
        ))),
    }
}

fn join_text<'a>(map: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(QueryError::UnsupportedShape(format!(
            "join '{key}' must be a string, found {other}"
        ))),
    }
}

fn string_list(value: &Value, key: &str) -> Result<Vec<String>> {
    match value {
        Value::String(single) => Ok(vec![single.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(QueryError::Configuration(format!(
                    "{key} entries must be strings, found {other}"
                ))),
            })
            .collect(),
        other => Err(QueryError::Configuration(format!(
            "{key} must be a list of strings, found {other}"
        ))),
    }
}

fn value_list(value: &Value, key: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => Ok(map.values().cloned().collect()),
        other => Err(QueryError::Configuration(format!(
            "{key} must be a list, found {other}"
        ))),
    }
}

impl TryFrom<&Value> for StatementParts {
    type Error = QueryError;

    fn try_from(value: &Value) -> Result<Self> {
        Self::from_value(value)
    }
}
