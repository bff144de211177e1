//! # WHERE Clause Compilation
//!
//! Lowers a [`PredicateTree`] into SQL text with `%n` placeholders and the
//! matching parameter list.
//!
//! The placeholder counter is an explicit value: every step takes the next
//! free index and hands back the one after its last allocation, so two
//! compilations never share state and a caller can continue numbering from a
//! fragment compiled elsewhere via [`WhereClause::compile_from`].

use super::predicate::{Condition, Predicate, PredicateTree, TypeHint};
use crate::error::{QueryError, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

/// A bound value and the type it should be bound as
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// Placeholder number; `%{index}` in the SQL text
    pub index: usize,
    pub value: Value,
    pub type_hint: TypeHint,
}

/// Compiled WHERE fragment (without the `WHERE` keyword)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereClause {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    /// First index not allocated by this fragment
    pub next_index: usize,
}

impl WhereClause {
    /// Compile with placeholders numbered from zero.
    ///
    /// Returns `Ok(None)` for an empty tree: there is no WHERE clause.
    pub fn compile(tree: &PredicateTree) -> Result<Option<Self>> {
        Self::compile_from(tree, 0)
    }

    /// Compile with placeholders numbered from `offset`
    pub fn compile_from(tree: &PredicateTree, offset: usize) -> Result<Option<Self>> {
        if tree.is_empty() {
            return Ok(None);
        }

        let clause = compile_sequence(tree.nodes(), offset)?;
        trace!(
            offset = offset,
            next_index = clause.next_index,
            parameters = clause.parameters.len(),
            "compiled WHERE clause"
        );
        Ok(Some(clause))
    }

    /// Placeholder indices in the order they appear
    pub fn placeholder_indices(&self) -> Vec<usize> {
        placeholder_indices(&self.sql)
    }
}

fn compile_sequence(nodes: &[Predicate], offset: usize) -> Result<WhereClause> {
    let mut sql = String::new();
    let mut parameters = Vec::new();
    let mut next_index = offset;

    for (position, node) in nodes.iter().enumerate() {
        let fragment = compile_node(node, next_index)?;
        if position > 0 {
            sql.push(' ');
            sql.push_str(node.connective().to_sql());
            sql.push(' ');
        }
        sql.push_str(&fragment.sql);
        parameters.extend(fragment.parameters);
        next_index = fragment.next_index;
    }

    Ok(WhereClause {
        sql,
        parameters,
        next_index,
    })
}

fn compile_node(node: &Predicate, index: usize) -> Result<WhereClause> {
    match node {
        Predicate::Leaf(condition) => compile_condition(condition, index),
        Predicate::Passthrough(raw) => {
            let sql = non_empty(&raw.sql, "raw condition")?;
            Ok(WhereClause {
                sql: sql.to_string(),
                parameters: Vec::new(),
                next_index: index,
            })
        }
        Predicate::Group(group) => {
            if group.children.is_empty() {
                return Err(QueryError::EmptyClause(
                    "parenthetical group has no children".to_string(),
                ));
            }
            let inner = compile_sequence(group.children.nodes(), index)?;
            non_empty(&inner.sql, "parenthetical group")?;
            Ok(WhereClause {
                sql: format!("({})", inner.sql),
                ..inner
            })
        }
    }
}

fn compile_condition(condition: &Condition, index: usize) -> Result<WhereClause> {
    let field = non_empty(&condition.field, "condition field")?;
    let comparator = condition.comparator.trim();

    match &condition.value {
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(QueryError::MalformedPredicate(
            format!("value for '{field}' must be a scalar"),
        )),
        Some(value) if !value.is_null() => {
            let comparator = if comparator.is_empty() { "=" } else { comparator };
            let next_index = index.checked_add(1).ok_or_else(|| {
                QueryError::Configuration(format!(
                    "placeholder numbering overflows after %{index}"
                ))
            })?;
            Ok(WhereClause {
                sql: format!("{field} {comparator} %{index}"),
                parameters: vec![Parameter {
                    index,
                    value: value.clone(),
                    type_hint: condition.type_hint.clone(),
                }],
                next_index,
            })
        }
        _ => {
            if comparator.is_empty() {
                return Err(QueryError::MalformedPredicate(format!(
                    "'{field}' has neither a value nor a self-contained comparator"
                )));
            }
            Ok(WhereClause {
                sql: format!("{field} {comparator}"),
                parameters: Vec::new(),
                next_index: index,
            })
        }
    }
}

fn non_empty<'a>(text: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(QueryError::EmptyClause(format!("{what} is empty")))
    } else {
        Ok(trimmed)
    }
}

/// Scan SQL text for `%n` placeholders, in order of appearance
pub fn placeholder_indices(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut indices = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                if let Ok(index) = sql[start..end].parse() {
                    indices.push(index);
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }

    indices
}
