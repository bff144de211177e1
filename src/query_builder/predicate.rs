//! # Predicate Tree Model
//!
//! Canonical, strongly-typed representation of a WHERE filter. A
//! [`PredicateTree`] is an ordered sequence of sibling [`Predicate`] nodes,
//! each joined to the node before it by its own [`Connective`]. The first
//! node's connective is never rendered.
//!
//! Loosely-shaped legacy input is lowered into this model by
//! [`crate::query_builder::normalize`]; nothing past that boundary needs to
//! sniff shapes.

use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Boolean operator joining a node to its preceding sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Connective {
    #[default]
    And,
    Or,
}

impl Connective {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }

    /// Parse a connective token, case-insensitively
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Connective::And),
            "OR" => Ok(Connective::Or),
            _ => Err(QueryError::MalformedPredicate(format!(
                "unknown connective '{token}' (expected AND or OR)"
            ))),
        }
    }
}

impl FromStr for Connective {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// Binding type carried alongside every parameter value.
///
/// Mirrors the validation type names used by the surrounding application
/// (`String`, `Integer`, `Boolean`, ...). Unknown names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeHint {
    #[default]
    String,
    Integer,
    Int,
    Positive,
    Boolean,
    Float,
    Money,
    Date,
    Timestamp,
    Memo,
    Link,
    Other(String),
}

impl TypeHint {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" => TypeHint::String,
            "integer" => TypeHint::Integer,
            "int" => TypeHint::Int,
            "positive" => TypeHint::Positive,
            "boolean" => TypeHint::Boolean,
            "float" => TypeHint::Float,
            "money" => TypeHint::Money,
            "date" => TypeHint::Date,
            "timestamp" => TypeHint::Timestamp,
            "memo" => TypeHint::Memo,
            "link" => TypeHint::Link,
            _ => TypeHint::Other(name.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TypeHint::String => "String",
            TypeHint::Integer => "Integer",
            TypeHint::Int => "Int",
            TypeHint::Positive => "Positive",
            TypeHint::Boolean => "Boolean",
            TypeHint::Float => "Float",
            TypeHint::Money => "Money",
            TypeHint::Date => "Date",
            TypeHint::Timestamp => "Timestamp",
            TypeHint::Memo => "Memo",
            TypeHint::Link => "Link",
            TypeHint::Other(name) => name,
        }
    }
}

impl From<String> for TypeHint {
    fn from(name: String) -> Self {
        TypeHint::parse(&name)
    }
}

impl From<&str> for TypeHint {
    fn from(name: &str) -> Self {
        TypeHint::parse(name)
    }
}

impl From<TypeHint> for String {
    fn from(hint: TypeHint) -> Self {
        hint.as_str().to_string()
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `field comparator value` test
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub comparator: String,
    /// `None` when the comparator is self-contained (`IS NULL`, `> NOW()`)
    pub value: Option<Value>,
    pub type_hint: TypeHint,
    pub connective: Connective,
}

impl Condition {
    /// `field = value`, bound as a string
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, "=", value)
    }

    /// `field <comparator> value`; a JSON `null` binds nothing
    pub fn compare(field: &str, comparator: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            comparator: comparator.to_string(),
            value: Some(value.into()).filter(|value| !value.is_null()),
            type_hint: TypeHint::default(),
            connective: Connective::default(),
        }
    }

    /// `field <comparator>` with no bound value, e.g. `IS NULL`
    pub fn self_contained(field: &str, comparator: &str) -> Self {
        Self {
            field: field.to_string(),
            comparator: comparator.to_string(),
            value: None,
            type_hint: TypeHint::default(),
            connective: Connective::default(),
        }
    }

    pub fn typed(mut self, type_hint: impl Into<TypeHint>) -> Self {
        self.type_hint = type_hint.into();
        self
    }

    pub fn connective(mut self, connective: Connective) -> Self {
        self.connective = connective;
        self
    }

    pub fn or(self) -> Self {
        self.connective(Connective::Or)
    }
}

/// Opaque boolean SQL inserted verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct RawCondition {
    pub sql: String,
    pub connective: Connective,
}

/// Parenthesized sub-expression
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateGroup {
    pub connective: Connective,
    pub children: PredicateTree,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf(Condition),
    Passthrough(RawCondition),
    Group(PredicateGroup),
}

impl Predicate {
    pub fn leaf(condition: Condition) -> Self {
        Predicate::Leaf(condition)
    }

    pub fn raw(sql: &str) -> Self {
        Predicate::Passthrough(RawCondition {
            sql: sql.to_string(),
            connective: Connective::default(),
        })
    }

    pub fn group(connective: Connective, children: impl Into<PredicateTree>) -> Self {
        Predicate::Group(PredicateGroup {
            connective,
            children: children.into(),
        })
    }

    pub fn connective(&self) -> Connective {
        match self {
            Predicate::Leaf(condition) => condition.connective,
            Predicate::Passthrough(raw) => raw.connective,
            Predicate::Group(group) => group.connective,
        }
    }

    pub fn with_connective(mut self, connective: Connective) -> Self {
        match &mut self {
            Predicate::Leaf(condition) => condition.connective = connective,
            Predicate::Passthrough(raw) => raw.connective = connective,
            Predicate::Group(group) => group.connective = connective,
        }
        self
    }

    /// Canonical JSON form; normalizing it yields this node again
    pub fn to_value(&self) -> Value {
        match self {
            Predicate::Leaf(condition) => {
                let mut node = Map::new();
                node.insert("field".to_string(), json!(condition.field));
                node.insert("comp".to_string(), json!(condition.comparator));
                if let Some(value) = &condition.value {
                    node.insert("value".to_string(), value.clone());
                }
                node.insert("type".to_string(), json!(condition.type_hint.as_str()));
                node.insert("conj".to_string(), json!(condition.connective.to_sql()));
                Value::Object(node)
            }
            Predicate::Passthrough(raw) => json!({
                "sql": raw.sql,
                "conj": raw.connective.to_sql(),
            }),
            Predicate::Group(group) => json!({
                "conj": group.connective.to_sql(),
                "children": group.children.to_value(),
            }),
        }
    }
}

impl From<Condition> for Predicate {
    fn from(condition: Condition) -> Self {
        Predicate::Leaf(condition)
    }
}

/// Ordered sequence of sibling predicates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredicateTree {
    nodes: Vec<Predicate>,
}

impl PredicateTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: impl Into<Predicate>) {
        self.nodes.push(node.into());
    }

    pub fn with(mut self, node: impl Into<Predicate>) -> Self {
        self.push(node);
        self
    }

    pub fn nodes(&self) -> &[Predicate] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Predicate> {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves that will allocate a parameter
    pub fn parameter_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                Predicate::Leaf(condition) => usize::from(condition.value.is_some()),
                Predicate::Passthrough(_) => 0,
                Predicate::Group(group) => group.children.parameter_count(),
            })
            .sum()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.nodes.iter().map(Predicate::to_value).collect())
    }
}

impl From<Vec<Predicate>> for PredicateTree {
    fn from(nodes: Vec<Predicate>) -> Self {
        Self { nodes }
    }
}

impl From<Vec<Condition>> for PredicateTree {
    fn from(conditions: Vec<Condition>) -> Self {
        Self {
            nodes: conditions.into_iter().map(Predicate::Leaf).collect(),
        }
    }
}

impl FromIterator<Predicate> for PredicateTree {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PredicateTree {
    type Item = Predicate;
    type IntoIter = std::vec::IntoIter<Predicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl Extend<Predicate> for PredicateTree {
    fn extend<I: IntoIterator<Item = Predicate>>(&mut self, iter: I) {
        self.nodes.extend(iter);
    }
}
