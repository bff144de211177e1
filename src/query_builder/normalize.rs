//! # Predicate Normalizer
//!
//! Lowers loosely-shaped JSON filter descriptions into a [`PredicateTree`].
//!
//! Two grouping syntaxes are accepted and folded into [`Predicate::Group`]:
//!
//! - **Explicit**: a node carrying one of `paren`, `parenthesis`,
//!   `parenthetical` or `sub`. The key's value is the group's connective and
//!   the node's remaining entries are its children. When several of these
//!   keys are present the last one in document order wins.
//! - **Lazy**: an entry keyed literally `AND` or `OR` whose value is a
//!   sub-tree.
//!
//! The canonical shapes produced by [`PredicateTree::to_value`] are accepted
//! too, so normalizing a canonical tree yields the same tree.
//!
//! ```rust
//! use serde_json::json;
//! use volunteer_search::query_builder::normalize::normalize;
//!
//! let tree = normalize(&json!([
//!     {"field": "civicrm_contact.first_name", "value": "Ada"},
//!     {"parenthetical": "or",
//!      "0": {"field": "civicrm_address.postal_code", "value": "22201"},
//!      "1": {"field": "civicrm_address.state", "value": "VA", "conj": "OR"}},
//! ])).unwrap();
//! assert_eq!(tree.len(), 2);
//! ```

use super::predicate::{
    Condition, Connective, Predicate, PredicateGroup, PredicateTree, RawCondition, TypeHint,
};
use crate::error::{QueryError, Result};
use serde_json::{Map, Value};

/// Keys that mark an explicit parenthetical
pub const GROUP_SYNONYMS: [&str; 4] = ["paren", "parenthesis", "parenthetical", "sub"];

const CONNECTIVE_KEYS: [&str; 2] = ["conj", "connective"];
const COMPARATOR_KEYS: [&str; 2] = ["comp", "comparator"];
const TYPE_KEYS: [&str; 2] = ["type", "type_hint"];
const CHILDREN_KEYS: [&str; 2] = ["children", "group"];

/// Normalize a JSON predicate description using `String` as the default type
pub fn normalize(value: &Value) -> Result<PredicateTree> {
    Normalizer::default().normalize(value)
}

/// Stateless lowering of legacy predicate shapes
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    default_type_hint: TypeHint,
}

impl Normalizer {
    pub fn with_default_type(default_type_hint: TypeHint) -> Self {
        Self { default_type_hint }
    }

    /// Normalize a root value: `null`, a node list, a keyed node map, or a
    /// single node
    pub fn normalize(&self, value: &Value) -> Result<PredicateTree> {
        match value {
            Value::Null => Ok(PredicateTree::new()),
            Value::Array(items) => self.sequence_from_array(items),
            Value::Object(map) if is_node_shape(map) => {
                Ok(PredicateTree::from(vec![self.node_from_object(map)?]))
            }
            Value::Object(map) => self.sequence_from_object(map),
            Value::String(sql) => Ok(PredicateTree::from(vec![raw(sql, Connective::And)])),
            other => Err(QueryError::MalformedPredicate(format!(
                "expected a predicate list, found {other}"
            ))),
        }
    }

    fn sequence_from_array(&self, items: &[Value]) -> Result<PredicateTree> {
        items.iter().map(|item| self.node(item)).collect()
    }

    fn sequence_from_object(&self, map: &Map<String, Value>) -> Result<PredicateTree> {
        map.iter()
            .map(|(key, item)| self.keyed_node(key, item))
            .collect()
    }

    /// A sequence entry; `AND`/`OR` keys introduce lazy groups
    fn keyed_node(&self, key: &str, item: &Value) -> Result<Predicate> {
        if is_leaf_key(key) {
            return Err(QueryError::MalformedPredicate(format!(
                "'field' is required: {{\"{key}\": {item}}}"
            )));
        }
        match lazy_connective(key) {
            Some(connective) => Ok(Predicate::Group(PredicateGroup {
                connective,
                children: self.subtree(item)?,
            })),
            None => self.node(item),
        }
    }

    /// Children of a lazy group; a lone leaf becomes a one-child group
    fn subtree(&self, value: &Value) -> Result<PredicateTree> {
        match value {
            Value::Object(map) if is_node_shape(map) => {
                Ok(PredicateTree::from(vec![self.node_from_object(map)?]))
            }
            Value::Object(map) => self.sequence_from_object(map),
            Value::Array(items) => self.sequence_from_array(items),
            Value::String(sql) => Ok(PredicateTree::from(vec![raw(sql, Connective::And)])),
            other => Err(QueryError::MalformedPredicate(format!(
                "group body must be a predicate list, found {other}"
            ))),
        }
    }

    fn node(&self, value: &Value) -> Result<Predicate> {
        match value {
            Value::String(sql) => Ok(raw(sql, Connective::And)),
            Value::Object(map) if is_node_shape(map) => self.node_from_object(map),
            Value::Object(map) if map.len() == 1 => match map.iter().next() {
                Some((key, inner)) if is_wrapper_entry(key, inner) => self.keyed_node(key, inner),
                _ => Err(QueryError::MalformedPredicate(format!(
                    "'field' is required: {value}"
                ))),
            },
            Value::Array(items) if items.len() == 1 => self.node(&items[0]),
            Value::Object(_) | Value::Array(_) => Err(QueryError::MalformedPredicate(format!(
                "nested structure without a recognizable predicate shape: {value}"
            ))),
            other => Err(QueryError::MalformedPredicate(format!(
                "expected a predicate node, found {other}"
            ))),
        }
    }

    fn node_from_object(&self, map: &Map<String, Value>) -> Result<Predicate> {
        if let Some(connective) = explicit_group_connective(map)? {
            let children: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| !is_reserved_group_key(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            return Ok(Predicate::Group(PredicateGroup {
                connective,
                children: self.sequence_from_object(&children)?,
            }));
        }

        let connective = match first_present(map, &CONNECTIVE_KEYS) {
            Some(value) => Connective::parse(scalar_str(value, "conj")?)?,
            None => Connective::default(),
        };

        if let Some(children) = children_of(map) {
            return Ok(Predicate::Group(PredicateGroup {
                connective,
                children: self.subtree(children)?,
            }));
        }

        if map.contains_key("field") {
            return self.leaf(map, connective).map(Predicate::Leaf);
        }

        match map.get("sql") {
            Some(sql) => Ok(raw(scalar_str(sql, "sql")?, connective)),
            None => Err(QueryError::MalformedPredicate(format!(
                "'field' is required: {}",
                Value::Object(map.clone())
            ))),
        }
    }

    fn leaf(&self, map: &Map<String, Value>, connective: Connective) -> Result<Condition> {
        let field = match map.get("field") {
            Some(value) => scalar_str(value, "field")?.to_string(),
            None => {
                return Err(QueryError::MalformedPredicate(
                    "'field' is required".to_string(),
                ))
            }
        };

        let comparator = first_present(map, &COMPARATOR_KEYS)
            .map(|value| scalar_str(value, "comp"))
            .transpose()?;

        let value = match map.get("value") {
            None | Some(Value::Null) => None,
            Some(Value::Array(_)) | Some(Value::Object(_)) => {
                return Err(QueryError::MalformedPredicate(format!(
                    "value for '{field}' must be a scalar"
                )))
            }
            Some(scalar) => Some(scalar.clone()),
        };

        if value.is_none() && comparator.is_none() {
            return Err(QueryError::MalformedPredicate(format!(
                "'{field}' needs a value or a self-contained comparator"
            )));
        }

        let type_hint = match first_present(map, &TYPE_KEYS) {
            Some(value) => TypeHint::parse(scalar_str(value, "type")?),
            None => self.default_type_hint.clone(),
        };

        Ok(Condition {
            field,
            comparator: comparator.unwrap_or("=").to_string(),
            value,
            type_hint,
            connective,
        })
    }
}

fn raw(sql: &str, connective: Connective) -> Predicate {
    Predicate::Passthrough(RawCondition {
        sql: sql.to_string(),
        connective,
    })
}

fn lazy_connective(key: &str) -> Option<Connective> {
    Connective::parse(key).ok()
}

fn is_children_key(key: &str) -> bool {
    CHILDREN_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn is_node_shape(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| {
        GROUP_SYNONYMS.contains(&key.as_str())
            || is_children_key(key)
            || key == "field"
            || key == "sql"
    })
}

/// Keys that only make sense on a leaf; never a wrapper or a sequence label
fn is_leaf_key(key: &str) -> bool {
    key == "value"
        || COMPARATOR_KEYS.contains(&key)
        || TYPE_KEYS.contains(&key)
        || CONNECTIVE_KEYS.contains(&key)
}

/// A one-entry object unwraps only around nested structure or a lazy group
fn is_wrapper_entry(key: &str, inner: &Value) -> bool {
    if is_leaf_key(key) {
        return false;
    }
    lazy_connective(key).is_some() || matches!(inner, Value::Object(_) | Value::Array(_))
}

fn is_reserved_group_key(key: &str) -> bool {
    GROUP_SYNONYMS.contains(&key) || CONNECTIVE_KEYS.contains(&key)
}

/// Connective of an explicit parenthetical; the last synonym present wins
fn explicit_group_connective(map: &Map<String, Value>) -> Result<Option<Connective>> {
    map.iter()
        .filter(|(key, _)| GROUP_SYNONYMS.contains(&key.as_str()))
        .last()
        .map(|(key, value)| Connective::parse(scalar_str(value, key)?))
        .transpose()
}

fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

fn children_of(map: &Map<String, Value>) -> Option<&Value> {
    map.iter()
        .find(|(key, _)| is_children_key(key))
        .map(|(_, value)| value)
}

fn scalar_str<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    match value {
        Value::String(s) => Ok(s),
        Value::Array(_) | Value::Object(_) => Err(QueryError::MalformedPredicate(format!(
            "'{key}' must be a string, found a nested structure"
        ))),
        other => Err(QueryError::MalformedPredicate(format!(
            "'{key}' must be a string, found {other}"
        ))),
    }
}

impl TryFrom<&Value> for PredicateTree {
    type Error = QueryError;

    fn try_from(value: &Value) -> Result<Self> {
        normalize(value)
    }
}
