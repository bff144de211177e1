//! # Clause Composition
//!
//! Merges two predicate trees, either by concatenating their top-level nodes
//! or by appending the addition as a single parenthesized group.

use super::normalize::Normalizer;
use super::predicate::{Connective, Predicate, PredicateTree};
use crate::error::Result;
use serde_json::{Map, Value};

/// Key under which a statement description carries its predicate tree
pub const WHERE_KEY: &str = "WHERES";

impl PredicateTree {
    /// Concatenate `addition` onto this tree, joining the seam with AND
    pub fn merge(self, addition: PredicateTree) -> PredicateTree {
        self.merge_with(addition, Connective::And)
    }

    /// Concatenate `addition` onto this tree, joining the seam with `seam`
    pub fn merge_with(mut self, addition: PredicateTree, seam: Connective) -> PredicateTree {
        let mut nodes = addition.into_nodes().into_iter();
        if let Some(first) = nodes.next() {
            self.push(first.with_connective(seam));
        }
        self.extend(nodes);
        self
    }

    /// Append `addition` as one parenthesized group joined by `connective`.
    ///
    /// An empty addition leaves the tree unchanged rather than producing an
    /// empty group.
    pub fn merge_wrapped(mut self, addition: PredicateTree, connective: Connective) -> PredicateTree {
        if !addition.is_empty() {
            self.push(Predicate::group(connective, addition));
        }
        self
    }
}

/// Merge two trees; `wrap` selects parenthesized composition
pub fn compose(base: PredicateTree, addition: PredicateTree, wrap: Option<Connective>) -> PredicateTree {
    match wrap {
        Some(connective) => base.merge_wrapped(addition, connective),
        None => base.merge(addition),
    }
}

/// Merge two JSON predicate descriptions.
///
/// Either side may be a bare predicate list or a wrapper object carrying the
/// tree under `WHERES` (for example a whole statement description). Both are
/// unwrapped and normalized; the result takes the shape of `base`, so a
/// wrapped base keeps its other keys and an addition's wrapper is dropped.
pub fn compose_values(base: &Value, addition: &Value, wrap: Option<Connective>) -> Result<Value> {
    let normalizer = Normalizer::default();
    let base_tree = normalizer.normalize(unwrap_tree(base))?;
    let addition_tree = normalizer.normalize(unwrap_tree(addition))?;
    let merged = compose(base_tree, addition_tree, wrap).to_value();

    Ok(match base {
        Value::Object(wrapper) if wrapper.contains_key(WHERE_KEY) => {
            let mut wrapper: Map<String, Value> = wrapper.clone();
            wrapper.insert(WHERE_KEY.to_string(), merged);
            Value::Object(wrapper)
        }
        _ => merged,
    })
}

fn unwrap_tree(value: &Value) -> &Value {
    match value {
        Value::Object(wrapper) => wrapper.get(WHERE_KEY).unwrap_or(value),
        _ => value,
    }
}
