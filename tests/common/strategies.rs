use proptest::prelude::*;
use serde_json::{json, Value};
use volunteer_search::query_builder::{Join, TableRef};

/// Strategy for generating qualified column names
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z_]{0,7}", "[a-z][a-z_]{0,7}").prop_map(|(table, column)| format!("{table}.{column}"))
}

/// Strategy for generating scalar parameter values
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(|n| json!(n)),
        any::<bool>().prop_map(|b| json!(b)),
        "[a-zA-Z0-9 ]{0,12}".prop_map(|s| json!(s)),
    ]
}

pub fn connective_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("AND"), Just("OR")]
}

/// Strategy for generating leaf nodes in the legacy JSON form
pub fn leaf_strategy() -> impl Strategy<Value = Value> {
    (
        field_name_strategy(),
        prop::option::of(scalar_strategy()),
        connective_strategy(),
    )
        .prop_map(|(field, value, conj)| match value {
            Some(value) => json!({"field": field, "value": value, "conj": conj}),
            None => json!({"field": field, "comp": "IS NULL", "conj": conj}),
        })
}

/// Strategy for generating nested predicate lists using every grouping syntax
pub fn predicate_tree_strategy() -> impl Strategy<Value = Value> {
    let leaf = leaf_strategy();
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            prop::collection::vec(inner, 1..4),
            connective_strategy(),
            prop_oneof![Just("paren"), Just("parenthetical"), Just("sub"), Just("lazy")],
        )
            .prop_map(|(children, conj, syntax)| {
                if syntax == "lazy" {
                    json!({ conj: children })
                } else {
                    let mut group = serde_json::Map::new();
                    group.insert(syntax.to_string(), json!(conj));
                    for (position, child) in children.into_iter().enumerate() {
                        group.insert(position.to_string(), child);
                    }
                    Value::Object(group)
                }
            })
    })
    .prop_map(|node| match node {
        Value::Array(_) => node,
        other => json!([other]),
    })
}

/// Strategy for a connected set of join descriptors in shuffled order.
///
/// Tables `t0..tn` form a tree where each `ti` joins to an earlier table and
/// `t0` is the only FROM anchor.
pub fn join_chain_strategy() -> impl Strategy<Value = (Vec<TableRef>, Vec<Join>)> {
    (1usize..7)
        .prop_flat_map(|count| {
            let parents: Vec<_> = (1..=count).map(|i| 0..i).collect();
            (parents, any::<bool>())
        })
        .prop_flat_map(|(parents, binary)| {
            let joins: Vec<Join> = parents
                .into_iter()
                .enumerate()
                .map(|(position, parent)| {
                    let child = position + 1;
                    let on = format!("t{parent}.id = t{child}.t{parent}_id");
                    let join = Join::inner(&format!("t{child}"), &on);
                    if binary {
                        join.from_table(&format!("t{parent}"))
                    } else {
                        join
                    }
                })
                .collect();
            (Just(vec![TableRef::parse("t0")]), Just(joins).prop_shuffle())
        })
}
