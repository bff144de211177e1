use serde_json::{json, Value};
use volunteer_search::query_builder::{
    normalize, Condition, Connective, Normalizer, Predicate, PredicateTree, TypeHint, WhereClause,
};
use volunteer_search::QueryError;

#[test]
fn test_all_group_synonyms_are_equivalent() {
    let expected = normalize(&json!([
        {"field": "a", "value": 1},
        {"OR": [{"field": "b", "value": 2}, {"field": "c", "value": 3, "conj": "OR"}]}
    ]))
    .unwrap();

    for synonym in ["paren", "parenthesis", "parenthetical", "sub"] {
        let tree = normalize(&json!([
            {"field": "a", "value": 1},
            {synonym: "or", "0": {"field": "b", "value": 2}, "1": {"field": "c", "value": 3, "conj": "OR"}}
        ]))
        .unwrap();
        assert_eq!(tree, expected, "synonym {synonym}");
    }
}

#[test]
fn test_keyed_map_root() {
    let tree = normalize(&json!({
        "first": {"field": "civicrm_contact.first_name", "value": "Ada"},
        "AND": {"0": {"field": "civicrm_contact.is_deleted", "value": 0, "type": "Boolean"}}
    }))
    .unwrap();

    let clause = WhereClause::compile(&tree).unwrap().unwrap();
    assert_eq!(
        clause.sql,
        "civicrm_contact.first_name = %0 AND (civicrm_contact.is_deleted = %1)"
    );
    assert_eq!(clause.parameters[1].type_hint, TypeHint::Boolean);
}

#[test]
fn test_canonical_form_round_trips() {
    let tree = normalize(&json!([
        "needs.is_active = 1",
        {"field": "needs.start_time", "comparator": ">=", "value": "2024-01-01", "type_hint": "Date"},
        {"parenthetical": "OR",
         "0": {"field": "needs.end_time", "comp": "IS NULL"},
         "1": {"field": "needs.end_time", "comp": "> NOW()", "connective": "or"}}
    ]))
    .unwrap();

    assert_eq!(normalize(&tree.to_value()).unwrap(), tree);
    assert_eq!(PredicateTree::try_from(&tree.to_value()).unwrap(), tree);
    assert_eq!(tree.parameter_count(), 1);
}

#[test]
fn test_passthrough_object_keeps_connective() {
    let tree = normalize(&json!([
        {"field": "a", "value": 1},
        {"sql": "b IS NOT NULL", "conj": "OR"}
    ]))
    .unwrap();
    match &tree.nodes()[1] {
        Predicate::Passthrough(raw) => {
            assert_eq!(raw.sql, "b IS NOT NULL");
            assert_eq!(raw.connective, Connective::Or);
        }
        other => panic!("expected passthrough, got {other:?}"),
    }
}

#[test]
fn test_malformed_inputs() {
    assert!(matches!(
        normalize(&json!(42)),
        Err(QueryError::MalformedPredicate(_))
    ));
    assert!(matches!(
        normalize(&json!([{"field": "a", "value": 1, "conj": "XOR"}])),
        Err(QueryError::MalformedPredicate(_))
    ));
    assert!(matches!(
        normalize(&json!([{"field": "a", "value": [1, 2]}])),
        Err(QueryError::MalformedPredicate(_))
    ));
    assert!(matches!(
        normalize(&json!([[{"field": "a", "value": 1}, {"field": "b", "value": 2}]])),
        Err(QueryError::MalformedPredicate(_))
    ));
}

#[test]
fn test_configured_default_type() {
    let tree = Normalizer::with_default_type(TypeHint::Memo)
        .normalize(&json!([{"field": "a", "value": "x"}, {"field": "b", "value": 1, "type": "Int"}]))
        .unwrap();
    let clause = WhereClause::compile(&tree).unwrap().unwrap();
    assert_eq!(clause.parameters[0].type_hint, TypeHint::Memo);
    assert_eq!(clause.parameters[1].type_hint, TypeHint::Int);
}

#[test]
fn test_leaf_keys_never_become_sql() {
    for fragment in [
        json!({"value": "1=1; DROP TABLE civicrm_contact"}),
        json!({"comp": "IS NULL"}),
        json!({"comparator": "> 0"}),
        json!({"type": "Integer"}),
        json!({"conj": "OR"}),
        json!({"connective": "AND"}),
    ] {
        let input = json!([{"field": "needs.id", "value": 1}, fragment]);
        assert!(
            matches!(normalize(&input), Err(QueryError::MalformedPredicate(_))),
            "accepted {input}"
        );
    }

    assert!(matches!(
        normalize(&json!({"value": "1=1"})),
        Err(QueryError::MalformedPredicate(_))
    ));
    assert!(matches!(
        normalize(&json!([{"paren": "OR", "value": "1=1"}])),
        Err(QueryError::MalformedPredicate(_))
    ));
}

#[test]
fn test_single_key_wrapper_needs_nested_structure() {
    assert!(matches!(
        normalize(&json!([{"label": "needs.is_active = 1"}])),
        Err(QueryError::MalformedPredicate(_))
    ));

    let tree = normalize(&json!([
        {"label": {"field": "needs.is_active", "value": 1}},
        {"OR": "needs.is_flexible = 1"}
    ]))
    .unwrap();
    let clause = WhereClause::compile(&tree).unwrap().unwrap();
    assert_eq!(clause.sql, "needs.is_active = %0 OR (needs.is_flexible = 1)");
}

#[test]
fn test_null_typed_value_survives_round_trip() {
    let tree = PredicateTree::new()
        .with(Condition::eq("needs.role_id", Value::Null))
        .with(Condition::self_contained("needs.end_time", "IS NULL"));
    assert_eq!(tree.parameter_count(), 0);
    assert_eq!(normalize(&tree.to_value()).unwrap(), tree);
}
