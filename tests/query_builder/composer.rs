use serde_json::json;
use volunteer_search::query_builder::{
    compose, compose_values, normalize, Condition, Connective, PredicateTree, WhereClause,
};

fn compile(tree: &PredicateTree) -> String {
    WhereClause::compile(tree).unwrap().unwrap().sql
}

#[test]
fn test_wrapped_or_composition() {
    let base = PredicateTree::new().with(Condition::eq("a", 1));
    let addition = PredicateTree::new().with(Condition::eq("b", 2));
    let merged = compose(base, addition, Some(Connective::Or));
    assert_eq!(compile(&merged), "a = %0 OR (b = %1)");
}

#[test]
fn test_flat_composition_joins_with_and() {
    let base = PredicateTree::new().with(Condition::eq("a", 1));
    let addition = PredicateTree::new()
        .with(Condition::eq("b", 2).or())
        .with(Condition::eq("c", 3).or());
    let merged = compose(base, addition, None);
    assert_eq!(compile(&merged), "a = %0 AND b = %1 OR c = %2");
}

#[test]
fn test_empty_sides() {
    let addition = PredicateTree::new().with(Condition::eq("b", 2));
    let merged = compose(PredicateTree::new(), addition.clone(), Some(Connective::Or));
    assert_eq!(compile(&merged), "(b = %0)");

    let unchanged = compose(addition.clone(), PredicateTree::new(), Some(Connective::Or));
    assert_eq!(unchanged, addition);
}

#[test]
fn test_compose_json_keeps_statement_wrapper() {
    let base = json!({
        "SELECTS": {"needs": ["id"]},
        "TABLES": ["needs"],
        "WHERES": [{"field": "needs.is_active", "value": 1}]
    });
    let addition = json!({"WHERES": [{"field": "needs.role_id", "value": 5}]});

    let merged = compose_values(&base, &addition, Some(Connective::Or)).unwrap();
    assert_eq!(merged["TABLES"], json!(["needs"]));

    let tree = normalize(&merged["WHERES"]).unwrap();
    assert_eq!(compile(&tree), "needs.is_active = %0 OR (needs.role_id = %1)");
}
