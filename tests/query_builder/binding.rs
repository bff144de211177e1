use serde_json::json;
use volunteer_search::query_builder::{BindValue, Condition, QueryBuilder};
use volunteer_search::QueryError;

#[test]
fn test_compiled_query_to_postgres() {
    let query = QueryBuilder::new()
        .select("needs", &["id"])
        .from("needs")
        .where_predicate(Condition::eq("needs.is_active", "1").typed("Boolean"))
        .where_predicate(Condition::compare("needs.start_time", ">=", "2024-06-01").typed("Date"))
        .param_offset(3)
        .build()
        .unwrap();

    let statement = query.to_postgres().unwrap();
    assert_eq!(
        statement.sql,
        "SELECT needs.id FROM needs WHERE needs.is_active = $1 AND needs.start_time >= $2"
    );
    assert_eq!(statement.values[0], BindValue::Bool(true));
    assert!(matches!(statement.values[1], BindValue::Date(_)));
}

#[test]
fn test_uncoercible_parameter_is_reported() {
    let query = QueryBuilder::new()
        .select("needs", &["id"])
        .from("needs")
        .where_predicate(Condition::eq("needs.quantity", json!("many")).typed("Integer"))
        .build()
        .unwrap();

    assert!(matches!(
        query.to_postgres(),
        Err(QueryError::ParameterType { index: 0, .. })
    ));
}

#[cfg(feature = "postgres")]
#[test]
fn test_statement_binds_without_executing() {
    let query = QueryBuilder::new()
        .select("needs", &["id"])
        .from("needs")
        .where_eq("needs.id", 5)
        .build()
        .unwrap();
    let statement = query.to_postgres().unwrap();
    let _bound = statement.query();
    assert_eq!(statement.values, vec![BindValue::Text("5".to_string())]);
}
