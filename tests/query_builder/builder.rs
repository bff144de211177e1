use serde_json::json;
use volunteer_search::query_builder::{
    normalize, Column, Condition, Connective, Join, Predicate, PredicateTree, QueryBuilder,
    TypeHint,
};
use volunteer_search::QueryError;

#[test]
fn test_basic_query_building() {
    let query = QueryBuilder::new()
        .select("civicrm_volunteer_project", &["id", "title"])
        .from("civicrm_volunteer_project")
        .where_eq("civicrm_volunteer_project.is_active", 1)
        .order_asc("civicrm_volunteer_project.title")
        .build()
        .unwrap();

    assert_eq!(
        query.sql,
        "SELECT civicrm_volunteer_project.id, civicrm_volunteer_project.title \
         FROM civicrm_volunteer_project \
         WHERE civicrm_volunteer_project.is_active = %0 \
         ORDER BY civicrm_volunteer_project.title ASC"
    );
}

#[test]
fn test_needs_projects_from_json_tree() {
    let tree = normalize(&json!([
        {"field": "needs.is_active", "value": 1, "type": "Integer"},
        {"OR": [
            {"field": "needs.end_time", "comp": "> NOW()"},
            {"field": "needs.end_time", "comp": "IS NULL", "conj": "OR"}
        ]}
    ]))
    .unwrap();

    let query = QueryBuilder::new()
        .select("needs", &["start_time", "end_time"])
        .select("projects", &["title"])
        .join(Join::inner("projects", "needs.project_id = projects.id").from_table("needs"))
        .where_tree(tree)
        .build()
        .unwrap();

    assert_eq!(
        query.sql,
        "SELECT needs.start_time, needs.end_time, projects.title FROM needs \
         INNER JOIN projects ON needs.project_id = projects.id \
         WHERE needs.is_active = %0 OR (needs.end_time > NOW() OR needs.end_time IS NULL)"
    );
    assert_eq!(query.parameters.len(), 1);
    assert_eq!(query.parameters[0].index, 0);
    assert_eq!(query.parameters[0].value, json!(1));
    assert_eq!(query.parameters[0].type_hint, TypeHint::Integer);
}

#[test]
fn test_no_predicates_means_no_where() {
    let query = QueryBuilder::new()
        .select_raw("COUNT(*)")
        .from("needs")
        .build()
        .unwrap();
    assert_eq!(query.sql, "SELECT COUNT(*) FROM needs");
    assert!(query.parameters.is_empty());
    assert_eq!(query.next_index, 0);
}

#[test]
fn test_chained_statements_share_numbering() {
    let first = QueryBuilder::new()
        .select("needs", &["id"])
        .from("needs")
        .where_eq("needs.project_id", 4)
        .build()
        .unwrap();

    let second = QueryBuilder::new()
        .select("projects", &["id"])
        .from("projects")
        .where_eq("projects.id", 4)
        .where_predicate(Condition::eq("projects.is_active", 1).or())
        .param_offset(first.next_index)
        .build()
        .unwrap();

    assert!(second.sql.ends_with("WHERE projects.id = %1 OR projects.is_active = %2"));
    assert_eq!(second.next_index, 3);
}

#[test]
fn test_merge_where_wraps_addition() {
    let query = QueryBuilder::new()
        .select("contacts", &["id"])
        .from("civicrm_contact contacts")
        .where_eq("contacts.is_deleted", 0)
        .merge_where(
            PredicateTree::new()
                .with(Condition::eq("contacts.first_name", "Ada"))
                .with(Condition::eq("contacts.last_name", "Ada").or()),
            Some(Connective::And),
        )
        .build()
        .unwrap();

    assert_eq!(
        query.sql,
        "SELECT contacts.id FROM civicrm_contact contacts \
         WHERE contacts.is_deleted = %0 AND (contacts.first_name = %1 OR contacts.last_name = %2)"
    );
}

#[test]
fn test_raw_columns_and_passthrough_predicates() {
    let query = QueryBuilder::new()
        .select_columns(
            "needs",
            vec![
                Column::from("id"),
                Column::aliased("DATE(needs.start_time)", "start_day"),
            ],
        )
        .from("needs")
        .where_predicate(Predicate::raw("needs.quantity > needs.filled"))
        .group_by(&["start_day"])
        .build()
        .unwrap();

    assert_eq!(
        query.sql,
        "SELECT needs.id, DATE(needs.start_time) AS start_day FROM needs \
         WHERE needs.quantity > needs.filled GROUP BY start_day"
    );
}

#[test]
fn test_empty_column_selection_is_rejected() {
    let result = QueryBuilder::new().select("needs", &[]).from("needs").build();
    assert!(matches!(result, Err(QueryError::Configuration(_))));

    let blank = QueryBuilder::new().select_raw("  ").from("needs").build();
    assert!(matches!(blank, Err(QueryError::Configuration(_))));
}

#[test]
fn test_empty_group_is_an_error() {
    let result = QueryBuilder::new()
        .select("needs", &["id"])
        .from("needs")
        .where_predicate(Predicate::group(Connective::Or, PredicateTree::new()))
        .build();
    assert!(matches!(result, Err(QueryError::EmptyClause(_))));
}

#[test]
fn test_strict_joins_surface_unresolved_descriptors() {
    let builder = QueryBuilder::new()
        .select("a", &["id"])
        .join(Join::inner("b", "a.id = b.a_id").from_table("a"))
        .join(Join::inner("d", "c.id = d.c_id").from_table("c"));

    assert!(builder.build().is_ok());
    let strict = builder.strict_joins(true).build();
    assert!(matches!(strict, Err(QueryError::UnresolvedJoin { .. })));
}

#[test]
fn test_selection_outside_from_is_rejected() {
    let result = QueryBuilder::new()
        .select("needs", &["id"])
        .select("projects", &["title"])
        .from("needs")
        .build();
    assert!(matches!(result, Err(QueryError::Configuration(_))));

    let joined = QueryBuilder::new()
        .select("needs", &["id"])
        .select("projects", &["title"])
        .from("needs")
        .join(Join::inner("projects", "needs.project_id = projects.id").from_table("needs"))
        .build()
        .unwrap();
    assert_eq!(
        joined.sql,
        "SELECT needs.id, projects.title FROM needs \
         INNER JOIN projects ON needs.project_id = projects.id"
    );
}
