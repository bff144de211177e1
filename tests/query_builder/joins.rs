use volunteer_search::query_builder::{Join, JoinResolver, JoinSpec, JoinType, TableRef};
use volunteer_search::QueryError;

fn specs(joins: Vec<Join>) -> Vec<JoinSpec> {
    joins.into_iter().map(JoinSpec::from).collect()
}

#[test]
fn test_inner_join() {
    let join = Join::inner("users u", "u.id = posts.user_id");
    assert_eq!(join.to_sql(), "INNER JOIN users u ON u.id = posts.user_id");
}

#[test]
fn test_right_join_with_left_side() {
    let join = Join::right("roles", "roles.id = needs.role_id").from_table("needs");
    assert_eq!(join.join_type, JoinType::Right);
    assert_eq!(join.to_sql(), "needs RIGHT JOIN roles ON roles.id = needs.role_id");
}

#[test]
fn test_shuffled_descriptors_are_reordered() {
    let joins = specs(vec![
        Join::left("civicrm_loc_block loc", "loc.id = projects.loc_block_id"),
        Join::inner("civicrm_contact owner", "owner.id = projects.created_id")
            .from_table("civicrm_volunteer_project projects"),
        Join::inner("civicrm_volunteer_project projects", "projects.id = needs.project_id"),
        Join::left("civicrm_option_value roles", "roles.value = needs.role_id"),
    ]);

    let resolved = JoinResolver::new()
        .resolve(&[TableRef::parse("civicrm_volunteer_need needs")], &joins)
        .unwrap();

    // Every ON clause only refers to tables already introduced
    assert_eq!(
        resolved.from_clause,
        "civicrm_volunteer_need needs \
         INNER JOIN civicrm_volunteer_project projects ON projects.id = needs.project_id \
         LEFT JOIN civicrm_option_value roles ON roles.value = needs.role_id \
         LEFT JOIN civicrm_loc_block loc ON loc.id = projects.loc_block_id \
         INNER JOIN civicrm_contact owner ON owner.id = projects.created_id"
    );
    assert_eq!(resolved.tables, vec!["needs", "projects", "roles", "loc", "owner"]);
    assert_eq!(resolved.postponements, 2);
    assert_eq!(resolved.forced, 0);
}

#[test]
fn test_each_table_appears_once() {
    let joins = specs(vec![
        Join::inner("b", "a.id = b.a_id").from_table("a"),
        Join::inner("c", "b.id = c.b_id").from_table("b"),
        Join::inner("c", "a.id = c.a_id").from_table("a"),
    ]);
    let resolved = JoinResolver::new().resolve(&[], &joins).unwrap();
    assert_eq!(
        resolved.from_clause,
        "a INNER JOIN b ON a.id = b.a_id INNER JOIN c ON (b.id = c.b_id) AND (a.id = c.a_id)"
    );
}

#[test]
fn test_failsafe_bounds_postponements() {
    let joins = specs(vec![Join::inner("b", "b.x = ghost.x")]);
    let resolved = JoinResolver::new()
        .resolve(&[TableRef::parse("a")], &joins)
        .unwrap();
    assert_eq!(resolved.from_clause, "a INNER JOIN b ON b.x = ghost.x");
    assert_eq!(resolved.forced, 0);

    let unary_only = specs(vec![Join::inner("b", "a.id = b.a_id")]);
    let resolved = JoinResolver::new().resolve(&[], &unary_only).unwrap();
    assert_eq!(resolved.from_clause, "INNER JOIN b ON a.id = b.a_id");
    assert_eq!(resolved.postponements, 2);
    assert_eq!(resolved.forced, 1);

    let err = JoinResolver::new()
        .strict(true)
        .resolve(&[], &unary_only)
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::UnresolvedJoin {
            postponements: 2,
            ..
        }
    ));
}

#[test]
fn test_raw_join_text_follows_descriptors() {
    let joins = vec![
        JoinSpec::Raw("LEFT JOIN civicrm_email e ON e.contact_id = c.id".to_string()),
        Join::inner("civicrm_phone p", "p.contact_id = c.id").into(),
    ];
    let resolved = JoinResolver::new()
        .resolve(&[TableRef::parse("civicrm_contact c")], &joins)
        .unwrap();
    assert_eq!(
        resolved.from_clause,
        "civicrm_contact c INNER JOIN civicrm_phone p ON p.contact_id = c.id \
         LEFT JOIN civicrm_email e ON e.contact_id = c.id"
    );
}
