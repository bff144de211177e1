use serde_json::{json, Value};
use volunteer_search::query_builder::{project_row, ReturnField, ReturnFields};

#[test]
fn test_projection_with_aliases() {
    let fields: ReturnFields = vec![
        ReturnField::Plain("id".to_string()),
        ReturnField::Aliased {
            field: "display_name".to_string(),
            alias: "name".to_string(),
        },
    ]
    .into_iter()
    .collect();

    let row = json!({"id": 12, "display_name": "Ada Lovelace", "email": "ada@example.org"});
    let projected = project_row(row.as_object().unwrap(), &fields);
    assert_eq!(Value::Object(projected), json!({"id": 12, "name": "Ada Lovelace"}));
}

#[test]
fn test_projection_from_request_object() {
    let fields = ReturnFields::from_value(&json!({"0": "title", "description": "summary"})).unwrap();
    let row = json!({"title": "Shelter shift"});
    let projected = project_row(row.as_object().unwrap(), &fields);
    assert_eq!(
        Value::Object(projected),
        json!({"title": "Shelter shift", "summary": null})
    );
}
