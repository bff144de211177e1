use super::builder::QueryBuilder;
use super::joins::Join;
use super::predicate::{Condition, TypeHint};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where an organization's impact area is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactAreaSchema {
    /// Custom-value table holding organization information
    pub table_name: String,
    /// Impact-area column within that table
    pub column_name: String,
}

/// Canned statements used by the need search
pub struct NeedSearchScopes;

impl NeedSearchScopes {
    /// Projects benefiting organizations whose impact area is any of `areas`
    ///
    /// Selects `orgs.id` and the linked `project_id`; with no areas the
    /// statement has no WHERE clause.
    pub fn projects_by_impact_area(
        schema: &ImpactAreaSchema,
        beneficiary_relationship_type: i64,
        areas: &[Value],
    ) -> QueryBuilder {
        let table = schema.table_name.as_str();
        let area_field = format!("{table}.{}", schema.column_name);

        let mut query = QueryBuilder::new()
            .select("orgs", &["id"])
            .select("civicrm_volunteer_project_contact", &["project_id"])
            .join(
                Join::inner(table, &format!("orgs.id = {table}.entity_id"))
                    .from_table("civicrm_contact orgs"),
            )
            .inner_join(
                "civicrm_volunteer_project_contact",
                &format!(
                    "orgs.id = civicrm_volunteer_project_contact.contact_id \
                     AND civicrm_volunteer_project_contact.relationship_type_id = {beneficiary_relationship_type}"
                ),
            );

        for area in areas {
            query = query.where_predicate(
                Condition::eq(&area_field, area.clone())
                    .typed(TypeHint::String)
                    .or(),
            );
        }

        query
    }
}
