//! # Option-Group Field Pairing
//!
//! Search fields that draw their values from the same option group can be
//! matched against each other (a volunteer's skills against a need's required
//! skills, for example). Fields are grouped into equivalence classes by
//! option group; each class with at least two members yields one pairing of
//! its two lexicographically smallest field names, and pairings are ordered
//! by option group, so the result does not depend on input order.
//!
//! Grouping is a single pass, so it terminates for any number of fields and
//! the classes do not depend on how often a group is revisited.
//!
//! [`RECOMMENDED_FIELDS`] and [`MATCHING_FIELDS`] name the volunteer profile
//! fields the need search recommends on and the field each one is matched
//! against.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Volunteer profile fields considered when recommending needs
pub const RECOMMENDED_FIELDS: [&str; 13] = [
    "Interests",
    "Primary_Impact_Area",
    "Background_Check_Opt_In",
    "Spoken_Languages",
    "Agreed_to_Waiver",
    "Group_Volunteer_Interest",
    "Availability",
    "Board_Service_Opt_In",
    "How_Often",
    "Volunteer_Emergency_Support_Team_Opt_In",
    "Other_Skills",
    "Local_Arlington_Civic_Association_Opt_In",
    "Spoken_Languages_Other_",
];

/// Volunteer field and the field it is matched against
pub const MATCHING_FIELDS: [(&str, &str); 12] = [
    ("Interests", "Primary_Impact_Area"),
    ("Background_Check_Opt_In", "Background_Check_Opt_In"),
    ("Spoken_Languages", "Spoken_Languages"),
    ("Agreed_to_Waiver", "Agreed_to_Waiver"),
    ("Group_Volunteer_Interest", "Group_Volunteer_Interest"),
    ("Availability", "Availability"),
    ("Board_Service_Opt_In", "Board_Service_Opt_In"),
    ("How_Often", "How_Often"),
    (
        "Volunteer_Emergency_Support_Team_Opt_In",
        "Volunteer_Emergency_Support_Team_Opt_In",
    ),
    ("Other_Skills", "Other_Skills"),
    (
        "Local_Arlington_Civic_Association_Opt_In",
        "Local_Arlington_Civic_Association_Opt_In",
    ),
    ("Spoken_Languages_Other_", "Spoken_Languages_Other_"),
];

/// Field a volunteer field is matched against, if it takes part in matching
pub fn matching_field(name: &str) -> Option<&'static str> {
    MATCHING_FIELDS
        .iter()
        .find(|(volunteer, _)| *volunteer == name)
        .map(|(_, matched)| *matched)
}

/// Metadata for one custom field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    #[serde(default)]
    pub option_group: Option<String>,
}

impl FieldMetadata {
    pub fn new(name: &str, option_group: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            option_group: option_group.map(str::to_string),
        }
    }
}

/// Fields sharing one option group, in first-seen order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldClass {
    pub option_group: String,
    pub fields: Vec<String>,
}

impl FieldClass {
    /// Representative pair of the two smallest names, when the class has two
    /// or more fields
    pub fn pairing(&self) -> Option<FieldPairing> {
        let mut names: Vec<&String> = self.fields.iter().collect();
        names.sort_unstable();
        match names.as_slice() {
            [first, second, ..] => Some(FieldPairing {
                option_group: self.option_group.clone(),
                left: (*first).clone(),
                right: (*second).clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPairing {
    pub option_group: String,
    pub left: String,
    pub right: String,
}

/// Group fields by option group; fields without one are skipped and a
/// repeated field name counts once
pub fn group_fields_by_option_group(fields: &[FieldMetadata]) -> Vec<FieldClass> {
    let mut classes: Vec<FieldClass> = Vec::new();
    let mut class_of: HashMap<&str, usize> = HashMap::new();

    for field in fields {
        let Some(group) = field.option_group.as_deref() else {
            continue;
        };
        let slot = *class_of.entry(group).or_insert_with(|| {
            classes.push(FieldClass {
                option_group: group.to_string(),
                fields: Vec::new(),
            });
            classes.len() - 1
        });
        let class = &mut classes[slot];
        if !class.fields.contains(&field.name) {
            class.fields.push(field.name.clone());
        }
    }

    classes
}

/// One pairing per option group shared by at least two fields, ordered by
/// option group
pub fn pair_fields_by_option_group(fields: &[FieldMetadata]) -> Vec<FieldPairing> {
    let mut pairings: Vec<FieldPairing> = group_fields_by_option_group(fields)
        .iter()
        .filter_map(FieldClass::pairing)
        .collect();
    pairings.sort_by(|a, b| a.option_group.cmp(&b.option_group));
    debug!(
        fields = fields.len(),
        pairings = pairings.len(),
        "paired fields by option group"
    );
    pairings
}

/// Pairings among the fields listed in [`RECOMMENDED_FIELDS`]
pub fn pair_recommended_fields(fields: &[FieldMetadata]) -> Vec<FieldPairing> {
    let recommended: Vec<FieldMetadata> = fields
        .iter()
        .filter(|field| RECOMMENDED_FIELDS.contains(&field.name.as_str()))
        .cloned()
        .collect();
    pair_fields_by_option_group(&recommended)
}
