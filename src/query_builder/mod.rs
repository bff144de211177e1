//! # Query Builder System
//!
//! Compiles data-driven descriptions of SELECT statements into parameterized
//! SQL text.
//!
//! ## Key Components
//!
//! - [`predicate`] - Predicate-tree model (leaves, passthroughs, groups)
//! - [`normalize`] - Folds the JSON grouping syntaxes into one tree shape
//! - [`conditions`] - WHERE compilation with threaded placeholder numbering
//! - [`composer`] - Merging two predicate trees with AND/OR
//! - [`joins`] - Join ordering with postponement and a failsafe
//! - [`builder`] - Statement assembly
//! - [`parts`] - The `SELECTS`/`TABLES`/`JOINS`/`WHERES` document form
//! - [`scopes`] - Canned need-search statements
//! - [`projection`] - Shaping fetched rows into requested return fields
//! - [`binding`] - Postgres placeholders and typed parameter values
//!
//! ## Placeholders
//!
//! Parameters are written `%n`, numbered from the builder's offset in the
//! order the WHERE tree is walked. [`CompiledQuery::next_index`] is the first
//! unused number, so several fragments can share one numbering:
//!
//! ```rust
//! use volunteer_search::query_builder::{Condition, QueryBuilder};
//!
//! let query = QueryBuilder::new()
//!     .select("needs", &["id"])
//!     .from("needs")
//!     .where_eq("needs.is_active", 1)
//!     .where_predicate(Condition::eq("needs.visibility_id", 2))
//!     .param_offset(5)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     query.sql,
//!     "SELECT needs.id FROM needs WHERE needs.is_active = %5 AND needs.visibility_id = %6"
//! );
//! assert_eq!(query.next_index, 7);
//! ```

pub mod binding;
pub mod builder;
pub mod composer;
pub mod conditions;
pub mod joins;
pub mod normalize;
pub mod parts;
pub mod predicate;
pub mod projection;
pub mod scopes;

pub use binding::{BindValue, PgStatement};
pub use builder::{Column, CompiledQuery, QueryBuilder};
pub use composer::{compose, compose_values};
pub use conditions::{Parameter, WhereClause};
pub use joins::{Join, JoinResolver, JoinSpec, JoinType, ResolvedJoins, TableRef};
pub use normalize::{normalize, Normalizer};
pub use parts::StatementParts;
pub use predicate::{
    Condition, Connective, Predicate, PredicateGroup, PredicateTree, RawCondition, TypeHint,
};
pub use projection::{project_row, ReturnField, ReturnFields};
pub use scopes::{ImpactAreaSchema, NeedSearchScopes};
