#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Volunteer Search
//!
//! Data-driven SQL SELECT compiler behind the volunteer need search.
//!
//! ## Overview
//!
//! Callers describe a statement as data: the columns to select, the tables
//! and join descriptors to draw them from, and a nested tree of filter
//! predicates. The compiler turns that description into parameterized SQL
//! text plus an ordered parameter list. It never executes anything.
//!
//! ## Module Organization
//!
//! - [`query_builder`] - Predicate trees, WHERE compilation, join ordering, statement assembly
//! - [`recommend`] - Option-group pairing of search fields
//! - [`config`] - Compiler settings layered from file and environment
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use volunteer_search::config::CompilerConfig;
//! use volunteer_search::query_builder::StatementParts;
//!
//! # fn main() -> Result<(), volunteer_search::QueryError> {
//! let parts = StatementParts::from_value(&json!({
//!     "SELECTS": {"needs": ["id"], "projects": ["title"]},
//!     "JOINS": [{"left": "needs", "right": "projects", "on": "needs.project_id = projects.id"}],
//!     "WHERES": [{"field": "needs.is_active", "value": 1, "type": "Integer"}]
//! }))?;
//!
//! let query = parts.compile(&CompilerConfig::default())?;
//! assert_eq!(
//!     query.sql,
//!     "SELECT needs.id, projects.title FROM needs \
//!      INNER JOIN projects ON needs.project_id = projects.id \
//!      WHERE needs.is_active = %0"
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod query_builder;
pub mod recommend;

pub use config::CompilerConfig;
pub use error::{QueryError, Result};
pub use query_builder::{CompiledQuery, PredicateTree, QueryBuilder, StatementParts};
