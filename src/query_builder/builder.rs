use super::conditions::{Parameter, WhereClause};
use super::joins::{Join, JoinResolver, JoinSpec, TableRef};
use super::predicate::{Condition, Connective, Predicate, PredicateTree};
use crate::config::CompilerConfig;
use crate::error::{QueryError, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// A selected column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Rendered qualified by its table, `table.column`
    Name(String),
    /// Rendered verbatim, `expr [AS alias]`
    Raw { expr: String, alias: Option<String> },
}

impl Column {
    pub fn raw(expr: &str) -> Self {
        Column::Raw {
            expr: expr.to_string(),
            alias: None,
        }
    }

    pub fn aliased(expr: &str, alias: &str) -> Self {
        Column::Raw {
            expr: expr.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    fn to_sql(&self, table: &str) -> String {
        match self {
            Column::Name(name) => format!("{table}.{name}"),
            Column::Raw { expr, alias: None } => expr.clone(),
            Column::Raw {
                expr,
                alias: Some(alias),
            } => format!("{expr} AS {alias}"),
        }
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::Name(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Selection {
    Tables(Vec<(String, Vec<Column>)>),
    Raw(String),
}

/// Final statement text and its bind parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    /// First placeholder index not used by this statement
    pub next_index: usize,
}

/// Main query builder for SELECT statements.
///
/// Collects the statement pieces without validating them; [`build`] checks
/// the structure, orders the joins and compiles the WHERE tree.
///
/// [`build`]: QueryBuilder::build
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    selection: Option<Selection>,
    tables: Vec<TableRef>,
    joins: Vec<JoinSpec>,
    where_tree: PredicateTree,
    group_by: Vec<String>,
    order_by: Vec<String>,
    param_offset: usize,
    strict_joins: bool,
    allow_raw_joins: bool,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            selection: None,
            tables: Vec::new(),
            joins: Vec::new(),
            where_tree: PredicateTree::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            param_offset: 0,
            strict_joins: false,
            allow_raw_joins: true,
        }
    }

    /// Start from the compiler settings in `config`
    pub fn with_config(config: &CompilerConfig) -> Self {
        Self::new()
            .strict_joins(config.strict_joins)
            .allow_raw_joins(config.allow_raw_joins)
            .param_offset(config.param_offset)
    }

    /// Select `columns` from `table`, qualified as `table.column`
    pub fn select(self, table: &str, columns: &[&str]) -> Self {
        let columns = columns.iter().map(|c| Column::from(*c)).collect();
        self.select_columns(table, columns)
    }

    pub fn select_columns(mut self, table: &str, columns: Vec<Column>) -> Self {
        let entry = (table.to_string(), columns);
        self.selection = match self.selection.take() {
            Some(Selection::Tables(mut entries)) => {
                entries.push(entry);
                Some(Selection::Tables(entries))
            }
            _ => Some(Selection::Tables(vec![entry])),
        };
        self
    }

    /// Use a literal select list instead of per-table columns
    pub fn select_raw(mut self, select_list: &str) -> Self {
        self.selection = Some(Selection::Raw(select_list.to_string()));
        self
    }

    /// Add a bare FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.tables.push(TableRef::parse(table));
        self
    }

    pub fn tables(mut self, tables: &[&str]) -> Self {
        self.tables.extend(tables.iter().map(|t| TableRef::parse(t)));
        self
    }

    /// Add a JOIN clause
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(JoinSpec::Descriptor(join));
        self
    }

    /// Add an INNER JOIN
    pub fn inner_join(self, table: &str, on_condition: &str) -> Self {
        self.join(Join::inner(table, on_condition))
    }

    /// Add a LEFT JOIN
    pub fn left_join(self, table: &str, on_condition: &str) -> Self {
        self.join(Join::left(table, on_condition))
    }

    /// Append join SQL verbatim after the resolved chain
    pub fn raw_join(mut self, sql: &str) -> Self {
        self.joins.push(JoinSpec::Raw(sql.to_string()));
        self
    }

    pub fn join_spec(mut self, spec: JoinSpec) -> Self {
        self.joins.push(spec);
        self
    }

    /// Replace the WHERE tree
    pub fn where_tree(mut self, tree: PredicateTree) -> Self {
        self.where_tree = tree;
        self
    }

    /// Append a node to the WHERE tree
    pub fn where_predicate(mut self, predicate: impl Into<Predicate>) -> Self {
        self.where_tree.push(predicate);
        self
    }

    /// Add a simple WHERE condition
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.where_predicate(Condition::eq(field, value))
    }

    /// Merge another tree into the WHERE tree, parenthesized when `wrap` is set
    pub fn merge_where(mut self, addition: PredicateTree, wrap: Option<Connective>) -> Self {
        let base = std::mem::take(&mut self.where_tree);
        self.where_tree = super::composer::compose(base, addition, wrap);
        self
    }

    /// Add GROUP BY clause
    pub fn group_by(mut self, fields: &[&str]) -> Self {
        self.group_by.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    /// Add ORDER BY clause
    pub fn order_by(mut self, field: &str, direction: &str) -> Self {
        let entry = format!("{field} {direction}");
        self.order_by.push(entry.trim().to_string());
        self
    }

    /// Add ORDER BY ASC
    pub fn order_asc(self, field: &str) -> Self {
        self.order_by(field, "ASC")
    }

    /// Add ORDER BY DESC
    pub fn order_desc(self, field: &str) -> Self {
        self.order_by(field, "DESC")
    }

    /// Number placeholders from `offset` instead of zero
    pub fn param_offset(mut self, offset: usize) -> Self {
        self.param_offset = offset;
        self
    }

    pub fn strict_joins(mut self, strict: bool) -> Self {
        self.strict_joins = strict;
        self
    }

    pub fn allow_raw_joins(mut self, allow: bool) -> Self {
        self.allow_raw_joins = allow;
        self
    }

    /// Build the complete SQL statement and its parameters
    pub fn build(&self) -> Result<CompiledQuery> {
        let select_list = self.select_list()?;

        if self.tables.is_empty() && self.joins.is_empty() {
            return Err(QueryError::Configuration(
                "a table list or join descriptors are required".to_string(),
            ));
        }

        if !self.allow_raw_joins {
            if let Some(JoinSpec::Raw(sql)) =
                self.joins.iter().find(|spec| matches!(spec, JoinSpec::Raw(_)))
            {
                return Err(QueryError::UnsupportedShape(format!(
                    "raw join strings are not permitted: {sql}"
                )));
            }
        }

        let resolved = JoinResolver::new()
            .strict(self.strict_joins)
            .resolve(&self.tables, &self.joins)?;
        self.check_selected_tables(&resolved.tables)?;

        // Conditions between plain FROM tables filter in WHERE instead
        let where_tree = if resolved.residual_conditions.is_empty() {
            self.where_tree.clone()
        } else {
            let residual: PredicateTree = resolved
                .residual_conditions
                .iter()
                .map(|condition| Predicate::raw(condition))
                .collect();
            if self.where_tree.len() > 1 {
                residual.merge_wrapped(self.where_tree.clone(), Connective::And)
            } else {
                residual.merge(self.where_tree.clone())
            }
        };

        let mut sql = format!("SELECT {select_list} FROM {}", resolved.from_clause);
        let mut parameters = Vec::new();
        let mut next_index = self.param_offset;

        if let Some(clause) = WhereClause::compile_from(&where_tree, self.param_offset)? {
            sql.push_str(" WHERE ");
            sql.push_str(&clause.sql);
            parameters = clause.parameters;
            next_index = clause.next_index;
        }

        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }

        if !self.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", self.order_by.join(", ")));
        }

        debug!(
            tables = resolved.tables.len(),
            parameters = parameters.len(),
            forced_joins = resolved.forced,
            "built SELECT statement"
        );

        Ok(CompiledQuery {
            sql,
            parameters,
            next_index,
        })
    }

    /// Build and keep only the SQL text
    pub fn build_sql(&self) -> Result<String> {
        self.build().map(|query| query.sql)
    }

    /// Every table named in the column selection must be reachable in FROM
    fn check_selected_tables(&self, resolved: &[String]) -> Result<()> {
        let Some(Selection::Tables(entries)) = &self.selection else {
            return Ok(());
        };
        let raw_joins: Vec<&str> = self
            .joins
            .iter()
            .filter_map(|spec| match spec {
                JoinSpec::Raw(sql) => Some(sql.as_str()),
                JoinSpec::Descriptor(_) => None,
            })
            .collect();

        for (table, _) in entries {
            let present = resolved.iter().any(|key| key == table)
                || raw_joins.iter().any(|sql| names_table(sql, table));
            if !present {
                return Err(QueryError::Configuration(format!(
                    "selected table '{table}' is not in the FROM clause"
                )));
            }
        }
        Ok(())
    }

    fn select_list(&self) -> Result<String> {
        let entries = match &self.selection {
            None => {
                return Err(QueryError::Configuration(
                    "a column selection is required".to_string(),
                ))
            }
            Some(Selection::Raw(list)) if list.trim().is_empty() => {
                return Err(QueryError::Configuration(
                    "the select list is empty".to_string(),
                ))
            }
            Some(Selection::Raw(list)) => return Ok(list.trim().to_string()),
            Some(Selection::Tables(entries)) => entries,
        };

        let mut seen: Vec<&str> = Vec::new();
        let mut columns = Vec::new();
        for (table, table_columns) in entries {
            if seen.contains(&table.as_str()) {
                return Err(QueryError::Configuration(format!(
                    "table '{table}' appears more than once in the column selection"
                )));
            }
            seen.push(table);
            columns.extend(table_columns.iter().map(|column| column.to_sql(table)));
        }

        if columns.is_empty() {
            return Err(QueryError::Configuration(
                "the column selection names no columns".to_string(),
            ));
        }
        Ok(columns.join(", "))
    }
}

fn names_table(sql: &str, table: &str) -> bool {
    sql.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token == table)
}
