//! # Join Resolution
//!
//! Orders an unordered bag of join descriptors into a FROM-clause chain in
//! which every `ON` condition only mentions tables introduced before it.
//!
//! The resolver is a best-effort greedy pass, not a proven topological sort.
//! Descriptors that cannot be placed yet are postponed to the back of the
//! line; once a descriptor has been postponed more times than there are
//! descriptors it is forced through as-is, which can produce a chain whose
//! `ON` text references a table that appears later. [`JoinResolver::strict`]
//! turns that failsafe into an [`QueryError::UnresolvedJoin`] error instead.

use crate::error::{QueryError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tracing::{debug, warn};

/// Represents different types of SQL JOINs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
    /// Any other join keyword, kept verbatim (e.g. `STRAIGHT_JOIN`)
    Custom(String),
}

impl JoinType {
    pub fn to_sql(&self) -> &str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
            JoinType::Custom(keyword) => keyword,
        }
    }

    /// Parse a join keyword; blank input means INNER JOIN
    pub fn parse(keyword: &str) -> Self {
        let canonical = keyword
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        match canonical.as_str() {
            "" | "JOIN" | "INNER JOIN" => JoinType::Inner,
            "LEFT JOIN" | "LEFT OUTER JOIN" => JoinType::Left,
            "RIGHT JOIN" | "RIGHT OUTER JOIN" => JoinType::Right,
            "FULL JOIN" | "FULL OUTER JOIN" => JoinType::Full,
            "CROSS JOIN" => JoinType::Cross,
            _ => JoinType::Custom(canonical),
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// A table as written in the FROM clause, e.g. `civicrm_contact orgs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    raw: String,
    name: String,
    alias: Option<String>,
}

impl TableRef {
    pub fn parse(text: &str) -> Self {
        let raw = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut parts = raw.split(' ');
        let name = parts.next().unwrap_or_default().to_string();
        let alias = match (parts.next(), parts.next()) {
            (Some(keyword), Some(alias)) if keyword.eq_ignore_ascii_case("AS") => {
                Some(alias.to_string())
            }
            (Some(alias), _) => Some(alias.to_string()),
            (None, _) => None,
        };
        Self { raw, name, alias }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Identifier other clauses use to qualify this table's columns
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn as_sql(&self) -> &str {
        &self.raw
    }
}

impl From<&str> for TableRef {
    fn from(text: &str) -> Self {
        TableRef::parse(text)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Represents a SQL JOIN descriptor.
///
/// With `left` set it is *binary*: an explicit pairwise join. Without it the
/// join is *unary* and attaches to whatever chain already exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub left: Option<TableRef>,
    pub right: TableRef,
    pub on_condition: String,
}

impl Join {
    pub fn new(join_type: JoinType, table: &str, on_condition: &str) -> Self {
        Self {
            join_type,
            left: None,
            right: TableRef::parse(table),
            on_condition: on_condition.trim().to_string(),
        }
    }

    /// Create an INNER JOIN
    pub fn inner(table: &str, on_condition: &str) -> Self {
        Self::new(JoinType::Inner, table, on_condition)
    }

    /// Create a LEFT JOIN
    pub fn left(table: &str, on_condition: &str) -> Self {
        Self::new(JoinType::Left, table, on_condition)
    }

    /// Create a RIGHT JOIN
    pub fn right(table: &str, on_condition: &str) -> Self {
        Self::new(JoinType::Right, table, on_condition)
    }

    /// Create a CROSS JOIN
    pub fn cross(table: &str) -> Self {
        Self::new(JoinType::Cross, table, "")
    }

    /// Make this a binary join from `table`
    pub fn from_table(mut self, table: &str) -> Self {
        self.left = Some(TableRef::parse(table));
        self
    }

    pub fn is_binary(&self) -> bool {
        self.left.is_some()
    }

    /// `KIND table [ON condition]` for the given side
    fn step_sql(&self, table: &TableRef) -> String {
        let mut sql = format!("{} {}", self.join_type.to_sql(), table.as_sql());
        if !self.on_condition.is_empty() {
            sql.push_str(" ON ");
            sql.push_str(&self.on_condition);
        }
        sql
    }

    /// Convert to SQL string as written, without reordering
    pub fn to_sql(&self) -> String {
        match &self.left {
            Some(left) => format!("{} {}", left.as_sql(), self.step_sql(&self.right)),
            None => self.step_sql(&self.right),
        }
    }
}

/// A join entry: a descriptor, or raw SQL appended verbatim
#[derive(Debug, Clone, PartialEq)]
pub enum JoinSpec {
    Descriptor(Join),
    Raw(String),
}

impl From<Join> for JoinSpec {
    fn from(join: Join) -> Self {
        JoinSpec::Descriptor(join)
    }
}

/// Output of [`JoinResolver::resolve`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedJoins {
    /// Text following `FROM`
    pub from_clause: String,
    /// Reference keys in the order their tables entered the chain
    pub tables: Vec<String>,
    /// Join conditions between tables that were both already present as
    /// plain FROM entries; they belong in the WHERE clause
    pub residual_conditions: Vec<String>,
    /// Total number of times any descriptor was sent to the back of the line
    pub postponements: usize,
    /// Descriptors emitted by the failsafe
    pub forced: usize,
}

#[derive(Debug, Clone)]
enum ChainItem {
    /// Comma-separated FROM entry
    Table(String),
    Step {
        join_type: JoinType,
        table: String,
        conditions: Vec<String>,
    },
    Verbatim(String),
}

#[derive(Debug, Default)]
struct Chain {
    items: Vec<ChainItem>,
    /// Reference key -> index of the item that introduced it
    introduced_at: HashMap<String, usize>,
    order: Vec<String>,
    residual: Vec<String>,
}

impl Chain {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.introduced_at.get(key).copied()
    }

    fn contains(&self, key: &str) -> bool {
        self.introduced_at.contains_key(key)
    }

    fn mark(&mut self, key: &str, item: usize) {
        if !self.introduced_at.contains_key(key) {
            self.introduced_at.insert(key.to_string(), item);
            self.order.push(key.to_string());
        }
    }

    fn push_table(&mut self, table: &TableRef) {
        if self.contains(table.key()) {
            return;
        }
        self.items.push(ChainItem::Table(table.as_sql().to_string()));
        self.mark(table.key(), self.items.len() - 1);
    }

    fn push_step(&mut self, join: &Join, table: &TableRef) {
        let conditions = if join.on_condition.is_empty() {
            Vec::new()
        } else {
            vec![join.on_condition.clone()]
        };
        self.items.push(ChainItem::Step {
            join_type: join.join_type.clone(),
            table: table.as_sql().to_string(),
            conditions,
        });
        self.mark(table.key(), self.items.len() - 1);
    }

    fn push_verbatim(&mut self, sql: String) -> usize {
        self.items.push(ChainItem::Verbatim(sql));
        self.items.len() - 1
    }

    /// Attach a condition to the step at `item`
    fn merge_condition(&mut self, item: usize, condition: &str) {
        if condition.is_empty() {
            return;
        }
        match self.items.get_mut(item) {
            Some(ChainItem::Step { conditions, .. }) => conditions.push(condition.to_string()),
            _ => self.residual.push(condition.to_string()),
        }
    }

    fn render(&self) -> String {
        let mut sql = String::new();
        for item in &self.items {
            match item {
                ChainItem::Table(table) => {
                    if !sql.is_empty() {
                        sql.push_str(", ");
                    }
                    sql.push_str(table);
                }
                ChainItem::Step {
                    join_type,
                    table,
                    conditions,
                } => {
                    if !sql.is_empty() {
                        sql.push(' ');
                    }
                    sql.push_str(join_type.to_sql());
                    sql.push(' ');
                    sql.push_str(table);
                    match conditions.len() {
                        0 => {}
                        1 => {
                            sql.push_str(" ON ");
                            sql.push_str(&conditions[0]);
                        }
                        _ => {
                            let parts: Vec<String> =
                                conditions.iter().map(|c| format!("({c})")).collect();
                            sql.push_str(" ON ");
                            sql.push_str(&parts.join(" AND "));
                        }
                    }
                }
                ChainItem::Verbatim(text) => {
                    if !sql.is_empty() {
                        sql.push(' ');
                    }
                    sql.push_str(text);
                }
            }
        }
        sql
    }
}

enum Placement {
    Seed,
    Introduce(TableRef),
    Merge(usize),
    Defer,
}

/// Greedy join orderer with a bounded postponement budget
#[derive(Debug, Clone, Default)]
pub struct JoinResolver {
    strict: bool,
}

impl JoinResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail instead of force-emitting joins whose dependencies never appear
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Order `joins` after the `anchors` (explicit FROM tables).
    ///
    /// Without descriptors the FROM clause is the comma-joined anchor list.
    pub fn resolve(&self, anchors: &[TableRef], joins: &[JoinSpec]) -> Result<ResolvedJoins> {
        let mut chain = Chain::default();
        for anchor in anchors {
            chain.push_table(anchor);
        }

        let descriptors: Vec<&Join> = joins
            .iter()
            .filter_map(|spec| match spec {
                JoinSpec::Descriptor(join) => Some(join),
                JoinSpec::Raw(_) => None,
            })
            .collect();

        let known = known_tables(anchors, &descriptors);
        let budget = descriptors.len();
        let mut postponements = 0;
        let mut forced = 0;

        // Popped from the back, so the first descriptor is considered first
        // and postponed ones wait behind everything still queued.
        let mut queue: VecDeque<(&Join, usize)> =
            descriptors.iter().rev().map(|join| (*join, 0)).collect();

        while let Some((join, postponed)) = queue.pop_back() {
            match place(join, &chain, &known) {
                Placement::Defer if postponed <= budget => {
                    postponements += 1;
                    queue.push_front((join, postponed + 1));
                }
                Placement::Defer => {
                    if self.strict {
                        return Err(QueryError::UnresolvedJoin {
                            join: join.to_sql(),
                            postponements: postponed,
                        });
                    }
                    warn!(
                        join = %join.to_sql(),
                        postponed = postponed,
                        "join dependencies never appeared; emitting it anyway"
                    );
                    forced += 1;
                    force(join, &mut chain);
                }
                placement => apply(placement, join, &mut chain),
            }
        }

        for spec in joins {
            if let JoinSpec::Raw(sql) = spec {
                chain.push_verbatim(sql.trim().to_string());
            }
        }

        debug!(
            descriptors = budget,
            tables = chain.order.len(),
            postponements = postponements,
            forced = forced,
            "resolved join chain"
        );

        Ok(ResolvedJoins {
            from_clause: chain.render(),
            tables: chain.order,
            residual_conditions: chain.residual,
            postponements,
            forced,
        })
    }
}

/// Table keys named by an anchor or by either side of a descriptor
fn known_tables(anchors: &[TableRef], descriptors: &[&Join]) -> HashSet<String> {
    let joined = descriptors
        .iter()
        .flat_map(|join| join.left.iter().chain(std::iter::once(&join.right)));
    anchors
        .iter()
        .chain(joined)
        .map(|table| table.key().to_string())
        .collect()
}

/// Known table keys used as `key.` qualifiers inside `condition`
fn qualifiers<'a>(condition: &str, known: &'a HashSet<String>) -> Vec<&'a str> {
    let mut found: Vec<&'a str> = Vec::new();
    let tokens = condition.split(|c: char| !(c.is_ascii_alphanumeric() || "_.`\"".contains(c)));
    for token in tokens {
        let Some((qualifier, _)) = token.split_once('.') else {
            continue;
        };
        let qualifier = qualifier.trim_matches(|c| c == '`' || c == '"');
        if let Some(key) = known.get(qualifier) {
            if !found.contains(&key.as_str()) {
                found.push(key.as_str());
            }
        }
    }
    found
}

fn place(join: &Join, chain: &Chain, known: &HashSet<String>) -> Placement {
    let right = join.right.key();
    let left = join.left.as_ref().map(TableRef::key);
    let deps: Vec<&str> = qualifiers(&join.on_condition, known)
        .into_iter()
        .filter(|key| *key != right && Some(*key) != left)
        .collect();
    let deps_present = deps.iter().all(|key| chain.contains(key));

    match &join.left {
        Some(left_table) => {
            let left_present = chain.contains(left_table.key());
            let right_present = chain.contains(right);
            match (left_present, right_present) {
                _ if chain.is_empty() => {
                    if deps.is_empty() {
                        Placement::Seed
                    } else {
                        Placement::Defer
                    }
                }
                (true, true) if deps_present => {
                    Placement::Merge(latest(chain, [left_table.key(), right], &deps))
                }
                (true, false) if deps_present => Placement::Introduce(join.right.clone()),
                (false, true) if deps_present => Placement::Introduce(left_table.clone()),
                _ => Placement::Defer,
            }
        }
        None => {
            if chain.is_empty() || !deps_present {
                Placement::Defer
            } else if chain.contains(right) {
                Placement::Merge(latest(chain, [right, right], &deps))
            } else {
                Placement::Introduce(join.right.clone())
            }
        }
    }
}

/// Latest chain position among the given present keys
fn latest(chain: &Chain, tables: [&str; 2], deps: &[&str]) -> usize {
    tables
        .iter()
        .chain(deps.iter())
        .filter_map(|key| chain.position(key))
        .max()
        .unwrap_or_default()
}

fn apply(placement: Placement, join: &Join, chain: &mut Chain) {
    match placement {
        Placement::Seed => {
            if let Some(left) = &join.left {
                chain.push_table(left);
            }
            chain.push_step(join, &join.right);
        }
        Placement::Introduce(table) => chain.push_step(join, &table),
        Placement::Merge(item) => chain.merge_condition(item, &join.on_condition),
        Placement::Defer => {}
    }
}

/// Failsafe emission of a join that never became eligible
fn force(join: &Join, chain: &mut Chain) {
    let right_present = chain.contains(join.right.key());
    match &join.left {
        Some(left) => {
            let left_present = chain.contains(left.key());
            match (left_present, right_present) {
                (false, false) => {
                    chain.push_table(left);
                    chain.push_step(join, &join.right);
                }
                (true, false) => chain.push_step(join, &join.right),
                (false, true) => chain.push_step(join, left),
                (true, true) => {
                    let item = latest(chain, [left.key(), join.right.key()], &[]);
                    chain.merge_condition(item, &join.on_condition);
                }
            }
        }
        None if right_present => {
            let item = latest(chain, [join.right.key(), join.right.key()], &[]);
            chain.merge_condition(item, &join.on_condition);
        }
        None if chain.is_empty() => {
            let item = chain.push_verbatim(join.to_sql());
            chain.mark(join.right.key(), item);
        }
        None => chain.push_step(join, &join.right),
    }
}
