//! Abstract Syntax Tree for YQL queries.
//!
//! Nodes are built once by the parser and never mutated afterwards. Generators
//! that need a different shape (Oracle's inner query, for one) clone.

use std::fmt;

use serde::Serialize;

use crate::placeholder::is_placeholder;
use crate::value::{Mapping, Value};

/// DML operation carried by a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Select => write!(f, "select"),
            Operation::Insert => write!(f, "insert"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Upsert => write!(f, "upsert"),
        }
    }
}

/// A parsed YQL document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub statement: Statement,
    /// The input tree, kept for diagnostics.
    #[serde(skip)]
    pub raw: Value,
}

impl Query {
    pub fn new(statement: Statement, raw: Value) -> Self {
        Self { statement, raw }
    }

    pub fn operation(&self) -> Operation {
        self.statement.operation()
    }

    /// The SELECT payload, if this is a SELECT.
    pub fn select(&self) -> Option<&SelectQuery> {
        match &self.statement {
            Statement::Select(q) => Some(q),
            _ => None,
        }
    }
}

/// Exactly one statement payload per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Statement {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
    Upsert(UpsertQuery),
}

impl Statement {
    pub fn operation(&self) -> Operation {
        match self {
            Statement::Select(_) => Operation::Select,
            Statement::Insert(_) => Operation::Insert,
            Statement::Update(_) => Operation::Update,
            Statement::Delete(_) => Operation::Delete,
            Statement::Upsert(_) => Operation::Upsert,
        }
    }
}

/// SELECT list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub alias: String,
    pub expression: String,
}

impl Column {
    pub fn new(alias: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            expression: expression.into(),
        }
    }

    /// A column whose alias is its expression.
    pub fn bare(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        Self {
            alias: expression.clone(),
            expression,
        }
    }

    pub fn is_aliased(&self) -> bool {
        self.alias != self.expression
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_aliased() {
            write!(f, "{} AS {}", self.expression, self.alias)
        } else {
            write!(f, "{}", self.expression)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FromClause {
    pub alias: String,
    pub table: String,
}

impl FromClause {
    pub fn new(alias: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            table: table.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    pub const ALL: [JoinType; 5] = [
        JoinType::Inner,
        JoinType::Left,
        JoinType::Right,
        JoinType::Full,
        JoinType::Cross,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
            JoinType::Cross => "CROSS",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub alias: String,
    pub table: String,
    pub on: Vec<String>,
    pub additional_conditions: Vec<String>,
}

impl JoinClause {
    /// `on` followed by the additional conditions, empty entries dropped.
    pub fn conditions(&self) -> impl Iterator<Item = &str> {
        self.on
            .iter()
            .chain(self.additional_conditions.iter())
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(SortDirection::Asc),
            "DESC" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderByClause {
    pub field: String,
    pub direction: SortDirection,
}

impl fmt::Display for OrderByClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// LIMIT, OFFSET, page and per_page values: a literal or an opaque expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LimitValue {
    Int(i64),
    Param(String),
}

impl LimitValue {
    /// The integer this value stands for, if it is a literal (or a numeric
    /// string). Placeholders never resolve.
    pub fn resolve(&self) -> Option<i64> {
        match self {
            LimitValue::Int(n) => Some(*n),
            LimitValue::Param(s) if is_placeholder(s) => None,
            LimitValue::Param(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.resolve() == Some(0)
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitValue::Int(n) => write!(f, "{}", n),
            LimitValue::Param(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for LimitValue {
    fn from(v: i64) -> Self {
        LimitValue::Int(v)
    }
}

impl From<&str> for LimitValue {
    fn from(v: &str) -> Self {
        LimitValue::Param(v.to_string())
    }
}

pub const DEFAULT_PAGE: &str = "#{page:1}";
pub const DEFAULT_PER_PAGE: &str = "#{per_page:20}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: LimitValue,
    pub per_page: LimitValue,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: LimitValue::from(DEFAULT_PAGE),
            per_page: LimitValue::from(DEFAULT_PER_PAGE),
        }
    }
}

/// Common table expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithClause {
    pub name: String,
    pub query: SelectQuery,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectQuery {
    pub columns: Vec<Column>,
    pub from: Option<FromClause>,
    pub joins: Vec<JoinClause>,
    /// AND-joined.
    pub where_clause: Vec<String>,
    pub group_by: Vec<String>,
    pub having: Vec<String>,
    pub order_by: Vec<OrderByClause>,
    pub limit: Option<LimitValue>,
    pub offset: Option<LimitValue>,
    pub with_clauses: Vec<WithClause>,
    /// Wins over `limit`/`offset` when present.
    pub pagination: Option<Pagination>,
}

impl SelectQuery {
    /// Copy of this query with LIMIT, OFFSET and pagination removed.
    pub fn without_window(&self) -> SelectQuery {
        SelectQuery {
            limit: None,
            offset: None,
            pagination: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertQuery {
    pub table: String,
    pub columns: Vec<String>,
    /// One mapping per row.
    pub values: Vec<Mapping>,
    /// INSERT ... SELECT source.
    pub from_query: Option<SelectQuery>,
    pub returning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateQuery {
    pub table: String,
    pub alias: Option<String>,
    pub set_values: Mapping,
    pub joins: Vec<JoinClause>,
    pub where_clause: Vec<String>,
    pub returning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteQuery {
    pub table: String,
    pub alias: Option<String>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Vec<String>,
    pub returning: Vec<String>,
}

/// What ON CONFLICT does with a conflicting row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    Update,
    Nothing,
}

/// PostgreSQL `ON CONFLICT`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnConflictClause {
    pub target: Vec<String>,
    pub unique_constraint: Option<String>,
    pub action: ConflictAction,
    pub update: Mapping,
    pub where_clause: Option<String>,
}

/// MySQL `ON DUPLICATE KEY UPDATE`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnDuplicateKeyClause {
    pub update: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WhenMatchedClause {
    pub update: Mapping,
    pub where_clause: Option<String>,
    pub delete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WhenNotMatchedClause {
    pub insert: Mapping,
}

/// SQL Server / Oracle `MERGE` parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeClause {
    pub using: Option<SelectQuery>,
    pub match_on: Vec<String>,
    pub when_matched: Option<WhenMatchedClause>,
    pub when_not_matched: Option<WhenNotMatchedClause>,
}

/// The dialect-shaped part of an upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertClause {
    OnConflict(OnConflictClause),
    OnDuplicateKey(OnDuplicateKeyClause),
    Merge(MergeClause),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertQuery {
    pub table: String,
    pub alias: Option<String>,
    pub columns: Vec<String>,
    pub values: Vec<Mapping>,
    pub from_query: Option<SelectQuery>,
    /// `None` when the document carries no recognised upsert clause.
    pub clause: Option<UpsertClause>,
    pub returning: Vec<String>,
}
