//! # YQL: YAML Query Language
//!
//! YQL describes relational queries as YAML documents and compiles them to SQL
//! for PostgreSQL, MySQL, SQL Server and Oracle.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use yql::prelude::*;
//!
//! let query = yql::parse_str(
//!     "select:\n  - id: c.id\nfrom:\n  c: customers\nlimit: 10",
//!     None,
//! )?;
//!
//! let sql = yql::generate_sql(&query, Dialect::SqlServer)?;
//! // => "SELECT TOP 10\n  c.id AS id\nFROM customers c"
//! ```
//!
//! ## Pipeline
//!
//! | Stage      | Module        | Output                      |
//! |------------|---------------|-----------------------------|
//! | Decode     | [`value`]     | [`Value`] tree              |
//! | Parse      | [`parser`]    | [`Query`] (imports resolved)|
//! | Generate   | [`generator`] | SQL text for one [`Dialect`]|
//! | Validate   | [`security`]  | allow/deny table check      |
//!
//! String values are emitted verbatim: `#{name}`, `${name}` and `@{name}`
//! placeholders are left for a binding layer downstream.

pub mod ast;
pub mod config;
pub mod error;
pub mod generator;
pub mod parser;
pub mod placeholder;
pub mod security;
pub mod value;

pub use ast::{Operation, Query};
pub use config::{Config, ImportOptions};
pub use error::{YqlError, YqlResult};
pub use generator::{Dialect, SqlGenerator, generate_sql};
pub use parser::{Parser, parse_file, parse_str, parse_value};
pub use security::SecurityConfig;
pub use value::Value;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::{Config, ImportOptions};
    pub use crate::error::*;
    pub use crate::generator::{Dialect, SqlGenerator, generate_sql};
    pub use crate::parser::{Parser, parse_file, parse_str, parse_value};
    pub use crate::security::SecurityConfig;
    pub use crate::value::{Mapping, Value};
    pub use crate::compile;
}

/// Generate SQL for `dialect` and, when a policy is given, validate it.
///
/// # Example
///
/// ```
/// use yql::{compile, parse_str, Dialect, SecurityConfig};
///
/// let query = parse_str("select: [id]\nfrom: customers", None).unwrap();
/// let policy = SecurityConfig::new().deny("customers");
/// assert!(compile(&query, Dialect::PostgreSql, Some(&policy)).is_err());
/// assert!(compile(&query, Dialect::PostgreSql, None).is_ok());
/// ```
pub fn compile(
    query: &Query,
    dialect: Dialect,
    security: Option<&SecurityConfig>,
) -> YqlResult<String> {
    let sql = generate_sql(query, dialect)?;
    if let Some(policy) = security {
        policy.validate(&sql)?;
    }
    Ok(sql)
}
