//! SQL generation for the supported dialects.
//!
//! Each dialect implements [`SqlGenerator`]; [`Dialect::generator`] is the
//! only way to obtain one.

pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod render;
pub mod sqlserver;
pub mod traits;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use mysql::MySqlGenerator;
pub use oracle::OracleGenerator;
pub use postgres::PostgresGenerator;
pub use sqlserver::SqlServerGenerator;
pub use traits::SqlGenerator;

use crate::ast::Query;
use crate::error::GenerateResult;

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "postgres", alias = "pg")]
    PostgreSql,
    MySql,
    #[serde(alias = "mssql", alias = "tsql")]
    SqlServer,
    Oracle,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::PostgreSql,
        Dialect::MySql,
        Dialect::SqlServer,
        Dialect::Oracle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::PostgreSql => "postgresql",
            Dialect::MySql => "mysql",
            Dialect::SqlServer => "sqlserver",
            Dialect::Oracle => "oracle",
        }
    }

    /// Generator for this dialect.
    pub fn generator(&self) -> Box<dyn SqlGenerator> {
        match self {
            Dialect::PostgreSql => Box::new(PostgresGenerator::new()),
            Dialect::MySql => Box::new(MySqlGenerator::new()),
            Dialect::SqlServer => Box::new(SqlServerGenerator::new()),
            Dialect::Oracle => Box::new(OracleGenerator::new()),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSql),
            "mysql" => Ok(Dialect::MySql),
            "sqlserver" | "mssql" | "tsql" => Ok(Dialect::SqlServer),
            "oracle" => Ok(Dialect::Oracle),
            other => Err(format!(
                "Unknown dialect '{}'. Valid dialects are: postgresql, mysql, sqlserver, oracle",
                other
            )),
        }
    }
}

/// Render `query` as SQL for `dialect`.
pub fn generate_sql(query: &Query, dialect: Dialect) -> GenerateResult<String> {
    debug!(%dialect, operation = %query.operation(), "generating SQL");
    dialect.generator().generate(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgres".parse::<Dialect>(), Ok(Dialect::PostgreSql));
        assert_eq!("MSSQL".parse::<Dialect>(), Ok(Dialect::SqlServer));
        assert_eq!("oracle".parse::<Dialect>(), Ok(Dialect::Oracle));
        assert!("sqlite".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_generator_matches_dialect() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.generator().dialect(), dialect);
            assert_eq!(dialect.to_string().parse::<Dialect>(), Ok(dialect));
        }
    }
}
