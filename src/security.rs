//! Table access policy for generated SQL.
//!
//! Tables are found with a keyword-anchored text scan (`FROM`, `JOIN`,
//! `UPDATE`, `INSERT INTO`, `DELETE FROM`, `MERGE [INTO]`), not a SQL parse:
//! quoted identifiers, comments and string literals can produce false matches.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{SecurityError, YqlError, YqlResult};
use crate::value::Value;

static TABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:KEY\s+UPDATE|FROM|JOIN|UPDATE|INSERT\s+INTO|DELETE\s+FROM|MERGE(?:\s+INTO)?)\s+(\w+)")
        .expect("table pattern is a valid regex")
});

/// Words the pattern can capture that never name a table
/// (`DO UPDATE SET`, `FROM DUAL`, `FROM (SELECT ...`).
const NOT_TABLES: &[&str] = &["set", "select", "dual", "lateral"];

/// Allow/deny lists applied to generated SQL.
///
/// ```yaml
/// denied_tables: [user_passwords, admin_logs]
/// allowed_tables: [customers, orders]   # optional allow-list
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub denied_tables: BTreeSet<String>,
    #[serde(default)]
    pub allowed_tables: BTreeSet<String>,
}

impl SecurityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> YqlResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            YqlError::Config(format!(
                "Failed to read security config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: SecurityConfig = serde_yaml::from_str(&content).map_err(|e| {
            YqlError::Config(format!(
                "Failed to parse security config {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(
            path = %path.display(),
            denied = config.denied_tables.len(),
            allowed = config.allowed_tables.len(),
            "loaded security config"
        );
        Ok(config)
    }

    /// Build from an already decoded tree.
    pub fn from_value(value: &Value) -> YqlResult<Self> {
        let json = serde_json::to_value(value)
            .map_err(|e| YqlError::Config(format!("Invalid security config: {}", e)))?;
        serde_json::from_value(json)
            .map_err(|e| YqlError::Config(format!("Invalid security config: {}", e)))
    }

    pub fn deny(mut self, table: impl Into<String>) -> Self {
        self.denied_tables.insert(table.into());
        self
    }

    pub fn allow(mut self, table: impl Into<String>) -> Self {
        self.allowed_tables.insert(table.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.denied_tables.is_empty() && self.allowed_tables.is_empty()
    }

    /// Check `sql` against the policy.
    ///
    /// Denied tables are reported first, and only the denied ones found;
    /// otherwise, with an allow-list, every table outside it.
    pub fn validate(&self, sql: &str) -> Result<(), SecurityError> {
        let found = extract_tables(sql);
        trace!(tables = ?found, "tables referenced by generated SQL");

        let denied: Vec<String> = found
            .iter()
            .filter(|t| contains_ignore_case(&self.denied_tables, t))
            .cloned()
            .collect();
        if !denied.is_empty() {
            return Err(SecurityError::DeniedTables {
                tables: denied,
                all_tables: found.into_iter().collect(),
            });
        }

        if !self.allowed_tables.is_empty() {
            let unauthorized: Vec<String> = found
                .iter()
                .filter(|t| !contains_ignore_case(&self.allowed_tables, t))
                .cloned()
                .collect();
            if !unauthorized.is_empty() {
                return Err(SecurityError::UnauthorizedTables {
                    tables: unauthorized,
                    allowed_tables: self.allowed_tables.iter().cloned().collect(),
                    all_tables: found.into_iter().collect(),
                });
            }
        }

        Ok(())
    }
}

fn contains_ignore_case(set: &BTreeSet<String>, table: &str) -> bool {
    set.iter().any(|t| t.eq_ignore_ascii_case(table))
}

/// Table names referenced by `sql`, sorted and deduplicated.
pub fn extract_tables(sql: &str) -> BTreeSet<String> {
    TABLE_PATTERN
        .captures_iter(sql)
        // `ON DUPLICATE KEY UPDATE col = ..` names a column.
        .filter(|caps| !caps[0].to_ascii_uppercase().starts_with("KEY"))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !NOT_TABLES.contains(&name.to_ascii_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tables() {
        let sql = "SELECT\n  c.id\nFROM customers c\nLEFT JOIN orders o ON c.id = o.customer_id";
        let tables: Vec<String> = extract_tables(sql).into_iter().collect();
        assert_eq!(tables, vec!["customers", "orders"]);
    }

    #[test]
    fn test_extract_dml_tables() {
        assert!(extract_tables("insert into audit_log\n(a)\nVALUES (1)").contains("audit_log"));
        assert!(extract_tables("UPDATE accounts\nSET x = 1").contains("accounts"));
        assert!(extract_tables("DELETE FROM sessions").contains("sessions"));
        assert!(extract_tables("MERGE INTO stock USING src").contains("stock"));
        let merge = extract_tables("MERGE customers AS target\nUSING (SELECT\n  id\nFROM staging) AS source");
        assert_eq!(merge.into_iter().collect::<Vec<_>>(), vec!["customers", "staging"]);
    }

    #[test]
    fn test_keywords_are_not_tables() {
        let tables = extract_tables(
            "INSERT INTO users\n(id)\nVALUES (1)\nON CONFLICT (id)\nDO UPDATE SET id = 2",
        );
        assert_eq!(tables.into_iter().collect::<Vec<_>>(), vec!["users"]);
        assert!(extract_tables("SELECT 1 FROM DUAL").is_empty());
        let upsert = extract_tables("INSERT INTO products\n(sku)\nVALUES (1)\nON DUPLICATE KEY UPDATE stock = stock + 1");
        assert_eq!(upsert.into_iter().collect::<Vec<_>>(), vec!["products"]);
    }

    #[test]
    fn test_denied_reports_only_denied() {
        let config = SecurityConfig::new().deny("customers");
        let err = config
            .validate("SELECT *\nFROM customers c\nJOIN orders o ON c.id = o.customer_id")
            .unwrap_err();
        assert_eq!(err.tables(), ["customers".to_string()]);
        match err {
            SecurityError::DeniedTables { all_tables, .. } => {
                assert_eq!(all_tables, vec!["customers", "orders"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_allow_list() {
        let config = SecurityConfig::new().allow("customers");
        assert!(config.validate("SELECT * FROM customers").is_ok());
        let err = config
            .validate("SELECT * FROM customers JOIN payments p ON TRUE")
            .unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized tables used: payments");
    }

    #[test]
    fn test_deny_checked_before_allow() {
        let config = SecurityConfig::new().allow("orders").deny("secrets");
        let err = config.validate("SELECT * FROM secrets JOIN other ON TRUE").unwrap_err();
        assert!(matches!(err, SecurityError::DeniedTables { .. }));
    }

    #[test]
    fn test_from_value() {
        let value = Value::from(
            serde_yaml::from_str::<serde_yaml::Value>("denied_tables: [a, b]").unwrap(),
        );
        let config = SecurityConfig::from_value(&value).unwrap();
        assert!(config.denied_tables.contains("b"));
        assert!(config.allowed_tables.is_empty());
    }
}
