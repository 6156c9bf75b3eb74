use super::render::{self, assignments, join_parts, page_offset};
use super::traits::SqlGenerator;
use super::Dialect;
use crate::ast::*;
use crate::error::{GenerateError, GenerateResult};

pub struct PostgresGenerator;

impl Default for PostgresGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl SqlGenerator for PostgresGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    fn limit(&self, limit: &LimitValue) -> String {
        format!("LIMIT {}", limit)
    }

    fn offset(&self, offset: &LimitValue) -> String {
        format!("OFFSET {}", offset)
    }

    fn pagination(&self, _query: &SelectQuery, pagination: &Pagination) -> GenerateResult<String> {
        Ok(format!(
            "LIMIT {}\nOFFSET {}",
            pagination.per_page,
            page_offset(pagination)
        ))
    }

    /// `INSERT ... ON CONFLICT (cols) DO UPDATE SET ... | DO NOTHING`.
    fn upsert(&self, query: &UpsertQuery) -> GenerateResult<String> {
        let conflict = match &query.clause {
            Some(UpsertClause::OnConflict(conflict)) => conflict,
            _ => {
                return Err(GenerateError::MissingClause {
                    dialect: self.dialect(),
                    clause: "on_conflict",
                });
            }
        };

        let mut parts = render::insert_head(
            self,
            "UPSERT",
            &query.table,
            &query.columns,
            &query.values,
            query.from_query.as_ref(),
        )?;

        if let Some(constraint) = &conflict.unique_constraint {
            parts.push(format!("ON CONFLICT ON CONSTRAINT {}", constraint));
        } else if !conflict.target.is_empty() {
            parts.push(format!("ON CONFLICT ({})", conflict.target.join(", ")));
        } else {
            return Err(GenerateError::InvalidClause {
                dialect: self.dialect(),
                message: "ON CONFLICT requires target columns or unique_constraint".to_string(),
            });
        }

        match conflict.action {
            ConflictAction::Nothing => parts.push("DO NOTHING".to_string()),
            ConflictAction::Update => {
                if conflict.update.is_empty() {
                    return Err(GenerateError::InvalidClause {
                        dialect: self.dialect(),
                        message: "ON CONFLICT DO UPDATE requires an update map".to_string(),
                    });
                }
                parts.push(format!("DO UPDATE SET {}", assignments(&conflict.update, ", ")));
                if let Some(condition) = &conflict.where_clause {
                    parts.push(format!("WHERE {}", condition));
                }
            }
        }

        if !query.returning.is_empty() {
            parts.push(self.returning(&query.returning)?);
        }
        Ok(join_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use pretty_assertions::assert_eq;

    fn sql(yaml: &str) -> GenerateResult<String> {
        let query = parse_str(yaml, None).unwrap();
        PostgresGenerator::new().generate(&query)
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            sql("select:\n  - id: c.id\n  - c.name\nfrom:\n  c: customers\nwhere:\n  - c.active = TRUE\n  - c.age > 18\norder_by:\n  - c.name: ASC\nlimit: 10\noffset: 5").unwrap(),
            "SELECT\n  c.id AS id,\n  c.name\nFROM customers c\nWHERE c.active = TRUE\n  AND c.age > 18\nORDER BY c.name ASC\nLIMIT 10\nOFFSET 5"
        );
    }

    #[test]
    fn test_select_star_and_group_by() {
        assert_eq!(
            sql("select: []\nfrom: orders\ngroup_by: [customer_id]\nhaving: [COUNT(*) > 1, SUM(amount) > 100]").unwrap(),
            "SELECT *\nFROM orders\nGROUP BY customer_id\nHAVING COUNT(*) > 1 AND SUM(amount) > 100"
        );
    }

    #[test]
    fn test_pagination_placeholders() {
        assert_eq!(
            sql("select: [id]\nfrom: users\npagination: {}").unwrap(),
            "SELECT\n  id\nFROM users\nLIMIT #{per_page:20}\nOFFSET ((#{page:1} - 1) * #{per_page:20})"
        );
    }

    #[test]
    fn test_pagination_wins_over_limit() {
        assert_eq!(
            sql("select: [id]\nfrom: users\nlimit: 5\npagination: {page: 3, per_page: 10}").unwrap(),
            "SELECT\n  id\nFROM users\nLIMIT 10\nOFFSET 20"
        );
    }

    #[test]
    fn test_with_clause() {
        assert_eq!(
            sql("with_clauses:\n  recent:\n    select: [id]\n    from: orders\nselect: [r.id]\nfrom: {r: recent}").unwrap(),
            "WITH recent AS (\n  SELECT\n    id\n  FROM orders\n)\nSELECT\n  r.id\nFROM recent r"
        );
    }

    #[test]
    fn test_upsert_do_update() {
        assert_eq!(
            sql("table: users\nvalues: {email: \"'a@example.com'\", name: \"'Alice'\"}\non_conflict:\n  target: [email]\n  update: {name: EXCLUDED.name}\n  where: users.active = TRUE\nreturning: [id]").unwrap(),
            "INSERT INTO users\n(email, name)\nVALUES ('a@example.com', 'Alice')\nON CONFLICT (email)\nDO UPDATE SET name = EXCLUDED.name\nWHERE users.active = TRUE\nRETURNING id"
        );
    }

    #[test]
    fn test_upsert_constraint_do_nothing() {
        assert_eq!(
            sql("table: users\nvalues: {id: 1}\non_conflict: {unique_constraint: users_pkey, action: nothing}").unwrap(),
            "INSERT INTO users\n(id)\nVALUES (1)\nON CONFLICT ON CONSTRAINT users_pkey\nDO NOTHING"
        );
    }

    #[test]
    fn test_upsert_errors() {
        let err = sql("table: users\nvalues: {id: 1}\non_conflict: {update: {id: 2}}").unwrap_err();
        assert!(matches!(err, GenerateError::InvalidClause { .. }));

        let err = sql("table: users\nvalues: {id: 1}\non_conflict: {target: id}").unwrap_err();
        assert!(matches!(err, GenerateError::InvalidClause { .. }));

        let err = sql("table: users\nvalues: {id: 1}\non_duplicate_key: {update: {id: 2}}").unwrap_err();
        assert_eq!(
            err,
            GenerateError::MissingClause {
                dialect: Dialect::PostgreSql,
                clause: "on_conflict",
            }
        );
    }

    #[test]
    fn test_update_with_joins_unsupported() {
        let err = sql("table: {c: customers}\nset: {vip: TRUE}\njoins:\n  - {alias: o, table: orders, on: c.id = o.customer_id}").unwrap_err();
        assert!(err.is_unsupported());
    }
}
