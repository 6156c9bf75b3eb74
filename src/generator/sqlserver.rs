use super::render::{join_parts, merge_statement, page_offset, select_body, select_list};
use super::traits::SqlGenerator;
use super::Dialect;
use crate::ast::*;
use crate::error::GenerateResult;

/// SQL Server generator: `TOP n` for bare limits, OFFSET-FETCH otherwise.
pub struct SqlServerGenerator;

impl Default for SqlServerGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlServerGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl SqlGenerator for SqlServerGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    /// Used as the `SELECT` modifier, never as a trailing clause.
    fn limit(&self, limit: &LimitValue) -> String {
        format!("TOP {}", limit)
    }

    fn offset(&self, offset: &LimitValue) -> String {
        format!("OFFSET {} ROWS", offset)
    }

    fn pagination(&self, _query: &SelectQuery, pagination: &Pagination) -> GenerateResult<String> {
        Ok(format!(
            "OFFSET {} ROWS\nFETCH NEXT {} ROWS ONLY",
            page_offset(pagination),
            pagination.per_page
        ))
    }

    fn upsert(&self, query: &UpsertQuery) -> GenerateResult<String> {
        merge_statement(self, query)
    }

    fn select(&self, query: &SelectQuery) -> GenerateResult<String> {
        let windowed = query.offset.is_some() || query.pagination.is_some();
        let top = match &query.limit {
            Some(limit) if !windowed => Some(self.limit(limit)),
            _ => None,
        };

        let mut parts = select_body(
            self,
            query,
            select_list(&query.columns, top.as_deref()),
            &query.where_clause,
        )?;

        // OFFSET-FETCH is only valid after an ORDER BY.
        if windowed && query.order_by.is_empty() {
            parts.push("ORDER BY (SELECT NULL)".to_string());
        }

        if let Some(pagination) = &query.pagination {
            parts.push(self.pagination(query, pagination)?);
        } else if let Some(offset) = &query.offset {
            parts.push(self.offset(offset));
            if let Some(limit) = &query.limit {
                parts.push(format!("FETCH NEXT {} ROWS ONLY", limit));
            }
        }

        Ok(join_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerateError;
    use crate::parser::parse_str;
    use pretty_assertions::assert_eq;

    fn sql(yaml: &str) -> GenerateResult<String> {
        let query = parse_str(yaml, None).unwrap();
        SqlServerGenerator::new().generate(&query)
    }

    #[test]
    fn test_top() {
        assert_eq!(
            sql("select: [{id: c.id}]\nfrom: {c: customers}\nlimit: 10").unwrap(),
            "SELECT TOP 10\n  c.id AS id\nFROM customers c"
        );
        assert_eq!(
            sql("select: []\nfrom: customers\nlimit: 5").unwrap(),
            "SELECT TOP 5 *\nFROM customers"
        );
    }

    #[test]
    fn test_offset_fetch_injects_order_by() {
        assert_eq!(
            sql("select: [id]\nfrom: users\nlimit: 10\noffset: 20").unwrap(),
            "SELECT\n  id\nFROM users\nORDER BY (SELECT NULL)\nOFFSET 20 ROWS\nFETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_offset_only() {
        assert_eq!(
            sql("select: [id]\nfrom: users\norder_by: [id]\noffset: 20").unwrap(),
            "SELECT\n  id\nFROM users\nORDER BY id ASC\nOFFSET 20 ROWS"
        );
    }

    #[test]
    fn test_pagination() {
        assert_eq!(
            sql("select: [id]\nfrom: users\norder_by: [{field: id, direction: DESC}]\npagination: {page: 2, per_page: 25}").unwrap(),
            "SELECT\n  id\nFROM users\nORDER BY id DESC\nOFFSET 25 ROWS\nFETCH NEXT 25 ROWS ONLY"
        );
    }

    #[test]
    fn test_merge() {
        assert_eq!(
            sql("table: 'target: customers'\nusing:\n  select: [{id: s.id}, {name: s.name}]\n  from: {s: staging}\nmatch_on: [id]\nwhen_matched:\n  where: target.name <> source.name\n  update: {name: source.name}\nwhen_not_matched:\n  insert: {id: source.id, name: source.name}").unwrap(),
            "MERGE customers AS target\nUSING (SELECT\n  s.id AS id,\n  s.name AS name\nFROM staging s) AS source\nON target.id = source.id\nWHEN MATCHED AND target.name <> source.name THEN\n  UPDATE SET\n    name = source.name\nWHEN NOT MATCHED THEN\n  INSERT (id, name)\n  VALUES (source.id, source.name);"
        );
    }

    #[test]
    fn test_merge_delete_when_matched() {
        let out = sql("table: customers\nusing: {select: [id], from: purge_list}\nmatch_on: [id]\nwhen_matched: {delete: true}").unwrap();
        assert!(out.contains("\nWHEN MATCHED THEN DELETE"));
        assert!(out.starts_with("MERGE customers AS target\n"));
    }

    #[test]
    fn test_merge_requires_using() {
        let err = sql("operation: upsert\ntable: customers\nmatch_on: [id]").unwrap_err();
        assert_eq!(
            err,
            GenerateError::MissingClause {
                dialect: Dialect::SqlServer,
                clause: "'using' and 'match_on'",
            }
        );
    }
}
