//! Oracle generator.
//!
//! Oracle has no LIMIT/OFFSET here: a bare limit becomes a `ROWNUM <= n`
//! predicate, and any offset or pagination wraps the query in a
//! `ROW_NUMBER() OVER (ORDER BY ..)` window, which needs an ORDER BY.

use super::render::{
    inline_columns, join_parts, merge_statement, order_by_fields, page_offset, render_select,
    select_body, select_list, window_end,
};
use super::traits::SqlGenerator;
use super::Dialect;
use crate::ast::*;
use crate::error::{GenerateError, GenerateResult};

pub struct OracleGenerator;

impl Default for OracleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OracleGenerator {
    pub fn new() -> Self {
        Self
    }

    /// ```text
    /// SELECT cols FROM (
    ///   SELECT cols, ROW_NUMBER() OVER (ORDER BY ..) AS rn
    ///   FROM (inner) subquery
    /// ) WHERE rn > offset AND rn <= end
    /// ```
    fn row_number_window(&self, query: &SelectQuery, bounds: &[String]) -> GenerateResult<String> {
        let inner = render_select(self, &query.without_window())?;
        let columns = inline_columns(&query.columns);

        Ok(format!(
            "SELECT {cols} FROM (\n  SELECT {cols}, ROW_NUMBER() OVER (ORDER BY {order}) AS rn\n  FROM ({inner}) subquery\n) WHERE {bounds}",
            cols = columns,
            order = order_by_fields(&query.order_by),
            inner = inner,
            bounds = bounds.join(" AND "),
        ))
    }

    fn require_order_by(&self, query: &SelectQuery, context: &'static str) -> GenerateResult<()> {
        if query.order_by.is_empty() {
            return Err(GenerateError::OrderByRequired {
                dialect: self.dialect(),
                context,
            });
        }
        Ok(())
    }
}

impl SqlGenerator for OracleGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    /// A WHERE predicate, not a trailing clause.
    fn limit(&self, limit: &LimitValue) -> String {
        format!("ROWNUM <= {}", limit)
    }

    /// Lower bound on the window's row number.
    fn offset(&self, offset: &LimitValue) -> String {
        format!("rn > {}", offset)
    }

    fn pagination(&self, query: &SelectQuery, pagination: &Pagination) -> GenerateResult<String> {
        self.require_order_by(query, "pagination")?;

        let offset = page_offset(pagination);
        let bounds = vec![
            format!("rn > {}", offset),
            format!("rn <= {}", window_end(&offset, &pagination.per_page)),
        ];
        self.row_number_window(query, &bounds)
    }

    fn upsert(&self, query: &UpsertQuery) -> GenerateResult<String> {
        merge_statement(self, query)
    }

    fn returning(&self, _columns: &[String]) -> GenerateResult<String> {
        Err(GenerateError::unsupported(self.dialect(), "RETURNING clause"))
    }

    fn select(&self, query: &SelectQuery) -> GenerateResult<String> {
        if let Some(pagination) = &query.pagination {
            return self.pagination(query, pagination);
        }

        match (&query.limit, &query.offset) {
            (limit, Some(offset)) if !offset.is_zero() => {
                self.require_order_by(query, "OFFSET")?;
                let mut bounds = vec![self.offset(offset)];
                if let Some(limit) = limit {
                    bounds.push(format!("rn <= {}", window_end(&offset.to_string(), limit)));
                }
                self.row_number_window(query, &bounds)
            }
            (Some(limit), _) => {
                let mut conditions = query.where_clause.clone();
                conditions.push(self.limit(limit));
                let parts = select_body(
                    self,
                    query,
                    select_list(&query.columns, None),
                    &conditions,
                )?;
                Ok(join_parts(parts))
            }
            _ => render_select(self, &query.without_window()),
        }
    }
}
