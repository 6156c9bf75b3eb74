use super::render::{self, assignments, join_line, join_parts, page_offset, where_block};
use super::traits::SqlGenerator;
use super::Dialect;
use crate::ast::*;
use crate::error::{GenerateError, GenerateResult};

/// MySQL generator. Unlike the other dialects it renders UPDATE and DELETE
/// with joins as multi-table statements.
pub struct MySqlGenerator;

impl Default for MySqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl SqlGenerator for MySqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
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

    fn upsert(&self, query: &UpsertQuery) -> GenerateResult<String> {
        let update = match &query.clause {
            Some(UpsertClause::OnDuplicateKey(clause)) => &clause.update,
            _ => {
                return Err(GenerateError::MissingClause {
                    dialect: self.dialect(),
                    clause: "on_duplicate_key",
                });
            }
        };
        if update.is_empty() {
            return Err(GenerateError::InvalidClause {
                dialect: self.dialect(),
                message: "ON DUPLICATE KEY UPDATE requires an update map".to_string(),
            });
        }

        let mut parts = render::insert_head(
            self,
            "UPSERT",
            &query.table,
            &query.columns,
            &query.values,
            query.from_query.as_ref(),
        )?;
        parts.push(format!("ON DUPLICATE KEY UPDATE {}", assignments(update, ", ")));

        if !query.returning.is_empty() {
            parts.push(self.returning(&query.returning)?);
        }
        Ok(join_parts(parts))
    }

    /// `UPDATE t a JOIN ... SET ... WHERE ...`.
    fn update(&self, query: &UpdateQuery) -> GenerateResult<String> {
        if query.set_values.is_empty() {
            return Err(GenerateError::EmptyQuery("UPDATE"));
        }

        let mut parts = vec![format!(
            "UPDATE {}",
            render::target(&query.table, query.alias.as_deref())
        )];
        parts.extend(query.joins.iter().map(join_line));
        parts.push(format!("SET {}", assignments(&query.set_values, ", ")));
        if !query.where_clause.is_empty() {
            parts.push(where_block(&query.where_clause));
        }
        if !query.returning.is_empty() {
            parts.push(self.returning(&query.returning)?);
        }
        Ok(join_parts(parts))
    }

    /// `DELETE a FROM t a JOIN ... WHERE ...` when joins are present.
    fn delete(&self, query: &DeleteQuery) -> GenerateResult<String> {
        let target = render::target(&query.table, query.alias.as_deref());
        let mut parts = if query.joins.is_empty() {
            vec![format!("DELETE FROM {}", target)]
        } else {
            let victim = query.alias.as_deref().unwrap_or(&query.table);
            vec![format!("DELETE {} FROM {}", victim, target)]
        };
        parts.extend(query.joins.iter().map(join_line));
        if !query.where_clause.is_empty() {
            parts.push(where_block(&query.where_clause));
        }
        if !query.returning.is_empty() {
            parts.push(self.returning(&query.returning)?);
        }
        Ok(join_parts(parts))
    }
}
