//! Dialect generator trait.

use super::render::{self, join_parts, where_block};
use super::Dialect;
use crate::ast::*;
use crate::error::{GenerateError, GenerateResult};

/// Trait for dialect-specific SQL generation.
///
/// The four required hooks cover the places dialects disagree on shape:
/// row limits, offsets, pagination and upserts. Everything else has a
/// default built from [`render`] that a dialect may override.
pub trait SqlGenerator {
    /// The dialect this generator renders.
    fn dialect(&self) -> Dialect;
    /// Render a plain row limit.
    fn limit(&self, limit: &LimitValue) -> String;
    /// Render a plain row offset.
    fn offset(&self, offset: &LimitValue) -> String;
    /// Render the pagination tail of `query`.
    fn pagination(&self, query: &SelectQuery, pagination: &Pagination) -> GenerateResult<String>;
    /// Render an insert-or-update.
    fn upsert(&self, query: &UpsertQuery) -> GenerateResult<String>;

    /// Render any query.
    fn generate(&self, query: &Query) -> GenerateResult<String> {
        match &query.statement {
            Statement::Select(q) => self.select(q),
            Statement::Insert(q) => self.insert(q),
            Statement::Update(q) => self.update(q),
            Statement::Delete(q) => self.delete(q),
            Statement::Upsert(q) => self.upsert(q),
        }
    }

    fn select(&self, query: &SelectQuery) -> GenerateResult<String> {
        render::render_select(self, query)
    }

    /// `RETURNING a, b`.
    fn returning(&self, columns: &[String]) -> GenerateResult<String> {
        Ok(format!("RETURNING {}", columns.join(", ")))
    }

    fn insert(&self, query: &InsertQuery) -> GenerateResult<String> {
        let mut parts = render::insert_head(
            self,
            "INSERT",
            &query.table,
            &query.columns,
            &query.values,
            query.from_query.as_ref(),
        )?;
        if !query.returning.is_empty() {
            parts.push(self.returning(&query.returning)?);
        }
        Ok(join_parts(parts))
    }

    /// UPDATE without joins; dialects that can join override this.
    fn update(&self, query: &UpdateQuery) -> GenerateResult<String> {
        if !query.joins.is_empty() {
            return Err(GenerateError::unsupported(self.dialect(), "JOIN in UPDATE"));
        }
        if query.set_values.is_empty() {
            return Err(GenerateError::EmptyQuery("UPDATE"));
        }

        let mut parts = vec![
            format!("UPDATE {}", render::target(&query.table, query.alias.as_deref())),
            format!("SET {}", render::assignments(&query.set_values, ", ")),
        ];
        if !query.where_clause.is_empty() {
            parts.push(where_block(&query.where_clause));
        }
        if !query.returning.is_empty() {
            parts.push(self.returning(&query.returning)?);
        }
        Ok(join_parts(parts))
    }

    /// DELETE without joins; dialects that can join override this.
    fn delete(&self, query: &DeleteQuery) -> GenerateResult<String> {
        if !query.joins.is_empty() {
            return Err(GenerateError::unsupported(self.dialect(), "JOIN in DELETE"));
        }

        let mut parts = vec![format!(
            "DELETE FROM {}",
            render::target(&query.table, query.alias.as_deref())
        )];
        if !query.where_clause.is_empty() {
            parts.push(where_block(&query.where_clause));
        }
        if !query.returning.is_empty() {
            parts.push(self.returning(&query.returning)?);
        }
        Ok(join_parts(parts))
    }
}
