//! Clause renderers shared by every dialect.
//!
//! Statements are assembled as a list of lines joined with `\n`; nested
//! queries are indented by [`INDENT`].

use super::traits::SqlGenerator;
use super::Dialect;
use crate::ast::*;
use crate::error::{GenerateError, GenerateResult};
use crate::value::{Mapping, Value};

pub const INDENT: &str = "  ";

pub fn indent(sql: &str, prefix: &str) -> String {
    sql.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `WITH a AS (\n  ...\n),\nb AS (...)`.
pub fn with_block<G: SqlGenerator + ?Sized>(
    g: &G,
    with_clauses: &[WithClause],
) -> GenerateResult<String> {
    let mut ctes = Vec::with_capacity(with_clauses.len());
    for cte in with_clauses {
        let body = g.select(&cte.query)?;
        ctes.push(format!("{} AS (\n{}\n)", cte.name, indent(&body, INDENT)));
    }
    Ok(format!("WITH {}", ctes.join(",\n")))
}

/// `SELECT *` or one column per line. `modifier` goes right after `SELECT`
/// (SQL Server's `TOP n`).
pub fn select_list(columns: &[Column], modifier: Option<&str>) -> String {
    let head = match modifier {
        Some(m) => format!("SELECT {}", m),
        None => "SELECT".to_string(),
    };
    if columns.is_empty() {
        return format!("{} *", head);
    }
    let lines: Vec<String> = columns
        .iter()
        .map(|c| format!("{}{}", INDENT, c))
        .collect();
    format!("{}\n{}", head, lines.join(",\n"))
}

/// Columns on one line, for Oracle's ROW_NUMBER wrapper.
pub fn inline_columns(columns: &[Column]) -> String {
    if columns.is_empty() {
        return "*".to_string();
    }
    columns
        .iter()
        .map(Column::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn from_line(from: &FromClause) -> String {
    if from.alias == from.table {
        format!("FROM {}", from.table)
    } else {
        format!("FROM {} {}", from.table, from.alias)
    }
}

/// `TYPE JOIN table alias ON a AND b`; no ON when there are no conditions.
pub fn join_line(join: &JoinClause) -> String {
    let conditions: Vec<&str> = join.conditions().collect();
    if conditions.is_empty() || join.join_type == JoinType::Cross {
        format!("{} JOIN {} {}", join.join_type, join.table, join.alias)
    } else {
        format!(
            "{} JOIN {} {} ON {}",
            join.join_type,
            join.table,
            join.alias,
            conditions.join(" AND ")
        )
    }
}

pub fn where_block(conditions: &[String]) -> String {
    let separator = format!("\n{}AND ", INDENT);
    format!("WHERE {}", conditions.join(&separator))
}

pub fn order_by_line(order_by: &[OrderByClause]) -> String {
    format!("ORDER BY {}", order_by_fields(order_by))
}

pub fn order_by_fields(order_by: &[OrderByClause]) -> String {
    order_by
        .iter()
        .map(OrderByClause::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything from WITH through ORDER BY.
///
/// `select_line` and `conditions` are passed in so dialects can add `TOP` or
/// a `ROWNUM` predicate without rebuilding the rest.
pub fn select_body<G: SqlGenerator + ?Sized>(
    g: &G,
    query: &SelectQuery,
    select_line: String,
    conditions: &[String],
) -> GenerateResult<Vec<String>> {
    let mut parts = Vec::new();

    if !query.with_clauses.is_empty() {
        parts.push(with_block(g, &query.with_clauses)?);
    }
    parts.push(select_line);
    if let Some(from) = &query.from {
        parts.push(from_line(from));
    }
    parts.extend(query.joins.iter().map(join_line));
    if !conditions.is_empty() {
        parts.push(where_block(conditions));
    }
    if !query.group_by.is_empty() {
        parts.push(format!("GROUP BY {}", query.group_by.join(", ")));
    }
    if !query.having.is_empty() {
        parts.push(format!("HAVING {}", query.having.join(" AND ")));
    }
    if !query.order_by.is_empty() {
        parts.push(order_by_line(&query.order_by));
    }

    Ok(parts)
}

/// The shared SELECT skeleton: body, then pagination or LIMIT/OFFSET hooks.
pub fn render_select<G: SqlGenerator + ?Sized>(
    g: &G,
    query: &SelectQuery,
) -> GenerateResult<String> {
    let mut parts = select_body(
        g,
        query,
        select_list(&query.columns, None),
        &query.where_clause,
    )?;

    if let Some(pagination) = &query.pagination {
        parts.push(g.pagination(query, pagination)?);
    } else {
        if let Some(limit) = &query.limit {
            parts.push(g.limit(limit));
        }
        if let Some(offset) = &query.offset {
            parts.push(g.offset(offset));
        }
    }

    Ok(join_parts(parts))
}

pub fn join_parts(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `(page - 1) * per_page`, computed when both are literals and the result
/// fits in an `i64`; symbolic otherwise.
pub fn page_offset(pagination: &Pagination) -> String {
    let computed = match (pagination.page.resolve(), pagination.per_page.resolve()) {
        (Some(page), Some(per_page)) => page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(per_page)),
        _ => None,
    };
    match computed {
        Some(offset) => offset.to_string(),
        None => format!("(({} - 1) * {})", pagination.page, pagination.per_page),
    }
}

/// Upper row bound `offset + count`, computed when both are literals and the
/// sum fits in an `i64`; symbolic otherwise.
pub fn window_end(offset: &str, count: &LimitValue) -> String {
    let computed = match (offset.trim().parse::<i64>().ok(), count.resolve()) {
        (Some(o), Some(c)) => o.checked_add(c),
        _ => None,
    };
    match computed {
        Some(end) => end.to_string(),
        None => format!("({} + {})", offset, count),
    }
}

/// `a = x, b = y`.
pub fn assignments(values: &Mapping, separator: &str) -> String {
    values
        .iter()
        .map(|(column, value)| format!("{} = {}", column, value.to_sql()))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Column list of an INSERT: explicit, else the first row's keys.
pub fn insert_columns(columns: &[String], rows: &[Mapping]) -> Vec<String> {
    if !columns.is_empty() {
        return columns.to_vec();
    }
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

/// `VALUES (..), (..)` with each row read by column name; gaps become NULL.
pub fn values_line(columns: &[String], rows: &[Mapping]) -> String {
    let rendered: Vec<String> = rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| row.get(c).unwrap_or(&Value::Null).to_sql())
                .collect();
            format!("({})", cells.join(", "))
        })
        .collect();
    format!("VALUES {}", rendered.join(", "))
}

/// `INSERT INTO t (cols)` followed by VALUES or a source SELECT.
pub fn insert_head<G: SqlGenerator + ?Sized>(
    g: &G,
    operation: &'static str,
    table: &str,
    columns: &[String],
    rows: &[Mapping],
    from_query: Option<&SelectQuery>,
) -> GenerateResult<Vec<String>> {
    if rows.is_empty() && from_query.is_none() {
        return Err(GenerateError::EmptyQuery(operation));
    }

    let columns = insert_columns(columns, rows);
    let mut parts = vec![format!("INSERT INTO {}", table)];
    if !columns.is_empty() {
        parts.push(format!("({})", columns.join(", ")));
    }
    match from_query {
        Some(source) => parts.push(g.select(source)?),
        None => parts.push(values_line(&columns, rows)),
    }
    Ok(parts)
}

pub fn target(table: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) if alias != table => format!("{} {}", table, alias),
        _ => table.to_string(),
    }
}

/// `MERGE t AS target USING (...) AS source ON ... WHEN ...;`
///
/// Oracle parenthesizes ON and selects constants `FROM DUAL`.
pub fn merge_statement<G: SqlGenerator + ?Sized>(
    g: &G,
    query: &UpsertQuery,
) -> GenerateResult<String> {
    let dialect = g.dialect();
    let oracle = dialect == Dialect::Oracle;
    let missing = GenerateError::MissingClause {
        dialect,
        clause: "'using' and 'match_on'",
    };

    let merge = match &query.clause {
        Some(UpsertClause::Merge(merge)) => merge,
        _ => return Err(missing),
    };
    let using = match &merge.using {
        Some(using) if !merge.match_on.is_empty() => using,
        _ => return Err(missing),
    };

    let alias = query.alias.as_deref().unwrap_or("target");
    let mut parts = vec![format!("MERGE {} AS {}", query.table, alias)];

    let mut using_sql = g.select(using)?;
    if oracle && using.from.is_none() {
        using_sql.push_str("\nFROM DUAL");
    }
    parts.push(format!("USING ({}) AS source", using_sql));

    let on = merge
        .match_on
        .iter()
        .map(|col| format!("{}.{} = source.{}", alias, col, col))
        .collect::<Vec<_>>()
        .join(" AND ");
    if oracle {
        parts.push(format!("ON ({})", on));
    } else {
        parts.push(format!("ON {}", on));
    }

    if let Some(matched) = &merge.when_matched {
        let guard = matched
            .where_clause
            .as_ref()
            .map(|w| format!(" AND {}", w))
            .unwrap_or_default();
        if matched.delete {
            parts.push(format!("WHEN MATCHED{} THEN DELETE", guard));
        } else if !matched.update.is_empty() {
            let set_indent = format!(",\n{}{}", INDENT, INDENT);
            parts.push(format!(
                "WHEN MATCHED{} THEN\n{}UPDATE SET\n{}{}{}",
                guard,
                INDENT,
                INDENT,
                INDENT,
                assignments(&matched.update, &set_indent)
            ));
        }
    }

    if let Some(not_matched) = &merge.when_not_matched {
        if !not_matched.insert.is_empty() {
            let columns: Vec<&str> = not_matched.insert.keys().map(String::as_str).collect();
            let values: Vec<String> = not_matched.insert.values().map(Value::to_sql).collect();
            parts.push(format!(
                "WHEN NOT MATCHED THEN\n{}INSERT ({})\n{}VALUES ({})",
                INDENT,
                columns.join(", "),
                INDENT,
                values.join(", ")
            ));
        }
    }

    if !query.returning.is_empty() {
        parts.push(g.returning(&query.returning)?);
    }

    Ok(format!("{};", parts.join("\n")))
}
