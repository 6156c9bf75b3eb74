//! Clause parsers: value tree → AST nodes.
//!
//! Each parser is total over the shapes it accepts and returns a
//! [`ParseError`] for anything else.

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::value::{Mapping, Value};

/// Parse the SELECT list.
///
/// ```yaml
/// select:
///   - id: c.id          # {alias: expression}
///   - c.name            # bare, alias = expression
/// ```
pub fn parse_select_clause(data: &Value) -> ParseResult<Vec<Column>> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![Column::bare(s.as_str())]),
        Value::Sequence(items) => {
            let mut columns = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Mapping(map) => {
                        for (alias, expr) in map {
                            columns.push(Column::new(alias.as_str(), expr.to_string()));
                        }
                    }
                    Value::String(s) => columns.push(Column::bare(s.as_str())),
                    other => {
                        return Err(ParseError::syntax(format!(
                            "Invalid SELECT column format: {}",
                            other
                        )));
                    }
                }
            }
            Ok(columns)
        }
        other => Err(ParseError::syntax(format!(
            "SELECT clause must be a list, got {}",
            other.kind()
        ))),
    }
}

/// Parse `from: {alias: table}` or `from: table`.
pub fn parse_from_clause(data: &Value) -> ParseResult<FromClause> {
    match data {
        Value::Mapping(map) => {
            if map.len() != 1 {
                return Err(ParseError::syntax(format!(
                    "FROM clause must have exactly one alias: {}",
                    data
                )));
            }
            let (alias, table) = map.iter().next().map(|(a, t)| (a.clone(), t.to_string())).unwrap_or_default();
            Ok(FromClause::new(alias, table))
        }
        Value::String(table) => Ok(FromClause::new(table.as_str(), table.as_str())),
        other => Err(ParseError::syntax(format!("Invalid FROM clause format: {}", other))),
    }
}

/// Parse the `joins` list.
pub fn parse_joins(data: &Value) -> ParseResult<Vec<JoinClause>> {
    let items = match data {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items.as_slice(),
        Value::Mapping(_) => std::slice::from_ref(data),
        other => {
            return Err(ParseError::syntax(format!(
                "joins must be a list, got {}",
                other.kind()
            )));
        }
    };

    items.iter().map(parse_join).collect()
}

fn parse_join(item: &Value) -> ParseResult<JoinClause> {
    if item.as_mapping().is_none() {
        return Err(ParseError::syntax(format!("JOIN must be a mapping: {}", item)));
    }

    let join_type = match item.get_present("type") {
        None => JoinType::Inner,
        Some(raw) => {
            let name = raw.to_string();
            JoinType::from_name(&name).ok_or_else(|| {
                let valid: Vec<&str> = JoinType::ALL.iter().map(JoinType::as_str).collect();
                ParseError::logic(format!(
                    "Invalid JOIN type '{}'. Valid types are: {}",
                    name,
                    valid.join(", ")
                ))
            })?
        }
    };

    let alias = item.get_present("alias").map(Value::to_string).unwrap_or_default();
    let table = item.get_present("table").map(Value::to_string).unwrap_or_default();
    if alias.is_empty() || table.is_empty() {
        return Err(ParseError::logic(format!(
            "JOIN must have 'alias' and 'table': {}",
            item
        )));
    }

    // A YAML 1.1 producer decodes the `on` key as boolean true.
    let on = item
        .get_present("on")
        .or_else(|| item.get_present("true"))
        .map(string_list)
        .transpose()?
        .unwrap_or_default();
    let additional_conditions = item
        .get_present("additional_conditions")
        .map(string_list)
        .transpose()?
        .unwrap_or_default();

    Ok(JoinClause {
        join_type,
        alias,
        table,
        on,
        additional_conditions,
    })
}

/// Parse WHERE, GROUP BY or HAVING entries.
///
/// Accepts a bare string, a list of strings, or list items of the form
/// `{field, operator, value}` / `{field, operator, subquery}`.
pub fn parse_conditions(data: &Value) -> Vec<String> {
    match data {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Value::Mapping(map) => format_complex_condition(map, item),
                other => other.to_string(),
            })
            .collect(),
        Value::Mapping(map) => vec![format_complex_condition(map, data)],
        other => vec![other.to_string()],
    }
}

fn format_complex_condition(map: &Mapping, item: &Value) -> String {
    if let (Some(field), Some(operator)) = (map.get("field"), map.get("operator")) {
        if map.contains_key("subquery") {
            return format!("{} {} (SUBQUERY)", field, operator);
        }
        if let Some(value) = map.get("value") {
            return format!("{} {} {}", field, operator, value.to_sql());
        }
    }
    item.to_string()
}

/// Parse ORDER BY entries.
///
/// ```yaml
/// order_by:
///   - field: c.created_at     # full form
///     direction: DESC
///   - c.name: ASC             # shorthand
///   - c.id                    # bare, ASC
/// ```
pub fn parse_order_by(data: &Value) -> ParseResult<Vec<OrderByClause>> {
    let items = match data {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items.as_slice(),
        _ => std::slice::from_ref(data),
    };

    let mut order_by = Vec::with_capacity(items.len());
    for item in items {
        let (field, direction) = match item {
            Value::Mapping(map) if map.contains_key("field") => {
                let field = map.get("field").map(Value::to_string).unwrap_or_default();
                let direction = map
                    .get("direction")
                    .filter(|v| !v.is_null())
                    .map(Value::to_string)
                    .unwrap_or_else(|| "ASC".to_string());
                (field, direction)
            }
            Value::Mapping(map) if map.len() == 1 && !map.contains_key("direction") => {
                let (field, direction) = map.iter().next().map(|(f, d)| (f.clone(), d.to_string())).unwrap_or_default();
                (field, direction)
            }
            Value::String(field) => (field.clone(), "ASC".to_string()),
            other => {
                return Err(ParseError::syntax(format!(
                    "Invalid ORDER BY format: {}. Use {{field: 'name', direction: 'ASC'}} or {{name: 'DESC'}}",
                    other
                )));
            }
        };

        let direction = SortDirection::from_name(&direction).ok_or_else(|| {
            ParseError::logic(format!(
                "Invalid sort direction '{}'. Valid directions are: ASC, DESC",
                direction.to_uppercase()
            ))
        })?;

        order_by.push(OrderByClause { field, direction });
    }

    Ok(order_by)
}

/// LIMIT/OFFSET are kept opaque; nothing is validated here.
pub fn parse_limit_value(data: &Value) -> Option<LimitValue> {
    match data {
        Value::Null => None,
        Value::Int(n) => Some(LimitValue::Int(*n)),
        Value::String(s) => Some(LimitValue::Param(s.clone())),
        other => Some(LimitValue::Param(other.to_string())),
    }
}

/// Parse `pagination`, defaulting missing fields to `#{page:1}` / `#{per_page:20}`.
pub fn parse_pagination(data: &Value) -> Pagination {
    let defaults = Pagination::default();
    Pagination {
        page: data
            .get("page")
            .and_then(parse_limit_value)
            .unwrap_or(defaults.page),
        per_page: data
            .get("per_page")
            .and_then(parse_limit_value)
            .unwrap_or(defaults.per_page),
    }
}

/// A table reference: `table`, `{alias: table}`, and (when `allow_colon`) `"alias: table"`.
pub fn parse_table_ref(data: &Value, allow_colon: bool) -> ParseResult<(Option<String>, String)> {
    match data {
        Value::Null => Ok((None, String::new())),
        Value::String(s) => {
            if allow_colon {
                if let Some((alias, table)) = s.split_once(':') {
                    return Ok((Some(alias.trim().to_string()), table.trim().to_string()));
                }
            }
            Ok((None, s.clone()))
        }
        Value::Mapping(map) if map.len() == 1 => {
            let (alias, table) = map.iter().next().map(|(a, t)| (a.clone(), t.to_string())).unwrap_or_default();
            Ok((Some(alias), table))
        }
        other => Err(ParseError::syntax(format!("Invalid table format: {}", other))),
    }
}

/// A string or a list of strings; non-string scalars are stringified.
pub fn string_list(data: &Value) -> ParseResult<Vec<String>> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Value::Mapping(_) | Value::Sequence(_) => Err(ParseError::syntax(format!(
                    "Expected a string, got {}: {}",
                    item.kind(),
                    item
                ))),
                other => Ok(other.to_string()),
            })
            .collect(),
        Value::Mapping(_) => Err(ParseError::syntax(format!(
            "Expected a string or list of strings, got mapping: {}",
            data
        ))),
        other => Ok(vec![other.to_string()]),
    }
}

/// A mapping field; absent or null yields an empty mapping.
pub fn mapping_field(data: &Value, key: &str) -> ParseResult<Mapping> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(Mapping::new()),
        Some(Value::Mapping(map)) => Ok(map.clone()),
        Some(other) => Err(ParseError::syntax(format!(
            "'{}' must be a mapping, got {}",
            key,
            other.kind()
        ))),
    }
}

/// An optional scalar rendered as a string.
pub fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get_present(key).map(Value::to_string)
}

/// `values:` as one row mapping or a list of row mappings.
pub fn parse_rows(data: &Value) -> ParseResult<Vec<Mapping>> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(map) => Ok(vec![map.clone()]),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_mapping()
                    .cloned()
                    .ok_or_else(|| ParseError::syntax(format!("Invalid values format: {}", item)))
            })
            .collect(),
        other => Err(ParseError::syntax(format!("Invalid values format: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn yaml(text: &str) -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>(text).unwrap())
    }

    #[test]
    fn test_select_clause_shapes() {
        let cols = parse_select_clause(&yaml("[{id: c.id}, c.name, {total: 'SUM(o.amount)'}]")).unwrap();
        assert_eq!(
            cols,
            vec![
                Column::new("id", "c.id"),
                Column::bare("c.name"),
                Column::new("total", "SUM(o.amount)"),
            ]
        );
        assert!(parse_select_clause(&yaml("[[1, 2]]")).is_err());
    }

    #[test]
    fn test_from_shapes_are_equivalent() {
        let bare = parse_from_clause(&yaml("customers")).unwrap();
        let mapped = parse_from_clause(&yaml("{customers: customers}")).unwrap();
        assert_eq!(bare, mapped);
        assert_eq!(
            parse_from_clause(&yaml("{c: customers}")).unwrap(),
            FromClause::new("c", "customers")
        );
        assert!(parse_from_clause(&yaml("{a: x, b: y}")).is_err());
    }

    #[test]
    fn test_join_parsing() {
        let joins = parse_joins(&yaml(
            "- type: left\n  alias: o\n  table: orders\n  on: c.id = o.customer_id\n  additional_conditions: [o.deleted = FALSE]",
        ))
        .unwrap();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].join_type, JoinType::Left);
        assert_eq!(joins[0].on, vec!["c.id = o.customer_id"]);
        assert_eq!(joins[0].additional_conditions, vec!["o.deleted = FALSE"]);
    }

    #[test]
    fn test_join_invalid_type() {
        let err = parse_joins(&yaml("- {type: OUTER, alias: o, table: orders}")).unwrap_err();
        assert_eq!(err.category, ErrorCategory::LogicError);
        assert_eq!(
            err.message,
            "Invalid JOIN type 'OUTER'. Valid types are: INNER, LEFT, RIGHT, FULL, CROSS"
        );
    }

    #[test]
    fn test_join_requires_alias_and_table() {
        let err = parse_joins(&yaml("- {type: INNER, table: orders}")).unwrap_err();
        assert!(err.message.starts_with("JOIN must have 'alias' and 'table'"));
    }

    #[test]
    fn test_conditions() {
        assert_eq!(parse_conditions(&yaml("c.id = 1")), vec!["c.id = 1"]);
        assert_eq!(
            parse_conditions(&yaml(
                "- c.active = TRUE\n- {field: c.age, operator: '>', value: 18}\n- {field: c.id, operator: IN, subquery: {select: [id]}}"
            )),
            vec!["c.active = TRUE", "c.age > 18", "c.id IN (SUBQUERY)"]
        );
    }

    #[test]
    fn test_order_by_shapes() {
        let order = parse_order_by(&yaml(
            "- {field: c.created_at, direction: desc}\n- {c.name: ASC}\n- c.id",
        ))
        .unwrap();
        assert_eq!(
            order,
            vec![
                OrderByClause { field: "c.created_at".into(), direction: SortDirection::Desc },
                OrderByClause { field: "c.name".into(), direction: SortDirection::Asc },
                OrderByClause { field: "c.id".into(), direction: SortDirection::Asc },
            ]
        );
    }

    #[test]
    fn test_order_by_invalid_direction() {
        let err = parse_order_by(&yaml("- {c.name: sideways}")).unwrap_err();
        assert_eq!(err.category, ErrorCategory::LogicError);
        assert_eq!(
            err.message,
            "Invalid sort direction 'SIDEWAYS'. Valid directions are: ASC, DESC"
        );
    }

    #[test]
    fn test_pagination_defaults() {
        let p = parse_pagination(&yaml("{page: 2}"));
        assert_eq!(p.page, LimitValue::Int(2));
        assert_eq!(p.per_page, LimitValue::from("#{per_page:20}"));
    }

    #[test]
    fn test_table_ref_shapes() {
        assert_eq!(parse_table_ref(&yaml("customers"), false).unwrap(), (None, "customers".into()));
        assert_eq!(
            parse_table_ref(&yaml("{c: customers}"), false).unwrap(),
            (Some("c".into()), "customers".into())
        );
        assert_eq!(
            parse_table_ref(&yaml("'target: test'"), true).unwrap(),
            (Some("target".into()), "test".into())
        );
    }

    #[test]
    fn test_rows() {
        assert_eq!(parse_rows(&yaml("{name: John}")).unwrap().len(), 1);
        assert_eq!(parse_rows(&yaml("[{name: A}, {name: B}]")).unwrap().len(), 2);
        assert!(parse_rows(&yaml("[1, 2]")).is_err());
    }
}
