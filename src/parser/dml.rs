//! INSERT, UPDATE, DELETE and UPSERT documents.

use super::clauses::{
    mapping_field, parse_conditions, parse_joins, parse_rows, parse_table_ref, string_field,
    string_list,
};
use super::imports::Definitions;
use super::parse_select_query;
use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::value::Value;

/// `table` field with an optional alias; an empty table name is a logic error.
fn table_with_alias(
    data: &Value,
    operation: &str,
    allow_colon: bool,
) -> ParseResult<(Option<String>, String)> {
    let (alias, table) = match data.get("table") {
        None => (None, String::new()),
        Some(value) => parse_table_ref(value, allow_colon)?,
    };
    if table.trim().is_empty() {
        return Err(ParseError::logic(format!("{} must have 'table'", operation)));
    }
    Ok((alias, table))
}

fn list_field(data: &Value, key: &str) -> ParseResult<Vec<String>> {
    match data.get(key) {
        None => Ok(Vec::new()),
        Some(value) => string_list(value),
    }
}

fn where_field(data: &Value) -> Vec<String> {
    data.get("where").map(parse_conditions).unwrap_or_default()
}

fn joins_field(data: &Value) -> ParseResult<Vec<JoinClause>> {
    match data.get("joins") {
        None => Ok(Vec::new()),
        Some(value) => parse_joins(value),
    }
}

fn source_query(
    data: &Value,
    key: &str,
    definitions: &Definitions,
) -> ParseResult<Option<SelectQuery>> {
    data.get_present(key)
        .map(|q| parse_select_query(q, definitions))
        .transpose()
}

pub fn parse_insert(data: &Value, definitions: &Definitions) -> ParseResult<InsertQuery> {
    let (_, table) = table_with_alias(data, "INSERT", false)?;
    let values = match data.get("values") {
        None => Vec::new(),
        Some(v) => parse_rows(v)?,
    };

    Ok(InsertQuery {
        table,
        columns: list_field(data, "columns")?,
        values,
        from_query: source_query(data, "from_query", definitions)?,
        returning: list_field(data, "returning")?,
    })
}

pub fn parse_update(data: &Value) -> ParseResult<UpdateQuery> {
    let (alias, table) = table_with_alias(data, "UPDATE", false)?;

    Ok(UpdateQuery {
        table,
        alias,
        set_values: mapping_field(data, "set")?,
        joins: joins_field(data)?,
        where_clause: where_field(data),
        returning: list_field(data, "returning")?,
    })
}

pub fn parse_delete(data: &Value) -> ParseResult<DeleteQuery> {
    let (alias, table) = table_with_alias(data, "DELETE", false)?;

    Ok(DeleteQuery {
        table,
        alias,
        joins: joins_field(data)?,
        where_clause: where_field(data),
        returning: list_field(data, "returning")?,
    })
}

/// Parse an UPSERT document.
///
/// Whichever dialect clause appears first in `on_conflict`, `on_duplicate_key`,
/// MERGE (`using`/`match_on`/`when_*`) is kept. Whether that clause suits the
/// target dialect is decided by the generator.
pub fn parse_upsert(data: &Value, definitions: &Definitions) -> ParseResult<UpsertQuery> {
    let (alias, table) = table_with_alias(data, "UPSERT", true)?;
    let values = match data.get("values") {
        None => Vec::new(),
        Some(v) => parse_rows(v)?,
    };

    let clause = if let Some(conflict) = data.get_present("on_conflict") {
        Some(UpsertClause::OnConflict(parse_on_conflict(conflict)?))
    } else if let Some(duplicate) = data.get_present("on_duplicate_key") {
        expect_mapping(duplicate, "on_duplicate_key")?;
        Some(UpsertClause::OnDuplicateKey(OnDuplicateKeyClause {
            update: mapping_field(duplicate, "update")?,
        }))
    } else if ["using", "match_on", "when_matched", "when_not_matched"]
        .iter()
        .any(|key| data.contains_key(key))
    {
        Some(UpsertClause::Merge(parse_merge(data, definitions)?))
    } else {
        None
    };

    Ok(UpsertQuery {
        table,
        alias,
        columns: list_field(data, "columns")?,
        values,
        from_query: source_query(data, "from_query", definitions)?,
        clause,
        returning: list_field(data, "returning")?,
    })
}

fn expect_mapping(data: &Value, key: &str) -> ParseResult<()> {
    match data {
        Value::Mapping(_) => Ok(()),
        other => Err(ParseError::syntax(format!(
            "'{}' must be a mapping, got {}",
            key,
            other.kind()
        ))),
    }
}

fn parse_on_conflict(data: &Value) -> ParseResult<OnConflictClause> {
    expect_mapping(data, "on_conflict")?;

    let target = match data.get_present("target").or_else(|| data.get_present("columns")) {
        None => Vec::new(),
        Some(v) => string_list(v)?,
    };
    let action = match string_field(data, "action") {
        None => ConflictAction::Update,
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "update" | "do update" => ConflictAction::Update,
            "nothing" | "ignore" | "do nothing" => ConflictAction::Nothing,
            _ => {
                return Err(ParseError::logic(format!(
                    "Invalid ON CONFLICT action '{}'. Valid actions are: update, nothing",
                    raw
                )));
            }
        },
    };

    Ok(OnConflictClause {
        target,
        unique_constraint: string_field(data, "unique_constraint"),
        action,
        update: mapping_field(data, "update")?,
        where_clause: string_field(data, "where"),
    })
}

fn parse_merge(data: &Value, definitions: &Definitions) -> ParseResult<MergeClause> {
    let when_matched = match data.get_present("when_matched") {
        None => None,
        Some(matched) => {
            expect_mapping(matched, "when_matched")?;
            Some(WhenMatchedClause {
                update: mapping_field(matched, "update")?,
                where_clause: string_field(matched, "where"),
                delete: matched.get("delete").and_then(Value::as_bool).unwrap_or(false),
            })
        }
    };
    let when_not_matched = match data.get_present("when_not_matched") {
        None => None,
        Some(not_matched) => {
            expect_mapping(not_matched, "when_not_matched")?;
            Some(WhenNotMatchedClause {
                insert: mapping_field(not_matched, "insert")?,
            })
        }
    };

    Ok(MergeClause {
        using: source_query(data, "using", definitions)?,
        match_on: list_field(data, "match_on")?,
        when_matched,
        when_not_matched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn yaml(text: &str) -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>(text).unwrap())
    }

    #[test]
    fn test_insert_multi_row() {
        let q = parse_insert(
            &yaml("table: customers\nvalues:\n  - {name: \"'A'\", age: 30}\n  - {name: \"'B'\", age: 41}\nreturning: id"),
            &Definitions::new(),
        )
        .unwrap();
        assert_eq!(q.table, "customers");
        assert_eq!(q.values.len(), 2);
        assert_eq!(q.returning, vec!["id"]);
        assert!(q.columns.is_empty());
    }

    #[test]
    fn test_insert_requires_table() {
        let err = parse_insert(&yaml("values: {a: 1}"), &Definitions::new()).unwrap_err();
        assert_eq!(err.category, ErrorCategory::LogicError);
        assert_eq!(err.message, "INSERT must have 'table'");
    }

    #[test]
    fn test_update_with_alias_and_joins() {
        let q = parse_update(&yaml(
            "table: {c: customers}\nset: {status: \"'vip'\"}\njoins:\n  - {type: INNER, alias: o, table: orders, on: c.id = o.customer_id}\nwhere: [o.amount > 1000]",
        ))
        .unwrap();
        assert_eq!(q.alias.as_deref(), Some("c"));
        assert_eq!(q.table, "customers");
        assert_eq!(q.set_values.get("status"), Some(&Value::from("'vip'")));
        assert_eq!(q.joins.len(), 1);
        assert_eq!(q.where_clause, vec!["o.amount > 1000"]);
    }

    #[test]
    fn test_delete_bare_table() {
        let q = parse_delete(&yaml("operation: delete\ntable: sessions\nwhere: expired = TRUE")).unwrap();
        assert_eq!(q.alias, None);
        assert_eq!(q.where_clause, vec!["expired = TRUE"]);
    }

    #[test]
    fn test_upsert_on_conflict() {
        let q = parse_upsert(
            &yaml("table: users\nvalues: {email: \"'a@b.c'\", name: \"'A'\"}\non_conflict:\n  columns: [email]\n  update: {name: EXCLUDED.name}"),
            &Definitions::new(),
        )
        .unwrap();
        match q.clause {
            Some(UpsertClause::OnConflict(c)) => {
                assert_eq!(c.target, vec!["email"]);
                assert_eq!(c.action, ConflictAction::Update);
                assert_eq!(c.update.len(), 1);
            }
            other => panic!("unexpected clause: {:?}", other),
        }
    }

    #[test]
    fn test_upsert_action_nothing() {
        let q = parse_upsert(
            &yaml("table: users\nvalues: {id: 1}\non_conflict: {target: id, action: ignore}"),
            &Definitions::new(),
        )
        .unwrap();
        assert!(matches!(
            q.clause,
            Some(UpsertClause::OnConflict(OnConflictClause { action: ConflictAction::Nothing, .. }))
        ));
    }

    #[test]
    fn test_upsert_merge_with_colon_table() {
        let q = parse_upsert(
            &yaml(
                "table: 'target: customers'\nusing:\n  select: [{id: s.id}]\n  from: {s: staging}\nmatch_on: [id]\nwhen_matched: {update: {name: source.name}}\nwhen_not_matched: {insert: {id: source.id}}",
            ),
            &Definitions::new(),
        )
        .unwrap();
        assert_eq!(q.alias.as_deref(), Some("target"));
        assert_eq!(q.table, "customers");
        match q.clause {
            Some(UpsertClause::Merge(m)) => {
                assert!(m.using.is_some());
                assert_eq!(m.match_on, vec!["id"]);
                assert!(!m.when_matched.unwrap().delete);
                assert_eq!(m.when_not_matched.unwrap().insert.len(), 1);
            }
            other => panic!("unexpected clause: {:?}", other),
        }
    }

    #[test]
    fn test_upsert_invalid_action() {
        let err = parse_upsert(
            &yaml("table: users\non_conflict: {target: id, action: merge}"),
            &Definitions::new(),
        )
        .unwrap_err();
        assert_eq!(err.category, ErrorCategory::LogicError);
    }
}
