use pretty_assertions::assert_eq;
use yql::error::GenerateError;
use yql::{Dialect, Operation, generate_sql, parse_str};

fn generate(yaml: &str, dialect: Dialect) -> Result<String, GenerateError> {
    let query = parse_str(yaml, None).expect("Failed to parse DML");
    generate_sql(&query, dialect)
}

#[test]
fn test_multi_row_insert() {
    let yaml = "table: customers\nvalues:\n  - {name: \"'Ada'\", age: 36}\n  - {name: \"'Linus'\", vip: true}";
    let expected = "INSERT INTO customers\n(name, age)\nVALUES ('Ada', 36), ('Linus', NULL)";
    for dialect in Dialect::ALL {
        assert_eq!(generate(yaml, dialect).unwrap(), expected);
    }
}

#[test]
fn test_insert_from_select() {
    let yaml = "operation: insert\ntable: archive\ncolumns: [id, name]\nfrom_query:\n  select: [id, name]\n  from: customers\n  where: deleted = TRUE";
    let query = parse_str(yaml, None).unwrap();
    assert_eq!(query.operation(), Operation::Insert);
    assert_eq!(
        generate_sql(&query, Dialect::PostgreSql).unwrap(),
        "INSERT INTO archive\n(id, name)\nSELECT\n  id,\n  name\nFROM customers\nWHERE deleted = TRUE"
    );
}

#[test]
fn test_insert_returning() {
    let yaml = "table: users\nvalues: {email: '#{email}'}\nreturning: [id, created_at]";
    assert_eq!(
        generate(yaml, Dialect::PostgreSql).unwrap(),
        "INSERT INTO users\n(email)\nVALUES (#{email})\nRETURNING id, created_at"
    );
    assert!(generate(yaml, Dialect::Oracle).unwrap_err().is_unsupported());
}

#[test]
fn test_update() {
    let yaml = "table: accounts\nset:\n  balance: balance - 100\n  updated_at: NOW()\nwhere:\n  - \"id = #{id}\"\n  - balance >= 100";
    let expected = "UPDATE accounts\nSET balance = balance - 100, updated_at = NOW()\nWHERE id = #{id}\n  AND balance >= 100";
    for dialect in Dialect::ALL {
        assert_eq!(generate(yaml, dialect).unwrap(), expected);
    }
}

#[test]
fn test_update_with_join_only_on_mysql() {
    let yaml = "table: {c: customers}\nset: {c.tier: \"'gold'\"}\njoins:\n  - {type: INNER, alias: o, table: orders, on: c.id = o.customer_id}";
    assert!(generate(yaml, Dialect::MySql).unwrap().starts_with("UPDATE customers c\nINNER JOIN orders o"));

    let err = generate(yaml, Dialect::PostgreSql).unwrap_err();
    assert_eq!(err, GenerateError::unsupported(Dialect::PostgreSql, "JOIN in UPDATE"));
}

#[test]
fn test_delete() {
    let yaml = "operation: delete\ntable: sessions\nwhere: expires_at < NOW()";
    for dialect in Dialect::ALL {
        assert_eq!(
            generate(yaml, dialect).unwrap(),
            "DELETE FROM sessions\nWHERE expires_at < NOW()"
        );
    }
}

#[test]
fn test_upsert_clause_must_match_dialect() {
    let on_conflict = "table: users\nvalues: {id: 1, name: \"'A'\"}\non_conflict:\n  target: [id]\n  update: {name: EXCLUDED.name}";
    assert_eq!(
        generate(on_conflict, Dialect::PostgreSql).unwrap(),
        "INSERT INTO users\n(id, name)\nVALUES (1, 'A')\nON CONFLICT (id)\nDO UPDATE SET name = EXCLUDED.name"
    );
    assert_eq!(
        generate(on_conflict, Dialect::MySql).unwrap_err(),
        GenerateError::MissingClause {
            dialect: Dialect::MySql,
            clause: "on_duplicate_key",
        }
    );
    assert!(matches!(
        generate(on_conflict, Dialect::SqlServer).unwrap_err(),
        GenerateError::MissingClause { .. }
    ));
    assert!(matches!(
        generate(on_conflict, Dialect::Oracle).unwrap_err(),
        GenerateError::MissingClause { .. }
    ));
}

#[test]
fn test_merge_on_both_merge_dialects() {
    let yaml = "table: inventory\nusing:\n  select: [sku, qty]\n  from: incoming\nmatch_on: [sku]\nwhen_matched:\n  update: {qty: target.qty + source.qty}\nwhen_not_matched:\n  insert: {sku: source.sku, qty: source.qty}";

    let mssql = generate(yaml, Dialect::SqlServer).unwrap();
    assert!(mssql.contains("\nON target.sku = source.sku\n"));
    assert!(mssql.ends_with(";"));

    let oracle = generate(yaml, Dialect::Oracle).unwrap();
    assert!(oracle.contains("\nON (target.sku = source.sku)\n"));
    assert!(!oracle.contains("DUAL"));

    assert!(generate(yaml, Dialect::PostgreSql).is_err());
}

#[test]
fn test_insert_without_values_is_empty() {
    let err = generate("operation: insert\ntable: users", Dialect::PostgreSql).unwrap_err();
    assert_eq!(err, GenerateError::EmptyQuery("INSERT"));
}
