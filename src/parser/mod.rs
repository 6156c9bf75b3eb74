//! YQL parser: decoded document → [`Query`].
//!
//! # Document shapes
//!
//! ```yaml
//! imports: [customer_summary]        # resolved before anything else
//! query:                             # or the SELECT keys at the top level
//!   with_clauses:
//!     summary: {using: customer_summary, parameters: {status: active}}
//!   select: [{id: c.id}, c.name]
//!   from: {c: customers}
//!   limit: 10
//! ```
//!
//! DML documents are recognised by `operation:` or by their distinguishing keys
//! (`values`, `set`, `on_conflict`, ...); see [`Parser::parse`].

pub mod clauses;
pub mod dml;
pub mod imports;

use std::fs;
use std::path::Path;

use tracing::debug;

pub use imports::{Definitions, ImportResolver, ImportScope};

use crate::ast::*;
use crate::config::ImportOptions;
use crate::error::{ErrorDetails, ParseError, ParseResult};
use crate::placeholder::substitute_value;
use crate::value::{Mapping, Value};
use clauses::*;

/// Parser carrying import limits and search paths.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ImportOptions,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ImportOptions) -> Self {
        Self { options }
    }

    /// Parse a decoded document. Relative imports resolve against `base_dir`,
    /// or the current directory when none is given.
    ///
    /// The operation is chosen by the first matching rule:
    /// 1. `operation: upsert`, `on_conflict`, `on_duplicate_key`, or `using` with `match_on`
    /// 2. `operation: insert` or `values`
    /// 3. `operation: update`, or `set` without `select`
    /// 4. `operation: delete`
    /// 5. SELECT, from `query`, `select` or `with_clauses`
    pub fn parse(&self, data: &Value, base_dir: Option<&Path>) -> ParseResult<Query> {
        let base_dir = base_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
        self.parse_in_scope(data, &ImportScope::root(base_dir))
    }

    /// Decode YAML text and parse it.
    pub fn parse_str(&self, text: &str, base_dir: Option<&Path>) -> ParseResult<Query> {
        let data = decode_document(text)?;
        self.parse(&data, base_dir)
    }

    /// Read, decode and parse a file; imports resolve relative to its directory.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> ParseResult<Query> {
        let path = path.as_ref();
        let details = || ErrorDetails {
            file: Some(path.to_path_buf()),
            ..Default::default()
        };

        let text = fs::read_to_string(path).map_err(|e| {
            ParseError::logic(format!("Error reading file {}: {}", path.display(), e))
                .with_details(details())
        })?;
        let data = decode_document(&text).map_err(|mut e| {
            e.details.file.get_or_insert_with(|| path.to_path_buf());
            e
        })?;

        debug!(file = %path.display(), "parsing file");
        self.parse_in_scope(&data, &ImportScope::for_file(path))
    }

    fn parse_in_scope(&self, data: &Value, scope: &ImportScope) -> ParseResult<Query> {
        if data.as_mapping().is_none() {
            return Err(ParseError::syntax(format!(
                "YQL document must be a mapping, got {}",
                data.kind()
            )));
        }

        let imports = imports::import_names(data)?;
        let definitions = if imports.is_empty() {
            Definitions::new()
        } else {
            debug!(count = imports.len(), base = %scope.base_dir.display(), "resolving imports");
            ImportResolver::new(&self.options).resolve(&imports, scope)?
        };

        let operation = data
            .get("operation")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let statement = if operation == "upsert"
            || data.contains_key("on_conflict")
            || data.contains_key("on_duplicate_key")
            || (data.contains_key("using") && data.contains_key("match_on"))
        {
            Statement::Upsert(dml::parse_upsert(data, &definitions)?)
        } else if operation == "insert" || data.contains_key("values") {
            Statement::Insert(dml::parse_insert(data, &definitions)?)
        } else if operation == "update"
            || (data.contains_key("set") && !data.contains_key("select"))
        {
            Statement::Update(dml::parse_update(data)?)
        } else if operation == "delete" {
            Statement::Delete(dml::parse_delete(data)?)
        } else {
            let query_data = if let Some(query) = data.get("query") {
                query
            } else if data.contains_key("select") || data.contains_key("with_clauses") {
                data
            } else {
                return Err(ParseError::logic(
                    "YQL must have 'query', 'select', or DML operation",
                ));
            };
            Statement::Select(parse_select_query(query_data, &definitions)?)
        };

        debug!(operation = %statement.operation(), "parsed document");
        Ok(Query::new(statement, data.clone()))
    }
}

/// Parse YAML text with default import options.
pub fn parse_str(text: &str, base_dir: Option<&Path>) -> ParseResult<Query> {
    Parser::new().parse_str(text, base_dir)
}

/// Parse a YQL file with default import options.
pub fn parse_file(path: impl AsRef<Path>) -> ParseResult<Query> {
    Parser::new().parse_file(path)
}

/// Parse an already decoded tree with default import options.
pub fn parse_value(data: &Value, base_dir: Option<&Path>) -> ParseResult<Query> {
    Parser::new().parse(data, base_dir)
}

fn decode_document(text: &str) -> ParseResult<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| ParseError::syntax(format!("Invalid YAML: {}", e)))?;
    Ok(Value::from(yaml))
}

/// Parse the SELECT keys of `data`.
pub(crate) fn parse_select_query(
    data: &Value,
    definitions: &Definitions,
) -> ParseResult<SelectQuery> {
    if data.as_mapping().is_none() {
        return Err(ParseError::syntax(format!(
            "SELECT query must be a mapping, got {}",
            data.kind()
        )));
    }

    let with_clauses = match data.get_present("with_clauses") {
        None => Vec::new(),
        Some(v) => parse_with_clauses(v, definitions)?,
    };
    let columns = match data.get("select") {
        None => Vec::new(),
        Some(v) => parse_select_clause(v)?,
    };
    let from = data.get_present("from").map(parse_from_clause).transpose()?;
    let joins = match data.get("joins") {
        None => Vec::new(),
        Some(v) => parse_joins(v)?,
    };
    let order_by = match data.get("order_by") {
        None => Vec::new(),
        Some(v) => parse_order_by(v)?,
    };
    let conditions = |key: &str| data.get(key).map(parse_conditions).unwrap_or_default();

    Ok(SelectQuery {
        columns,
        from,
        joins,
        where_clause: conditions("where"),
        group_by: conditions("group_by"),
        having: conditions("having"),
        order_by,
        limit: data.get("limit").and_then(parse_limit_value),
        offset: data.get("offset").and_then(parse_limit_value),
        with_clauses,
        pagination: data.get_present("pagination").map(parse_pagination),
    })
}

fn parse_with_clauses(data: &Value, definitions: &Definitions) -> ParseResult<Vec<WithClause>> {
    let map = data.as_mapping().ok_or_else(|| {
        ParseError::syntax(format!("with_clauses must be a mapping, got {}", data.kind()))
    })?;

    let mut with_clauses = Vec::with_capacity(map.len());
    for (name, definition) in map {
        if definition.as_mapping().is_none() {
            return Err(ParseError::syntax(format!(
                "Invalid WITH clause definition: {}",
                definition
            )));
        }

        let query = match definition.get_present("using") {
            Some(import_name) => {
                let select_def = imported_select(&import_name.to_string(), definition, definitions)?;
                parse_select_query(&select_def, definitions)?
            }
            None => parse_select_query(definition, definitions)?,
        };
        with_clauses.push(WithClause {
            name: name.clone(),
            query,
        });
    }

    Ok(with_clauses)
}

/// The `select_definition` of an import with parameters applied.
fn imported_select(
    import_name: &str,
    reference: &Value,
    definitions: &Definitions,
) -> ParseResult<Value> {
    let imported = definitions.get(import_name).ok_or_else(|| {
        let available: Vec<&str> = definitions.keys().map(String::as_str).collect();
        ParseError::logic(format!(
            "Imported definition '{}' not found. Available: [{}]",
            import_name,
            available.join(", ")
        ))
    })?;
    let select_def = imported.get("select_definition").ok_or_else(|| {
        ParseError::logic(format!(
            "Imported definition '{}' does not contain 'select_definition'",
            import_name
        ))
    })?;

    let mut params = declared_defaults(imported);
    params.extend(mapping_field(reference, "parameters")?);

    if params.is_empty() {
        Ok(select_def.clone())
    } else {
        Ok(substitute_value(select_def, &params))
    }
}

/// Defaults an imported file declares under `parameters`.
///
/// Either `{name: default}` or a list of `{name, default}` entries. A
/// mapping declaration is unwrapped to its `default`; one without a default
/// contributes nothing.
fn declared_defaults(imported: &Value) -> Mapping {
    let default_of = |v: &Value| match v {
        Value::Mapping(_) => v.get_present("default").cloned(),
        other => Some(other.clone()),
    };

    match imported.get("parameters") {
        Some(Value::Mapping(map)) => map
            .iter()
            .filter_map(|(name, v)| Some((name.clone(), default_of(v)?)))
            .collect(),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| {
                let name = item.get("name")?.to_string();
                let default = item.get_present("default")?.clone();
                Some((name, default))
            })
            .collect(),
        _ => Mapping::new(),
    }
}
