//! Cross-file import resolution.
//!
//! Imports are resolved depth-first before the importing document is parsed.
//! Each descent carries its own copy of the visited set, so two siblings that
//! import the same file do not collide while any ancestor revisit on a single
//! chain is reported as a cycle.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::config::ImportOptions;
use crate::error::{ErrorDetails, ParseError, ParseResult};
use crate::parser::clauses::string_list;
use crate::value::Value;

/// Imported documents by logical name.
pub type Definitions = IndexMap<String, Value>;

/// Position of one resolution step in the import graph.
#[derive(Debug, Clone, Default)]
pub struct ImportScope {
    /// File whose `imports` are being resolved, if any.
    pub file: Option<PathBuf>,
    /// Directory relative names resolve against.
    pub base_dir: PathBuf,
    pub depth: usize,
    /// Canonical paths on the current descent chain.
    pub visited: HashSet<PathBuf>,
    /// Same paths, in descent order, for reporting.
    pub chain: Vec<PathBuf>,
}

impl ImportScope {
    /// Scope for an in-memory document resolved against `base_dir`.
    pub fn root(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Scope for a document loaded from `file`; the file itself starts the chain.
    pub fn for_file(file: &Path) -> Self {
        let canonical = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        let base_dir = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            file: Some(file.to_path_buf()),
            base_dir,
            depth: 0,
            visited: HashSet::from([canonical.clone()]),
            chain: vec![canonical],
        }
    }

    fn details(&self) -> ErrorDetails {
        ErrorDetails {
            file: self.file.clone(),
            import_chain: self.chain.clone(),
            ..Default::default()
        }
    }
}

/// Parse the `imports:` field into a list of names.
pub fn import_names(data: &Value) -> ParseResult<Vec<String>> {
    match data.get("imports") {
        None => Ok(Vec::new()),
        Some(value) => string_list(value),
    }
}

/// Loads imported files with depth, count and cycle bounds.
#[derive(Debug, Clone)]
pub struct ImportResolver<'a> {
    options: &'a ImportOptions,
}

impl<'a> ImportResolver<'a> {
    pub fn new(options: &'a ImportOptions) -> Self {
        Self { options }
    }

    /// Resolve `imports` declared by the document at `scope`.
    pub fn resolve(&self, imports: &[String], scope: &ImportScope) -> ParseResult<Definitions> {
        if imports.len() > self.options.max_imports {
            return Err(ParseError::logic(format!(
                "Too many imports: {} (maximum: {})",
                imports.len(),
                self.options.max_imports
            ))
            .with_details(ErrorDetails {
                import_count: Some(imports.len()),
                max_imports: Some(self.options.max_imports),
                ..scope.details()
            }));
        }

        if scope.depth >= self.options.max_depth {
            return Err(ParseError::logic(format!(
                "Import depth exceeds maximum ({})",
                self.options.max_depth
            ))
            .with_details(ErrorDetails {
                depth: Some(scope.depth),
                max_depth: Some(self.options.max_depth),
                ..scope.details()
            }));
        }

        let mut definitions = Definitions::new();

        for import_path in imports {
            let full_path = self.locate(import_path, scope)?;
            let canonical = fs::canonicalize(&full_path).map_err(|e| {
                ParseError::logic(format!(
                    "Error loading import file {}: {}",
                    full_path.display(),
                    e
                ))
                .with_details(ErrorDetails {
                    import_path: Some(import_path.clone()),
                    ..scope.details()
                })
            })?;

            if scope.visited.contains(&canonical) {
                let mut cycle = scope.chain.clone();
                cycle.push(canonical);
                let rendered: Vec<String> = cycle.iter().map(|p| p.display().to_string()).collect();
                return Err(ParseError::logic(format!(
                    "Circular dependency detected: {}",
                    rendered.join(" -> ")
                ))
                .with_details(ErrorDetails {
                    import_path: Some(import_path.clone()),
                    circular_path: Some(cycle),
                    ..scope.details()
                }));
            }

            let mut visited = scope.visited.clone();
            visited.insert(canonical.clone());
            let mut chain = scope.chain.clone();
            chain.push(canonical);

            debug!(import = %import_path, path = %full_path.display(), depth = scope.depth, "loading import");
            let data = load_document(&full_path, &chain)?;
            let name = data
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| full_path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| import_path.clone());

            let nested = import_names(&data)?;
            if !nested.is_empty() {
                let child = ImportScope {
                    file: Some(full_path.clone()),
                    base_dir: full_path.parent().map(Path::to_path_buf).unwrap_or_default(),
                    depth: scope.depth + 1,
                    visited,
                    chain: chain.clone(),
                };
                for (nested_name, nested_def) in self.resolve(&nested, &child)? {
                    if definitions.contains_key(&nested_name) {
                        return Err(ParseError::logic(format!(
                            "Duplicate import name '{}' in import chain",
                            nested_name
                        ))
                        .with_details(ErrorDetails {
                            file: scope.file.clone(),
                            import_chain: chain,
                            duplicate_name: Some(nested_name),
                            ..Default::default()
                        }));
                    }
                    definitions.insert(nested_name, nested_def);
                }
            }

            trace!(name = %name, "registered import");
            definitions.insert(name, data);
        }

        Ok(definitions)
    }

    /// Map an import name to a file.
    ///
    /// A directory containing the entry file wins; otherwise the name is a file
    /// path, with the default extension appended when it has none.
    fn locate(&self, import_path: &str, scope: &ImportScope) -> ParseResult<PathBuf> {
        let requested = Path::new(import_path);
        let roots: Vec<&Path> = if requested.is_absolute() {
            vec![Path::new("")]
        } else {
            std::iter::once(scope.base_dir.as_path())
                .chain(self.options.search_paths.iter().map(PathBuf::as_path))
                .collect()
        };

        for root in &roots {
            let candidate = root.join(requested);
            let entry = candidate.join(&self.options.directory_entry);
            if candidate.is_dir() && entry.is_file() {
                return Ok(entry);
            }
            let file = if candidate.extension().is_none() {
                candidate.with_extension(&self.options.extension)
            } else {
                candidate
            };
            if file.is_file() {
                return Ok(file);
            }
        }

        let expected = roots
            .first()
            .map(|root| root.join(requested))
            .unwrap_or_else(|| requested.to_path_buf());
        Err(ParseError::logic(format!(
            "Import file not found: {}",
            expected.display()
        ))
        .with_details(ErrorDetails {
            import_path: Some(import_path.to_string()),
            ..scope.details()
        }))
    }
}

/// Read and decode an imported YAML document.
fn load_document(path: &Path, chain: &[PathBuf]) -> ParseResult<Value> {
    let details = || ErrorDetails {
        file: Some(path.to_path_buf()),
        import_chain: chain.to_vec(),
        ..Default::default()
    };

    let content = fs::read_to_string(path).map_err(|e| {
        ParseError::logic(format!("Error loading import file {}: {}", path.display(), e))
            .with_details(details())
    })?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| {
        ParseError::syntax(format!("Failed to parse import file {}: {}", path.display(), e))
            .with_details(details())
    })?;

    let data = Value::from(yaml);
    if data.as_mapping().is_none() {
        return Err(ParseError::syntax(format!(
            "Imported file must be a YAML mapping: {}",
            path.display()
        ))
        .with_details(details()));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_count_limit_checked_before_reading() {
        let dir = tempdir().unwrap();
        let options = ImportOptions::default();
        let resolver = ImportResolver::new(&options);
        // None of these files exist: the count check must fire first.
        let imports: Vec<String> = (0..11).map(|i| format!("missing_{}", i)).collect();

        let err = resolver.resolve(&imports, &ImportScope::root(dir.path())).unwrap_err();
        assert_eq!(err.category, ErrorCategory::LogicError);
        assert!(err.message.contains("Too many imports"));
        assert_eq!(err.details.import_count, Some(11));
    }

    #[test]
    fn test_directory_entry_resolution() {
        let dir = tempdir().unwrap();
        write(dir.path(), "customer_summary/before.yql", "name: summary\nselect_definition: {select: [id]}\n");
        let options = ImportOptions::default();
        let resolver = ImportResolver::new(&options);

        let defs = resolver
            .resolve(&["customer_summary".to_string()], &ImportScope::root(dir.path()))
            .unwrap();
        assert!(defs.contains_key("summary"));
    }

    #[test]
    fn test_extension_appended_and_stem_used_as_name() {
        let dir = tempdir().unwrap();
        write(dir.path(), "active_customers.yql", "select_definition: {select: [id]}\n");
        let options = ImportOptions::default();
        let resolver = ImportResolver::new(&options);

        let defs = resolver
            .resolve(&["active_customers".to_string()], &ImportScope::root(dir.path()))
            .unwrap();
        assert!(defs.contains_key("active_customers"));
    }

    #[test]
    fn test_missing_import() {
        let dir = tempdir().unwrap();
        let options = ImportOptions::default();
        let resolver = ImportResolver::new(&options);

        let err = resolver
            .resolve(&["nowhere".to_string()], &ImportScope::root(dir.path()))
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::LogicError);
        assert!(err.message.starts_with("Import file not found"));
        assert_eq!(err.details.import_path.as_deref(), Some("nowhere"));
    }

    #[test]
    fn test_siblings_importing_same_file_do_not_collide() {
        let dir = tempdir().unwrap();
        write(dir.path(), "shared.yql", "name: shared\n");
        write(dir.path(), "left.yql", "name: left\nimports: [shared]\n");
        write(dir.path(), "right.yql", "name: right\nimports: [shared2]\n");
        write(dir.path(), "shared2.yql", "name: shared2\n");
        write(dir.path(), "both.yql", "name: both\nimports: [shared, shared]\n");
        let options = ImportOptions::default();
        let resolver = ImportResolver::new(&options);

        let defs = resolver
            .resolve(&["both".to_string(), "right".to_string()], &ImportScope::root(dir.path()))
            .unwrap();
        assert!(defs.contains_key("shared"));
        assert!(defs.contains_key("shared2"));
        assert!(defs.contains_key("both"));
        assert!(defs.contains_key("right"));
    }

    #[test]
    fn test_duplicate_nested_name_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.yql", "name: a\nimports: [common]\n");
        write(dir.path(), "b.yql", "name: b\nimports: [common]\n");
        write(dir.path(), "common.yql", "name: common\n");
        let options = ImportOptions::default();
        let resolver = ImportResolver::new(&options);

        let err = resolver
            .resolve(&["a".to_string(), "b".to_string()], &ImportScope::root(dir.path()))
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::LogicError);
        assert_eq!(err.details.duplicate_name.as_deref(), Some("common"));
    }

    #[test]
    fn test_search_paths_fallback() {
        let base = tempdir().unwrap();
        let shared = tempdir().unwrap();
        write(shared.path(), "lib.yql", "name: lib\n");
        let options = ImportOptions {
            search_paths: vec![shared.path().to_path_buf()],
            ..Default::default()
        };
        let resolver = ImportResolver::new(&options);

        let defs = resolver
            .resolve(&["lib".to_string()], &ImportScope::root(base.path()))
            .unwrap();
        assert!(defs.contains_key("lib"));
    }
}
