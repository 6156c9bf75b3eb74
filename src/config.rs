//! Compiler configuration.
//!
//! ```toml
//! dialect = "mysql"
//! security_file = "security.yaml"   # or an inline [security] table
//!
//! [imports]
//! max_depth = 3
//! max_imports = 10
//! search_paths = ["shared/queries"]
//!
//! [security]
//! denied_tables = ["user_passwords"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{YqlError, YqlResult};
use crate::generator::Dialect;
use crate::security::SecurityConfig;

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_MAX_IMPORTS: usize = 10;
pub const DEFAULT_EXTENSION: &str = "yql";
pub const DIRECTORY_ENTRY: &str = "before.yql";

/// Limits and lookup rules for `imports:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Nesting levels below the importing file.
    pub max_depth: usize,
    /// Imports declared by a single file.
    pub max_imports: usize,
    /// Appended to import names that have no extension.
    pub extension: String,
    /// File that stands for a directory import.
    pub directory_entry: String,
    /// Tried in order after the importing file's directory.
    pub search_paths: Vec<PathBuf>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_imports: DEFAULT_MAX_IMPORTS,
            extension: DEFAULT_EXTENSION.to_string(),
            directory_entry: DIRECTORY_ENTRY.to_string(),
            search_paths: Vec::new(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dialect: Dialect,
    pub imports: ImportOptions,
    pub security: Option<SecurityConfig>,
    /// YAML security policy, relative to the config file.
    pub security_file: Option<PathBuf>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `<config dir>/yql/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("yql").join("config.toml"))
    }

    /// Parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> YqlResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            YqlError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&content)
            .map_err(|e| YqlError::Config(format!("{} ({})", e, path.display())))?;

        if let Some(parent) = path.parent() {
            config.security_file = config.security_file.take().map(|file| {
                if file.is_relative() {
                    parent.join(file)
                } else {
                    file
                }
            });
        }
        debug!(path = %path.display(), dialect = %config.dialect, "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load `path` if given, else the default location when it exists.
    pub fn load(path: Option<&Path>) -> YqlResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(default) if default.is_file() => Self::from_file(default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// The effective security policy: the inline table, else `security_file`.
    pub fn security_config(&self) -> YqlResult<Option<SecurityConfig>> {
        if let Some(security) = &self.security {
            return Ok(Some(security.clone()));
        }
        self.security_file
            .as_ref()
            .map(SecurityConfig::from_file)
            .transpose()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.imports.max_depth = depth;
        self
    }

    pub fn max_imports(mut self, count: usize) -> Self {
        self.config.imports.max_imports = count;
        self
    }

    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.imports.search_paths.push(path.into());
        self
    }

    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.config.security = Some(security);
        self
    }

    pub fn security_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.security_file = Some(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
