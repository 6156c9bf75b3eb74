//! Error types for YQL.
//!
//! Parsing failures carry a category and structured details so a caller can
//! render a diagnostic (file, import chain, circular path) without re-deriving
//! anything. Generation and security failures have their own enums.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::generator::Dialect;

/// The main error type for YQL operations.
#[derive(Debug, Error)]
pub enum YqlError {
    /// The input document could not be turned into a query.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The query could not be rendered for the requested dialect.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// The generated SQL violates the table access policy.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl YqlError {
    /// Category label used by the CLI when reporting the error.
    pub fn category(&self) -> &'static str {
        match self {
            YqlError::Parse(e) => e.category.as_str(),
            YqlError::Generate(_) => "generate_error",
            YqlError::Security(_) => ErrorCategory::SecurityError.as_str(),
            YqlError::Config(_) => "config_error",
            YqlError::Io(_) => "io_error",
        }
    }
}

/// Result type alias for YQL operations.
pub type YqlResult<T> = Result<T, YqlError>;

/// Broad classification of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input document.
    SyntaxError,
    /// Denied or unauthorized table use.
    SecurityError,
    /// Missing field, bad enum value, import limits, cycles, duplicate names.
    LogicError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::SyntaxError => "syntax_error",
            ErrorCategory::SecurityError => "security_error",
            ErrorCategory::LogicError => "logic_error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context attached to a [`ParseError`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub import_chain: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circular_path: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_imports: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_name: Option<String>,
}

impl ErrorDetails {
    pub fn is_empty(&self) -> bool {
        *self == ErrorDetails::default()
    }
}

/// Failure to turn an input tree into a [`crate::ast::Query`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub category: ErrorCategory,
    pub details: ErrorDetails,
}

impl ParseError {
    /// Malformed input document.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: ErrorCategory::SyntaxError,
            details: ErrorDetails::default(),
        }
    }

    /// Structurally valid document with invalid content.
    pub fn logic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: ErrorCategory::LogicError,
            details: ErrorDetails::default(),
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }
}

/// Result type alias for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Failure to render a query for a dialect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    /// The operation tag has no payload, or the payload has nothing to render.
    #[error("{0} query is empty")]
    EmptyQuery(&'static str),

    /// The dialect needs a sub-clause the query does not carry.
    #[error("{dialect} UPSERT requires {clause}")]
    MissingClause { dialect: Dialect, clause: &'static str },

    /// A sub-clause is present but incomplete.
    #[error("{dialect}: {message}")]
    InvalidClause { dialect: Dialect, message: String },

    /// The dialect has no rendering for this feature.
    #[error("{dialect} does not support {feature}")]
    Unsupported { dialect: Dialect, feature: String },

    /// Row windowing needs a deterministic order.
    #[error("{dialect} {context} requires ORDER BY clause")]
    OrderByRequired { dialect: Dialect, context: &'static str },
}

impl GenerateError {
    pub fn unsupported(dialect: Dialect, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect,
            feature: feature.into(),
        }
    }

    /// True for the "dialect cannot express this" family.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            GenerateError::Unsupported { .. } | GenerateError::OrderByRequired { .. }
        )
    }
}

/// Result type alias for SQL generation.
pub type GenerateResult<T> = Result<T, GenerateError>;

/// Table access policy violation found in generated SQL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SecurityError {
    #[error("Forbidden tables used: {}", .tables.join(", "))]
    DeniedTables {
        tables: Vec<String>,
        all_tables: Vec<String>,
    },

    #[error("Unauthorized tables used: {}", .tables.join(", "))]
    UnauthorizedTables {
        tables: Vec<String>,
        allowed_tables: Vec<String>,
        all_tables: Vec<String>,
    },
}

impl SecurityError {
    /// The offending tables: denied ones or those outside the allow-list.
    pub fn tables(&self) -> &[String] {
        match self {
            SecurityError::DeniedTables { tables, .. } => tables,
            SecurityError::UnauthorizedTables { tables, .. } => tables,
        }
    }
}
