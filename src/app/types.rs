//! Application types for CLI commands.
//!
//! Command parameters after merging CLI flags over configuration, the input
//! document shapes read at the I/O boundary, and the reports handed to the
//! output formatters.

use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::AmbiguityReporter,
    lineage::{CrudKind, LineageRecord},
    output::OutputOptions,
    preprocessor::SqlSource,
    query::SqlDialect,
    resolve::{ParsedStatement, ResolverConfig, StatementId},
    usage::UsageSummary
};

/// Effective parameters shared by both commands.
///
/// # Example
///
/// ```
/// use crud_lineage::{
///     app::RunParams, output::OutputOptions, preprocessor::SqlSource, query::SqlDialect,
///     resolve::ResolverConfig
/// };
///
/// let params = RunParams {
///     schema_paths:    vec!["schema.sql".into()],
///     statement_paths: vec!["mappers/user.json".into()],
///     dialect:         SqlDialect::PostgreSQL,
///     source:          SqlSource::MyBatis,
///     resolver:        ResolverConfig::default(),
///     workers:         None,
///     output:          OutputOptions::default(),
///     progress:        false
/// };
/// assert_eq!(params.resolver.max_depth, 32);
/// ```
#[derive(Debug, Clone)]
pub struct RunParams {
    /// DDL or JSON schema files, merged in order
    pub schema_paths:    Vec<PathBuf>,
    /// Mapper statement documents
    pub statement_paths: Vec<PathBuf>,
    pub dialect:         SqlDialect,
    pub source:          SqlSource,
    pub resolver:        ResolverConfig,
    /// Worker threads; `None` uses one per core
    pub workers:         Option<usize>,
    pub output:          OutputOptions,
    /// Show a spinner on stderr while working
    pub progress:        bool
}

/// Extra inputs of the lineage command
#[derive(Debug, Clone, Default)]
pub struct LineageParams {
    pub dao_paths:   Vec<PathBuf>,
    pub logic_paths: Vec<PathBuf>
}

/// Statement document: `{namespace, statements: [{id, sql, kind?}]}`, or a
/// MyBatis mapper XML file.
///
/// In YAML documents, quote SQL holding `#{...}` parameters: an unquoted
/// ` #` starts a comment and silently truncates the statement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapperDocument {
    #[serde(default)]
    pub namespace:  CompactString,
    pub statements: Vec<MapperStatement>
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapperStatement {
    pub id:   CompactString,
    pub sql:  String,
    /// Operation named by the mapper element (`<select>` → Read)
    #[serde(default)]
    pub kind: Option<CrudKind>
}

/// One resolved statement with the file it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntry {
    pub id:         StatementId,
    pub file:       String,
    pub statement:  ParsedStatement,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<CompactString>,
    /// Kind declared by the mapper document, when it names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared:   Option<CrudKind>
}

/// Output of the resolve command
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveReport {
    pub statements:  Vec<ResolvedEntry>,
    pub usage:       UsageSummary,
    pub diagnostics: AmbiguityReporter
}

/// Output of the lineage command
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineageReport {
    pub lineage:     Vec<LineageRecord>,
    pub diagnostics: AmbiguityReporter
}

/// Output from CLI command execution.
///
/// Represents the final output ready for display, including the exit
/// code and all lines to be printed to stdout.
///
/// # Example
///
/// ```
/// use crud_lineage::app::CommandOutput;
///
/// let output = CommandOutput {
///     exit_code: 0,
///     stdout:    vec!["Lineage complete.".to_string()]
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code for the process (0=clean, 1=warnings, 2=errors).
    pub exit_code: i32,
    /// Lines to print to stdout.
    pub stdout:    Vec<String>
}
