//! Type conversion functions for CLI to internal types.
//!
//! Maps CLI-facing enums and flags (from the `cli` module) onto the internal
//! types used by resolution and output, layering them over the loaded
//! configuration.

use super::types::RunParams;
use crate::{
    cli::{CommonArgs, Dialect, Format},
    config::Config,
    output::{OutputFormat, OutputOptions},
    preprocessor::SqlSource,
    query::SqlDialect
};

/// Converts a CLI dialect enum to the internal SQL dialect type.
///
/// # Example
///
/// ```
/// use crud_lineage::{app::convert_dialect, cli::Dialect, query::SqlDialect};
///
/// let dialect = convert_dialect(Dialect::Mysql);
/// assert!(matches!(dialect, SqlDialect::MySQL));
/// ```
pub fn convert_dialect(dialect: Dialect) -> SqlDialect {
    match dialect {
        Dialect::Generic => SqlDialect::Generic,
        Dialect::Mysql => SqlDialect::MySQL,
        Dialect::Postgresql => SqlDialect::PostgreSQL,
        Dialect::Sqlite => SqlDialect::SQLite,
        Dialect::Mssql => SqlDialect::MsSql
    }
}

/// Converts a CLI format enum to the internal output format type.
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Merge CLI flags over the loaded configuration.
///
/// Flags win when given; everything else comes from `config`, which already
/// holds file and environment values.
pub fn build_params(args: &CommonArgs, config: &Config, progress: bool) -> RunParams {
    let mut resolver = config.resolver.resolver_config();
    if let Some(depth) = args.max_depth {
        resolver.max_depth = depth;
    }
    RunParams {
        schema_paths: args.schema.clone(),
        statement_paths: args.statements.clone(),
        dialect: args
            .dialect
            .map(convert_dialect)
            .unwrap_or(config.resolver.dialect),
        source: if args.plain_sql {
            SqlSource::Plain
        } else {
            config.resolver.source
        },
        resolver,
        workers: args.workers.filter(|w| *w > 0).or(config.runtime.workers),
        output: OutputOptions {
            format:  convert_format(args.output_format),
            colored: !args.no_color,
            verbose: args.verbose
        },
        progress
    }
}
