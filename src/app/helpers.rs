//! Helper functions for CLI operations.
//!
//! File loading at the I/O boundary: a file that cannot be read or decoded
//! becomes a `MalformedInput` diagnostic and the run goes on without it.

use std::{
    fs::read_to_string,
    io::{self, Read},
    path::Path
};

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{mapper_xml::parse_mapper_xml, types::MapperDocument};
use crate::{
    catalog::SchemaCatalog,
    diagnostics::{AmbiguityReporter, Diagnostic, DiagnosticKind, Severity},
    error::{AppError, AppResult, file_read_error, malformed_input_error},
    query::SqlDialect
};

/// Calculates the process exit code from the highest diagnostic severity:
/// - `0` - No diagnostics or only informational ones
/// - `1` - At least one warning present
/// - `2` - At least one error present
///
/// # Example
///
/// ```
/// use crud_lineage::{app::calculate_exit_code, diagnostics::AmbiguityReporter};
///
/// assert_eq!(calculate_exit_code(&AmbiguityReporter::new()), 0);
/// ```
pub fn calculate_exit_code(reporter: &AmbiguityReporter) -> i32 {
    match reporter.max_severity() {
        Some(Severity::Error) => 2,
        Some(Severity::Warning) => 1,
        _ => 0
    }
}

/// Reads a file, or standard input when the path is "-".
///
/// # Errors
///
/// Returns an error if the file cannot be read or stdin fails.
pub fn read_input(path: &Path) -> AppResult<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| file_read_error("stdin", e))?;
        Ok(buffer)
    } else {
        read_to_string(path).map_err(|e| file_read_error(&path.display().to_string(), e))
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Decode a JSON or YAML document, chosen by file extension (JSON when
/// unknown).
///
/// # Errors
///
/// Returns a malformed-input error if the text does not decode into `T`
pub fn decode_document<T: DeserializeOwned>(path: &Path, text: &str) -> AppResult<T> {
    let name = path.display().to_string();
    if is_yaml(path) {
        serde_yaml::from_str(text).map_err(|e| malformed_input_error(&name, e.to_string()))
    } else {
        serde_json::from_str(text).map_err(|e| malformed_input_error(&name, e.to_string()))
    }
}

/// `MalformedInput` diagnostic for a file-fatal error
pub fn malformed_input(path: &Path, error: &AppError) -> Diagnostic {
    let file = path.display().to_string();
    warn!(file = %file, error = %error, "skipping input file");
    Diagnostic::new(DiagnosticKind::MalformedInput, error.to_string()).with_file(file)
}

/// Read and decode one document
///
/// # Errors
///
/// Returns a `MalformedInput` diagnostic when the file is unreadable or
/// undecodable
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, Diagnostic> {
    read_input(path)
        .and_then(|text| decode_document(path, &text))
        .map_err(|e| malformed_input(path, &e))
}

/// Read one statement file: MyBatis mapper XML by extension, otherwise a
/// JSON or YAML [`MapperDocument`]
///
/// # Errors
///
/// Returns a `MalformedInput` diagnostic when the file is unreadable or
/// undecodable
pub fn load_mapper(path: &Path) -> Result<MapperDocument, Diagnostic> {
    if !is_xml(path) {
        return load_document(path);
    }
    read_input(path)
        .and_then(|text| parse_mapper_xml(&path.display().to_string(), &text))
        .map_err(|e| malformed_input(path, &e))
}

/// Load record arrays from many files in parallel, keeping file order
pub fn load_records<T, P>(paths: &[P]) -> (Vec<T>, AmbiguityReporter)
where
    T: DeserializeOwned + Send,
    P: AsRef<Path> + Sync
{
    let loaded: Vec<Result<Vec<T>, Diagnostic>> = paths
        .par_iter()
        .map(|p| load_document::<Vec<T>>(p.as_ref()))
        .collect();
    let mut records = Vec::new();
    let mut diagnostics = AmbiguityReporter::new();
    for result in loaded {
        match result {
            Ok(batch) => records.extend(batch),
            Err(diag) => diagnostics.push(diag)
        }
    }
    debug!(files = paths.len(), records = records.len(), "loaded records");
    (records, diagnostics)
}

/// Load and merge schema catalogs in order: JSON by extension, DDL
/// otherwise. Unreadable files are skipped with a diagnostic; without paths
/// the catalog is empty.
pub fn load_catalog<P: AsRef<Path>>(
    paths: &[P],
    dialect: SqlDialect
) -> (SchemaCatalog, Vec<Diagnostic>) {
    let mut catalog = SchemaCatalog::default();
    let mut diagnostics = Vec::new();
    for path in paths.iter().map(AsRef::as_ref) {
        let loaded = read_input(path).and_then(|text| {
            if is_json(path) {
                SchemaCatalog::from_json(&text)
            } else {
                SchemaCatalog::from_ddl(&text, dialect)
            }
        });
        match loaded {
            Ok(part) => catalog = catalog.merge(part),
            Err(e) => diagnostics.push(malformed_input(path, &e))
        }
    }
    debug!(files = paths.len(), tables = catalog.len(), "loaded schema catalog");
    (catalog, diagnostics)
}
