//! Core execution logic.
//!
//! Orchestrates the resolve and lineage pipelines: schema loading, statement
//! preprocessing, parsing and resolution on a bounded worker pool, then
//! lineage joining.

use std::{collections::BTreeMap, path::Path, time::Duration};

use compact_str::CompactString;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use tracing::{debug, info, warn};

use super::{
    helpers::{calculate_exit_code, load_catalog, load_mapper, load_records},
    types::{
        CommandOutput, LineageParams, LineageReport, MapperDocument, ResolveReport, ResolvedEntry,
        RunParams
    }
};
use crate::{
    catalog::SchemaCatalog,
    diagnostics::{AmbiguityReporter, Diagnostic, DiagnosticKind},
    error::{AppError, AppResult},
    lineage::{CrudKind, CrudLineageJoiner, DaoMethodRecord, LogicCallRecord},
    output::{format_lineage_report, format_resolve_report},
    preprocessor::Preprocessor,
    query::parse_statement,
    resolve::{ParsedStatement, Resolver, StatementId},
    usage::UsageSummary
};

/// Executes the resolve command.
///
/// # Errors
///
/// Returns an error if the worker pool cannot be built. Unreadable inputs
/// and unparsable statements are reported as diagnostics instead.
///
/// # Example
///
/// ```no_run
/// use crud_lineage::{app::{RunParams, run_resolve}, output::OutputOptions, query::SqlDialect};
///
/// let params = RunParams {
///     schema_paths:    vec!["schema.sql".into()],
///     statement_paths: vec!["mappers/user.json".into()],
///     dialect:         SqlDialect::PostgreSQL,
///     source:          Default::default(),
///     resolver:        Default::default(),
///     workers:         None,
///     output:          OutputOptions::default(),
///     progress:        false
/// };
/// let output = run_resolve(&params)?;
/// println!("Exit code: {}", output.exit_code);
/// # Ok::<(), crud_lineage::error::AppError>(())
/// ```
pub fn run_resolve(params: &RunParams) -> AppResult<CommandOutput> {
    let pool = build_pool(params.workers)?;
    let pb = spinner(params.progress, "Resolving statements...");
    let report = pool.install(|| resolve_report(params));
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    info!(
        statements = report.statements.len(),
        diagnostics = report.diagnostics.len(),
        "resolve finished"
    );
    Ok(CommandOutput {
        exit_code: calculate_exit_code(&report.diagnostics),
        stdout:    vec![format_resolve_report(&report, &params.output)]
    })
}

/// Executes the lineage command.
///
/// # Errors
///
/// Returns an error if the worker pool cannot be built.
pub fn run_lineage(params: &RunParams, lineage: &LineageParams) -> AppResult<CommandOutput> {
    let pool = build_pool(params.workers)?;
    let pb = spinner(params.progress, "Building lineage...");
    let report = pool.install(|| lineage_report(params, lineage));
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    info!(
        records = report.lineage.len(),
        diagnostics = report.diagnostics.len(),
        "lineage finished"
    );
    Ok(CommandOutput {
        exit_code: calculate_exit_code(&report.diagnostics),
        stdout:    vec![format_lineage_report(&report, &params.output)]
    })
}

/// Load, parse and resolve every statement file
pub fn resolve_report(params: &RunParams) -> ResolveReport {
    let mut diagnostics = AmbiguityReporter::new();
    let (catalog, schema_diag) = load_catalog(&params.schema_paths, params.dialect);
    diagnostics.extend(schema_diag);

    let (statements, statement_diags) = resolve_files(params, &catalog);
    diagnostics.merge(statement_diags);
    diagnostics.sort();

    let usage = UsageSummary::from_statements(statements.iter().map(|e| &e.statement));
    ResolveReport {
        statements,
        usage,
        diagnostics
    }
}

/// Resolve statements, then join them with DAO and logic records
pub fn lineage_report(params: &RunParams, lineage: &LineageParams) -> LineageReport {
    let ResolveReport {
        statements,
        mut diagnostics,
        ..
    } = resolve_report(params);

    let (daos, dao_diags): (Vec<DaoMethodRecord>, _) = load_records(&lineage.dao_paths);
    let (logic, logic_diags): (Vec<LogicCallRecord>, _) = load_records(&lineage.logic_paths);
    diagnostics.merge(dao_diags);
    diagnostics.merge(logic_diags);

    let mut parsed: BTreeMap<StatementId, ParsedStatement> = BTreeMap::new();
    let mut parameters: BTreeMap<StatementId, Vec<CompactString>> = BTreeMap::new();
    for entry in statements {
        if parsed.contains_key(&entry.id) {
            warn!(statement = %entry.id, file = %entry.file, "duplicate statement id, keeping the first");
            continue;
        }
        parameters.insert(entry.id.clone(), entry.parameters);
        parsed.insert(entry.id, entry.statement);
    }

    let output = CrudLineageJoiner::new(&daos, &parsed)
        .with_parameters(&parameters)
        .join(&logic);
    diagnostics.merge(output.diagnostics);
    diagnostics.sort();

    LineageReport {
        lineage: output.records,
        diagnostics
    }
}

/// One task per statement file; output sorted by statement id
fn resolve_files(params: &RunParams, catalog: &SchemaCatalog) -> (Vec<ResolvedEntry>, AmbiguityReporter) {
    let resolver = Resolver::new(catalog, params.resolver);
    let per_file: Vec<(Vec<ResolvedEntry>, AmbiguityReporter)> = params
        .statement_paths
        .par_iter()
        .map(|path| resolve_file(path, params, &resolver))
        .collect();

    let mut entries = Vec::new();
    let mut diagnostics = AmbiguityReporter::new();
    for (found, diags) in per_file {
        entries.extend(found);
        diagnostics.merge(diags);
    }
    entries.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.file.cmp(&b.file)));
    (entries, diagnostics)
}

fn resolve_file(
    path: &Path,
    params: &RunParams,
    resolver: &Resolver<'_>
) -> (Vec<ResolvedEntry>, AmbiguityReporter) {
    let mut diagnostics = AmbiguityReporter::new();
    let document: MapperDocument = match load_mapper(path) {
        Ok(doc) => doc,
        Err(diag) => {
            diagnostics.push(diag);
            return (Vec::new(), diagnostics);
        }
    };
    let file = path.display().to_string();
    let preprocessor = Preprocessor::new(params.source).for_dialect(params.dialect);

    let mut entries = Vec::with_capacity(document.statements.len());
    for raw in &document.statements {
        let id = StatementId::new(document.namespace.clone(), raw.id.clone());
        let processed = preprocessor.process(&raw.sql);
        match parse_statement(&processed.sql, params.dialect) {
            Ok(tree) => {
                let resolution = resolver.resolve(&tree, Some(&id));
                diagnostics.extend_from_file(&file, resolution.diagnostics);
                let parsed_kind = CrudKind::from(resolution.statement.dml);
                if raw.kind.is_some_and(|declared| declared != parsed_kind) {
                    debug!(statement = %id, declared = ?raw.kind, parsed = %parsed_kind, "mapper element disagrees with SQL");
                }
                entries.push(ResolvedEntry {
                    id,
                    file: file.clone(),
                    statement: resolution.statement,
                    parameters: processed.metadata.parameters,
                    declared: raw.kind
                });
            }
            Err(e) => {
                warn!(statement = %id, file = %file, error = %e, "skipping statement");
                diagnostics.push(parse_failure(&id, &file, &e));
            }
        }
    }
    (entries, diagnostics)
}

fn parse_failure(id: &StatementId, file: &str, error: &AppError) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::ParseFailure, error.to_string())
        .with_statement(id.to_string())
        .with_file(file)
}

fn build_pool(workers: Option<usize>) -> AppResult<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers.unwrap_or(0))
        .thread_name(|i| format!("crud-lineage-{}", i))
        .build()
        .map_err(|e| AppError::internal(format!("Failed to start worker pool: {}", e)))
}

fn spinner(enabled: bool, message: &'static str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}
