use std::collections::{BTreeMap, BTreeSet};

use colored::Colorize;
use compact_str::CompactString;
use serde::Serialize;

use crate::{
    app::{LineageReport, ResolveReport},
    diagnostics::{AmbiguityReporter, Diagnostic, Severity},
    usage::{UsageCount, UsageSummary}
};

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool,
    pub verbose: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true,
            verbose: false
        }
    }
}

/// Format the resolve report based on output options
pub fn format_resolve_report(report: &ResolveReport, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Yaml => to_yaml(report),
        OutputFormat::Text => format_text_resolve(report, opts)
    }
}

/// Format the lineage report based on output options
pub fn format_lineage_report(report: &LineageReport, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Yaml => to_yaml(report),
        OutputFormat::Text => format_text_lineage(report, opts)
    }
}

/// Format diagnostics alone, one per line, with a severity summary
pub fn format_diagnostics(diagnostics: &AmbiguityReporter, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => to_json(diagnostics),
        OutputFormat::Yaml => to_yaml(diagnostics),
        OutputFormat::Text => format_text_diagnostics(diagnostics, opts)
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn to_yaml<T: Serialize>(value: &T) -> String {
    serde_yaml::to_string(value).unwrap_or_default()
}

fn format_text_resolve(report: &ResolveReport, opts: &OutputOptions) -> String {
    let mut output = heading("=== Resolved Statements ===", opts);
    output.push_str("\n\n");

    for entry in &report.statements {
        let header = format!("{} ({})", entry.id, entry.statement.dml);
        output.push_str(&paint_header(&header, opts));
        if opts.verbose {
            output.push_str(&format!(" [{}]", entry.file));
        }
        output.push('\n');
        push_tables(&mut output, &entry.statement.tables, &entry.statement.columns);
        if opts.verbose && !entry.parameters.is_empty() {
            output.push_str(&format!("  Parameters: {}\n", join(&entry.parameters)));
        }
        output.push('\n');
    }

    if opts.verbose {
        output.push_str(&format_usage(&report.usage, opts));
    }
    output.push_str(&format_text_diagnostics(&report.diagnostics, opts));
    output
}

fn format_text_lineage(report: &LineageReport, opts: &OutputOptions) -> String {
    let mut output = heading("=== CRUD Lineage ===", opts);
    output.push_str("\n\n");

    for record in &report.lineage {
        let header = format!(
            "{}.{} -> {}.{} [{}] {}",
            record.logic_class,
            record.logic_method,
            record.dao_class,
            record.dao_method,
            record.crud.letter(),
            record.statement
        );
        output.push_str(&paint_header(&header, opts));
        output.push('\n');
        if opts.verbose {
            output.push_str(&format!("  Call: {}\n", record.invoked));
        }
        push_tables(&mut output, &record.tables, &record.columns);
        if !record.parameters.is_empty() {
            output.push_str(&format!("  Parameters: {}\n", join(&record.parameters)));
        }
        output.push('\n');
    }

    output.push_str(&format_text_diagnostics(&report.diagnostics, opts));
    output
}

fn push_tables(
    output: &mut String,
    tables: &BTreeSet<CompactString>,
    columns: &BTreeMap<CompactString, BTreeSet<CompactString>>
) {
    if tables.is_empty() {
        output.push_str("  Tables: (none)\n");
        return;
    }
    output.push_str(&format!("  Tables: {}\n", join(tables)));
    for (table, cols) in columns {
        output.push_str(&format!("    {}: {}\n", table, join(cols)));
    }
}

fn format_usage(usage: &UsageSummary, opts: &OutputOptions) -> String {
    let mut output = heading("Usage:", opts);
    output.push('\n');
    let kinds: Vec<String> = usage
        .by_kind
        .iter()
        .map(|(kind, count)| format!("{} {}", kind, count))
        .collect();
    output.push_str(&format!(
        "  {} statements ({})\n",
        usage.statements,
        kinds.join(", ")
    ));
    push_counts(&mut output, "Tables", &usage.tables);
    push_counts(&mut output, "Columns", &usage.columns);
    output.push('\n');
    output
}

fn push_counts(output: &mut String, label: &str, counts: &[UsageCount]) {
    if counts.is_empty() {
        return;
    }
    output.push_str(&format!("  {}:\n", label));
    for c in counts {
        output.push_str(&format!("    {:>4}  {}\n", c.count, c.name));
    }
}

fn format_text_diagnostics(diagnostics: &AmbiguityReporter, opts: &OutputOptions) -> String {
    let mut output = String::new();
    if !diagnostics.is_empty() {
        output.push_str(&heading("Diagnostics:", opts));
        output.push('\n');
        for d in diagnostics.iter() {
            output.push_str(&format_diagnostic(d, opts));
            output.push('\n');
        }
        output.push('\n');
    }

    let summary = format!(
        "Summary: {} error(s), {} warning(s), {} info",
        diagnostics.error_count(),
        diagnostics.warning_count(),
        diagnostics.info_count()
    );
    output.push_str(&summary);
    output.push('\n');
    output
}

fn format_diagnostic(d: &Diagnostic, opts: &OutputOptions) -> String {
    let label = format!("[{}]", d.severity);
    let label = if opts.colored {
        match d.severity {
            Severity::Error => label.red().bold().to_string(),
            Severity::Warning => label.yellow().bold().to_string(),
            Severity::Info => label.blue().to_string()
        }
    } else {
        label
    };

    let mut line = format!("{} {} {}", label, d.kind.code(), d.message);
    let location: Vec<&str> = [d.statement.as_deref(), d.file.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !location.is_empty() {
        line.push_str(&format!(" ({})", location.join(", ")));
    }
    line
}

fn heading(text: &str, opts: &OutputOptions) -> String {
    if opts.colored {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

fn paint_header(text: &str, opts: &OutputOptions) -> String {
    if opts.colored {
        text.cyan().bold().to_string()
    } else {
        text.to_string()
    }
}

fn join<'a>(items: impl IntoIterator<Item = &'a CompactString>) -> String {
    items
        .into_iter()
        .map(CompactString::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
