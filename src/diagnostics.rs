//! Side-channel diagnostics reported next to the lineage stream.
//!
//! Nothing in resolution or joining aborts on a diagnostic: every problem is
//! recorded as a [`Diagnostic`] in an [`AmbiguityReporter`] and processing
//! continues.
//!
//! - [`Severity`] - Diagnostic severity levels (Info, Warning, Error)
//! - [`DiagnosticKind`] - What went wrong
//! - [`Diagnostic`] - One finding with enough context to act on it
//! - [`AmbiguityReporter`] - Accumulator shared by all stages

use compact_str::CompactString;
use serde::Serialize;

/// Severity level of a diagnostic.
///
/// Ordered from lowest to highest severity for sorting purposes.
/// Exit codes are determined by the highest severity found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    /// Informational, does not affect exit code
    Info,
    /// Lineage is incomplete or uncertain (exit code 1)
    Warning,
    /// Input was skipped entirely (exit code 2)
    Error
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR")
        }
    }
}

/// Kind of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Two table references in one scope share an alias; the last one wins
    DuplicateAlias,
    /// A logic-layer invocation matches no DAO method
    UnresolvedCall,
    /// A DAO method points at a SQL statement that was not resolved
    MissingSqlStatement,
    /// Nesting bound hit; the deeper branch was skipped
    ParseDepthExceeded,
    /// Unqualified column found in several in-scope tables
    AmbiguousColumn,
    /// Column matched no alias and no schema entry
    UnknownColumn,
    /// SQL text could not be parsed; the statement was skipped
    ParseFailure,
    /// An input file could not be read or decoded; the file was skipped
    MalformedInput
}

impl DiagnosticKind {
    /// Default severity of this kind
    pub fn severity(self) -> Severity {
        match self {
            Self::DuplicateAlias | Self::UnresolvedCall => Severity::Info,
            Self::MissingSqlStatement
            | Self::ParseDepthExceeded
            | Self::AmbiguousColumn
            | Self::UnknownColumn => Severity::Warning,
            Self::ParseFailure | Self::MalformedInput => Severity::Error
        }
    }

    /// Stable identifier shown in text output
    pub fn code(self) -> &'static str {
        match self {
            Self::DuplicateAlias => "LIN001",
            Self::UnresolvedCall => "LIN002",
            Self::MissingSqlStatement => "LIN003",
            Self::ParseDepthExceeded => "LIN004",
            Self::AmbiguousColumn => "LIN005",
            Self::UnknownColumn => "LIN006",
            Self::ParseFailure => "LIN007",
            Self::MalformedInput => "LIN008"
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A single diagnostic.
///
/// `statement`, `file` and `subject` give the context needed to find the
/// offending input: the SQL statement id, the source file, and the column,
/// alias or call name involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind:      DiagnosticKind,
    pub severity:  Severity,
    pub message:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<CompactString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file:      Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject:   Option<CompactString>
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            statement: None,
            file: None,
            subject: None
        }
    }

    #[must_use]
    pub fn with_statement(mut self, statement: impl Into<CompactString>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<CompactString>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Collects diagnostics from every stage.
///
/// Use [`error_count`](Self::error_count),
/// [`warning_count`](Self::warning_count) and [`info_count`](Self::info_count)
/// for severity totals, [`count_of`](Self::count_of) per kind.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AmbiguityReporter {
    diagnostics: Vec<Diagnostic>
}

impl AmbiguityReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add diagnostics, tagging those without a file with `file`
    pub fn extend_from_file(
        &mut self,
        file: &str,
        diagnostics: impl IntoIterator<Item = Diagnostic>
    ) {
        self.diagnostics.extend(diagnostics.into_iter().map(|d| {
            if d.file.is_none() {
                d.with_file(file)
            } else {
                d
            }
        }));
    }

    pub fn merge(&mut self, other: AmbiguityReporter) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.count_severity(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count_severity(Severity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count_severity(Severity::Info)
    }

    fn count_severity(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    /// Sort by severity (errors first), then file, statement and message
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.file.cmp(&b.file))
                .then_with(|| a.statement.cmp(&b.statement))
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.message.cmp(&b.message))
        });
    }
}

impl Extend<Diagnostic> for AmbiguityReporter {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.diagnostics.extend(iter);
    }
}

impl FromIterator<Diagnostic> for AmbiguityReporter {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            diagnostics: iter.into_iter().collect()
        }
    }
}
