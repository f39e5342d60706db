use crud_lineage::diagnostics::{AmbiguityReporter, Diagnostic, DiagnosticKind, Severity};

#[test]
fn test_kind_severities() {
    assert_eq!(DiagnosticKind::DuplicateAlias.severity(), Severity::Info);
    assert_eq!(DiagnosticKind::UnresolvedCall.severity(), Severity::Info);
    assert_eq!(DiagnosticKind::MissingSqlStatement.severity(), Severity::Warning);
    assert_eq!(DiagnosticKind::ParseDepthExceeded.severity(), Severity::Warning);
    assert_eq!(DiagnosticKind::AmbiguousColumn.severity(), Severity::Warning);
    assert_eq!(DiagnosticKind::UnknownColumn.severity(), Severity::Warning);
    assert_eq!(DiagnosticKind::ParseFailure.severity(), Severity::Error);
    assert_eq!(DiagnosticKind::MalformedInput.severity(), Severity::Error);
}

#[test]
fn test_codes_are_unique() {
    let kinds = [
        DiagnosticKind::DuplicateAlias,
        DiagnosticKind::UnresolvedCall,
        DiagnosticKind::MissingSqlStatement,
        DiagnosticKind::ParseDepthExceeded,
        DiagnosticKind::AmbiguousColumn,
        DiagnosticKind::UnknownColumn,
        DiagnosticKind::ParseFailure,
        DiagnosticKind::MalformedInput
    ];
    let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), kinds.len());
}

#[test]
fn test_reporter_counts_and_merge() {
    let mut a = AmbiguityReporter::new();
    a.push(Diagnostic::new(DiagnosticKind::AmbiguousColumn, "id in users, orders").with_subject("id"));
    a.push(Diagnostic::new(DiagnosticKind::UnresolvedCall, "mailer.send"));
    let mut b = AmbiguityReporter::new();
    b.push(Diagnostic::new(DiagnosticKind::MalformedInput, "bad file").with_file("x.json"));
    a.merge(b);

    assert_eq!(a.len(), 3);
    assert_eq!(a.error_count(), 1);
    assert_eq!(a.warning_count(), 1);
    assert_eq!(a.info_count(), 1);
    assert_eq!(a.max_severity(), Some(Severity::Error));
    assert_eq!(a.count_of(DiagnosticKind::AmbiguousColumn), 1);
}

#[test]
fn test_empty_reporter() {
    let reporter = AmbiguityReporter::new();
    assert!(reporter.is_empty());
    assert_eq!(reporter.max_severity(), None);
    assert_eq!(reporter.iter().count(), 0);
}

#[test]
fn test_diagnostic_serializes_context() {
    let diag = Diagnostic::new(DiagnosticKind::UnknownColumn, "no table has column 'x'")
        .with_statement("UserMapper.find")
        .with_file("user.json")
        .with_subject("x");
    let json = serde_json::to_value(&diag).unwrap();
    assert_eq!(json["kind"], "UnknownColumn");
    assert_eq!(json["severity"], "Warning");
    assert_eq!(json["statement"], "UserMapper.find");
    assert_eq!(json["file"], "user.json");
    assert_eq!(json["subject"], "x");

    let bare = serde_json::to_value(Diagnostic::new(DiagnosticKind::UnresolvedCall, "m")).unwrap();
    assert!(bare.get("file").is_none());
}
