use crud_lineage::{
    catalog::SchemaCatalog,
    query::{DmlKind, SqlDialect, parse_statement},
    resolve::{ParsedStatement, Resolver, ResolverConfig},
    usage::UsageSummary
};

fn resolve_all(sqls: &[&str]) -> Vec<ParsedStatement> {
    let catalog = SchemaCatalog::from_tables([
        ("users", vec!["id", "name"]),
        ("orders", vec!["id", "user_id"])
    ]);
    let resolver = Resolver::new(&catalog, ResolverConfig::default());
    sqls.iter()
        .map(|sql| {
            let stmt = parse_statement(sql, SqlDialect::Generic).unwrap();
            resolver.resolve(&stmt, None).statement
        })
        .collect()
}

#[test]
fn test_usage_counts_tables_columns_and_kinds() {
    let statements = resolve_all(&[
        "SELECT name FROM users WHERE id = 1",
        "SELECT o.id FROM orders o JOIN users u ON u.id = o.user_id",
        "DELETE FROM orders WHERE id = 2",
        "SELECT id FROM users u JOIN orders o ON u.id = o.user_id"
    ]);
    let usage = UsageSummary::from_statements(&statements);

    assert_eq!(usage.statements, 4);
    assert_eq!(usage.count_of(DmlKind::Select), 3);
    assert_eq!(usage.count_of(DmlKind::Delete), 1);
    assert_eq!(usage.count_of(DmlKind::Insert), 0);

    let tables: Vec<_> = usage.tables.iter().map(|t| (t.name.as_str(), t.count)).collect();
    assert_eq!(tables, vec![("orders", 3), ("users", 3)]);
    assert!(usage.tables.iter().all(|t| t.name != "AMBIGUOUS"));

    assert_eq!(usage.columns[0].name, "users.id");
    assert_eq!(usage.columns[0].count, 3);
}
