use crud_lineage::query::{DmlKind, Expr, ProjectionItem, SqlDialect, Statement, parse_statement};

fn select(sql: &str) -> crud_lineage::query::Scope {
    match parse_statement(sql, SqlDialect::Generic).unwrap() {
        Statement::Select(scope) => scope,
        other => panic!("expected select, got {:?}", other)
    }
}

#[test]
fn test_table_references_with_aliases() {
    let scope = select("SELECT 1 FROM app.users u JOIN orders ON orders.user_id = u.id");
    let refs: Vec<_> = scope
        .table_references()
        .iter()
        .map(|t| (t.name.to_string(), t.alias.as_ref().map(|a| a.to_string())))
        .collect();
    assert_eq!(
        refs,
        vec![
            ("users".to_string(), Some("u".to_string())),
            ("orders".to_string(), None)
        ]
    );
}

#[test]
fn test_column_qualifier_is_structured() {
    let scope = select("SELECT app.users.id, name FROM app.users");
    let columns = scope.column_references();
    assert_eq!(columns[0].qualifier(), Some("users"));
    assert_eq!(columns[0].name, "id");
    assert_eq!(columns[1].qualifier(), None);
}

#[test]
fn test_ctes_in_declaration_order() {
    let stmt = parse_statement(
        "WITH a AS (SELECT 1 AS x), b AS (SELECT x FROM a) SELECT x FROM b",
        SqlDialect::Generic
    )
    .unwrap();
    let aliases: Vec<_> = stmt.ctes().iter().map(|c| c.alias.as_str()).collect();
    assert_eq!(aliases, vec!["a", "b"]);
}

#[test]
fn test_subqueries_as_table_sources() {
    let scope = select("SELECT t.id FROM (SELECT id FROM users) AS t");
    assert_eq!(scope.subqueries().len(), 1);
    assert_eq!(scope.subqueries()[0].alias.as_deref(), Some("t"));
    assert!(scope.table_references().is_empty());
}

#[test]
fn test_order_by_projection_alias_is_not_a_column() {
    let scope = select("SELECT COUNT(*) AS total FROM orders ORDER BY total");
    let names: Vec<_> = scope.column_references().iter().map(|c| c.name.as_str()).collect();
    assert!(!names.contains(&"total"));
    assert_eq!(scope.projection, vec![ProjectionItem::Named("total".into())]);
}

#[test]
fn test_function_keeps_call_text() {
    let scope = select("SELECT MAX(o.total) FROM orders o");
    let Expr::Function(func) = &scope.exprs[0] else {
        panic!("expected function");
    };
    assert_eq!(func.text, "MAX(o.total)");
    assert_eq!(func.args.len(), 1);
}

#[test]
fn test_insert_and_update_targets() {
    let Statement::Insert(insert) =
        parse_statement("INSERT INTO users (id, name) VALUES (1, 'a')", SqlDialect::Generic).unwrap()
    else {
        panic!("expected insert");
    };
    assert_eq!(insert.target_columns(), ["id", "name"]);

    let Statement::Update(update) =
        parse_statement("UPDATE users SET name = 'b', age = 3 WHERE id = 1", SqlDialect::Generic)
            .unwrap()
    else {
        panic!("expected update");
    };
    assert_eq!(update.set_targets(), ["name", "age"]);
    assert_eq!(update.target_table().map(|t| t.name.as_str()), Some("users"));
}

#[test]
fn test_classify_statement_kinds() {
    let kinds: Vec<DmlKind> = [
        "SELECT 1",
        "INSERT INTO t (a) VALUES (1)",
        "UPDATE t SET a = 1",
        "DELETE FROM t",
        "DROP TABLE t"
    ]
    .iter()
    .map(|sql| parse_statement(sql, SqlDialect::Generic).unwrap().classify())
    .collect();
    assert_eq!(
        kinds,
        vec![
            DmlKind::Select,
            DmlKind::Insert,
            DmlKind::Update,
            DmlKind::Delete,
            DmlKind::Unknown
        ]
    );
}

#[test]
fn test_parse_failure_is_an_error() {
    assert!(parse_statement("SELEC id FRM users", SqlDialect::Generic).is_err());
    assert!(parse_statement("", SqlDialect::Generic).is_err());
}
