mod expr;
mod set_expr;
mod table;

use compact_str::CompactString;
pub use expr::lower_expr;
pub use set_expr::lower_query;
use sqlparser::ast;
pub use table::lower_table_with_joins;

use super::types::{
    ColumnRef, DeleteStatement, Expr, InsertStatement, Scope, Statement, TableRef,
    UpdateStatement
};

/// Lower a parsed `sqlparser` statement into the closed node tree
pub fn lower_statement(stmt: &ast::Statement) -> Statement {
    match stmt {
        ast::Statement::Query(query) => Statement::Select(lower_query(query)),
        ast::Statement::Insert(insert) => Statement::Insert(lower_insert(insert)),
        ast::Statement::Update(ast::Update {
            table,
            assignments,
            from,
            selection,
            ..
        }) => {
            let mut scope = Scope::default();
            lower_table_with_joins(table, &mut scope);
            if let Some(
                ast::UpdateTableFromKind::BeforeSet(from) | ast::UpdateTableFromKind::AfterSet(from)
            ) = from
            {
                for item in from {
                    lower_table_with_joins(item, &mut scope);
                }
            }
            let targets = lower_assignments(assignments, &mut scope.exprs);
            if let Some(sel) = selection {
                lower_expr(sel, &mut scope.exprs);
            }
            Statement::Update(UpdateStatement {
                targets,
                scope
            })
        }
        ast::Statement::Delete(delete) => {
            let mut scope = Scope::default();
            let (ast::FromTable::WithFromKeyword(from) | ast::FromTable::WithoutKeyword(from)) =
                &delete.from;
            for item in from {
                lower_table_with_joins(item, &mut scope);
            }
            if let Some(using) = &delete.using {
                for item in using {
                    lower_table_with_joins(item, &mut scope);
                }
            }
            if let Some(sel) = &delete.selection {
                lower_expr(sel, &mut scope.exprs);
            }
            Statement::Delete(DeleteStatement {
                scope
            })
        }
        _ => Statement::Unknown
    }
}

fn lower_insert(insert: &ast::Insert) -> InsertStatement {
    let name = match &insert.table {
        ast::TableObject::TableName(name) => object_name_tail(name),
        other => unquote(&other.to_string())
    };
    let mut columns: Vec<CompactString> = insert
        .columns
        .iter()
        .map(|c| unquote(&c.to_string()))
        .collect();
    let mut source = insert.source.as_ref().map(|q| lower_query(q));
    if !insert.assignments.is_empty() {
        // MySQL `INSERT INTO t SET a = 1`
        let scope = source.get_or_insert_with(Scope::default);
        columns.extend(lower_assignments(&insert.assignments, &mut scope.exprs));
    }

    let table = TableRef {
        name,
        alias: insert
            .table_alias
            .as_ref()
            .map(|a| a.value.as_str().into())
    };
    let on_conflict = insert
        .on
        .as_ref()
        .and_then(|on| lower_upsert(on, &table, insert));
    InsertStatement {
        table,
        columns,
        source,
        on_conflict
    }
}

/// `ON CONFLICT ... DO UPDATE` / `ON DUPLICATE KEY UPDATE` as an update of
/// the target table. `EXCLUDED` and the MySQL row alias name the target too.
fn lower_upsert(on: &ast::OnInsert, table: &TableRef, insert: &ast::Insert) -> Option<UpdateStatement> {
    let mut scope = Scope::default();
    scope.tables.push(table.clone());
    let targets = match on {
        ast::OnInsert::DuplicateKeyUpdate(assignments) => {
            if let Some(aliases) = &insert.insert_alias {
                scope
                    .tables
                    .push(TableRef::aliased(table.name.clone(), object_name_tail(&aliases.row_alias)));
            }
            lower_assignments(assignments, &mut scope.exprs)
        }
        ast::OnInsert::OnConflict(conflict) => {
            if let Some(ast::ConflictTarget::Columns(columns)) = &conflict.conflict_target {
                scope.exprs.extend(
                    columns
                        .iter()
                        .map(|c| Expr::Column(ColumnRef::bare(c.value.as_str())))
                );
            }
            let ast::OnConflictAction::DoUpdate(update) = &conflict.action else {
                return (!scope.exprs.is_empty()).then_some(UpdateStatement {
                    targets: Vec::new(),
                    scope
                });
            };
            scope
                .tables
                .push(TableRef::aliased(table.name.clone(), "excluded"));
            let targets = lower_assignments(&update.assignments, &mut scope.exprs);
            if let Some(sel) = &update.selection {
                lower_expr(sel, &mut scope.exprs);
            }
            targets
        }
        _ => return None
    };
    Some(UpdateStatement {
        targets,
        scope
    })
}

/// Assignment target columns; value expressions go to `exprs`
fn lower_assignments(assignments: &[ast::Assignment], exprs: &mut Vec<Expr>) -> Vec<CompactString> {
    let mut targets = Vec::new();
    for assignment in assignments {
        match &assignment.target {
            ast::AssignmentTarget::ColumnName(name) => targets.push(object_name_tail(name)),
            ast::AssignmentTarget::Tuple(names) => targets.extend(names.iter().map(object_name_tail))
        }
        lower_expr(&assignment.value, exprs);
    }
    targets
}

/// Last identifier of a possibly schema-qualified object name
pub(crate) fn object_name_tail(name: &ast::ObjectName) -> CompactString {
    name.0
        .last()
        .map(|part| unquote(&part.to_string()))
        .unwrap_or_default()
}

/// Strip one level of identifier quoting (`"x"`, `` `x` ``, `[x]`)
pub(crate) fn unquote(raw: &str) -> CompactString {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let unquoted = match (chars.next(), chars.next_back()) {
        (Some('"'), Some('"')) | (Some('`'), Some('`')) | (Some('['), Some(']'))
            if trimmed.len() >= 2 =>
        {
            &trimmed[1..trimmed.len() - 1]
        }
        _ => trimmed
    };
    unquoted.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"users\""), "users");
        assert_eq!(unquote("`users`"), "users");
        assert_eq!(unquote("[users]"), "users");
        assert_eq!(unquote("users"), "users");
        assert_eq!(unquote("\""), "\"");
    }
}
