use compact_str::CompactString;
use sqlparser::ast;

use super::{expr::lower_expr, object_name_tail, set_expr::lower_query};
use crate::query::types::{ColumnRef, DerivedTable, Expr, Scope, TableRef};

/// Register the FROM item and its joins in `scope`
pub fn lower_table_with_joins(table: &ast::TableWithJoins, scope: &mut Scope) {
    let mut previous = lower_table_factor(&table.relation, scope);
    for join in &table.joins {
        let current = lower_table_factor(&join.relation, scope);
        let (constraint, match_condition) = join_constraint(&join.join_operator);
        if let Some(condition) = match_condition {
            lower_expr(condition, &mut scope.exprs);
        }
        match constraint {
            Some(ast::JoinConstraint::On(expr)) => lower_expr(expr, &mut scope.exprs),
            Some(ast::JoinConstraint::Using(columns)) => {
                // The shared column is read from both sides of the join
                for column in columns.iter().map(object_name_tail) {
                    for side in [&previous, &current].into_iter().flatten() {
                        scope
                            .exprs
                            .push(Expr::Column(ColumnRef::qualified(side.clone(), column.clone())));
                    }
                }
            }
            _ => {}
        }
        if current.is_some() {
            previous = current;
        }
    }
}

fn join_constraint(
    operator: &ast::JoinOperator
) -> (Option<&ast::JoinConstraint>, Option<&ast::Expr>) {
    use sqlparser::ast::JoinOperator;
    match operator {
        JoinOperator::Join(constraint)
        | JoinOperator::Inner(constraint)
        | JoinOperator::Left(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::Right(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint)
        | JoinOperator::CrossJoin(constraint)
        | JoinOperator::Semi(constraint)
        | JoinOperator::LeftSemi(constraint)
        | JoinOperator::RightSemi(constraint)
        | JoinOperator::Anti(constraint)
        | JoinOperator::LeftAnti(constraint)
        | JoinOperator::RightAnti(constraint)
        | JoinOperator::StraightJoin(constraint) => (Some(constraint), None),
        JoinOperator::AsOf {
            match_condition,
            constraint
        } => (Some(constraint), Some(match_condition)),
        JoinOperator::CrossApply | JoinOperator::OuterApply => (None, None)
    }
}

/// Lower one FROM item; returns the name its columns are qualified with
fn lower_table_factor(table_factor: &ast::TableFactor, scope: &mut Scope) -> Option<CompactString> {
    use sqlparser::ast::TableFactor;

    match table_factor {
        TableFactor::Table {
            name,
            alias,
            ..
        } => {
            let table = TableRef {
                name:  object_name_tail(name),
                alias: alias.as_ref().map(|a| a.name.value.as_str().into())
            };
            let key = CompactString::from(table.key());
            scope.tables.push(table);
            Some(key)
        }
        TableFactor::Derived {
            subquery,
            alias,
            ..
        } => {
            let alias: Option<CompactString> = alias.as_ref().map(|a| a.name.value.as_str().into());
            scope.derived.push(DerivedTable {
                alias:   alias.clone(),
                columns: alias_columns(table_factor),
                body:    lower_query(subquery)
            });
            alias
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            lower_table_with_joins(table_with_joins, scope);
            None
        }
        TableFactor::UNNEST {
            array_exprs, ..
        } => {
            for expr in array_exprs {
                lower_expr(expr, &mut scope.exprs);
            }
            None
        }
        TableFactor::TableFunction {
            expr, ..
        } => {
            lower_expr(expr, &mut scope.exprs);
            None
        }
        _ => None
    }
}

fn alias_columns(table_factor: &ast::TableFactor) -> Vec<CompactString> {
    match table_factor {
        ast::TableFactor::Derived {
            alias: Some(alias),
            ..
        } => alias
            .columns
            .iter()
            .map(|c| c.name.value.as_str().into())
            .collect(),
        _ => Vec::new()
    }
}
