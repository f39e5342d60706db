use sqlparser::ast;

use super::{
    expr::{lower_expr, lower_exprs_skipping_aliases, lower_window, projection_name},
    table::lower_table_with_joins,
    unquote
};
use crate::query::types::{Cte, DerivedTable, ProjectionItem, Scope, TableRef};

/// Lower a full query (CTEs, body, ORDER BY) into one scope
pub fn lower_query(query: &ast::Query) -> Scope {
    let mut scope = lower_set_expr(&query.body);
    if let Some(with) = &query.with {
        scope.ctes = with
            .cte_tables
            .iter()
            .map(|cte| Cte {
                alias:   cte.alias.name.value.as_str().into(),
                columns: cte
                    .alias
                    .columns
                    .iter()
                    .map(|c| c.name.value.as_str().into())
                    .collect(),
                body:    lower_query(&cte.query)
            })
            .collect();
    }
    if let Some(order_by) = &query.order_by
        && let ast::OrderByKind::Expressions(exprs) = &order_by.kind
    {
        lower_exprs_skipping_aliases(exprs.iter().map(|e| &e.expr), &mut scope);
    }
    scope
}

fn lower_set_expr(set_expr: &ast::SetExpr) -> Scope {
    use sqlparser::ast::SetExpr;
    match set_expr {
        SetExpr::Select(select) => lower_select(select),
        SetExpr::Query(query) => lower_query(query),
        SetExpr::SetOperation {
            left,
            right,
            ..
        } => {
            let left = lower_set_expr(left);
            let right = lower_set_expr(right);
            Scope {
                projection: left.projection.clone(),
                derived: vec![
                    DerivedTable {
                        alias:   None,
                        columns: Vec::new(),
                        body:    left
                    },
                    DerivedTable {
                        alias:   None,
                        columns: Vec::new(),
                        body:    right
                    },
                ],
                ..Default::default()
            }
        }
        SetExpr::Values(values) => {
            let mut scope = Scope::default();
            for row in &values.rows {
                for expr in row {
                    lower_expr(expr, &mut scope.exprs);
                }
            }
            scope
        }
        SetExpr::Table(table) => {
            let mut scope = Scope::default();
            if let Some(name) = &table.table_name {
                scope.tables.push(TableRef::new(unquote(name)));
                scope.projection.push(ProjectionItem::Wildcard {
                    qualifier: None
                });
            }
            scope
        }
        _ => Scope::default()
    }
}

fn lower_select(select: &ast::Select) -> Scope {
    use sqlparser::ast::SelectItem;

    let mut scope = Scope::default();
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                lower_expr(expr, &mut scope.exprs);
                scope
                    .projection
                    .push(ProjectionItem::Named(projection_name(expr)));
            }
            SelectItem::ExprWithAlias {
                expr,
                alias
            } => {
                lower_expr(expr, &mut scope.exprs);
                scope
                    .projection
                    .push(ProjectionItem::Named(alias.value.as_str().into()));
            }
            SelectItem::QualifiedWildcard(..) => {
                scope.projection.push(ProjectionItem::Wildcard {
                    qualifier: wildcard_qualifier(&item.to_string())
                });
            }
            SelectItem::Wildcard(..) => {
                scope.projection.push(ProjectionItem::Wildcard {
                    qualifier: None
                });
            }
        }
    }
    for table in &select.from {
        lower_table_with_joins(table, &mut scope);
    }
    if let Some(ast::Distinct::On(exprs)) = &select.distinct {
        for expr in exprs {
            lower_expr(expr, &mut scope.exprs);
        }
    }
    for predicate in [&select.prewhere, &select.selection].into_iter().flatten() {
        lower_expr(predicate, &mut scope.exprs);
    }
    if let ast::GroupByExpr::Expressions(exprs, _) = &select.group_by {
        lower_exprs_skipping_aliases(exprs, &mut scope);
    }
    if let Some(having) = &select.having {
        lower_exprs_skipping_aliases([having], &mut scope);
    }
    if let Some(qualify) = &select.qualify {
        lower_exprs_skipping_aliases([qualify], &mut scope);
    }
    lower_exprs_skipping_aliases(
        select
            .cluster_by
            .iter()
            .chain(&select.distribute_by)
            .chain(select.sort_by.iter().map(|o| &o.expr)),
        &mut scope
    );
    for ast::NamedWindowDefinition(_, window) in &select.named_window {
        if let ast::NamedWindowExpr::WindowSpec(spec) = window {
            lower_window(spec, &mut scope.exprs);
        }
    }
    scope
}

/// `u.*` / `public.users.* EXCLUDE (x)` -> `u` / `users`
///
/// The qualified wildcard kind has no stable accessor across parser
/// releases, so the rendered item is used.
fn wildcard_qualifier(rendered: &str) -> Option<compact_str::CompactString> {
    let head = rendered.split_whitespace().next()?;
    let path = head.strip_suffix(".*")?;
    let last = path.rsplit('.').next()?;
    Some(super::unquote(last))
}
