use compact_str::CompactString;
use sqlparser::ast;

use super::{set_expr::lower_query, unquote};
use crate::query::types::{ColumnRef, Expr, FunctionCall, Scope};

/// Collect column, function and subquery nodes reachable from `expr`.
///
/// Every variant carrying sub-expressions is walked. Literals, placeholders
/// and bare wildcards contribute nothing.
pub fn lower_expr(expr: &ast::Expr, out: &mut Vec<Expr>) {
    use sqlparser::ast::Expr as E;

    match expr {
        E::Identifier(ident) => {
            out.push(Expr::Column(ColumnRef::bare(ident.value.as_str())));
        }
        E::CompoundIdentifier(idents) => {
            let parts: Vec<&str> = idents.iter().map(|i| i.value.as_str()).collect();
            push_column(&parts, out);
        }
        E::CompoundFieldAccess {
            root,
            access_chain
        } => {
            lower_expr(root, out);
            for access in access_chain {
                if let ast::AccessExpr::Subscript(subscript) = access {
                    lower_subscript(subscript, out);
                }
            }
        }
        E::JsonAccess {
            value, ..
        } => lower_expr(value, out),
        E::IsFalse(e)
        | E::IsNotFalse(e)
        | E::IsTrue(e)
        | E::IsNotTrue(e)
        | E::IsNull(e)
        | E::IsNotNull(e)
        | E::IsUnknown(e)
        | E::IsNotUnknown(e)
        | E::Nested(e)
        | E::OuterJoin(e)
        | E::Prior(e) => lower_expr(e, out),
        E::IsNormalized {
            expr, ..
        }
        | E::UnaryOp {
            expr, ..
        }
        | E::Cast {
            expr, ..
        }
        | E::Extract {
            expr, ..
        }
        | E::Ceil {
            expr, ..
        }
        | E::Floor {
            expr, ..
        }
        | E::Collate {
            expr, ..
        }
        | E::Named {
            expr, ..
        } => lower_expr(expr, out),
        E::Prefixed {
            value, ..
        } => lower_expr(value, out),
        E::Interval(interval) => lower_expr(&interval.value, out),
        E::IsDistinctFrom(left, right)
        | E::IsNotDistinctFrom(left, right)
        | E::BinaryOp {
            left,
            right,
            ..
        }
        | E::AnyOp {
            left,
            right,
            ..
        }
        | E::AllOp {
            left,
            right,
            ..
        } => {
            lower_expr(left, out);
            lower_expr(right, out);
        }
        E::Like {
            expr,
            pattern,
            ..
        }
        | E::ILike {
            expr,
            pattern,
            ..
        }
        | E::SimilarTo {
            expr,
            pattern,
            ..
        }
        | E::RLike {
            expr,
            pattern,
            ..
        } => {
            lower_expr(expr, out);
            lower_expr(pattern, out);
        }
        E::AtTimeZone {
            timestamp,
            time_zone
        } => {
            lower_expr(timestamp, out);
            lower_expr(time_zone, out);
        }
        E::Position {
            expr,
            r#in
        } => {
            lower_expr(expr, out);
            lower_expr(r#in, out);
        }
        E::InList {
            expr,
            list,
            ..
        } => {
            lower_expr(expr, out);
            lower_all(list, out);
        }
        E::InSubquery {
            expr,
            subquery,
            ..
        } => {
            lower_expr(expr, out);
            out.push(Expr::Subquery(Box::new(lower_query(subquery))));
        }
        E::InUnnest {
            expr,
            array_expr,
            ..
        } => {
            lower_expr(expr, out);
            lower_expr(array_expr, out);
        }
        E::Between {
            expr,
            low,
            high,
            ..
        } => {
            lower_expr(expr, out);
            lower_expr(low, out);
            lower_expr(high, out);
        }
        E::Convert {
            expr,
            styles,
            ..
        } => {
            lower_expr(expr, out);
            lower_all(styles, out);
        }
        E::Substring {
            expr,
            substring_from,
            substring_for,
            ..
        } => {
            lower_expr(expr, out);
            lower_optional(substring_from.as_deref(), out);
            lower_optional(substring_for.as_deref(), out);
        }
        E::Trim {
            expr,
            trim_what,
            trim_characters,
            ..
        } => {
            lower_expr(expr, out);
            lower_optional(trim_what.as_deref(), out);
            if let Some(characters) = trim_characters {
                lower_all(characters, out);
            }
        }
        E::Overlay {
            expr,
            overlay_what,
            overlay_from,
            overlay_for
        } => {
            lower_expr(expr, out);
            lower_expr(overlay_what, out);
            lower_expr(overlay_from, out);
            lower_optional(overlay_for.as_deref(), out);
        }
        E::Function(func) => lower_function(func, out),
        E::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            lower_optional(operand.as_deref(), out);
            for case_when in conditions {
                lower_expr(&case_when.condition, out);
                lower_expr(&case_when.result, out);
            }
            lower_optional(else_result.as_deref(), out);
        }
        E::Subquery(query)
        | E::Exists {
            subquery: query, ..
        } => {
            out.push(Expr::Subquery(Box::new(lower_query(query))));
        }
        E::GroupingSets(sets) | E::Cube(sets) | E::Rollup(sets) => {
            for set in sets {
                lower_all(set, out);
            }
        }
        E::Tuple(items)
        | E::Struct {
            values: items, ..
        } => lower_all(items, out),
        E::Array(array) => lower_all(&array.elem, out),
        E::Dictionary(fields) => {
            for field in fields {
                lower_expr(&field.value, out);
            }
        }
        E::Map(map) => {
            for entry in &map.entries {
                lower_expr(&entry.key, out);
                lower_expr(&entry.value, out);
            }
        }
        E::MatchAgainst {
            columns, ..
        } => {
            for column in columns {
                let parts: Vec<CompactString> =
                    column.0.iter().map(|p| unquote(&p.to_string())).collect();
                let parts: Vec<&str> = parts.iter().map(CompactString::as_str).collect();
                push_column(&parts, out);
            }
        }
        E::Lambda(lambda) => {
            let mut body = Vec::new();
            lower_expr(&lambda.body, &mut body);
            body.retain(|node| match node {
                Expr::Column(col) if col.qualifier().is_none() => !lambda
                    .params
                    .iter()
                    .any(|p| p.value.eq_ignore_ascii_case(&col.name)),
                _ => true
            });
            out.extend(body);
        }
        E::MemberOf(member) => {
            lower_expr(&member.value, out);
            lower_expr(&member.array, out);
        }
        E::Value(_) | E::TypedString(_) | E::Wildcard(_) | E::QualifiedWildcard(..) => {}
    }
}

/// `a.b.c` → column `c` qualified by `b`
fn push_column(parts: &[&str], out: &mut Vec<Expr>) {
    match parts {
        [.., qualifier, column] => {
            out.push(Expr::Column(ColumnRef::qualified(*qualifier, *column)));
        }
        [column] => out.push(Expr::Column(ColumnRef::bare(*column))),
        [] => {}
    }
}

fn lower_all(exprs: &[ast::Expr], out: &mut Vec<Expr>) {
    for expr in exprs {
        lower_expr(expr, out);
    }
}

fn lower_optional(expr: Option<&ast::Expr>, out: &mut Vec<Expr>) {
    if let Some(expr) = expr {
        lower_expr(expr, out);
    }
}

fn lower_subscript(subscript: &ast::Subscript, out: &mut Vec<Expr>) {
    match subscript {
        ast::Subscript::Index {
            index
        } => lower_expr(index, out),
        ast::Subscript::Slice {
            lower_bound,
            upper_bound,
            stride
        } => {
            lower_optional(lower_bound.as_ref(), out);
            lower_optional(upper_bound.as_ref(), out);
            lower_optional(stride.as_ref(), out);
        }
    }
}

/// Push the call node, then the columns of its `FILTER`, `OVER` and
/// `WITHIN GROUP` clauses as plain references beside it
fn lower_function(func: &ast::Function, out: &mut Vec<Expr>) {
    let mut args = Vec::new();
    let mut clauses = Vec::new();
    lower_arguments(&func.parameters, &mut args, &mut clauses);
    lower_arguments(&func.args, &mut args, &mut clauses);
    out.push(Expr::Function(FunctionCall {
        name: func.name.to_string().into(),
        text: func.to_string().into(),
        args
    }));
    out.extend(clauses);
    if let Some(filter) = &func.filter {
        lower_expr(filter, out);
    }
    if let Some(ast::WindowType::WindowSpec(spec)) = &func.over {
        lower_window(spec, out);
    }
    for order in &func.within_group {
        lower_expr(&order.expr, out);
    }
}

fn lower_arguments(arguments: &ast::FunctionArguments, args: &mut Vec<Expr>, clauses: &mut Vec<Expr>) {
    match arguments {
        ast::FunctionArguments::List(arg_list) => {
            for arg in &arg_list.args {
                let (ast::FunctionArg::Unnamed(arg_expr)
                | ast::FunctionArg::Named {
                    arg: arg_expr, ..
                }
                | ast::FunctionArg::ExprNamed {
                    arg: arg_expr, ..
                }) = arg;
                if let ast::FunctionArgExpr::Expr(e) = arg_expr {
                    lower_expr(e, args);
                }
            }
            for clause in &arg_list.clauses {
                match clause {
                    ast::FunctionArgumentClause::OrderBy(order_by) => {
                        for order in order_by {
                            lower_expr(&order.expr, clauses);
                        }
                    }
                    ast::FunctionArgumentClause::Limit(limit) => lower_expr(limit, clauses),
                    ast::FunctionArgumentClause::Having(ast::HavingBound(_, bound)) => {
                        lower_expr(bound, clauses)
                    }
                    _ => {}
                }
            }
        }
        ast::FunctionArguments::Subquery(query) => {
            args.push(Expr::Subquery(Box::new(lower_query(query))));
        }
        ast::FunctionArguments::None => {}
    }
}

/// `PARTITION BY` and `ORDER BY` of a window; frame bounds are constants
pub(super) fn lower_window(spec: &ast::WindowSpec, out: &mut Vec<Expr>) {
    lower_all(&spec.partition_by, out);
    for order in &spec.order_by {
        lower_expr(&order.expr, out);
    }
}

/// Name an enclosing scope sees for an unaliased projection expression
pub(super) fn projection_name(expr: &ast::Expr) -> CompactString {
    match expr {
        ast::Expr::Identifier(ident) => ident.value.as_str().into(),
        ast::Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|i| i.value.as_str().into())
            .unwrap_or_default(),
        other => other.to_string().into()
    }
}

/// Lower expressions, dropping bare references to the scope's own output
/// aliases (`ORDER BY total` where `total` is a SELECT alias)
pub(super) fn lower_exprs_skipping_aliases<'a>(
    exprs: impl IntoIterator<Item = &'a ast::Expr>,
    scope: &mut Scope
) {
    use crate::query::types::ProjectionItem;

    let mut lowered = Vec::new();
    for expr in exprs {
        lower_expr(expr, &mut lowered);
    }
    lowered.retain(|node| match node {
        Expr::Column(col) if col.qualifier().is_none() => !scope.projection.iter().any(|p| {
            matches!(p, ProjectionItem::Named(name) if name.eq_ignore_ascii_case(&col.name))
        }),
        _ => true
    });
    scope.exprs.extend(lowered);
}

#[cfg(test)]
mod tests {
    use sqlparser::{dialect::PostgreSqlDialect, parser::Parser};

    use super::*;

    /// Column references (as `q.name` / `name`) reachable outside subqueries
    fn columns(sql: &str) -> Vec<String> {
        let expr = Parser::new(&PostgreSqlDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap();
        let mut out = Vec::new();
        lower_expr(&expr, &mut out);
        let mut names = Vec::new();
        collect(&out, &mut names);
        names
    }

    fn collect(nodes: &[Expr], names: &mut Vec<String>) {
        for node in nodes {
            match node {
                Expr::Column(col) => names.push(match col.qualifier() {
                    Some(q) => format!("{}.{}", q, col.name),
                    None => col.name.to_string()
                }),
                Expr::Function(func) => collect(&func.args, names),
                Expr::Subquery(_) => names.push("<subquery>".to_string())
            }
        }
    }

    #[test]
    fn test_string_functions_keep_their_columns() {
        assert_eq!(columns("TRIM(name)"), vec!["name"]);
        assert_eq!(columns("SUBSTRING(name FROM 1 FOR len)"), vec!["name", "len"]);
        assert_eq!(columns("POSITION(a IN b)"), vec!["a", "b"]);
        assert_eq!(columns("OVERLAY(a PLACING b FROM 1)"), vec!["a", "b"]);
    }

    #[test]
    fn test_predicates_keep_their_columns() {
        assert_eq!(columns("status IS DISTINCT FROM 1"), vec!["status"]);
        assert_eq!(columns("flag IS TRUE"), vec!["flag"]);
        assert_eq!(columns("name SIMILAR TO pattern"), vec!["name", "pattern"]);
        assert_eq!(columns("name COLLATE \"C\""), vec!["name"]);
        assert_eq!(columns("created AT TIME ZONE tz"), vec!["created", "tz"]);
    }

    #[test]
    fn test_any_subquery_is_kept() {
        assert_eq!(
            columns("u.id = ANY(SELECT user_id FROM orders)"),
            vec!["u.id", "<subquery>"]
        );
    }

    #[test]
    fn test_window_and_filter_columns_sit_beside_the_call() {
        assert_eq!(
            columns("ROW_NUMBER() OVER (PARTITION BY u.dept ORDER BY u.created)"),
            vec!["u.dept", "u.created"]
        );
        assert_eq!(
            columns("COUNT(id) FILTER (WHERE active)"),
            vec!["id", "active"]
        );
        assert_eq!(
            columns("STRING_AGG(name, ',' ORDER BY seq)"),
            vec!["name", "seq"]
        );
    }

    #[test]
    fn test_array_and_case_forms() {
        assert_eq!(columns("ARRAY[a, b]"), vec!["a", "b"]);
        assert_eq!(columns("tags[idx]"), vec!["tags", "idx"]);
        assert_eq!(
            columns("CASE WHEN a > 0 THEN b ELSE c END"),
            vec!["a", "b", "c"]
        );
    }
}
