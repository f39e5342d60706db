//! Recursive resolution of CTEs and subqueries as nested scopes.
//!
//! Each scope is resolved into its own [`ScopeOutput`], which the caller
//! merges into its result on return. Nothing is shared mutably between
//! scopes; name lookups walk the [`ScopeFrame`] chain instead.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet}
};

use compact_str::CompactString;

use super::{
    alias::{duplicate_alias, resolve_aliases},
    attribute::{Attribution, ColumnAttributor, PseudoTables, ScopeFrame}
};
use crate::{
    diagnostics::{Diagnostic, DiagnosticKind},
    query::{
        ColumnRef, DeleteStatement, Expr, InsertStatement, ProjectionItem, Scope, Statement,
        UpdateStatement
    }
};

const WILDCARD: &str = "*";

/// Findings of one scope and everything nested below it
#[derive(Debug, Default)]
pub struct ScopeOutput {
    pub tables:      BTreeSet<CompactString>,
    pub columns:     BTreeMap<CompactString, BTreeSet<CompactString>>,
    pub diagnostics: Vec<Diagnostic>,
    /// Output column names of this scope only
    pub projection:  Vec<CompactString>
}

impl ScopeOutput {
    fn record(&mut self, table: &str, column: CompactString) {
        self.columns.entry(table.into()).or_default().insert(column);
    }

    /// Fold a nested scope into this one; the nested projection is dropped
    fn merge(&mut self, nested: ScopeOutput) {
        self.tables.extend(nested.tables);
        for (table, columns) in nested.columns {
            self.columns.entry(table).or_default().extend(columns);
        }
        self.diagnostics.extend(nested.diagnostics);
    }
}

/// Walks a statement scope by scope, bounded by `max_depth`
#[derive(Debug, Clone, Copy)]
pub struct SubqueryFlattener<'a> {
    attributor: ColumnAttributor<'a>,
    max_depth:  usize
}

impl<'a> SubqueryFlattener<'a> {
    pub fn new(attributor: ColumnAttributor<'a>, max_depth: usize) -> Self {
        Self {
            attributor,
            max_depth
        }
    }

    pub fn flatten(&self, statement: &Statement) -> ScopeOutput {
        let no_ctes = PseudoTables::default();
        match statement {
            Statement::Select(scope) => self.resolve_scope(scope, &no_ctes, None, 0),
            Statement::Insert(insert) => self.flatten_insert(insert, &no_ctes),
            Statement::Update(update) => self.flatten_update(update, &no_ctes),
            Statement::Delete(DeleteStatement {
                scope
            }) => self.resolve_scope(scope, &no_ctes, None, 0),
            Statement::Unknown => ScopeOutput::default()
        }
    }

    fn flatten_insert(&self, insert: &InsertStatement, ctes: &PseudoTables) -> ScopeOutput {
        let mut out = match &insert.source {
            Some(source) => self.resolve_scope(source, ctes, None, 0),
            None => ScopeOutput::default()
        };
        let target = self.attributor.canonical(&insert.table.name, ctes);
        for column in insert.target_columns() {
            let column = self.attributor.spelling(&target, column, None);
            out.record(&target, column);
        }
        out.tables.insert(target);
        if let Some(upsert) = &insert.on_conflict {
            out.merge(self.flatten_update(upsert, ctes));
        }
        out.projection.clear();
        out
    }

    fn flatten_update(&self, update: &UpdateStatement, ctes: &PseudoTables) -> ScopeOutput {
        let mut out = self.resolve_scope(&update.scope, ctes, None, 0);
        if let Some(target) = update.target_table() {
            let target = self.attributor.canonical(&target.name, ctes);
            for column in update.set_targets() {
                let column = self.attributor.spelling(&target, column, None);
                out.record(&target, column);
            }
        }
        out
    }

    fn enter(&self, depth: usize) -> Option<usize> {
        let next = depth + 1;
        (next <= self.max_depth).then_some(next)
    }

    fn depth_exceeded(&self, what: &str, subject: Option<&str>) -> Diagnostic {
        let diag = Diagnostic::new(
            DiagnosticKind::ParseDepthExceeded,
            format!(
                "{} nested deeper than {} levels was not resolved",
                what, self.max_depth
            )
        );
        match subject {
            Some(s) => diag.with_subject(s),
            None => diag
        }
    }

    fn resolve_scope(
        &self,
        scope: &Scope,
        ctes: &PseudoTables,
        parent: Option<&ScopeFrame<'_>>,
        depth: usize
    ) -> ScopeOutput {
        let mut out = ScopeOutput::default();
        let visible = self.register_ctes(scope, ctes, parent, depth, &mut out);

        let (aliases, diagnostics) =
            resolve_aliases(scope, |name| self.attributor.canonical(name, &visible));
        out.diagnostics.extend(diagnostics);

        let mut frame = ScopeFrame::new(aliases, &visible, parent);
        let mut branch_projection = None;
        for derived in scope.subqueries() {
            let columns = match self.enter(depth) {
                Some(next) => {
                    let nested = self.resolve_scope(&derived.body, &visible, parent, next);
                    let projection = nested.projection.clone();
                    out.merge(nested);
                    projection
                }
                None => {
                    out.diagnostics.push(
                        self.depth_exceeded("derived table", derived.alias.as_deref())
                    );
                    Vec::new()
                }
            };
            match &derived.alias {
                Some(alias) => {
                    let columns = if derived.columns.is_empty() {
                        columns
                    } else {
                        derived.columns.clone()
                    };
                    frame.derived.register(alias.clone(), columns);
                    if let Some(previous) = frame.aliases.insert(alias.clone(), alias.clone()) {
                        out.diagnostics
                            .push(duplicate_alias(alias, &previous.table, alias));
                    }
                }
                None => {
                    branch_projection.get_or_insert(columns);
                }
            }
        }

        for entry in frame.aliases.iter() {
            out.tables.insert(entry.table.clone());
        }

        for expr in &scope.exprs {
            self.resolve_expr(expr, &frame, depth, &mut out);
        }

        out.projection = match branch_projection {
            Some(columns) if frame.aliases.is_empty() => columns,
            _ => self.projection(scope, &frame, &mut out)
        };
        out
    }

    /// Resolve the CTEs of `scope` in declaration order; each one is visible
    /// to the CTEs after it and to the scope body
    fn register_ctes<'c>(
        &self,
        scope: &Scope,
        ctes: &'c PseudoTables,
        parent: Option<&ScopeFrame<'_>>,
        depth: usize,
        out: &mut ScopeOutput
    ) -> Cow<'c, PseudoTables> {
        if scope.ctes().is_empty() {
            return Cow::Borrowed(ctes);
        }
        let mut visible = ctes.clone();
        for cte in scope.ctes() {
            let projection = match self.enter(depth) {
                Some(next) => {
                    let nested = self.resolve_scope(&cte.body, &visible, parent, next);
                    let projection = nested.projection.clone();
                    out.merge(nested);
                    projection
                }
                None => {
                    out.diagnostics
                        .push(self.depth_exceeded("CTE", Some(&cte.alias)));
                    Vec::new()
                }
            };
            let columns = if cte.columns.is_empty() {
                projection
            } else {
                cte.columns.clone()
            };
            visible.register(cte.alias.clone(), columns);
            out.tables.insert(cte.alias.clone());
        }
        Cow::Owned(visible)
    }

    fn resolve_expr(
        &self,
        expr: &Expr,
        frame: &ScopeFrame<'_>,
        depth: usize,
        out: &mut ScopeOutput
    ) {
        match expr {
            Expr::Column(column) => {
                self.record_column(column, frame, out);
            }
            Expr::Function(func) => {
                for arg in &func.args {
                    if let Expr::Column(column) = arg {
                        let attribution = self.record_column(column, frame, out);
                        if column.qualifier().is_some()
                            && let Attribution::Table(table) = attribution
                        {
                            out.record(&table, func.text.clone());
                        }
                    } else {
                        self.resolve_expr(arg, frame, depth, out);
                    }
                }
            }
            Expr::Subquery(body) => match self.enter(depth) {
                Some(next) => {
                    let nested = self.resolve_scope(body, frame.ctes, Some(frame), next);
                    out.merge(nested);
                }
                None => out.diagnostics.push(self.depth_exceeded("subquery", None))
            }
        }
    }

    fn record_column(
        &self,
        column: &ColumnRef,
        frame: &ScopeFrame<'_>,
        out: &mut ScopeOutput
    ) -> Attribution {
        let attribution = self.attributor.attribute(column, frame);
        if let Some(diag) = attribution.diagnostic(column) {
            out.diagnostics.push(diag);
        }
        let name = match &attribution {
            Attribution::Table(table) => self.attributor.spelling(table, &column.name, Some(frame)),
            _ => column.name.clone()
        };
        out.record(attribution.bucket(), name);
        attribution
    }

    /// Output columns of a scope. Wildcards expand to the known columns of
    /// the tables they cover and are recorded as `*` reads.
    fn projection(
        &self,
        scope: &Scope,
        frame: &ScopeFrame<'_>,
        out: &mut ScopeOutput
    ) -> Vec<CompactString> {
        let mut columns = Vec::with_capacity(scope.projection.len());
        for item in &scope.projection {
            match item {
                ProjectionItem::Named(name) => columns.push(name.clone()),
                ProjectionItem::Wildcard {
                    qualifier: None
                } => {
                    for table in frame.aliases.tables() {
                        out.record(table, WILDCARD.into());
                        if let Some(known) = self.attributor.known_columns(table, frame) {
                            columns.extend(known);
                        }
                    }
                }
                ProjectionItem::Wildcard {
                    qualifier: Some(qualifier)
                } => match frame.aliases.get(qualifier) {
                    Some(table) => {
                        out.record(table, WILDCARD.into());
                        if let Some(known) = self.attributor.known_columns(table, frame) {
                            columns.extend(known);
                        }
                    }
                    None => {
                        let column = ColumnRef::qualified(qualifier.clone(), WILDCARD);
                        self.record_column(&column, frame, out);
                    }
                }
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::SchemaCatalog,
        query::{SqlDialect, parse_statement}
    };

    fn flatten(catalog: &SchemaCatalog, max_depth: usize, sql: &str) -> ScopeOutput {
        let stmt = parse_statement(sql, SqlDialect::Generic).unwrap();
        SubqueryFlattener::new(ColumnAttributor::new(catalog), max_depth).flatten(&stmt)
    }

    fn cols(out: &ScopeOutput, table: &str) -> Vec<String> {
        out.columns
            .get(table)
            .map(|c| c.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_derived_table_alias_is_pseudo_table() {
        let catalog = SchemaCatalog::from_tables([("orders", vec!["id", "total"])]);
        let out = flatten(
            &catalog,
            32,
            "SELECT t.total FROM (SELECT id, total FROM orders) t"
        );
        assert!(out.tables.contains("t"));
        assert!(out.tables.contains("orders"));
        assert_eq!(cols(&out, "t"), vec!["total"]);
        assert_eq!(cols(&out, "orders"), vec!["id", "total"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_correlated_subquery_sees_outer_alias() {
        let catalog = SchemaCatalog::from_tables([
            ("users", vec!["id", "name"]),
            ("orders", vec!["id", "user_id"])
        ]);
        let out = flatten(
            &catalog,
            32,
            "SELECT name FROM users u WHERE EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id)"
        );
        assert_eq!(cols(&out, "users"), vec!["id", "name"]);
        assert_eq!(cols(&out, "orders"), vec!["user_id"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_depth_bound_skips_only_the_deep_branch() {
        let catalog = SchemaCatalog::from_tables([("users", vec!["id", "name"])]);
        let out = flatten(
            &catalog,
            0,
            "SELECT name FROM users WHERE id IN (SELECT id FROM users)"
        );
        assert_eq!(cols(&out, "users"), vec!["id", "name"]);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::ParseDepthExceeded);
    }

    #[test]
    fn test_insert_select_records_target_and_source() {
        let catalog = SchemaCatalog::from_tables([
            ("archive", vec!["id", "name"]),
            ("users", vec!["id", "name"])
        ]);
        let out = flatten(
            &catalog,
            32,
            "INSERT INTO archive (id, name) SELECT id, name FROM users"
        );
        assert_eq!(cols(&out, "archive"), vec!["id", "name"]);
        assert_eq!(cols(&out, "users"), vec!["id", "name"]);
        assert!(out.projection.is_empty());
    }

    #[test]
    fn test_wildcard_recorded_and_expanded_through_cte() {
        let catalog = SchemaCatalog::from_tables([("users", vec!["id", "name"])]);
        let out = flatten(
            &catalog,
            32,
            "WITH u AS (SELECT * FROM users) SELECT name FROM u"
        );
        assert_eq!(cols(&out, "users"), vec!["*"]);
        assert_eq!(cols(&out, "u"), vec!["name"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_qualified_function_argument_records_call_text() {
        let catalog = SchemaCatalog::from_tables([("users", vec!["id"])]);
        let out = flatten(&catalog, 32, "SELECT COUNT(u.id) FROM users u");
        assert_eq!(cols(&out, "users"), vec!["COUNT(u.id)", "id"]);
    }
}
