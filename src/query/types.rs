//! Closed node tree produced by the parsing adapter.
//!
//! Resolution never looks at `sqlparser` types. Every statement is lowered
//! into this small, fixed set of node kinds so that each resolution stage can
//! match exhaustively on it.

use compact_str::CompactString;
use serde::Serialize;

/// Kind of a DML statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DmlKind {
    Select,
    Insert,
    Update,
    Delete,
    Unknown
}

impl std::fmt::Display for DmlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Unknown => write!(f, "UNKNOWN")
        }
    }
}

/// A lowered SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Scope),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Unknown
}

impl Statement {
    /// Statement kind, see [`crate::resolve::classify`]
    pub fn classify(&self) -> DmlKind {
        crate::resolve::classify(self)
    }

    /// CTEs declared at the top of the statement, in declaration order
    pub fn ctes(&self) -> &[Cte] {
        match self {
            Self::Select(scope) => &scope.ctes,
            Self::Insert(insert) => insert
                .source
                .as_ref()
                .map(|s| s.ctes.as_slice())
                .unwrap_or_default(),
            Self::Update(update) => &update.scope.ctes,
            Self::Delete(delete) => &delete.scope.ctes,
            Self::Unknown => &[]
        }
    }
}

/// A FROM/JOIN table reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name:  CompactString,
    pub alias: Option<CompactString>
}

impl TableRef {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name:  name.into(),
            alias: None
        }
    }

    pub fn aliased(name: impl Into<CompactString>, alias: impl Into<CompactString>) -> Self {
        Self {
            name:  name.into(),
            alias: Some(alias.into())
        }
    }

    /// Alias if present, otherwise the bare table name
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A column reference, optionally qualified by an alias or table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    qualifier: Option<CompactString>,
    pub name:  CompactString
}

impl ColumnRef {
    pub fn bare(name: impl Into<CompactString>) -> Self {
        Self {
            qualifier: None,
            name:      name.into()
        }
    }

    pub fn qualified(qualifier: impl Into<CompactString>, name: impl Into<CompactString>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name:      name.into()
        }
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

/// Function or aggregate call with its argument expressions
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: CompactString,
    /// Rendered call text, e.g. `COUNT(u.id)`
    pub text: CompactString,
    pub args: Vec<Expr>
}

/// Expression nodes relevant to column attribution
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Function(FunctionCall),
    Subquery(Box<Scope>)
}

/// One item of a SELECT list, as seen by enclosing scopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionItem {
    Named(CompactString),
    Wildcard { qualifier: Option<CompactString> }
}

/// Common table expression
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub alias:   CompactString,
    /// Columns listed as `WITH name (a, b) AS ...`
    pub columns: Vec<CompactString>,
    pub body:    Scope
}

/// Subquery used as a table source (`FROM (SELECT ...) t`) or a set
/// operation branch (no alias)
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTable {
    pub alias:   Option<CompactString>,
    pub columns: Vec<CompactString>,
    pub body:    Scope
}

/// One query scope: a SELECT body with its own FROM clause
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scope {
    pub ctes:       Vec<Cte>,
    pub tables:     Vec<TableRef>,
    pub derived:    Vec<DerivedTable>,
    pub exprs:      Vec<Expr>,
    pub projection: Vec<ProjectionItem>
}

impl Scope {
    /// Table references of this scope only
    pub fn table_references(&self) -> &[TableRef] {
        &self.tables
    }

    /// Column references of this scope, including function arguments, but
    /// not those inside nested subqueries
    pub fn column_references(&self) -> Vec<&ColumnRef> {
        fn walk<'a>(expr: &'a Expr, out: &mut Vec<&'a ColumnRef>) {
            match expr {
                Expr::Column(col) => out.push(col),
                Expr::Function(func) => func.args.iter().for_each(|a| walk(a, out)),
                Expr::Subquery(_) => {}
            }
        }
        let mut out = Vec::new();
        for expr in &self.exprs {
            walk(expr, &mut out);
        }
        out
    }

    /// Table-source subqueries with their aliases
    pub fn subqueries(&self) -> &[DerivedTable] {
        &self.derived
    }

    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table:       TableRef,
    pub columns:     Vec<CompactString>,
    /// `INSERT ... SELECT` source query
    pub source:      Option<Scope>,
    /// Upsert branch, resolved as an update of the target table
    pub on_conflict: Option<UpdateStatement>
}

impl InsertStatement {
    pub fn target_columns(&self) -> &[CompactString] {
        &self.columns
    }

    /// Columns written by `DO UPDATE SET` / `ON DUPLICATE KEY UPDATE`
    pub fn upsert_targets(&self) -> &[CompactString] {
        self.on_conflict
            .as_ref()
            .map(UpdateStatement::set_targets)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub targets: Vec<CompactString>,
    /// Target table first, then SET values and WHERE predicates
    pub scope:   Scope
}

impl UpdateStatement {
    pub fn set_targets(&self) -> &[CompactString] {
        &self.targets
    }

    pub fn target_table(&self) -> Option<&TableRef> {
        self.scope.tables.first()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table first, then WHERE predicates
    pub scope: Scope
}

impl DeleteStatement {
    pub fn target_table(&self) -> Option<&TableRef> {
        self.scope.tables.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_references_skip_subqueries() {
        let scope = Scope {
            exprs: vec![
                Expr::Column(ColumnRef::bare("id")),
                Expr::Function(FunctionCall {
                    name: "COUNT".into(),
                    text: "COUNT(u.id)".into(),
                    args: vec![Expr::Column(ColumnRef::qualified("u", "id"))]
                }),
                Expr::Subquery(Box::new(Scope {
                    exprs: vec![Expr::Column(ColumnRef::bare("hidden"))],
                    ..Default::default()
                })),
            ],
            ..Default::default()
        };
        let cols = scope.column_references();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[1].qualifier(), Some("u"));
    }

    #[test]
    fn test_table_ref_key() {
        assert_eq!(TableRef::new("users").key(), "users");
        assert_eq!(TableRef::aliased("users", "u").key(), "u");
    }
}
