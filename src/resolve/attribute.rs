//! Column attribution: alias map first, pseudo-table and catalog schemas
//! second.

use compact_str::CompactString;
use indexmap::IndexMap;

use super::{
    alias::AliasMap,
    types::{AMBIGUOUS, UNKNOWN}
};
use crate::{
    catalog::{SchemaCatalog, fold},
    diagnostics::{Diagnostic, DiagnosticKind},
    query::ColumnRef
};

/// Columns of a CTE or derived table, known only inside one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoTable {
    pub name:    CompactString,
    pub columns: Vec<CompactString>
}

impl PseudoTable {
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Pseudo-tables visible in a scope, keyed by folded name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PseudoTables {
    tables: IndexMap<CompactString, PseudoTable>
}

impl PseudoTables {
    pub fn register(&mut self, name: impl Into<CompactString>, columns: Vec<CompactString>) {
        let name = name.into();
        self.tables.insert(fold(&name), PseudoTable {
            name,
            columns
        });
    }

    pub fn get(&self, name: &str) -> Option<&PseudoTable> {
        self.tables.get(&fold(name))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Name-resolution state of one scope, linked to its enclosing scope
#[derive(Debug)]
pub struct ScopeFrame<'a> {
    pub aliases: AliasMap,
    /// Derived tables declared in this scope's FROM clause
    pub derived: PseudoTables,
    /// CTEs visible from this scope
    pub ctes:    &'a PseudoTables,
    pub parent:  Option<&'a ScopeFrame<'a>>
}

impl<'a> ScopeFrame<'a> {
    pub fn new(aliases: AliasMap, ctes: &'a PseudoTables, parent: Option<&'a ScopeFrame<'a>>) -> Self {
        Self {
            aliases,
            derived: PseudoTables::default(),
            ctes,
            parent
        }
    }

    /// Resolve a qualifier here or in an enclosing scope
    pub fn lookup(&self, qualifier: &str) -> Option<&str> {
        self.aliases
            .get(qualifier)
            .or_else(|| self.parent.and_then(|p| p.lookup(qualifier)))
    }

    /// Pseudo-table schema for `table`, innermost declaration first
    pub fn pseudo(&self, table: &str) -> Option<&PseudoTable> {
        self.derived
            .get(table)
            .or_else(|| self.ctes.get(table))
            .or_else(|| self.parent.and_then(|p| p.pseudo(table)))
    }
}

/// Where a column reference landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    Table(CompactString),
    /// Candidate tables that all carry the column
    Ambiguous(Vec<CompactString>),
    Unknown(UnknownReason)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownReason {
    /// Qualifier names no alias or table in scope
    UnresolvedQualifier(CompactString),
    /// No in-scope table is known to have the column
    NoMatchingTable,
    /// The scope has no table references
    NoTables
}

impl Attribution {
    /// Bucket the column is recorded under
    pub fn bucket(&self) -> &str {
        match self {
            Self::Table(t) => t,
            Self::Ambiguous(_) => AMBIGUOUS,
            Self::Unknown(_) => UNKNOWN
        }
    }

    /// Diagnostic for ambiguous and unknown outcomes
    pub fn diagnostic(&self, column: &ColumnRef) -> Option<Diagnostic> {
        match self {
            Self::Table(_) => None,
            Self::Ambiguous(candidates) => Some(
                Diagnostic::new(
                    DiagnosticKind::AmbiguousColumn,
                    format!(
                        "column '{}' exists in {}; qualify it with an alias",
                        column.name,
                        candidates.join(", ")
                    )
                )
                .with_subject(column.name.clone())
            ),
            Self::Unknown(reason) => {
                let message = match reason {
                    UnknownReason::UnresolvedQualifier(q) => {
                        format!("qualifier '{}' of column '{}' does not resolve", q, column.name)
                    }
                    UnknownReason::NoMatchingTable => {
                        format!("column '{}' matches no table in scope", column.name)
                    }
                    UnknownReason::NoTables => {
                        format!("column '{}' used in a scope without tables", column.name)
                    }
                };
                let subject = match column.qualifier() {
                    Some(q) => CompactString::from(format!("{}.{}", q, column.name)),
                    None => column.name.clone()
                };
                Some(Diagnostic::new(DiagnosticKind::UnknownColumn, message).with_subject(subject))
            }
        }
    }
}

/// Attributes column references against one scope frame
#[derive(Debug, Clone, Copy)]
pub struct ColumnAttributor<'a> {
    catalog: &'a SchemaCatalog
}

impl<'a> ColumnAttributor<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self {
            catalog
        }
    }

    pub fn attribute(&self, column: &ColumnRef, frame: &ScopeFrame<'_>) -> Attribution {
        if let Some(qualifier) = column.qualifier() {
            return match frame.lookup(qualifier) {
                Some(table) => Attribution::Table(table.into()),
                None => Attribution::Unknown(UnknownReason::UnresolvedQualifier(qualifier.into()))
            };
        }

        let tables = frame.aliases.tables();
        match tables.as_slice() {
            [] => Attribution::Unknown(UnknownReason::NoTables),
            [only] => Attribution::Table((*only).into()),
            _ => {
                let mut matches: Vec<CompactString> = tables
                    .iter()
                    .filter(|t| self.has_column(t, &column.name, frame) == Some(true))
                    .map(|t| CompactString::from(*t))
                    .collect();
                match matches.len() {
                    0 => Attribution::Unknown(UnknownReason::NoMatchingTable),
                    1 => Attribution::Table(matches.remove(0)),
                    _ => Attribution::Ambiguous(matches)
                }
            }
        }
    }

    /// `None` when neither a pseudo-table nor the catalog knows `table`
    pub fn has_column(&self, table: &str, column: &str, frame: &ScopeFrame<'_>) -> Option<bool> {
        match frame.pseudo(table) {
            Some(pseudo) => Some(pseudo.contains(column)),
            None => self.catalog.has_column(table, column)
        }
    }

    /// Known columns of `table`, in declaration order
    pub fn known_columns(&self, table: &str, frame: &ScopeFrame<'_>) -> Option<Vec<CompactString>> {
        match frame.pseudo(table) {
            Some(pseudo) => Some(pseudo.columns.clone()),
            None => self.catalog.table(table).map(|t| t.columns.clone())
        }
    }

    /// Declared spelling of `column` in `table`, or the column as written
    pub fn spelling(
        &self,
        table: &str,
        column: &str,
        frame: Option<&ScopeFrame<'_>>
    ) -> CompactString {
        let declared = match frame.and_then(|f| f.pseudo(table)) {
            Some(pseudo) => pseudo
                .columns
                .iter()
                .find(|c| c.eq_ignore_ascii_case(column)),
            None => self
                .catalog
                .table(table)
                .and_then(|t| t.columns.iter().find(|c| c.eq_ignore_ascii_case(column)))
        };
        declared.cloned().unwrap_or_else(|| column.into())
    }

    /// Canonical spelling of a written table name: the visible CTE, then the
    /// catalog entry, then the name as written
    pub fn canonical(&self, name: &str, ctes: &PseudoTables) -> CompactString {
        if let Some(cte) = ctes.get(name) {
            return cte.name.clone();
        }
        match self.catalog.table(name) {
            Some(schema) => schema.name.clone(),
            None => name.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_tables([
            ("users", vec!["id", "name", "status"]),
            ("orders", vec!["id", "user_id", "total"]),
        ])
    }

    fn frame<'a>(ctes: &'a PseudoTables, entries: &[(&str, &str)]) -> ScopeFrame<'a> {
        let mut aliases = AliasMap::new();
        for (alias, table) in entries {
            aliases.insert(*alias, *table);
        }
        ScopeFrame::new(aliases, ctes, None)
    }

    #[test]
    fn test_single_table_takes_every_unqualified_column() {
        let catalog = catalog();
        let ctes = PseudoTables::default();
        let frame = frame(&ctes, &[("users", "users")]);
        let attributor = ColumnAttributor::new(&catalog);
        assert_eq!(
            attributor.attribute(&ColumnRef::bare("not_in_schema"), &frame),
            Attribution::Table("users".into())
        );
    }

    #[test]
    fn test_shared_column_is_ambiguous() {
        let catalog = catalog();
        let ctes = PseudoTables::default();
        let frame = frame(&ctes, &[("u", "users"), ("o", "orders")]);
        let attributor = ColumnAttributor::new(&catalog);
        let attribution = attributor.attribute(&ColumnRef::bare("ID"), &frame);
        assert_eq!(attribution.bucket(), AMBIGUOUS);
        let diag = attribution.diagnostic(&ColumnRef::bare("ID")).unwrap();
        assert_eq!(diag.kind, DiagnosticKind::AmbiguousColumn);
    }

    #[test]
    fn test_catalog_disambiguates() {
        let catalog = catalog();
        let ctes = PseudoTables::default();
        let frame = frame(&ctes, &[("u", "users"), ("o", "orders")]);
        let attributor = ColumnAttributor::new(&catalog);
        assert_eq!(
            attributor.attribute(&ColumnRef::bare("total"), &frame),
            Attribution::Table("orders".into())
        );
    }

    #[test]
    fn test_no_catalog_with_many_tables_is_unknown() {
        let catalog = SchemaCatalog::default();
        let ctes = PseudoTables::default();
        let frame = frame(&ctes, &[("a", "alpha"), ("b", "beta")]);
        let attributor = ColumnAttributor::new(&catalog);
        assert_eq!(
            attributor.attribute(&ColumnRef::bare("x"), &frame),
            Attribution::Unknown(UnknownReason::NoMatchingTable)
        );
    }

    #[test]
    fn test_unresolved_qualifier() {
        let catalog = catalog();
        let ctes = PseudoTables::default();
        let frame = frame(&ctes, &[("u", "users")]);
        let attributor = ColumnAttributor::new(&catalog);
        let column = ColumnRef::qualified("x", "id");
        let attribution = attributor.attribute(&column, &frame);
        assert_eq!(attribution.bucket(), UNKNOWN);
        assert_eq!(
            attribution.diagnostic(&column).unwrap().subject.as_deref(),
            Some("x.id")
        );
    }

    #[test]
    fn test_qualifier_found_in_enclosing_scope() {
        let catalog = catalog();
        let ctes = PseudoTables::default();
        let outer = frame(&ctes, &[("u", "users")]);
        let mut aliases = AliasMap::new();
        aliases.insert("o", "orders");
        let inner = ScopeFrame::new(aliases, &ctes, Some(&outer));
        let attributor = ColumnAttributor::new(&catalog);
        assert_eq!(
            attributor.attribute(&ColumnRef::qualified("u", "id"), &inner),
            Attribution::Table("users".into())
        );
    }

    #[test]
    fn test_pseudo_table_shadows_catalog() {
        let catalog = catalog();
        let mut ctes = PseudoTables::default();
        ctes.register("users", vec!["only_this".into()]);
        let frame = frame(&ctes, &[("users", "users")]);
        let attributor = ColumnAttributor::new(&catalog);
        assert_eq!(attributor.has_column("users", "name", &frame), Some(false));
        assert_eq!(
            attributor.known_columns("USERS", &frame),
            Some(vec![CompactString::from("only_this")])
        );
    }
}
