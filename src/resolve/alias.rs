//! Alias maps: alias-or-bare-name → canonical table, one per scope.

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::{
    catalog::fold,
    diagnostics::{Diagnostic, DiagnosticKind},
    query::Scope
};

/// One alias entry, keeping the alias as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub alias: CompactString,
    pub table: CompactString
}

/// Alias → canonical table mapping for one scope.
///
/// Keys are case-folded; insertion order is kept so that wildcard expansion
/// follows FROM order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: IndexMap<CompactString, AliasEntry>
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the one it replaced
    pub fn insert(
        &mut self,
        alias: impl Into<CompactString>,
        table: impl Into<CompactString>
    ) -> Option<AliasEntry> {
        let alias = alias.into();
        let entry = AliasEntry {
            alias: alias.clone(),
            table: table.into()
        };
        self.entries.insert(fold(&alias), entry)
    }

    /// Canonical table behind `alias`
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(&fold(alias)).map(|e| e.table.as_str())
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(&fold(alias))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AliasEntry> {
        self.entries.values()
    }

    /// Distinct canonical tables in FROM order
    pub fn tables(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.values() {
            if !seen.iter().any(|t| t.eq_ignore_ascii_case(&entry.table)) {
                seen.push(&entry.table);
            }
        }
        seen
    }
}

/// Build the alias map of one scope's own FROM/JOIN references.
///
/// Subquery and CTE bodies are not visited. `canonical` maps a written table
/// name to its canonical spelling. A reused alias keeps the last table and
/// yields a `DuplicateAlias` diagnostic.
pub fn resolve_aliases(
    scope: &Scope,
    canonical: impl Fn(&str) -> CompactString
) -> (AliasMap, Vec<Diagnostic>) {
    let mut map = AliasMap::new();
    let mut diagnostics = Vec::new();
    for table in scope.table_references() {
        let target = canonical(&table.name);
        if let Some(previous) = map.insert(table.key(), target.clone()) {
            diagnostics.push(duplicate_alias(table.key(), &previous.table, &target));
        }
    }
    (map, diagnostics)
}

pub(crate) fn duplicate_alias(alias: &str, previous: &str, table: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::DuplicateAlias,
        format!(
            "alias '{}' refers to '{}' and '{}'; using '{}'",
            alias, previous, table, table
        )
    )
    .with_subject(alias)
}
