use std::collections::{BTreeMap, BTreeSet};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::{diagnostics::Diagnostic, lineage::CrudKind, query::DmlKind};

/// Pseudo-table receiving unqualified columns found in several tables
pub const AMBIGUOUS: &str = "AMBIGUOUS";
/// Pseudo-table receiving columns that match no alias and no schema entry
pub const UNKNOWN: &str = "UNKNOWN";

/// Identifier of a SQL statement: mapper namespace plus statement id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatementId {
    #[serde(default)]
    pub namespace: CompactString,
    pub id:        CompactString
}

impl StatementId {
    pub fn new(namespace: impl Into<CompactString>, id: impl Into<CompactString>) -> Self {
        Self {
            namespace: namespace.into(),
            id:        id.into()
        }
    }

    /// Split `UserMapper.selectById` at the last `.`; text without a dot is
    /// a bare id with an empty namespace
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once('.') {
            Some((namespace, id)) => Self::new(namespace, id),
            None => Self::new("", text)
        }
    }

    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty()
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}.{}", self.namespace, self.id)
        }
    }
}

/// Resolution result for one SQL statement.
///
/// Collections are ordered lexically so that resolving the same tree twice
/// yields identical output regardless of traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedStatement {
    pub dml:     DmlKind,
    /// Canonical names of every table and pseudo-table in any scope
    pub tables:  BTreeSet<CompactString>,
    /// Table → columns, including the [`AMBIGUOUS`] and [`UNKNOWN`] buckets
    pub columns: BTreeMap<CompactString, BTreeSet<CompactString>>
}

impl ParsedStatement {
    pub fn empty(dml: DmlKind) -> Self {
        Self {
            dml,
            tables: BTreeSet::new(),
            columns: BTreeMap::new()
        }
    }

    pub fn crud(&self) -> CrudKind {
        CrudKind::from(self.dml)
    }

    pub fn columns_of(&self, table: &str) -> Option<&BTreeSet<CompactString>> {
        self.columns.get(table)
    }

    pub fn ambiguous_columns(&self) -> impl Iterator<Item = &CompactString> {
        self.columns.get(AMBIGUOUS).into_iter().flatten()
    }

    pub fn unknown_columns(&self) -> impl Iterator<Item = &CompactString> {
        self.columns.get(UNKNOWN).into_iter().flatten()
    }

    /// `table.column` pairs for real tables only
    pub fn qualified_columns(&self) -> impl Iterator<Item = (&CompactString, &CompactString)> {
        self.columns
            .iter()
            .filter(|(table, _)| table.as_str() != AMBIGUOUS && table.as_str() != UNKNOWN)
            .flat_map(|(table, cols)| cols.iter().map(move |c| (table, c)))
    }
}

/// Parsed statement together with the diagnostics produced while resolving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub statement:   ParsedStatement,
    pub diagnostics: Vec<Diagnostic>
}
