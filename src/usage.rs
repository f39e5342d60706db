//! Usage aggregation over resolved statements.
//!
//! Counts how often each statement kind, table and `table.column` pair
//! occurs across a set of [`ParsedStatement`]s. The `AMBIGUOUS` and
//! `UNKNOWN` buckets are not counted as tables.

use std::collections::BTreeMap;

use compact_str::CompactString;
use serde::Serialize;

use crate::{query::DmlKind, resolve::ParsedStatement};

/// One usage count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCount {
    pub name:  CompactString,
    pub count: usize
}

/// Aggregated usage across statements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub statements: usize,
    pub by_kind:    BTreeMap<DmlKind, usize>,
    /// Tables by descending count, ties in name order
    pub tables:     Vec<UsageCount>,
    /// `table.column` pairs by descending count, ties in name order
    pub columns:    Vec<UsageCount>
}

impl UsageSummary {
    pub fn from_statements<'a>(statements: impl IntoIterator<Item = &'a ParsedStatement>) -> Self {
        let mut summary = Self::default();
        let mut tables: BTreeMap<CompactString, usize> = BTreeMap::new();
        let mut columns: BTreeMap<CompactString, usize> = BTreeMap::new();

        for stmt in statements {
            summary.statements += 1;
            *summary.by_kind.entry(stmt.dml).or_default() += 1;
            for (table, column) in stmt.qualified_columns() {
                *columns
                    .entry(CompactString::from(format!("{}.{}", table, column)))
                    .or_default() += 1;
            }
            for table in &stmt.tables {
                *tables.entry(table.clone()).or_default() += 1;
            }
        }

        summary.tables = ranked(tables);
        summary.columns = ranked(columns);
        summary
    }

    pub fn count_of(&self, kind: DmlKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or_default()
    }
}

fn ranked(counts: BTreeMap<CompactString, usize>) -> Vec<UsageCount> {
    let mut ranked: Vec<UsageCount> = counts
        .into_iter()
        .map(|(name, count)| UsageCount {
            name,
            count
        })
        .collect();
    // stable sort keeps name order for ties
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::AMBIGUOUS;

    fn stmt(dml: DmlKind, tables: &[&str], columns: &[(&str, &str)]) -> ParsedStatement {
        let mut s = ParsedStatement::empty(dml);
        for t in tables {
            s.tables.insert((*t).into());
        }
        for (t, c) in columns {
            s.columns
                .entry((*t).into())
                .or_default()
                .insert((*c).into());
        }
        s
    }

    #[test]
    fn test_counts_kinds_tables_and_columns() {
        let statements = [
            stmt(DmlKind::Select, &["users"], &[("users", "id")]),
            stmt(DmlKind::Select, &["users", "orders"], &[("users", "id"), (AMBIGUOUS, "x")]),
            stmt(DmlKind::Insert, &["orders"], &[("orders", "total")]),
        ];
        let summary = UsageSummary::from_statements(&statements);
        assert_eq!(summary.statements, 3);
        assert_eq!(summary.count_of(DmlKind::Select), 2);
        assert_eq!(summary.count_of(DmlKind::Delete), 0);
        assert_eq!(summary.tables[0].count, 2);
        assert_eq!(summary.tables[0].name, "orders");
        assert_eq!(summary.tables[1].name, "users");
        assert_eq!(summary.columns[0].name, "users.id");
        assert_eq!(summary.columns[0].count, 2);
        assert!(summary.columns.iter().all(|c| !c.name.starts_with(AMBIGUOUS)));
    }
}
