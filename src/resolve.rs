//! Semantic resolution of lowered SQL statements.
//!
//! Given a [`Statement`] and a read-only [`SchemaCatalog`], determine which
//! table every referenced column belongs to.
//!
//! # Stages
//!
//! - [`alias`] - alias map of one scope's FROM/JOIN references
//! - [`attribute`] - column attribution against a scope frame
//! - [`flatten`] - CTEs, derived tables and subqueries as nested scopes
//! - [`classify`] - statement kind
//!
//! # Example
//!
//! ```
//! use crud_lineage::{
//!     catalog::SchemaCatalog,
//!     query::{SqlDialect, parse_statement},
//!     resolve::{Resolver, ResolverConfig}
//! };
//!
//! let catalog = SchemaCatalog::from_tables([("users", vec!["id", "name", "status"])]);
//! let stmt = parse_statement(
//!     "SELECT u.id, name FROM users u WHERE u.status = 1",
//!     SqlDialect::Generic
//! )
//! .unwrap();
//!
//! let resolution = Resolver::new(&catalog, ResolverConfig::default()).resolve(&stmt, None);
//! let columns = resolution.statement.columns_of("users").unwrap();
//! assert_eq!(columns.len(), 3);
//! assert!(resolution.diagnostics.is_empty());
//! ```

pub mod alias;
pub mod attribute;
mod classify;
pub mod flatten;
pub mod types;

use std::collections::HashSet;

pub use alias::{AliasMap, resolve_aliases};
pub use attribute::{Attribution, ColumnAttributor};
pub use classify::classify;
pub use flatten::SubqueryFlattener;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::debug;
pub use types::{AMBIGUOUS, ParsedStatement, Resolution, StatementId, UNKNOWN};

use crate::{catalog::SchemaCatalog, diagnostics::Diagnostic, query::Statement};

/// Default bound on CTE/subquery nesting
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Resolver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Nesting levels resolved below the statement's own scope
    pub max_depth: usize
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH
        }
    }
}

/// Resolves statements against a shared catalog.
///
/// Holds no mutable state, so one resolver serves every worker thread.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a SchemaCatalog,
    config:  ResolverConfig
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a SchemaCatalog, config: ResolverConfig) -> Self {
        Self {
            catalog,
            config
        }
    }

    /// Resolve one statement. Diagnostics are tagged with `id` when given
    /// and reported once per distinct finding.
    pub fn resolve(&self, statement: &Statement, id: Option<&StatementId>) -> Resolution {
        let flattener =
            SubqueryFlattener::new(ColumnAttributor::new(self.catalog), self.config.max_depth);
        let output = flattener.flatten(statement);
        let dml = classify(statement);

        let mut seen = HashSet::new();
        let diagnostics: Vec<Diagnostic> = output
            .diagnostics
            .into_iter()
            .filter(|d| seen.insert((d.kind, d.subject.clone(), d.message.clone())))
            .map(|d| match id {
                Some(id) => d.with_statement(id.to_string()),
                None => d
            })
            .collect();

        debug!(
            statement = id.map(|i| i.to_string()).unwrap_or_default(),
            %dml,
            tables = output.tables.len(),
            diagnostics = diagnostics.len(),
            "resolved statement"
        );

        Resolution {
            statement: ParsedStatement {
                dml,
                tables: output.tables,
                columns: output.columns
            },
            diagnostics
        }
    }

    /// Resolve many statements in parallel; output keeps input order
    pub fn resolve_all(&self, statements: &[(StatementId, Statement)]) -> Vec<(StatementId, Resolution)> {
        statements
            .par_iter()
            .map(|(id, stmt)| (id.clone(), self.resolve(stmt, Some(id))))
            .collect()
    }
}
