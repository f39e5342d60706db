//! Schema catalog: the table → column ground truth.
//!
//! The catalog is only a disambiguation fallback for unqualified columns.
//! It is built once, then shared read-only (`&SchemaCatalog`) by every
//! resolver thread, so none of its public methods take `&mut self`.
//!
//! # Sources
//!
//! - DDL: `CREATE TABLE` with a column list, and `CREATE TABLE ... AS SELECT`
//!   (columns taken from the projection)
//! - JSON: `{"users": ["id", "name"], ...}`
//!
//! # Example
//!
//! ```
//! use crud_lineage::{catalog::SchemaCatalog, query::SqlDialect};
//!
//! let sql = r#"
//!     CREATE TABLE users (
//!         id INT PRIMARY KEY,
//!         name VARCHAR(255) NOT NULL
//!     );
//! "#;
//!
//! let catalog = SchemaCatalog::from_ddl(sql, SqlDialect::Generic).unwrap();
//! assert_eq!(catalog.has_column("users", "NAME"), Some(true));
//! assert_eq!(catalog.has_column("orders", "id"), None);
//! ```

use std::collections::{BTreeMap, HashSet};

use compact_str::CompactString;
use sqlparser::parser::Parser;

use crate::{
    error::{AppResult, schema_parse_error},
    query::{ProjectionItem, SqlDialect, lower_query, object_name_tail}
};

/// Columns of one catalogued table
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table name as declared
    pub name:    CompactString,
    /// Columns in declaration order
    pub columns: Vec<CompactString>,
    folded:      HashSet<CompactString>
}

impl TableSchema {
    fn new(name: CompactString, columns: Vec<CompactString>) -> Self {
        let folded = columns.iter().map(|c| fold(c)).collect();
        Self {
            name,
            columns,
            folded
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.folded.contains(&fold(column))
    }
}

/// Immutable table → column-set mapping.
///
/// Lookups are ASCII case-insensitive. Tables are stored in a `BTreeMap` for
/// deterministic iteration order.
#[derive(Debug, Default, Clone)]
pub struct SchemaCatalog {
    tables: BTreeMap<CompactString, TableSchema>
}

impl SchemaCatalog {
    /// Build a catalog from `(table, columns)` pairs; later duplicates replace
    /// earlier ones
    pub fn from_tables<T, C, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: Into<CompactString>,
        C: IntoIterator,
        C::Item: Into<CompactString>
    {
        let mut catalog = Self::default();
        for (name, columns) in tables {
            catalog.insert(name.into(), columns.into_iter().map(Into::into).collect());
        }
        catalog
    }

    /// Parse DDL with the given dialect
    ///
    /// # Errors
    ///
    /// Returns error if the DDL does not parse
    pub fn from_ddl(sql: &str, dialect: SqlDialect) -> AppResult<Self> {
        let parser_dialect = dialect.into_parser_dialect();
        let statements = Parser::parse_sql(parser_dialect.as_ref(), sql)
            .map_err(|e| schema_parse_error(e.to_string()))?;
        let mut catalog = Self::default();
        for stmt in statements {
            if let sqlparser::ast::Statement::CreateTable(create) = stmt {
                let name = object_name_tail(&create.name);
                let columns = if let Some(query) = &create.query {
                    lower_query(query)
                        .projection
                        .into_iter()
                        .filter_map(|item| match item {
                            ProjectionItem::Named(n) => Some(n),
                            ProjectionItem::Wildcard {
                                ..
                            } => None
                        })
                        .collect()
                } else {
                    create
                        .columns
                        .iter()
                        .map(|c| c.name.value.as_str().into())
                        .collect()
                };
                catalog.insert(name, columns);
            }
        }
        Ok(catalog)
    }

    /// Parse the JSON form `{"table": ["col", ...]}`
    ///
    /// # Errors
    ///
    /// Returns error if the document is not a table → column-list object
    pub fn from_json(json: &str) -> AppResult<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| schema_parse_error(format!("invalid schema JSON: {}", e)))?;
        Ok(Self::from_tables(raw))
    }

    /// Union of two catalogs; tables of `other` replace same-named ones
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.tables.extend(other.tables);
        self
    }

    fn insert(&mut self, name: CompactString, columns: Vec<CompactString>) {
        self.tables.insert(fold(&name), TableSchema::new(name, columns));
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(&fold(name))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(&fold(name))
    }

    /// `None` if the table is not catalogued, otherwise whether it has the
    /// column
    pub fn has_column(&self, table: &str, column: &str) -> Option<bool> {
        self.table(table).map(|t| t.contains(column))
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Case-folded identifier used for lookups
pub(crate) fn fold(name: &str) -> CompactString {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        name.to_ascii_lowercase().into()
    } else {
        name.into()
    }
}
