//! Mapper-text preprocessing.
//!
//! SQL taken from data-access mapper files carries templating that
//! `sqlparser` rejects: parameter placeholders, string substitutions and
//! dynamic XML elements. This module rewrites it into plain SQL while
//! collecting the parameter names it removed.
//!
//! # Supported Sources
//!
//! - **MyBatis**: `#{...}`, `${...}`, `<if>`, `<where>`, `<set>`, `<trim>`,
//!   `<foreach>`, `<choose>`, `<include>`, `<bind>`, CDATA and XML entities
//! - **Plain**: passed through unchanged
//!
//! # Example
//!
//! ```
//! use crud_lineage::preprocessor::{Preprocessor, SqlSource};
//!
//! let sql = r#"SELECT * FROM users <where><if test="id != null">AND id = #{id}</if></where>"#;
//! let result = Preprocessor::new(SqlSource::MyBatis).process(sql);
//!
//! assert_eq!(result.sql, "SELECT * FROM users WHERE id = ?");
//! assert_eq!(result.metadata.parameters, vec!["id"]);
//! ```

pub mod mybatis;

use compact_str::CompactString;
use serde::Deserialize;

use crate::query::SqlDialect;

/// Where the SQL text comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlSource {
    /// Plain SQL, no templating
    Plain,
    /// MyBatis mapper statement body
    #[default]
    MyBatis
}

/// How bound parameters are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placeholder {
    /// `?`
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL reads `?` as an operator)
    Numbered
}

impl Placeholder {
    pub fn for_dialect(dialect: SqlDialect) -> Self {
        match dialect {
            SqlDialect::PostgreSQL => Self::Numbered,
            _ => Self::Question
        }
    }
}

/// Preprocessor for mapper templating.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    source:      SqlSource,
    placeholder: Placeholder
}

/// Metadata extracted during preprocessing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreprocessorMetadata {
    /// Bound parameters (`#{name}`) in order of first appearance
    pub parameters:    Vec<CompactString>,
    /// Text substitutions (`${name}`) in order of first appearance
    pub substitutions: Vec<CompactString>
}

/// Result of preprocessing.
#[derive(Debug)]
pub struct PreprocessorResult {
    /// Transformed SQL ready for parsing
    pub sql:      String,
    /// Extracted metadata
    pub metadata: PreprocessorMetadata
}

impl Preprocessor {
    #[must_use]
    pub fn new(source: SqlSource) -> Self {
        Self {
            source,
            placeholder: Placeholder::default()
        }
    }

    /// Render parameters the way `dialect` parses them
    #[must_use]
    pub fn for_dialect(mut self, dialect: SqlDialect) -> Self {
        self.placeholder = Placeholder::for_dialect(dialect);
        self
    }

    /// Process SQL and return transformed result with metadata.
    #[must_use]
    pub fn process(&self, sql: &str) -> PreprocessorResult {
        match self.source {
            SqlSource::MyBatis => mybatis::preprocess_with(sql, self.placeholder),
            SqlSource::Plain => PreprocessorResult {
                sql:      sql.to_string(),
                metadata: PreprocessorMetadata::default()
            }
        }
    }
}
