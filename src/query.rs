//! SQL parsing adapter.
//!
//! Wraps `sqlparser` and lowers its AST into the closed node tree in
//! [`types`], which is all the resolution stages ever see.

mod extract;
pub mod types;

pub(crate) use extract::object_name_tail;
pub use extract::{lower_query, lower_statement};
use sqlparser::{
    dialect::{Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect},
    parser::Parser
};
use serde::Deserialize;
use tracing::debug;
pub use types::{
    ColumnRef, Cte, DeleteStatement, DerivedTable, DmlKind, Expr, FunctionCall, InsertStatement,
    ProjectionItem, Scope, Statement, TableRef, UpdateStatement
};

use crate::error::{AppResult, statement_parse_error};

/// SQL dialect for parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SqlDialect {
    Generic,
    MySQL,
    #[default]
    #[serde(alias = "postgres")]
    PostgreSQL,
    SQLite,
    MsSql
}

impl SqlDialect {
    /// Convert to sqlparser dialect for parsing
    pub fn into_parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::MySQL => Box::new(MySqlDialect {}),
            Self::PostgreSQL => Box::new(PostgreSqlDialect {}),
            Self::SQLite => Box::new(SQLiteDialect {}),
            Self::MsSql => Box::new(MsSqlDialect {})
        }
    }
}

/// Parse the single statement held in `sql`.
///
/// # Errors
///
/// Returns a parse failure if the text does not parse or holds no statement.
/// Trailing statements after the first are ignored.
pub fn parse_statement(sql: &str, dialect: SqlDialect) -> AppResult<Statement> {
    let parser_dialect = dialect.into_parser_dialect();
    let statements = Parser::parse_sql(parser_dialect.as_ref(), sql)
        .map_err(|e| statement_parse_error(e.to_string()))?;
    if statements.len() > 1 {
        debug!(
            count = statements.len(),
            "statement text holds several statements, using the first"
        );
    }
    statements
        .first()
        .map(lower_statement)
        .ok_or_else(|| statement_parse_error("no SQL statement found"))
}
