use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// CRUD Lineage - Trace which business operation reads or writes which
/// tables and columns
#[derive(Parser, Debug)]
#[command(name = "crud-lineage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve SQL statements into tables and columns
    Resolve {
        #[command(flatten)]
        common: CommonArgs
    },
    /// Join logic calls, DAO methods and resolved statements into lineage
    Lineage {
        #[command(flatten)]
        common: CommonArgs,

        /// DAO method record files (JSON or YAML)
        #[arg(short, long, required = true, num_args = 1..)]
        dao: Vec<PathBuf>,

        /// Logic call record files (JSON or YAML)
        #[arg(short, long, required = true, num_args = 1..)]
        logic: Vec<PathBuf>
    }
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Schema files: DDL (.sql) or JSON table → columns; later files
    /// replace same-named tables
    #[arg(short, long, num_args = 1..)]
    pub schema: Vec<PathBuf>,

    /// Mapper statement files: MyBatis XML, JSON or YAML. Quote YAML SQL
    /// holding `#{...}`, since ` #` starts a YAML comment
    #[arg(short = 'q', long = "statements", required = true, num_args = 1..)]
    pub statements: Vec<PathBuf>,

    /// SQL dialect for parsing (overrides config)
    #[arg(long, value_enum)]
    pub dialect: Option<Dialect>,

    /// Maximum CTE/subquery nesting depth (overrides config)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Worker threads (overrides config)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Treat statement text as plain SQL instead of mapper templates
    #[arg(long)]
    pub plain_sql: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    pub output_format: Format,

    /// Enable verbose output and info-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dialect {
    Generic,
    Mysql,
    Postgresql,
    Sqlite,
    Mssql
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Resolve {
                common
            }
            | Self::Lineage {
                common, ..
            } => common
        }
    }
}
