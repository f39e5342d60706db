//! # CRUD Lineage
//!
//! Static CRUD lineage: which business-logic method reads or writes which
//! tables and columns, through which DAO method and SQL statement.
//!
//! # Quick Start
//!
//! ```bash
//! # Resolve mapper statements against a schema
//! crud-lineage resolve -s schema.sql -q mappers/UserMapper.xml mappers/order.json
//!
//! # Join logic calls and DAO methods with the resolved statements
//! crud-lineage lineage -s schema.sql -q mappers/*.json -d dao.json -l logic.json -f json
//! ```
//!
//! Statement files are MyBatis mapper XML (`.xml`) or JSON/YAML documents of
//! the form `{namespace, statements: [{id, sql}]}`. In YAML, quote any SQL
//! holding `#{...}` parameters; an unquoted ` #` starts a comment.
//!
//! # Exit Codes
//!
//! - `0` - Clean, or only informational diagnostics
//! - `1` - Warnings: ambiguous or unknown columns, missing statements
//! - `2` - Errors: unreadable inputs or unparsable statements
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`,
//! `info` with `--verbose`).

use std::{
    io::{IsTerminal, stderr},
    process
};

use clap::Parser;
use crud_lineage::{
    app::run,
    cli::Cli,
    config::Config,
    error::AppResult
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.command.common().verbose);

    match execute(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn execute(cli: &Cli) -> AppResult<i32> {
    let config = Config::load()?;
    let output = run(cli, &config, stderr().is_terminal())?;
    for line in &output.stdout {
        println!("{}", line);
    }
    Ok(output.exit_code)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(stderr).with_ansi(stderr().is_terminal()))
        .try_init();
}
