//! Application logic for the CRUD lineage CLI.
//!
//! This module contains the core application logic separated from the main
//! entry point to enable testing.
//!
//! # Module Structure
//!
//! - [`types`] - Parameters, input documents and reports
//! - [`convert`] - CLI to internal type conversions
//! - [`helpers`] - Input loading and exit codes
//! - [`mapper_xml`] - MyBatis mapper XML decoding
//! - [`analyze`] - Resolve and lineage pipelines

mod analyze;
mod convert;
mod helpers;
mod mapper_xml;
mod types;

pub use analyze::{lineage_report, resolve_report, run_lineage, run_resolve};
pub use convert::{build_params, convert_dialect, convert_format};
pub use helpers::{
    calculate_exit_code, decode_document, load_catalog, load_document, load_mapper, load_records,
    read_input
};
pub use mapper_xml::parse_mapper_xml;
pub use types::{
    CommandOutput, LineageParams, LineageReport, MapperDocument, MapperStatement, ResolveReport,
    ResolvedEntry, RunParams
};

use crate::{
    cli::{Cli, Commands, Format},
    config::Config,
    error::AppResult
};

/// Dispatch a parsed command line.
///
/// `progress` enables the stderr spinner; it is ignored for JSON and YAML
/// output.
///
/// # Errors
///
/// Returns an error if the worker pool cannot be started.
pub fn run(cli: &Cli, config: &Config, progress: bool) -> AppResult<CommandOutput> {
    let common = cli.command.common();
    let params = build_params(common, config, progress && common.output_format == Format::Text);
    match &cli.command {
        Commands::Resolve {
            ..
        } => run_resolve(&params),
        Commands::Lineage {
            dao,
            logic,
            ..
        } => {
            let lineage = LineageParams {
                dao_paths:   dao.clone(),
                logic_paths: logic.clone()
            };
            run_lineage(&params, &lineage)
        }
    }
}
