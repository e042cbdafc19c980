//! Command line options for the migra tool
use std::fs::read_to_string;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::config::MigraConfig;
use crate::errors::MigraError;
use crate::pipeline::{self, MigrationOutcome};
use crate::{git, host, resolver};

/// migra - Bulk-migrate git repositories to a new hosting account
#[derive(Parser, Deserialize, Default, Clone, Debug)]
pub struct MigraCli {
    /// The target owner to create the migrated repositories under
    #[arg(short, long)]
    pub owner: String,

    /// File containing newline-separated repository URLs
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Source host string to rewrite in submodule configurations
    #[arg(short, long = "rewrite-from")]
    pub rewrite_from: Option<String>,

    /// Maximum number of concurrent migrations
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Custom configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Repository URLs to migrate
    pub urls: Vec<String>,
}

/// Merge positional URLs with the lines of the optional URL file.
pub(crate) fn collect_candidates(
    urls: Vec<String>,
    file_contents: Option<&str>,
) -> Vec<String> {
    let mut candidates = urls;
    if let Some(contents) = file_contents {
        candidates.extend(contents.lines().map(str::to_string));
    }
    candidates
}

/// Run the migra tool with the provided command line options
/// # Errors
/// Error if a required tool is missing, the URL file can't be read, the
/// configuration can't be loaded, or the run scratch space can't be managed
pub async fn migra_main() -> Result<(), MigraError> {
    let args = MigraCli::parse();

    // Both external tools must resolve before any repository is touched.
    git::check_installed(git::GIT_BIN).await?;
    git::check_installed(host::HOST_BIN).await?;

    let file_contents = match &args.file {
        Some(path) => Some(
            read_to_string(path)
                .map_err(|e| MigraError::new_with_source("Unable to read URL file", e))?,
        ),
        None => None,
    };
    let candidates = collect_candidates(args.urls.clone(), file_contents.as_deref());
    let resolution = resolver::resolve(candidates);

    // Ambiguous names are never auto-resolved; report the whole group and
    // move on before any migration starts.
    for (name, urls) in &resolution.duplicates {
        log::warn!(
            "{name}: {} ({})",
            MigrationOutcome::SkippedDuplicateName,
            urls.join(", ")
        );
    }

    let config = MigraConfig::try_new(args)?;
    pipeline::process(&config, resolution.eligible).await
}
