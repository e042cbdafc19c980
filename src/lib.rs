//! # migra
//!
//! Bulk-migrate git repositories to a new hosting account
//!
//! ## Usage
//!
//! ```txt
//! Usage: migra [OPTIONS] --owner <OWNER> [URLS]...
//!
//! Arguments:
//!  [URLS]...  Repository URLs to migrate
//!
//! Options:
//!  -o, --owner <OWNER>                The target owner to create the migrated repositories under
//!  -f, --file <FILE>                  File containing newline-separated repository URLs
//!  -r, --rewrite-from <REWRITE_FROM>  Source host string to rewrite in submodule configurations
//!  -j, --jobs <JOBS>                  Maximum number of concurrent migrations
//!  -c, --config <CONFIG>              Custom configuration file path
//!  -h, --help                         Print help
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![deny(
    missing_docs,
    clippy::all,
    clippy::missing_docs_in_private_items,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![warn(clippy::multiple_crate_versions)]

pub(crate) mod cli;
pub(crate) mod config;
pub(crate) mod errors;
pub(crate) mod git;
pub(crate) mod host;
pub(crate) mod pipeline;
pub(crate) mod queue;
pub(crate) mod resolver;
pub(crate) mod rewrite;

pub use cli::{migra_main, MigraCli};
pub use config::MigraConfig;
pub use errors::MigraError;
