//! Rewrite submodule references to point at the new host.
//!
//! Works on a full clone: every remote-tracking branch is checked out in
//! turn, and when its `.gitmodules` contains the source host string, every
//! occurrence is replaced and the change is committed with a fixed,
//! tool-attributed message.
use std::path::Path;

use crate::errors::MigraError;
use crate::git;

/// Submodule configuration file at the working-tree root.
const GITMODULES: &str = ".gitmodules";

/// Commit message identifying the tool as the author of the rewrite.
const REWRITE_COMMIT_MESSAGE: &str = "Rewrite submodule URLs for migration (migra)";

/// Parse the output of the remote branch listing into branch names.
///
/// Lines are of the form `origin/<branch>` or `origin/HEAD -> origin/<branch>`.
/// The `HEAD` alias line is excluded; its target already appears as its own
/// line.
pub(crate) fn parse_remote_branches(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(" -> "))
        .filter_map(|line| line.strip_prefix("origin/"))
        .map(str::to_string)
        .collect()
}

/// Replace the source host string in submodule configuration content.
///
/// Returns `None` when the content contains no occurrence, making repeated
/// rewrites a no-op.
pub(crate) fn rewrite_content(content: &str, from: &str, to: &str) -> Option<String> {
    if content.contains(from) {
        Some(content.replace(from, to))
    } else {
        None
    }
}

/// Rewrite submodule references on every remote branch of a full clone.
///
/// Returns the number of branches that received a rewrite commit.
pub(crate) async fn rewrite_submodules(
    dir: &Path,
    from: &str,
    to: &str,
) -> Result<usize, MigraError> {
    let listing = git::remote_branch_lines(dir).await?;
    let branches = parse_remote_branches(&listing);
    let gitmodules = dir.join(GITMODULES);
    let mut rewritten = 0;
    for branch in branches {
        git::checkout(dir, &branch).await?;
        if !gitmodules.exists() {
            continue;
        }
        let content = tokio::fs::read_to_string(&gitmodules).await?;
        let Some(updated) = rewrite_content(&content, from, to) else {
            continue;
        };
        tokio::fs::write(&gitmodules, updated).await?;
        git::commit_all(dir, REWRITE_COMMIT_MESSAGE).await?;
        rewritten += 1;
    }
    Ok(rewritten)
}
