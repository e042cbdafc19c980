//! Wrappers around the hosting-platform CLI (`gh`).
//!
//! The existence probe queries the destination directly: it answers "does
//! `owner/name` already exist at the target host" independently of any
//! source-side naming.
use crate::errors::{MigraError, MigraErrorKind};
use crate::git::{run, run_checked};

/// Name of the hosting-platform CLI executable.
pub(crate) const HOST_BIN: &str = "gh";

/// Exit status the hosting CLI uses for authentication failures.
const HOST_AUTH_ERROR: i32 = 4;

/// Check whether `owner/name` already exists at the destination.
///
/// A successful probe means the repository exists and a failing probe means
/// it does not, except for an authentication failure, which aborts the task:
/// a broken session must not be mistaken for "not found" and lead to a
/// half-migrated repository.
pub(crate) async fn repo_exists(owner: &str, name: &str) -> Result<bool, MigraError> {
    let slug = format!("{owner}/{name}");
    let output = run(HOST_BIN, &["repo", "view", &slug], None).await?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    interpret_probe(
        output.status.success(),
        output.status.code(),
        &slug,
        stderr.trim(),
    )
}

/// Decide the probe outcome from the exit status and captured stderr.
fn interpret_probe(
    success: bool,
    code: Option<i32>,
    slug: &str,
    stderr: &str,
) -> Result<bool, MigraError> {
    if success {
        return Ok(true);
    }
    if code == Some(HOST_AUTH_ERROR) {
        let text = format!("'{HOST_BIN} repo view {slug}' failed: {stderr}");
        return Err(MigraError::new(MigraErrorKind::ToolStep).with_text(&text));
    }
    Ok(false)
}

/// Create a private repository `owner/name` at the destination.
pub(crate) async fn create_private_repo(owner: &str, name: &str) -> Result<(), MigraError> {
    let slug = format!("{owner}/{name}");
    run_checked(HOST_BIN, &["repo", "create", &slug, "--private"], None).await?;
    Ok(())
}

/// Build the ssh push URL for `owner/name` on the destination host.
pub(crate) fn push_url(host: &str, owner: &str, name: &str) -> String {
    format!("git@{host}:{owner}/{name}.git")
}
