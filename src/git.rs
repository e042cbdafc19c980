//! Wrappers around the git command-line client.
//!
//! Every invocation uses an argument vector, never a shell string, so
//! repository names and URLs derived from untrusted input cannot be
//! interpreted by a shell.
use std::path::Path;
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::errors::{MigraError, MigraErrorKind};

/// Name of the git executable.
pub(crate) const GIT_BIN: &str = "git";

/// Run an external program with captured output.
pub(crate) async fn run(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<Output, MigraError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    Ok(command.output().await?)
}

/// Run an external program and fail on a nonzero exit status.
///
/// The failure carries the program name, its arguments and the captured
/// stderr so the per-repository log line explains what broke.
pub(crate) async fn run_checked(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<Output, MigraError> {
    let output = run(program, args, cwd).await?;
    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = format!("'{program} {}' failed: {}", args.join(" "), stderr.trim());
        Err(MigraError::new(MigraErrorKind::ToolStep).with_text(&text))
    }
}

/// Check that an executable is resolvable on the search path.
pub(crate) async fn check_installed(executable: &str) -> Result<(), MigraError> {
    let output = run("which", &[executable], None).await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(MigraError::new(MigraErrorKind::ToolMissing)
            .with_text(&format!("{executable} is not installed or in PATH")))
    }
}

/// Mirror-clone a repository (all refs, no working tree).
pub(crate) async fn clone_mirror(url: &str, dest: &Path) -> Result<(), MigraError> {
    let dest = dest.to_string_lossy();
    run_checked(GIT_BIN, &["clone", "--mirror", url, &dest], None).await?;
    Ok(())
}

/// Clone a repository with a checked-out working tree.
pub(crate) async fn clone_full(url: &str, dest: &Path) -> Result<(), MigraError> {
    let dest = dest.to_string_lossy();
    run_checked(GIT_BIN, &["clone", url, &dest], None).await?;
    Ok(())
}

/// Remove the clone's reference to its origin.
pub(crate) async fn remote_remove_origin(dir: &Path) -> Result<(), MigraError> {
    run_checked(GIT_BIN, &["remote", "remove", "origin"], Some(dir)).await?;
    Ok(())
}

/// List remote-tracking branch lines as reported by the client.
pub(crate) async fn remote_branch_lines(dir: &Path) -> Result<String, MigraError> {
    let output = run_checked(GIT_BIN, &["branch", "-r"], Some(dir)).await?;
    Ok(std::str::from_utf8(&output.stdout)?.to_string())
}

/// Check out a branch in the working tree.
pub(crate) async fn checkout(dir: &Path, branch: &str) -> Result<(), MigraError> {
    run_checked(GIT_BIN, &["checkout", branch], Some(dir)).await?;
    Ok(())
}

/// Commit all tracked changes with the given message.
pub(crate) async fn commit_all(dir: &Path, message: &str) -> Result<(), MigraError> {
    run_checked(GIT_BIN, &["commit", "-a", "-m", message], Some(dir)).await?;
    Ok(())
}

/// Mirror-push all refs to the destination URL.
pub(crate) async fn push_mirror(dir: &Path, dest_url: &str) -> Result<(), MigraError> {
    run_checked(GIT_BIN, &["push", "--mirror", dest_url], Some(dir)).await?;
    Ok(())
}
