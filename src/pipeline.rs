//! Concurrent migration pipeline.
//!
//! One task per eligible repository is enqueued on a shared [`WorkQueue`];
//! a pool of workers drains it, running each task through the migration
//! workflow. Any step failure aborts only that task, is logged with the
//! repository name, and never reaches sibling workers or the pipeline.
use std::collections::BTreeMap;
use std::fs::{create_dir, remove_dir_all};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tokio::task::JoinSet;

use crate::config::MigraConfig;
use crate::errors::MigraError;
use crate::queue::{RepoTask, WorkQueue};
use crate::{git, host, rewrite};

/// Terminal outcome recorded for a task once its workflow stops advancing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MigrationOutcome {
    /// The repository was pushed to the destination.
    Migrated,

    /// A repository with the same name already exists at the destination.
    SkippedExists,

    /// Several source URLs resolve to the same repository name.
    SkippedDuplicateName,

    /// A workflow step failed; the reason is the caught error.
    Failed(String),
}

impl std::fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Migrated => write!(f, "migrated"),
            Self::SkippedExists => {
                write!(f, "a repository with the same name already exists")
            }
            Self::SkippedDuplicateName => {
                write!(f, "several URLs resolve to the same repository name")
            }
            Self::Failed(reason) => write!(f, "{reason}"),
        }
    }
}

/// Boxed future returned by [`WorkflowOps`] methods.
type OpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, MigraError>> + Send + 'a>>;

/// Seam over the external commands the workflow drives.
///
/// The production implementation shells out to the git client and the
/// hosting CLI; tests substitute scripted operations to pin down where the
/// workflow stops on a skip or a failure.
trait WorkflowOps: Send + Sync {
    /// Check whether `owner/name` already exists at the destination.
    fn repo_exists<'a>(&'a self, owner: &'a str, name: &'a str) -> OpFuture<'a, bool>;

    /// Mirror-clone the source repository.
    fn clone_mirror<'a>(&'a self, url: &'a str, dest: &'a Path) -> OpFuture<'a, ()>;

    /// Clone the source repository with a working tree.
    fn clone_full<'a>(&'a self, url: &'a str, dest: &'a Path) -> OpFuture<'a, ()>;

    /// Rewrite submodule references on every remote branch of the clone.
    fn rewrite_submodules<'a>(
        &'a self,
        dir: &'a Path,
        from: &'a str,
        to: &'a str,
    ) -> OpFuture<'a, usize>;

    /// Remove the clone's reference to its origin.
    fn remote_remove_origin<'a>(&'a self, dir: &'a Path) -> OpFuture<'a, ()>;

    /// Create the private destination repository.
    fn create_repo<'a>(&'a self, owner: &'a str, name: &'a str) -> OpFuture<'a, ()>;

    /// Mirror-push all refs to the destination URL.
    fn push_mirror<'a>(&'a self, dir: &'a Path, dest_url: &'a str) -> OpFuture<'a, ()>;
}

/// [`WorkflowOps`] backed by the external tools.
struct ToolOps;

impl WorkflowOps for ToolOps {
    fn repo_exists<'a>(&'a self, owner: &'a str, name: &'a str) -> OpFuture<'a, bool> {
        Box::pin(host::repo_exists(owner, name))
    }

    fn clone_mirror<'a>(&'a self, url: &'a str, dest: &'a Path) -> OpFuture<'a, ()> {
        Box::pin(git::clone_mirror(url, dest))
    }

    fn clone_full<'a>(&'a self, url: &'a str, dest: &'a Path) -> OpFuture<'a, ()> {
        Box::pin(git::clone_full(url, dest))
    }

    fn rewrite_submodules<'a>(
        &'a self,
        dir: &'a Path,
        from: &'a str,
        to: &'a str,
    ) -> OpFuture<'a, usize> {
        Box::pin(rewrite::rewrite_submodules(dir, from, to))
    }

    fn remote_remove_origin<'a>(&'a self, dir: &'a Path) -> OpFuture<'a, ()> {
        Box::pin(git::remote_remove_origin(dir))
    }

    fn create_repo<'a>(&'a self, owner: &'a str, name: &'a str) -> OpFuture<'a, ()> {
        Box::pin(host::create_private_repo(owner, name))
    }

    fn push_mirror<'a>(&'a self, dir: &'a Path, dest_url: &'a str) -> OpFuture<'a, ()> {
        Box::pin(git::push_mirror(dir, dest_url))
    }
}

/// Shared, read-only context for every task of one pipeline run.
struct TaskContext {
    /// Target owner the repositories are created under.
    owner: String,

    /// Destination host for push URLs and rewritten submodule references.
    host: String,

    /// Source host string to rewrite in submodule configurations, if any.
    rewrite_from: Option<String>,

    /// Run-scoped scratch directory holding the per-task clones.
    work_root: PathBuf,

    /// External operations the workflow drives.
    ops: Box<dyn WorkflowOps>,
}

/// Removes a task's clone directory when dropped, on every exit path.
struct WorkdirGuard {
    /// Directory to remove.
    path: PathBuf,
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = remove_dir_all(&self.path) {
                log::warn!("Could not clean up {}: {e}", self.path.display());
            }
        }
    }
}

/// Migrate every repository in `repos` to the configured owner.
///
/// Returns only after every task reached a terminal outcome. Per-task
/// failures are reported in the log and do not fail the run.
/// # Errors
/// Error if the run-scoped scratch directory cannot be created.
pub(crate) async fn process(
    config: &MigraConfig,
    repos: BTreeMap<String, String>,
) -> Result<(), MigraError> {
    if repos.is_empty() {
        log::info!("Nothing to migrate");
        return Ok(());
    }
    let rand_string: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    let work_root = std::env::temp_dir().join(format!("tmp-{rand_string}"));
    create_dir(&work_root)?;

    let total = repos.len();
    let queue = Arc::new(WorkQueue::new(
        repos
            .into_iter()
            .map(|(name, url)| RepoTask { name, url }),
    ));
    let workers = match config.jobs() {
        Some(jobs) if jobs > 0 => jobs.min(total),
        _ => total,
    };
    let ctx = Arc::new(TaskContext {
        owner: config.owner().to_string(),
        host: config.host(),
        rewrite_from: config.rewrite_from().map(str::to_string),
        work_root: work_root.clone(),
        ops: Box::new(ToolOps),
    });
    run_pool(queue, workers, move |task| {
        let ctx = ctx.clone();
        async move { migrate_one_repo(&ctx, task).await }
    })
    .await;

    log::info!("Cleaning up {}", work_root.display());
    remove_dir_all(work_root)?;
    Ok(())
}

/// Drive a pool of workers over the queue until every task is done.
///
/// Each worker claims one task at a time, runs `migrate` on it, turns the
/// result into a log line and signals the queue. The pool returns once the
/// join barrier fires; shutting down the worker set afterwards only reaps
/// workers that already drained out.
async fn run_pool<F, Fut>(queue: Arc<WorkQueue>, workers: usize, migrate: F)
where
    F: Fn(RepoTask) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<MigrationOutcome, MigraError>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for _ in 0..workers {
        let worker_queue = queue.clone();
        let migrate = migrate.clone();
        set.spawn(async move {
            while let Some(task) = worker_queue.claim() {
                let name = task.name.clone();
                log::info!("Started processing {name}");
                let outcome = match migrate(task).await {
                    Ok(outcome) => outcome,
                    Err(e) => MigrationOutcome::Failed(e.to_string()),
                };
                match &outcome {
                    MigrationOutcome::Migrated => log::info!("{name} migrated"),
                    MigrationOutcome::Failed(reason) => {
                        log::error!("Stopped processing {name}: {reason}");
                    }
                    other => log::warn!("Stopped processing {name}: {other}"),
                }
                worker_queue.task_done();
            }
        });
    }
    queue.join().await;
    set.shutdown().await;
}

/// Run the migration workflow for one repository.
async fn migrate_one_repo(
    ctx: &TaskContext,
    task: RepoTask,
) -> Result<MigrationOutcome, MigraError> {
    let name = task.name.as_str();
    let result = migrate_steps(ctx, &task).await;
    result.map_err(|e| e.with_repo(name))
}

/// The per-repository workflow steps, failure-isolated by the caller.
async fn migrate_steps(
    ctx: &TaskContext,
    task: &RepoTask,
) -> Result<MigrationOutcome, MigraError> {
    let name = task.name.as_str();
    if ctx.ops.repo_exists(&ctx.owner, name).await? {
        return Ok(MigrationOutcome::SkippedExists);
    }

    // A mirror clone is enough unless .gitmodules must be edited, which
    // needs a working tree to check out each branch.
    let clone_dir = match &ctx.rewrite_from {
        Some(_) => ctx.work_root.join(name),
        None => ctx.work_root.join(format!("{name}.git")),
    };
    let _guard = WorkdirGuard {
        path: clone_dir.clone(),
    };
    match &ctx.rewrite_from {
        Some(from) => {
            ctx.ops.clone_full(&task.url, &clone_dir).await?;
            let to = format!("https://{}/{}", ctx.host, ctx.owner);
            let rewritten = ctx.ops.rewrite_submodules(&clone_dir, from, &to).await?;
            if rewritten > 0 {
                log::info!("{name}: rewrote submodule URLs on {rewritten} branch(es)");
            }
        }
        None => ctx.ops.clone_mirror(&task.url, &clone_dir).await?,
    }

    ctx.ops.remote_remove_origin(&clone_dir).await?;
    ctx.ops.create_repo(&ctx.owner, name).await?;
    ctx.ops
        .push_mirror(&clone_dir, &host::push_url(&ctx.host, &ctx.owner, name))
        .await?;
    Ok(MigrationOutcome::Migrated)
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Scripted [`WorkflowOps`] recording every call in invocation order.
    struct ScriptedOps {
        /// Calls seen so far, shared with the test body.
        calls: Arc<Mutex<Vec<&'static str>>>,

        /// Whether the destination already has the repository.
        existing: bool,

        /// Whether the clone step fails.
        clone_fails: bool,
    }

    impl ScriptedOps {
        /// Record one workflow call.
        fn record(&self, call: &'static str) {
            self.calls
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(call);
        }
    }

    impl WorkflowOps for ScriptedOps {
        fn repo_exists<'a>(&'a self, _owner: &'a str, _name: &'a str) -> OpFuture<'a, bool> {
            Box::pin(async move {
                self.record("exists");
                Ok(self.existing)
            })
        }

        fn clone_mirror<'a>(&'a self, _url: &'a str, _dest: &'a Path) -> OpFuture<'a, ()> {
            Box::pin(async move {
                self.record("clone");
                if self.clone_fails {
                    Err(MigraError::from("simulated clone failure"))
                } else {
                    Ok(())
                }
            })
        }

        fn clone_full<'a>(&'a self, _url: &'a str, _dest: &'a Path) -> OpFuture<'a, ()> {
            Box::pin(async move {
                self.record("clone");
                if self.clone_fails {
                    Err(MigraError::from("simulated clone failure"))
                } else {
                    Ok(())
                }
            })
        }

        fn rewrite_submodules<'a>(
            &'a self,
            _dir: &'a Path,
            _from: &'a str,
            _to: &'a str,
        ) -> OpFuture<'a, usize> {
            Box::pin(async move {
                self.record("rewrite");
                Ok(0)
            })
        }

        fn remote_remove_origin<'a>(&'a self, _dir: &'a Path) -> OpFuture<'a, ()> {
            Box::pin(async move {
                self.record("unlink");
                Ok(())
            })
        }

        fn create_repo<'a>(&'a self, _owner: &'a str, _name: &'a str) -> OpFuture<'a, ()> {
            Box::pin(async move {
                self.record("create");
                Ok(())
            })
        }

        fn push_mirror<'a>(&'a self, _dir: &'a Path, _dest_url: &'a str) -> OpFuture<'a, ()> {
            Box::pin(async move {
                self.record("push");
                Ok(())
            })
        }
    }

    /// Build a context running the workflow against scripted operations.
    fn scripted_context(ops: ScriptedOps, rewrite_from: Option<&str>) -> TaskContext {
        TaskContext {
            owner: "acme".to_string(),
            host: "github.com".to_string(),
            rewrite_from: rewrite_from.map(str::to_string),
            work_root: std::env::temp_dir().join("scripted-run"),
            ops: Box::new(ops),
        }
    }

    /// Read back the calls recorded by a [`ScriptedOps`].
    fn recorded(calls: &Arc<Mutex<Vec<&'static str>>>) -> Vec<&'static str> {
        calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Build a batch of n throwaway tasks.
    fn tasks(n: usize) -> Vec<RepoTask> {
        (0..n)
            .map(|i| RepoTask {
                name: format!("repo-{i}"),
                url: format!("https://host/repo-{i}.git"),
            })
            .collect()
    }

    #[tokio::test]
    async fn pool_reaches_a_terminal_outcome_for_every_task() {
        let queue = Arc::new(WorkQueue::new(tasks(8)));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        run_pool(queue.clone(), 8, move |_task| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(MigrationOutcome::Migrated)
            }
        })
        .await;
        assert_eq!(seen.load(Ordering::SeqCst), 8);
        assert_eq!(queue.claim(), None);
    }

    #[tokio::test]
    async fn pool_isolates_task_failures() {
        let queue = Arc::new(WorkQueue::new(tasks(6)));
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let record = outcomes.clone();
        run_pool(queue, 6, move |task| {
            let record = record.clone();
            async move {
                record
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(task.name.clone());
                if task.name.ends_with(['0', '2', '4']) {
                    Err(MigraError::from("simulated step failure"))
                } else {
                    Ok(MigrationOutcome::Migrated)
                }
            }
        })
        .await;
        let names = outcomes.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(names.len(), 6);
    }

    #[tokio::test]
    async fn pool_with_single_worker_drains_everything() {
        let queue = Arc::new(WorkQueue::new(tasks(5)));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        run_pool(queue, 1, move |_task| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(MigrationOutcome::SkippedExists)
            }
        })
        .await;
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn pool_with_empty_queue_returns_immediately() {
        let queue = Arc::new(WorkQueue::new([]));
        run_pool(queue, 4, |_task| async {
            Ok::<_, MigraError>(MigrationOutcome::Migrated)
        })
        .await;
    }

    #[tokio::test]
    async fn existing_repo_is_skipped_before_any_clone() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let ctx = scripted_context(
            ScriptedOps {
                calls: calls.clone(),
                existing: true,
                clone_fails: false,
            },
            None,
        );
        let task = RepoTask {
            name: "widget".to_string(),
            url: "https://host/widget.git".to_string(),
        };
        let outcome = migrate_steps(&ctx, &task).await;
        assert!(matches!(outcome, Ok(MigrationOutcome::SkippedExists)));
        assert_eq!(recorded(&calls), vec!["exists"]);
    }

    #[tokio::test]
    async fn clone_failure_stops_before_create_and_push() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let ctx = scripted_context(
            ScriptedOps {
                calls: calls.clone(),
                existing: false,
                clone_fails: true,
            },
            None,
        );
        let task = RepoTask {
            name: "widget".to_string(),
            url: "https://host/widget.git".to_string(),
        };
        let outcome = migrate_steps(&ctx, &task).await;
        assert!(outcome.is_err());
        assert_eq!(recorded(&calls), vec!["exists", "clone"]);
    }

    #[tokio::test]
    async fn workflow_steps_run_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let ctx = scripted_context(
            ScriptedOps {
                calls: calls.clone(),
                existing: false,
                clone_fails: false,
            },
            None,
        );
        let task = RepoTask {
            name: "widget".to_string(),
            url: "https://host/widget.git".to_string(),
        };
        let outcome = migrate_steps(&ctx, &task).await;
        assert!(matches!(outcome, Ok(MigrationOutcome::Migrated)));
        assert_eq!(
            recorded(&calls),
            vec!["exists", "clone", "unlink", "create", "push"]
        );
    }

    #[tokio::test]
    async fn rewrite_runs_between_clone_and_unlink() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let ctx = scripted_context(
            ScriptedOps {
                calls: calls.clone(),
                existing: false,
                clone_fails: false,
            },
            Some("git@old.example.org:team"),
        );
        let task = RepoTask {
            name: "widget".to_string(),
            url: "https://host/widget.git".to_string(),
        };
        let outcome = migrate_steps(&ctx, &task).await;
        assert!(matches!(outcome, Ok(MigrationOutcome::Migrated)));
        assert_eq!(
            recorded(&calls),
            vec!["exists", "clone", "rewrite", "unlink", "create", "push"]
        );
    }

    #[test]
    fn outcome_display() {
        assert_eq!(MigrationOutcome::Migrated.to_string(), "migrated");
        assert_eq!(
            MigrationOutcome::Failed("clone failed".to_string()).to_string(),
            "clone failed"
        );
    }
}
