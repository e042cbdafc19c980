//! Shared work queue for the migration pipeline.
//!
//! Tasks are enqueued once, claimed by exactly one worker each, and marked
//! done independently of the claim. The join barrier releases when every
//! enqueued task has been marked done, regardless of worker lifecycles.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

/// The unit of work submitted to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepoTask {
    /// Name of the repository, also the name created under the target owner.
    pub name: String,

    /// Source URL the repository is cloned from.
    pub url: String,
}

/// Queue of pending [`RepoTask`]s shared by all workers.
#[derive(Debug)]
pub(crate) struct WorkQueue {
    /// Pending tasks, claimed from the front.
    tasks: Mutex<VecDeque<RepoTask>>,

    /// Number of tasks not yet marked done (claimed but unfinished included).
    pending: AtomicUsize,

    /// Signalled every time the pending count reaches zero.
    done: Notify,
}

impl WorkQueue {
    /// Create a queue holding the given tasks.
    pub(crate) fn new<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = RepoTask>,
    {
        let tasks: VecDeque<RepoTask> = tasks.into_iter().collect();
        let pending = tasks.len();
        Self {
            tasks: Mutex::new(tasks),
            pending: AtomicUsize::new(pending),
            done: Notify::new(),
        }
    }

    /// Claim the next pending task, if any.
    ///
    /// Each task is handed out exactly once. Claiming does not decrement the
    /// pending count; the worker must call [`WorkQueue::task_done`] once the
    /// task reaches a terminal outcome.
    pub(crate) fn claim(&self) -> Option<RepoTask> {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.pop_front()
    }

    /// Signal that one claimed task has reached a terminal outcome.
    pub(crate) fn task_done(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.done.notify_waiters();
        }
    }

    /// Wait until every enqueued task has been marked done.
    ///
    /// Returns immediately when the queue was created empty.
    pub(crate) async fn join(&self) {
        loop {
            let notified = self.done.notified();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}
