//! Tracked background tasks.
//!
//! Work that outlives the request which triggered it (auto-categorizing a
//! new feed, refreshing every feed of a user) runs here. Concurrency is
//! bounded by a semaphore and every task's state can be queried by ID.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::Result;

/// Finished tasks kept for status queries before the oldest are dropped.
const MAX_FINISHED_TASKS: usize = 256;

/// Lifecycle of a background task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "error")]
pub enum TaskState {
    /// Waiting for a free slot.
    Queued,
    Running,
    Completed,
    Failed(String),
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed(_))
    }
}

/// Snapshot of one background task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub id: u64,
    pub kind: &'static str,
    pub user_id: i64,
    #[serde(flatten)]
    pub state: TaskState,
}

struct Inner {
    semaphore: Arc<Semaphore>,
    next_id: AtomicU64,
    tasks: Mutex<BTreeMap<u64, TaskInfo>>,
}

/// Registry and runner for background tasks.
#[derive(Clone)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

impl BackgroundTasks {
    /// Create a runner allowing `max_concurrent` tasks at once.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
                next_id: AtomicU64::new(1),
                tasks: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Spawn a task and return its ID.
    ///
    /// The task waits for a free slot before it starts. Its result is
    /// logged and recorded; it is never returned to the spawner.
    pub fn spawn<F>(&self, kind: &'static str, user_id: i64, task: F) -> u64
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.set(TaskInfo {
            id,
            kind,
            user_id,
            state: TaskState::Queued,
        });

        let this = self.clone();
        tokio::spawn(async move {
            let _permit = match this.inner.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    this.finish(id, TaskState::Failed(e.to_string()));
                    return;
                }
            };

            this.update(id, TaskState::Running);
            debug!(task = kind, task_id = id, user_id, "Background task started");

            match task.await {
                Ok(()) => {
                    info!(task = kind, task_id = id, user_id, "Background task completed");
                    this.finish(id, TaskState::Completed);
                }
                Err(e) => {
                    warn!(task = kind, task_id = id, user_id, error = %e, "Background task failed");
                    this.finish(id, TaskState::Failed(e.to_string()));
                }
            }
        });

        id
    }

    /// Current state of a task, if it is still tracked.
    pub fn get(&self, id: u64) -> Option<TaskInfo> {
        self.lock().get(&id).cloned()
    }

    /// Number of tasks not yet finished.
    pub fn pending(&self) -> usize {
        self.lock()
            .values()
            .filter(|t| !t.state.is_finished())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, TaskInfo>> {
        // A poisoned map still holds valid snapshots.
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set(&self, info: TaskInfo) {
        self.lock().insert(info.id, info);
    }

    fn update(&self, id: u64, state: TaskState) {
        if let Some(info) = self.lock().get_mut(&id) {
            info.state = state;
        }
    }

    fn finish(&self, id: u64, state: TaskState) {
        let mut tasks = self.lock();
        if let Some(info) = tasks.get_mut(&id) {
            info.state = state;
        }

        let finished: Vec<u64> = tasks
            .values()
            .filter(|t| t.state.is_finished())
            .map(|t| t.id)
            .collect();
        if finished.len() > MAX_FINISHED_TASKS {
            for old in &finished[..finished.len() - MAX_FINISHED_TASKS] {
                tasks.remove(old);
            }
        }
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("available", &self.inner.semaphore.available_permits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeedflowError;
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn wait_finished(tasks: &BackgroundTasks, id: u64) -> TaskInfo {
        for _ in 0..200 {
            if let Some(info) = tasks.get(id) {
                if info.state.is_finished() {
                    return info;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {id} did not finish");
    }

    #[tokio::test]
    async fn test_task_completes() {
        let tasks = BackgroundTasks::new(2);
        let id = tasks.spawn("noop", 1, async { Ok(()) });
        let info = wait_finished(&tasks, id).await;
        assert_eq!(info.state, TaskState::Completed);
        assert_eq!(info.kind, "noop");
        assert_eq!(info.user_id, 1);
    }

    #[tokio::test]
    async fn test_task_failure_is_recorded() {
        let tasks = BackgroundTasks::new(1);
        let id = tasks.spawn("fail", 1, async {
            Err(FeedflowError::Validation("boom".to_string()))
        });
        let info = wait_finished(&tasks, id).await;
        assert!(matches!(info.state, TaskState::Failed(ref msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let tasks = BackgroundTasks::new(1);
        let (tx, rx) = oneshot::channel::<()>();

        let first = tasks.spawn("blocker", 1, async move {
            let _ = rx.await;
            Ok(())
        });
        let second = tasks.spawn("waiter", 1, async { Ok(()) });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tasks.get(first).unwrap().state, TaskState::Running);
        assert_eq!(tasks.get(second).unwrap().state, TaskState::Queued);
        assert_eq!(tasks.pending(), 2);

        tx.send(()).unwrap();
        wait_finished(&tasks, first).await;
        wait_finished(&tasks, second).await;
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_oldest_finished_tasks_are_dropped() {
        let tasks = BackgroundTasks::new(1);
        let ids: Vec<u64> = (0..MAX_FINISHED_TASKS + 2)
            .map(|_| tasks.spawn("noop", 1, async { Ok(()) }))
            .collect();
        for _ in 0..200 {
            if tasks.pending() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(tasks.pending(), 0);
        assert_eq!(tasks.lock().len(), MAX_FINISHED_TASKS);
        assert!(tasks.get(ids[0]).is_none());
        assert!(tasks.get(ids[1]).is_none());
        assert!(tasks.get(*ids.last().unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let tasks = BackgroundTasks::new(1);
        assert!(tasks.get(42).is_none());
    }

    #[test]
    fn test_task_info_serialization() {
        let info = TaskInfo {
            id: 3,
            kind: "refresh_all",
            user_id: 7,
            state: TaskState::Failed("timeout".to_string()),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["kind"], "refresh_all");
        assert_eq!(json["state"], "failed");
        assert_eq!(json["error"], "timeout");
    }
}
