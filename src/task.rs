//! The day's working set: up to six ranked tasks.
//!
//! `TaskSetManager` owns the in-memory list and mirrors every mutation to the
//! `power6_tasks` store key. Insertion order is entry order; ranks may repeat.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::Result;
use crate::remote::RemoteSync;
use crate::storage::{LocalStore, StoreExt, TASKS_KEY};

/// Maximum number of tasks in a day's working set
pub const MAX_TASKS: usize = 6;

/// Lowest (most important) rank
pub const MIN_RANK: u8 = 1;

/// Highest rank
pub const MAX_RANK: u8 = 6;

pub type TaskId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub rank: u8,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>, rank: u8) -> Self {
        Self {
            id,
            text: text.into(),
            rank,
            completed: false,
        }
    }
}

/// Where the working set came from when it was loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    /// Read back from the local store
    Local,
    /// Adopted from the remote "today" list
    Remote,
    /// Nothing stored and nothing usable remotely
    Empty,
}

pub struct TaskSetManager {
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    tasks: Vec<Task>,
}

impl TaskSetManager {
    /// Manager with an empty in-memory set; nothing is read yet
    pub fn new(store: Arc<dyn LocalStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            tasks: Vec::new(),
        }
    }

    /// Load the working set at startup
    ///
    /// A persisted set wins. Otherwise the remote "today" list is fetched; a
    /// non-empty result is adopted and persisted, while a failure or an empty
    /// list leaves the set empty. Remote failures are logged, never returned.
    pub async fn load_working_set(&mut self, remote: &dyn RemoteSync) -> Result<LoadSource> {
        if let Some(stored) = self.store.load::<Vec<Task>>(TASKS_KEY) {
            self.tasks = stored;
            if self.tasks.len() > MAX_TASKS {
                tracing::warn!(
                    count = self.tasks.len(),
                    "stored working set exceeds capacity; keeping the first {MAX_TASKS}"
                );
                self.tasks.truncate(MAX_TASKS);
            }
            return Ok(LoadSource::Local);
        }

        self.tasks.clear();

        let mut fetched = match remote.fetch_today_tasks().await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!(error = %err, "could not fetch today's tasks; starting empty");
                return Ok(LoadSource::Empty);
            }
        };

        fetched = sanitize_remote(fetched);
        if fetched.is_empty() {
            return Ok(LoadSource::Empty);
        }

        if fetched.len() > MAX_TASKS {
            tracing::warn!(
                count = fetched.len(),
                "remote returned more than {MAX_TASKS} tasks; keeping the first {MAX_TASKS}"
            );
            fetched.truncate(MAX_TASKS);
        }

        self.tasks = fetched;
        self.persist()?;
        tracing::debug!(count = self.tasks.len(), "adopted remote working set");
        Ok(LoadSource::Remote)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tasks.len() >= MAX_TASKS
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    /// Copy of the current set, for archiving and upload
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Append a new task
    ///
    /// Returns `Ok(None)` without touching anything when `text` is blank, the
    /// rank is outside 1..=6, or the set already holds six tasks.
    pub fn add_task(&mut self, text: &str, rank: u8) -> Result<Option<Task>> {
        let text = text.trim();
        if text.is_empty() || !(MIN_RANK..=MAX_RANK).contains(&rank) || self.is_full() {
            return Ok(None);
        }

        let task = Task::new(self.next_id(), text, rank);
        self.tasks.push(task.clone());
        self.persist()?;
        tracing::debug!(id = task.id, rank, "task added");
        Ok(Some(task))
    }

    /// Flip `completed` on the task with `id`
    ///
    /// Returns the new state, or `Ok(None)` when no task has that id.
    pub fn toggle_complete(&mut self, id: TaskId) -> Result<Option<bool>> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist()?;
        tracing::debug!(id, completed, "task toggled");
        Ok(Some(completed))
    }

    /// Empty the set and drop its persisted entry
    pub fn clear(&mut self) -> Result<()> {
        self.tasks.clear();
        self.store.remove(TASKS_KEY)
    }

    fn persist(&self) -> Result<()> {
        self.store.save(TASKS_KEY, &self.tasks)
    }

    // Millisecond timestamps, bumped past the largest id in the set so two
    // adds in the same millisecond still differ.
    fn next_id(&self) -> TaskId {
        let now = u64::try_from(self.clock.now_millis()).unwrap_or(0);
        let after_last = self
            .tasks
            .iter()
            .map(|task| task.id)
            .max()
            .map_or(0, |max| max.saturating_add(1));
        now.max(after_last)
    }
}

// Remote tasks must obey the same rules as locally added ones: non-blank
// text, rank in 1..=6, ids unique within the day. Offenders are dropped.
fn sanitize_remote(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| {
            if task.text.trim().is_empty() {
                tracing::warn!(id = task.id, "dropping remote task with blank text");
                return false;
            }
            if !(MIN_RANK..=MAX_RANK).contains(&task.rank) {
                tracing::warn!(
                    id = task.id,
                    rank = task.rank,
                    "dropping remote task with out-of-range rank"
                );
                return false;
            }
            if !seen.insert(task.id) {
                tracing::warn!(id = task.id, "dropping remote task with duplicate id");
                return false;
            }
            true
        })
        .collect()
}
