//! The task store: single owner of the in-memory task collection.
//!
//! Mutations are fire-and-forget. An unknown id or a blank title is a silent
//! no-op; nothing is saved and no observer runs. A successful mutation saves
//! the whole collection through [`Persistence`] and then notifies every
//! observer synchronously with the event and the new snapshot.
//!
//! Collection order is newest-added first.

use tracing::debug;

use crate::error::{Error, Result};
use crate::persistence::{LoadReport, Persistence, SaveOutcome};
use crate::task::{
    self, normalize_description, normalize_title, Task, TaskEdit, TaskId, TaskStats, TaskStatus,
};

/// What changed in the last mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(TaskId),
    Deleted(TaskId),
    Toggled(TaskId),
    Edited(TaskId),
    StatusChanged(TaskId),
}

impl StoreEvent {
    pub fn task_id(&self) -> &str {
        match self {
            StoreEvent::Added(id)
            | StoreEvent::Deleted(id)
            | StoreEvent::Toggled(id)
            | StoreEvent::Edited(id)
            | StoreEvent::StatusChanged(id) => id,
        }
    }
}

/// Handle returned by [`TaskStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&StoreEvent, &[Task])>;

pub struct TaskStore {
    tasks: Vec<Task>,
    persistence: Persistence,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    load_report: LoadReport,
    last_save_error: Option<String>,
}

impl TaskStore {
    /// Load the collection through `persistence` and take ownership of it
    pub fn open(persistence: Persistence) -> Self {
        let (tasks, load_report) = persistence.load();
        Self {
            tasks,
            persistence,
            observers: Vec::new(),
            next_subscription: 0,
            load_report,
            last_save_error: None,
        }
    }

    /// Snapshot of every task in collection order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::collect(&self.tasks)
    }

    /// How the collection was loaded at startup
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Message of the most recent failed save, cleared by the next successful one
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    /// Prepend a new task. A title that is blank after trimming is ignored
    /// and `None` is returned.
    pub fn add(
        &mut self,
        title: &str,
        description: Option<&str>,
        status: TaskStatus,
    ) -> Option<TaskId> {
        let Some(title) = normalize_title(title) else {
            debug!("ignoring add with blank title");
            return None;
        };
        let mut task = Task::new(title, status);
        task.description = description.and_then(normalize_description);
        let id = task.id.clone();
        self.tasks.insert(0, task);
        self.commit(StoreEvent::Added(id.clone()));
        Some(id)
    }

    pub fn delete(&mut self, id: &str) {
        let Some(index) = self.position(id) else {
            debug!(id, "delete: no such task");
            return;
        };
        let removed = self.tasks.remove(index);
        self.commit(StoreEvent::Deleted(removed.id));
    }

    /// Completed tasks go back to pending; anything else becomes completed
    pub fn toggle(&mut self, id: &str) {
        let now = task::now();
        let Some(task) = self.find_mut(id) else {
            debug!(id, "toggle: no such task");
            return;
        };
        let next = if task.status() == TaskStatus::Completed {
            TaskStatus::Pending
        } else {
            TaskStatus::Completed
        };
        task.set_status(next);
        task.touch(now);
        let id = task.id.clone();
        self.commit(StoreEvent::Toggled(id));
    }

    /// Apply a partial edit. A blank title is ignored, a blank description
    /// clears the description. `updatedAt` is refreshed even for an empty edit.
    pub fn edit(&mut self, id: &str, edit: TaskEdit) {
        let now = task::now();
        let Some(task) = self.find_mut(id) else {
            debug!(id, "edit: no such task");
            return;
        };
        if let Some(title) = edit.title.as_deref().and_then(normalize_title) {
            task.title = title;
        }
        if let Some(description) = edit.description.as_deref() {
            task.description = normalize_description(description);
        }
        if let Some(status) = edit.status {
            task.set_status(status);
        }
        task.touch(now);
        let id = task.id.clone();
        self.commit(StoreEvent::Edited(id));
    }

    pub fn update_status(&mut self, id: &str, status: TaskStatus) {
        let now = task::now();
        let Some(task) = self.find_mut(id) else {
            debug!(id, "update_status: no such task");
            return;
        };
        task.set_status(status);
        task.touch(now);
        let id = task.id.clone();
        self.commit(StoreEvent::StatusChanged(id));
    }

    /// Resolve user input to a task id: an exact id, or a prefix shared by
    /// exactly one task.
    pub fn resolve(&self, input: &str) -> Result<TaskId> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }
        if let Some(task) = self.get(input) {
            return Ok(task.id.clone());
        }
        let matches: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| task.id.starts_with(input))
            .collect();
        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(input.to_string())),
            [task] => Ok(task.id.clone()),
            _ => Err(Error::AmbiguousTaskId {
                input: input.to_string(),
                matches: matches.len(),
            }),
        }
    }

    /// Register an observer called after every successful mutation
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent, &[Task]) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer; returns false when it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    fn commit(&mut self, event: StoreEvent) {
        debug!(?event, tasks = self.tasks.len(), "task store changed");
        self.last_save_error = match self.persistence.save(&self.tasks) {
            SaveOutcome::Saved => None,
            SaveOutcome::Failed(message) => Some(message),
        };
        for (_, observer) in self.observers.iter_mut() {
            observer(&event, &self.tasks);
        }
    }
}
