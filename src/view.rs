//! Read-only projections over a task collection: free-text search, status
//! filter, and the three-way status partition rendered by the board and by
//! `td list`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::task::{Task, TaskStatus};

/// Tasks partitioned by status. Each group keeps collection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskGroups {
    pub in_progress: Vec<Task>,
    pub pending: Vec<Task>,
    pub completed: Vec<Task>,
}

impl TaskGroups {
    pub fn group(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Pending => &self.pending,
            TaskStatus::Completed => &self.completed,
        }
    }

    /// `(status, tasks)` in display order
    pub fn sections(&self) -> impl Iterator<Item = (TaskStatus, &[Task])> + '_ {
        TaskStatus::ALL
            .into_iter()
            .map(move |status| (status, self.group(status)))
    }

    pub fn len(&self) -> usize {
        self.in_progress.len() + self.pending.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Status filter offered by `td list --filter`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    /// Pending or in progress
    Incomplete,
    InProgress,
    Pending,
}

impl TaskFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Completed => "completed",
            TaskFilter::Incomplete => "incomplete",
            TaskFilter::InProgress => "in_progress",
            TaskFilter::Pending => "pending",
        }
    }

    pub fn accepts(self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Completed => task.status() == TaskStatus::Completed,
            TaskFilter::Incomplete => task.status() != TaskStatus::Completed,
            TaskFilter::InProgress => task.status() == TaskStatus::InProgress,
            TaskFilter::Pending => task.status() == TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all" => Ok(TaskFilter::All),
            "completed" => Ok(TaskFilter::Completed),
            "incomplete" => Ok(TaskFilter::Incomplete),
            "in_progress" => Ok(TaskFilter::InProgress),
            "pending" => Ok(TaskFilter::Pending),
            other => Err(Error::InvalidArgument(format!(
                "unknown filter '{other}' (expected all|completed|incomplete|in_progress|pending)"
            ))),
        }
    }
}

/// Tasks whose title or description contains `query`, case-insensitively.
/// A blank query keeps everything.
pub fn search<'a>(tasks: &'a [Task], query: &str) -> Vec<&'a Task> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return tasks.iter().collect();
    }
    tasks.iter().filter(|task| task.matches(&needle)).collect()
}

pub fn filter<'a>(tasks: &'a [Task], filter: TaskFilter) -> Vec<&'a Task> {
    tasks.iter().filter(|task| filter.accepts(task)).collect()
}

/// Search, then partition the working set by status
pub fn project(tasks: &[Task], query: &str) -> TaskGroups {
    partition(search(tasks, query))
}

/// Partition already-selected tasks by status, preserving order
pub fn partition<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> TaskGroups {
    let mut groups = TaskGroups::default();
    for task in tasks {
        let bucket = match task.status() {
            TaskStatus::InProgress => &mut groups.in_progress,
            TaskStatus::Pending => &mut groups.pending,
            TaskStatus::Completed => &mut groups.completed,
        };
        bucket.push(task.clone());
    }
    groups
}
