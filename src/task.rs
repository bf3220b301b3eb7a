//! Task model for taskdeck.
//!
//! A task's `completed` flag is derived from its status. Both fields are
//! private and only change together through [`Task::set_status`], so a task
//! obtained from this crate always satisfies `completed == (status == Completed)`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// Opaque task identifier
pub type TaskId = String;

pub const TITLE_MAX_CHARS: usize = 120;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Title given to tasks that carry none
pub const UNTITLED: &str = "Untitled";
const TASK_ID_PREFIX: &str = "task";
const BASE36_CHARSET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Every status, in board display order
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::InProgress,
        TaskStatus::Pending,
        TaskStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Human-readable section title
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn is_completed(self) -> bool {
        self == TaskStatus::Completed
    }

    /// Next status in the pending -> in_progress -> completed -> pending cycle
    pub fn cycle(self) -> TaskStatus {
        match self {
            TaskStatus::Pending => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(Error::InvalidArgument(format!(
                "unknown status '{other}' (expected pending|in_progress|completed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::InvalidArgument(format!(
                "unknown priority '{other}' (expected low|medium|high)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TaskRecord")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    completed: bool,
    status: TaskStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// Stored shape of a task. `completed` is only consulted when `status` is
/// missing; the flag on the resulting task is always rederived.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    updated_at: DateTime<Utc>,
    #[serde(default)]
    priority: Option<Priority>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let status = record.status.unwrap_or(if record.completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        });
        let mut task = Task::restore(
            record.id,
            record.title,
            status,
            record.created_at,
            Some(record.updated_at),
        );
        task.description = record.description;
        task.priority = record.priority;
        task
    }
}

impl Task {
    /// Create a task with a fresh id and `created_at == updated_at == now`.
    /// The title is normalized like [`normalize_title`]; a blank one becomes
    /// [`UNTITLED`].
    pub fn new(title: impl AsRef<str>, status: TaskStatus) -> Self {
        let title = normalize_title(title.as_ref()).unwrap_or_else(|| UNTITLED.to_string());
        Self::restore(generate_task_id(), title, status, now(), None)
    }

    /// Rebuild a task from stored parts. `updated_at` of `None` means "same as created_at".
    pub(crate) fn restore(
        id: TaskId,
        title: impl Into<String>,
        status: TaskStatus,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            completed: status.is_completed(),
            status,
            created_at,
            updated_at: updated_at.unwrap_or(created_at),
            priority: None,
        }
    }

    pub fn with_description(mut self, description: impl AsRef<str>) -> Self {
        self.description = normalize_description(description.as_ref());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Set the status and keep `completed` in sync
    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.completed = status.is_completed();
    }

    /// Refresh `updated_at`, never moving it backwards
    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }

    /// Case-insensitive substring match on title or description.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        if self.title.to_lowercase().contains(needle) {
            return true;
        }
        self.description
            .as_deref()
            .map(|description| description.to_lowercase().contains(needle))
            .unwrap_or(false)
    }
}

/// Partial update applied by [`crate::store::TaskStore::edit`].
///
/// `None` leaves a field untouched. A `description` of `Some("")` (or only
/// whitespace) clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }
}

/// Aggregate counts over a task collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

impl TaskStats {
    pub fn collect(tasks: &[Task]) -> Self {
        let mut stats = TaskStats {
            total: tasks.len(),
            ..TaskStats::default()
        };
        for task in tasks {
            match task.status() {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
        }
    }
}

/// Current time at the precision the persisted format keeps (milliseconds)
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Generate an id of the form `task_<unix millis>_<base-36 random>`.
///
/// Uniqueness is probabilistic: the random part is the 80 random bits of a
/// fresh ULID.
pub fn generate_task_id() -> TaskId {
    let ulid = Ulid::new();
    format!(
        "{}_{}_{}",
        TASK_ID_PREFIX,
        ulid.timestamp_ms(),
        to_base36(ulid.random())
    )
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_CHARSET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Trim a title and cap its length; `None` when nothing is left
pub fn normalize_title(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(clamp_chars(trimmed, TITLE_MAX_CHARS))
}

/// Trim a description and cap its length; empty means absent
pub fn normalize_description(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(clamp_chars(trimmed, DESCRIPTION_MAX_CHARS))
}

fn clamp_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => value[..cut].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Timestamps as RFC 3339 strings with millisecond precision and a `Z` suffix
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

/// Interpret epoch milliseconds, as older clients stored `Date.now()` values
pub(crate) fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_derives_completed_from_status() {
        let pending = Task::new("Write tests", TaskStatus::Pending);
        assert!(!pending.completed());
        assert_eq!(pending.created_at, pending.updated_at);

        let done = Task::new("Ship", TaskStatus::Completed);
        assert!(done.completed());
    }

    #[test]
    fn set_status_keeps_flag_in_sync() {
        let mut task = Task::new("Review", TaskStatus::Completed);
        task.set_status(TaskStatus::InProgress);
        assert_eq!(task.status(), TaskStatus::InProgress);
        assert!(!task.completed());
        task.set_status(TaskStatus::Completed);
        assert!(task.completed());
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut task = Task::new("Clock skew", TaskStatus::Pending);
        let before = task.updated_at;
        task.touch(before - chrono::Duration::seconds(30));
        assert_eq!(task.updated_at, before);
        task.touch(before + chrono::Duration::seconds(30));
        assert!(task.updated_at > before);
    }

    #[test]
    fn status_parses_loose_spellings() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(" Completed ".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn status_cycle_visits_every_status() {
        let mut status = TaskStatus::Pending;
        let mut seen = Vec::new();
        for _ in 0..3 {
            status = status.cycle();
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![TaskStatus::InProgress, TaskStatus::Completed, TaskStatus::Pending]
        );
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = generate_task_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "task");
        assert!(parts[1].parse::<u64>().is_ok());
        assert!(parts[2].chars().all(|ch| ch.is_ascii_alphanumeric()));
        assert_ne!(generate_task_id(), id);
    }

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn normalize_title_trims_and_caps() {
        assert_eq!(normalize_title("   "), None);
        assert_eq!(normalize_title("  Buy milk ").as_deref(), Some("Buy milk"));
        let long = "é".repeat(200);
        assert_eq!(normalize_title(&long).unwrap().chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn normalize_description_maps_blank_to_none() {
        assert_eq!(normalize_description(" \t\n"), None);
        assert_eq!(normalize_description(" notes ").as_deref(), Some("notes"));
        let long = "x".repeat(DESCRIPTION_MAX_CHARS + 10);
        assert_eq!(
            normalize_description(&long).unwrap().len(),
            DESCRIPTION_MAX_CHARS
        );
    }

    #[test]
    fn matches_checks_title_and_description() {
        let task = Task::new("Foobar", TaskStatus::Pending);
        assert!(task.matches("foo"));

        let plain = Task::new("bar", TaskStatus::Pending);
        assert!(!plain.matches("foo"));

        let described = Task::new("bar", TaskStatus::Pending).with_description("contains FOO");
        assert!(described.matches("foo"));
    }

    #[test]
    fn serialized_layout_uses_camel_case_and_iso_timestamps() {
        let task = Task::new("Layout", TaskStatus::InProgress).with_priority(Priority::High);
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["completed"], false);
        assert_eq!(value["priority"], "high");
        assert!(value.get("description").is_none());
        let created = value["createdAt"].as_str().unwrap();
        assert!(created.ends_with('Z'));
        assert_eq!(timestamp::parse(created), Some(task.created_at));
    }

    #[test]
    fn deserialize_rederives_completed_from_status() {
        let task: Task = serde_json::from_str(
            r#"{"id":"x","title":"t","completed":true,"status":"pending",
                "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-02T00:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(!task.completed());
        assert_eq!(timestamp::format(&task.updated_at), "2024-01-02T00:00:00.000Z");

        let legacy: Task = serde_json::from_str(
            r#"{"id":"y","title":"t","completed":true,
                "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(legacy.status(), TaskStatus::Completed);
        assert!(legacy.completed());
    }

    #[test]
    fn serialized_task_reads_back_equal() {
        let task = Task::new("Round trip", TaskStatus::InProgress)
            .with_description("notes")
            .with_priority(Priority::Low);
        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(serde_json::from_str::<Task>(&json).unwrap(), task);
    }

    #[test]
    fn constructor_normalizes_title_and_description() {
        let blank = Task::new("   ", TaskStatus::Pending).with_description(" \t ");
        assert_eq!(blank.title, UNTITLED);
        assert!(blank.description.is_none());

        let padded = Task::new("  Buy milk ", TaskStatus::Pending);
        assert_eq!(padded.title, "Buy milk");

        let long = Task::new("x".repeat(TITLE_MAX_CHARS + 30), TaskStatus::Pending);
        assert_eq!(long.title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn stats_count_each_status() {
        let tasks = vec![
            Task::new("a", TaskStatus::Pending),
            Task::new("b", TaskStatus::InProgress),
            Task::new("c", TaskStatus::Completed),
            Task::new("d", TaskStatus::Completed),
        ];
        let stats = TaskStats::collect(&tasks);
        assert_eq!(
            stats,
            TaskStats {
                total: 4,
                completed: 2,
                in_progress: 1,
                pending: 1
            }
        );
        assert_eq!(stats.count(TaskStatus::Completed), 2);
    }
}
