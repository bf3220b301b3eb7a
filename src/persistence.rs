//! Persistence adapter: loads the task collection at startup and writes it
//! back after every mutation.
//!
//! Loading tolerates older layouts. The primary key is tried first, then each
//! legacy key in order; the first value that parses as a JSON array wins.
//! Each record is normalized on the way in (see [`normalize_record`]), so a
//! legacy `{ id, title, completed: true }` becomes a task with status
//! `completed`.
//!
//! Neither load nor save ever fails outward. Unreadable data falls back to the
//! next source and finally to an empty collection; a failed save is logged and
//! reported through [`SaveOutcome`], and the in-memory collection stays
//! authoritative.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::task::{self, generate_task_id, timestamp, Priority, Task, TaskStatus};

/// Key holding the current task collection
pub const DEFAULT_PRIMARY_KEY: &str = "taskManager_tasks";

/// Superseded keys consulted only when the primary key is missing or invalid
pub const DEFAULT_LEGACY_KEYS: [&str; 2] = ["tasks", "todo_tasks"];

pub use crate::task::UNTITLED;

/// Where the loaded collection came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum LoadSource {
    Primary,
    Legacy(String),
    Empty,
}

/// Summary of a startup load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub source: LoadSource,
    pub records: usize,
    /// Records that were not objects and were replaced by placeholders
    pub placeholders: usize,
}

/// Result of a best-effort save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed(String),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

pub struct Persistence {
    backend: Box<dyn KeyValueStore>,
    primary_key: String,
    legacy_keys: Vec<String>,
}

impl Persistence {
    /// Adapter over `backend` using the default primary and legacy keys
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            legacy_keys: DEFAULT_LEGACY_KEYS.iter().map(|key| key.to_string()).collect(),
        }
    }

    /// Override the storage keys
    pub fn with_keys(mut self, primary_key: impl Into<String>, legacy_keys: Vec<String>) -> Self {
        self.primary_key = primary_key.into();
        self.legacy_keys = legacy_keys;
        self
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn legacy_keys(&self) -> &[String] {
        &self.legacy_keys
    }

    /// Load and normalize the collection. Never fails.
    pub fn load(&self) -> (Vec<Task>, LoadReport) {
        let keys = std::iter::once(&self.primary_key).chain(self.legacy_keys.iter());
        for (position, key) in keys.enumerate() {
            let Some(records) = self.read_array(key) else {
                continue;
            };
            let source = if position == 0 {
                LoadSource::Primary
            } else {
                warn!(key = %key, "primary task data unavailable, loading legacy key");
                LoadSource::Legacy(key.clone())
            };
            let now = task::now();
            let placeholders = records.iter().filter(|raw| !raw.is_object()).count();
            let tasks: Vec<Task> = records
                .iter()
                .map(|raw| normalize_record(raw, now))
                .collect();
            debug!(key = %key, records = tasks.len(), placeholders, "loaded tasks");
            let report = LoadReport {
                source,
                records: tasks.len(),
                placeholders,
            };
            return (tasks, report);
        }

        debug!("no stored tasks found, starting empty");
        (
            Vec::new(),
            LoadReport {
                source: LoadSource::Empty,
                records: 0,
                placeholders: 0,
            },
        )
    }

    /// Serialize the full collection to the primary key. Failures are logged
    /// and returned as [`SaveOutcome::Failed`], never raised.
    pub fn save(&self, tasks: &[Task]) -> SaveOutcome {
        match self.try_save(tasks) {
            Ok(()) => {
                debug!(key = %self.primary_key, tasks = tasks.len(), "saved tasks");
                SaveOutcome::Saved
            }
            Err(err) => {
                error!(key = %self.primary_key, error = %err, "failed to persist tasks");
                SaveOutcome::Failed(err.to_string())
            }
        }
    }

    fn try_save(&self, tasks: &[Task]) -> Result<()> {
        let json = serde_json::to_string_pretty(tasks)?;
        self.backend.set(&self.primary_key, &json)
    }

    fn read_array(&self, key: &str) -> Option<Vec<Value>> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "storage key absent");
                return None;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "failed to read storage key");
                return None;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => Some(items),
            Ok(other) => {
                warn!(key = %key, found = json_kind(&other), "stored tasks are not an array");
                None
            }
            Err(err) => {
                warn!(key = %key, error = %err, "stored tasks are not valid JSON");
                None
            }
        }
    }
}

/// Turn one raw stored record into a task.
///
/// Non-objects become an `Untitled` pending placeholder. For objects every
/// field has a fallback: fresh id, `Untitled`, absent description, status
/// derived from `completed`, and `now` for unreadable timestamps.
pub fn normalize_record(raw: &Value, now: DateTime<Utc>) -> Task {
    let Some(record) = raw.as_object() else {
        return Task::restore(generate_task_id(), UNTITLED, TaskStatus::Pending, now, None);
    };

    let id = record
        .get("id")
        .and_then(text_value)
        .unwrap_or_else(generate_task_id);
    let title = record
        .get("title")
        .and_then(text_value)
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let description = record
        .get("description")
        .and_then(text_value)
        .filter(|description| !description.trim().is_empty());
    let completed = record.get("completed").map(is_truthy).unwrap_or(false);
    let status = record
        .get("status")
        .and_then(Value::as_str)
        .and_then(|status| status.parse::<TaskStatus>().ok())
        .unwrap_or(if completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        });
    let created_at = record.get("createdAt").and_then(parse_time).unwrap_or(now);
    let updated_at = record.get("updatedAt").and_then(parse_time).unwrap_or(now);
    let priority = record
        .get("priority")
        .and_then(Value::as_str)
        .and_then(|priority| priority.parse::<Priority>().ok());

    let mut task = Task::restore(id, title, status, created_at, Some(updated_at));
    task.description = description;
    task.priority = priority;
    task
}

/// JavaScript-style truthiness for loosely typed stored flags
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0 && !n.is_nan()).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text for truthy scalars; numbers and `true` are stringified
fn text_value(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(_) => Some("true".to_string()),
        _ => None,
    }
}

fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_time_text(text),
        Value::Number(number) => number.as_i64().and_then(task::from_epoch_millis),
        _ => None,
    }
}

fn parse_time_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Some(parsed) = timestamp::parse(text) {
        return Some(parsed);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        timestamp::parse("2024-05-01T12:00:00.000Z").unwrap()
    }

    #[test]
    fn non_object_records_become_placeholders() {
        let task = normalize_record(&json!(42), fixed_now());
        assert_eq!(task.title, UNTITLED);
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(!task.completed());
        assert_eq!(task.created_at, fixed_now());
        assert_eq!(task.updated_at, fixed_now());
        assert!(task.id.starts_with("task_"));
    }

    #[test]
    fn status_is_derived_from_completed_when_missing() {
        let done = normalize_record(&json!({"id": "a", "title": "x", "completed": true}), fixed_now());
        assert_eq!(done.status(), TaskStatus::Completed);
        assert!(done.completed());

        let open = normalize_record(&json!({"id": "b", "title": "y", "completed": 0}), fixed_now());
        assert_eq!(open.status(), TaskStatus::Pending);
    }

    #[test]
    fn explicit_status_wins_and_flag_follows_it() {
        let task = normalize_record(
            &json!({"id": "a", "title": "x", "completed": true, "status": "in_progress"}),
            fixed_now(),
        );
        assert_eq!(task.status(), TaskStatus::InProgress);
        assert!(!task.completed());
    }

    #[test]
    fn unknown_status_falls_back_to_completed_flag() {
        let task = normalize_record(
            &json!({"id": "a", "title": "x", "completed": "yes", "status": "archived"}),
            fixed_now(),
        );
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[test]
    fn falsy_fields_get_defaults() {
        let task = normalize_record(
            &json!({"id": "", "title": "", "description": "", "createdAt": "not a date"}),
            fixed_now(),
        );
        assert!(task.id.starts_with("task_"));
        assert_eq!(task.title, UNTITLED);
        assert_eq!(task.description, None);
        assert_eq!(task.created_at, fixed_now());
        assert_eq!(task.updated_at, fixed_now());
    }

    #[test]
    fn whitespace_only_text_counts_as_absent() {
        let task = normalize_record(
            &json!({"id": "w", "title": " \t ", "description": "   ", "status": "pending"}),
            fixed_now(),
        );
        assert_eq!(task.title, UNTITLED);
        assert!(task.description.is_none());

        let kept = normalize_record(&json!({"id": "k", "title": " Keep "}), fixed_now());
        assert_eq!(kept.title, " Keep ");
    }

    #[test]
    fn numeric_ids_and_epoch_timestamps_are_accepted() {
        let task = normalize_record(
            &json!({"id": 1700000000000u64, "title": "old", "createdAt": 1700000000000i64}),
            fixed_now(),
        );
        assert_eq!(task.id, "1700000000000");
        assert_eq!(
            task.created_at,
            task::from_epoch_millis(1_700_000_000_000).unwrap()
        );
    }

    #[test]
    fn date_only_strings_parse_as_midnight_utc() {
        let parsed = parse_time_text("2023-02-03").unwrap();
        assert_eq!(timestamp::format(&parsed), "2023-02-03T00:00:00.000Z");
    }

    #[test]
    fn priority_passes_through_when_known() {
        let high = normalize_record(&json!({"title": "x", "priority": "high"}), fixed_now());
        assert_eq!(high.priority, Some(Priority::High));
        let odd = normalize_record(&json!({"title": "x", "priority": "urgent"}), fixed_now());
        assert_eq!(odd.priority, None);
    }

    #[test]
    fn load_prefers_primary_then_legacy_in_order() {
        let backend = MemoryStore::new()
            .with_entry(DEFAULT_PRIMARY_KEY, "{\"not\": \"an array\"}")
            .with_entry("tasks", "not json")
            .with_entry("todo_tasks", r#"[{"id": "t1", "title": "From legacy"}]"#);
        let persistence = Persistence::new(backend);

        let (tasks, report) = persistence.load();
        assert_eq!(report.source, LoadSource::Legacy("todo_tasks".to_string()));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "From legacy");
    }

    #[test]
    fn load_empty_when_nothing_parses() {
        let backend = MemoryStore::new().with_entry(DEFAULT_PRIMARY_KEY, "[");
        let (tasks, report) = Persistence::new(backend).load();
        assert!(tasks.is_empty());
        assert_eq!(report.source, LoadSource::Empty);
    }

    #[test]
    fn save_failure_is_reported_not_raised() {
        let backend = MemoryStore::new();
        backend.set_reject_writes(true);
        let persistence = Persistence::new(backend.clone());

        let outcome = persistence.save(&[Task::new("x", TaskStatus::Pending)]);
        assert!(matches!(outcome, SaveOutcome::Failed(_)));
        assert_eq!(backend.value(DEFAULT_PRIMARY_KEY), None);
    }

    #[test]
    fn custom_keys_are_used() {
        let backend = MemoryStore::new().with_entry("old", r#"[{"title": "kept"}]"#);
        let persistence =
            Persistence::new(backend.clone()).with_keys("current", vec!["old".to_string()]);

        let (tasks, report) = persistence.load();
        assert_eq!(report.source, LoadSource::Legacy("old".to_string()));
        assert!(persistence.save(&tasks).is_saved());
        assert!(backend.value("current").unwrap().contains("kept"));
    }
}
