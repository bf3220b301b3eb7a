//! td task command implementations.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::persistence::{LoadSource, Persistence};
use crate::storage::FileStore;
use crate::store::TaskStore;
use crate::task::{timestamp, Task, TaskEdit, TaskStats, TaskStatus};
use crate::view::{self, TaskFilter, TaskGroups};

use super::StoreLocation;

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub search: Option<String>,
    pub filter: String,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub struct ShowOptions {
    pub id: String,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub struct ToggleOptions {
    pub id: String,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub struct StatusOptions {
    pub id: String,
    pub status: String,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub struct DeleteOptions {
    pub id: String,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub struct StatsOptions {
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub struct BoardOptions {
    pub search: Option<String>,
    pub location: StoreLocation,
    pub json: bool,
    pub quiet: bool,
}

pub(super) struct TaskContext {
    pub(super) store: TaskStore,
    pub(super) config: Config,
    pub(super) data_dir: PathBuf,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = load_context(&options.location)?;
    if options.title.trim().is_empty() {
        return Err(Error::InvalidArgument("title cannot be empty".to_string()));
    }
    let status = match options.status.as_deref() {
        Some(value) => value.parse::<TaskStatus>()?,
        None => ctx.config.tasks.default_status(),
    };

    let id = ctx
        .store
        .add(&options.title, options.description.as_deref(), status)
        .ok_or_else(|| Error::InvalidArgument("title cannot be empty".to_string()))?;
    ensure_saved(&ctx.store)?;
    let task = find_task(&ctx.store, &id)?;

    let mut human = HumanOutput::new("Task added");
    push_load_warnings(&mut human, &ctx.store);
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status().to_string());
    human.push_next_step(format!("td status {} in_progress", task.id));

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "add",
        &TaskOutput { task },
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(&options.location)?;
    let filter: TaskFilter = options.filter.parse()?;
    let query = options.search.unwrap_or_default();

    let groups = view::partition(
        view::search(ctx.store.tasks(), &query)
            .into_iter()
            .filter(|task| filter.accepts(task)),
    );

    let mut human = HumanOutput::new("Tasks");
    push_load_warnings(&mut human, &ctx.store);
    human.push_summary("Total", groups.len().to_string());
    if !query.trim().is_empty() {
        human.push_summary("Search", query.trim().to_string());
    }
    if filter != TaskFilter::All {
        human.push_summary("Filter", filter.to_string());
    }
    for (status, tasks) in groups.sections() {
        if tasks.is_empty() {
            continue;
        }
        human.push_detail(format!("{} ({})", status.label(), tasks.len()));
        for task in tasks {
            human.push_detail(format!("  {}", format_task_line(task)));
        }
    }
    if ctx.store.is_empty() {
        human.push_next_step("td add \"<title>\"");
    }

    let output = TaskListOutput {
        total: groups.len(),
        search: (!query.trim().is_empty()).then(|| query.trim().to_string()),
        filter,
        groups: &groups,
    };

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "list",
        &output,
        Some(&human),
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(&options.location)?;
    let id = ctx.store.resolve(&options.id)?;
    let task = find_task(&ctx.store, &id)?;

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_task_summary(&mut human, task);

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "show",
        &TaskOutput { task },
        Some(&human),
    )
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = load_context(&options.location)?;
    let id = ctx.store.resolve(&options.id)?;

    let mut edit = TaskEdit::new();
    if let Some(title) = options.title {
        if title.trim().is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }
        edit = edit.title(title);
    }
    if let Some(description) = options.description {
        edit = edit.description(description);
    }
    if let Some(status) = options.status.as_deref() {
        edit = edit.status(status.parse()?);
    }
    if edit.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to edit; pass --title, --description or --status".to_string(),
        ));
    }

    ctx.store.edit(&id, edit);
    ensure_saved(&ctx.store)?;
    let task = find_task(&ctx.store, &id)?;

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, task);

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "edit",
        &TaskOutput { task },
        Some(&human),
    )
}

pub fn run_toggle(options: ToggleOptions) -> Result<()> {
    let mut ctx = load_context(&options.location)?;
    let id = ctx.store.resolve(&options.id)?;
    ctx.store.toggle(&id);
    ensure_saved(&ctx.store)?;
    emit_status_change(&ctx.store, &id, "toggle", options.json, options.quiet)
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let mut ctx = load_context(&options.location)?;
    let id = ctx.store.resolve(&options.id)?;
    let status: TaskStatus = options.status.parse()?;
    ctx.store.update_status(&id, status);
    ensure_saved(&ctx.store)?;
    emit_status_change(&ctx.store, &id, "status", options.json, options.quiet)
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut ctx = load_context(&options.location)?;
    let id = ctx.store.resolve(&options.id)?;
    let title = find_task(&ctx.store, &id)?.title.clone();
    ctx.store.delete(&id);
    ensure_saved(&ctx.store)?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", id.clone());
    human.push_summary("Title", title.clone());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "delete",
        &TaskDeletedOutput { id, title },
        Some(&human),
    )
}

pub fn run_stats(options: StatsOptions) -> Result<()> {
    let ctx = load_context(&options.location)?;
    let stats: TaskStats = ctx.store.stats();

    let mut human = HumanOutput::new("Task stats");
    push_load_warnings(&mut human, &ctx.store);
    human.push_summary("Total", stats.total.to_string());
    for status in TaskStatus::ALL {
        human.push_summary(status.label(), stats.count(status).to_string());
    }
    human.push_detail(format!("Data dir: {}", ctx.data_dir.display()));

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "stats",
        &stats,
        Some(&human),
    )
}

pub fn run_board(options: BoardOptions) -> Result<()> {
    if options.json {
        return Err(Error::InvalidArgument(
            "board does not support --json".to_string(),
        ));
    }
    if options.quiet {
        return Err(Error::InvalidArgument(
            "board does not support --quiet".to_string(),
        ));
    }
    let ctx = load_context(&options.location)?;
    crate::ui::board::run(ctx.store, options.search.unwrap_or_default())
}

/// Resolve configuration and data directory, then open the store
pub(super) fn load_context(location: &StoreLocation) -> Result<TaskContext> {
    let config = Config::discover(location.config.as_deref())?;
    let data_dir = match location.data_dir.clone() {
        Some(dir) => dir,
        None => config.storage.resolve_data_dir()?,
    };
    let backend = FileStore::new(&data_dir).with_lock_timeout(config.storage.lock_timeout_ms);
    let persistence = Persistence::new(backend).with_keys(
        config.storage.primary_key.clone(),
        config.storage.legacy_keys.clone(),
    );
    let store = TaskStore::open(persistence);

    Ok(TaskContext {
        store,
        config,
        data_dir,
    })
}

/// Fail the command when the last mutation was not persisted
fn ensure_saved(store: &TaskStore) -> Result<()> {
    match store.last_save_error() {
        Some(err) => Err(Error::OperationFailed(format!(
            "task changes were not saved: {err}"
        ))),
        None => Ok(()),
    }
}

fn find_task<'a>(store: &'a TaskStore, id: &str) -> Result<&'a Task> {
    store
        .get(id)
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))
}

fn emit_status_change(
    store: &TaskStore,
    id: &str,
    command: &str,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let task = find_task(store, id)?;
    let output = TaskStatusOutput {
        id: task.id.clone(),
        status: task.status(),
        completed: task.completed(),
    };

    let mut human = HumanOutput::new(format!("Task {}", task.status().label().to_lowercase()));
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status().to_string());

    emit_success(
        OutputOptions { json, quiet },
        command,
        &output,
        Some(&human),
    )
}

fn push_load_warnings(human: &mut HumanOutput, store: &TaskStore) {
    let report = store.load_report();
    if let LoadSource::Legacy(key) = &report.source {
        human.push_warning(format!(
            "loaded {} task(s) from legacy key '{key}'; they move to the primary key on the next change",
            report.records
        ));
    }
    if report.placeholders > 0 {
        human.push_warning(format!(
            "{} stored record(s) were unreadable and shown as 'Untitled'",
            report.placeholders
        ));
    }
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status().to_string());
    if let Some(priority) = task.priority {
        human.push_summary("Priority", priority.as_str());
    }
    human.push_summary("Created", timestamp::format(&task.created_at));
    human.push_summary("Updated", timestamp::format(&task.updated_at));
    if let Some(description) = task.description.as_ref() {
        human.push_detail(description.clone());
    }
}

fn format_task_line(task: &Task) -> String {
    let mut line = format!("[{}] {} {}", task.status(), task.id, task.title);
    if let Some(priority) = task.priority {
        line.push_str(&format!(" (priority: {})", priority.as_str()));
    }
    line
}

#[derive(Serialize)]
struct TaskOutput<'a> {
    task: &'a Task,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<String>,
    filter: TaskFilter,
    groups: &'a TaskGroups,
}

#[derive(Serialize)]
struct TaskStatusOutput {
    id: String,
    status: TaskStatus,
    completed: bool,
}

#[derive(Serialize)]
struct TaskDeletedOutput {
    id: String,
    title: String,
}
