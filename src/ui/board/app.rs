use std::cell::Cell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::debug;

use crate::error::Result;
use crate::store::{SubscriptionId, TaskStore};
use crate::task::{Task, TaskEdit, TaskStats, TaskStatus};
use crate::view::{self, TaskGroups};

use super::model::{self, BoardRow};
use super::view as board_view;

const EVENT_POLL_MS: u64 = 120;

#[derive(Clone, Copy)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PromptKind {
    NewTask,
    EditTitle(String),
}

/// Single-line text input shown in a modal
pub(crate) struct PromptState {
    pub(crate) kind: PromptKind,
    pub(crate) value: String,
}

impl PromptState {
    pub(crate) fn title(&self) -> &'static str {
        match self.kind {
            PromptKind::NewTask => "New Task",
            PromptKind::EditTitle(_) => "Edit Title",
        }
    }
}

pub(crate) struct DeleteConfirmState {
    pub(crate) task_id: String,
    pub(crate) title: String,
}

#[derive(Default, Clone, Copy)]
struct Viewport {
    height: u16,
}

pub struct AppState {
    pub(crate) groups: TaskGroups,
    pub(crate) rows: Vec<BoardRow>,
    pub(crate) selected: Option<usize>,
    pub(crate) query: String,
    pub(crate) search_active: bool,
    pub(crate) collapsed: HashSet<TaskStatus>,
    pub(crate) prompt: Option<PromptState>,
    pub(crate) delete_confirm: Option<DeleteConfirmState>,
    pub(crate) show_help: bool,
    status_message: Option<String>,
    info_message: Option<String>,
    viewport: Viewport,
    store: TaskStore,
    changed: Rc<Cell<bool>>,
    subscription: SubscriptionId,
}

impl AppState {
    fn new(mut store: TaskStore, query: String) -> Self {
        let changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&changed);
        let subscription = store.subscribe(move |event, tasks| {
            debug!(?event, tasks = tasks.len(), "board notified");
            flag.set(true);
        });
        let mut app = Self {
            groups: TaskGroups::default(),
            rows: Vec::new(),
            selected: None,
            query,
            search_active: false,
            collapsed: HashSet::new(),
            prompt: None,
            delete_confirm: None,
            show_help: false,
            status_message: None,
            info_message: None,
            viewport: Viewport::default(),
            store,
            changed,
            subscription,
        };
        app.refresh();
        app
    }

    pub(crate) fn stats(&self) -> TaskStats {
        self.store.stats()
    }

    pub(crate) fn task(&self, id: &str) -> Option<&Task> {
        self.store.get(id)
    }

    pub(crate) fn selected_row(&self) -> Option<&BoardRow> {
        self.selected.and_then(|idx| self.rows.get(idx))
    }

    pub(crate) fn selected_task(&self) -> Option<&Task> {
        self.selected_row()
            .and_then(BoardRow::task_id)
            .and_then(|id| self.store.get(id))
    }

    /// Rebuild the projection if the store reported a change
    fn sync_with_store(&mut self) -> bool {
        if !self.changed.replace(false) {
            return false;
        }
        self.refresh();
        true
    }

    /// Recompute the projection and keep the cursor on the same task
    fn refresh(&mut self) {
        let previous_id = self.selected_task().map(|task| task.id.clone());
        self.refresh_selecting(previous_id);
    }

    fn refresh_selecting(&mut self, task_id: Option<String>) {
        let previous_pos = self.selected;
        let previous_status = self.selected_row().map(BoardRow::status);
        self.groups = view::project(self.store.tasks(), &self.query);
        self.rows = model::build_rows(&self.groups, &self.collapsed);
        self.selected =
            model::select_row(&self.rows, task_id.as_deref(), previous_status, previous_pos);
    }

    pub(crate) fn status_line(&self) -> Option<(String, StatusKind)> {
        if let Some(message) = self.status_message.as_ref() {
            return Some((message.clone(), StatusKind::Error));
        }
        if let Some(info) = self.info_message.as_ref() {
            return Some((info.clone(), StatusKind::Info));
        }
        None
    }

    pub(crate) fn footer_hint(&self) -> String {
        if self.delete_confirm.is_some() {
            return "y confirm delete  esc cancel".to_string();
        }
        if self.prompt.is_some() {
            return "type title  enter save  esc cancel".to_string();
        }
        if self.search_active {
            return "type to search  backspace delete  enter done  esc clear".to_string();
        }
        "j/k move  / search  n new  e edit  space toggle  s status  d delete  tab fold  ? help  q quit"
            .to_string()
    }

    pub(crate) fn task_count_summary(&self) -> String {
        let stats = self.stats();
        format!(
            "total: {}  in progress: {}  pending: {}  completed: {}",
            stats.total, stats.in_progress, stats.pending, stats.completed
        )
    }

    fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = None;
            return;
        }
        let current = self.selected.unwrap_or(0) as isize;
        let max = self.rows.len().saturating_sub(1) as isize;
        self.selected = Some((current + delta).clamp(0, max) as usize);
    }

    fn toggle_section(&mut self) {
        let Some(status) = self.selected_row().map(BoardRow::status) else {
            return;
        };
        if !self.collapsed.remove(&status) {
            self.collapsed.insert(status);
        }
        self.rows = model::build_rows(&self.groups, &self.collapsed);
        self.selected = model::select_row(&self.rows, None, Some(status), None);
    }

    fn set_error(&mut self, message: String) {
        self.status_message = Some(message);
        self.info_message = None;
    }

    fn set_info(&mut self, message: String) {
        self.info_message = Some(message);
        self.status_message = None;
    }

    /// Report the outcome of a store call; save failures win over `message`
    fn after_mutation(&mut self, message: String) {
        match self.store.last_save_error() {
            Some(err) => {
                let err = format!("not saved: {err}");
                self.set_error(err);
            }
            None => self.set_info(message),
        }
    }

    fn list_jump(&self) -> isize {
        let height = self.viewport.height.saturating_sub(8);
        (height / 2).max(1) as isize
    }
}

pub fn run(store: TaskStore, query: String) -> Result<()> {
    let mut app = AppState::new(store, query);
    let result = run_terminal(&mut app);
    app.store.unsubscribe(app.subscription);
    result
}

fn run_terminal(app: &mut AppState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let size = terminal.size()?;
    app.viewport = Viewport {
        height: size.height,
    };

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    let mut dirty = true;
    loop {
        if app.sync_with_store() {
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| {
                app.viewport = Viewport {
                    height: frame.size().height,
                };
                board_view::render(frame, app);
            })?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    if handle_key(app, key) {
                        break;
                    }
                    dirty = true;
                }
                Event::Resize(_, height) => {
                    app.viewport = Viewport { height };
                    dirty = true;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Apply one key press; returns true when the board should close
fn handle_key(app: &mut AppState, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    if let Some(confirm) = app.delete_confirm.take() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                app.store.delete(&confirm.task_id);
                app.after_mutation(format!("deleted {}", confirm.title));
            }
            KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                app.set_info("cancelled".to_string());
            }
            _ => {
                app.delete_confirm = Some(confirm);
            }
        }
        return false;
    }

    if let Some(mut prompt) = app.prompt.take() {
        match key.code {
            KeyCode::Esc => app.set_info("cancelled".to_string()),
            KeyCode::Enter => submit_prompt(app, prompt),
            KeyCode::Backspace => {
                prompt.value.pop();
                app.prompt = Some(prompt);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                prompt.value.clear();
                app.prompt = Some(prompt);
            }
            KeyCode::Char(ch) => {
                prompt.value.push(ch);
                app.prompt = Some(prompt);
            }
            _ => app.prompt = Some(prompt),
        }
        return false;
    }

    if app.search_active {
        match key.code {
            KeyCode::Enter => app.search_active = false,
            KeyCode::Esc => {
                app.search_active = false;
                app.query.clear();
                app.refresh();
            }
            KeyCode::Backspace => {
                app.query.pop();
                app.refresh();
            }
            KeyCode::Char(ch) => {
                app.query.push(ch);
                app.refresh();
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('?') => app.show_help = !app.show_help,
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.move_selection(app.list_jump())
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.move_selection(-app.list_jump())
        }
        KeyCode::Char('g') | KeyCode::Home => app.selected = (!app.rows.is_empty()).then_some(0),
        KeyCode::Char('G') | KeyCode::End => app.selected = app.rows.len().checked_sub(1),
        KeyCode::Char('/') => {
            app.search_active = true;
            app.info_message = None;
        }
        KeyCode::Tab => app.toggle_section(),
        KeyCode::Char('n') => {
            app.prompt = Some(PromptState {
                kind: PromptKind::NewTask,
                value: String::new(),
            });
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(task) = app.selected_task() {
                app.prompt = Some(PromptState {
                    kind: PromptKind::EditTitle(task.id.clone()),
                    value: task.title.clone(),
                });
            }
        }
        KeyCode::Char(' ') => {
            if let Some(task) = app.selected_task() {
                let id = task.id.clone();
                let title = task.title.clone();
                app.store.toggle(&id);
                app.after_mutation(format!("toggled {title}"));
            }
        }
        KeyCode::Char('s') => {
            if let Some(task) = app.selected_task() {
                let id = task.id.clone();
                let next = task.status().cycle();
                app.store.update_status(&id, next);
                app.after_mutation(format!("status -> {}", next.label()));
            }
        }
        KeyCode::Char('d') => {
            if let Some(task) = app.selected_task() {
                app.delete_confirm = Some(DeleteConfirmState {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                });
            }
        }
        _ => {}
    }
    false
}

fn submit_prompt(app: &mut AppState, prompt: PromptState) {
    match prompt.kind {
        PromptKind::NewTask => match app.store.add(&prompt.value, None, TaskStatus::Pending) {
            Some(id) => {
                app.refresh_selecting(Some(id));
                app.after_mutation("task added".to_string());
            }
            None => app.set_error("title cannot be empty".to_string()),
        },
        PromptKind::EditTitle(id) => {
            if prompt.value.trim().is_empty() {
                app.set_error("title cannot be empty".to_string());
                return;
            }
            app.store.edit(&id, TaskEdit::new().title(prompt.value));
            app.after_mutation("title updated".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Persistence;
    use crate::storage::MemoryStore;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut AppState, code: KeyCode) {
        handle_key(app, key(code));
        app.sync_with_store();
    }

    fn type_text(app: &mut AppState, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn app_with(titles: &[(&str, TaskStatus)]) -> AppState {
        let mut store = TaskStore::open(Persistence::new(MemoryStore::new()));
        for (title, status) in titles.iter().rev() {
            store.add(title, None, *status);
        }
        AppState::new(store, String::new())
    }

    #[test]
    fn new_task_prompt_adds_and_selects() {
        let mut app = app_with(&[]);
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Buy milk");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.stats().pending, 1);
        assert_eq!(app.selected_task().map(|task| task.title.as_str()), Some("Buy milk"));
    }

    #[test]
    fn space_toggles_selected_task() {
        let mut app = app_with(&[("Ship", TaskStatus::InProgress)]);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char(' '));

        let task = app.selected_task().expect("still selected");
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[test]
    fn search_narrows_projection() {
        let mut app = app_with(&[
            ("Foobar", TaskStatus::Pending),
            ("bar", TaskStatus::Pending),
        ]);
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "foo");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.groups.len(), 1);
        assert!(!app.search_active);

        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.groups.len(), 2);
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = app_with(&[("Temp", TaskStatus::Pending)]);
        // Last row is the completed header, the task sits just above it
        press(&mut app, KeyCode::Char('G'));
        press(&mut app, KeyCode::Char('k'));
        press(&mut app, KeyCode::Char('d'));
        assert!(app.delete_confirm.is_some());

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.stats().total, 1);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('c'));
        assert!(app.delete_confirm.is_some());
        assert_eq!(app.stats().total, 1);

        press(&mut app, KeyCode::Char('y'));
        assert!(app.delete_confirm.is_none());
        assert_eq!(app.stats().total, 0);
    }

    #[test]
    fn tab_folds_section_under_cursor() {
        let mut app = app_with(&[
            ("One", TaskStatus::Pending),
            ("Two", TaskStatus::Pending),
        ]);
        // rows: InProgress header, Pending header, One, Two, Completed header
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Tab);

        assert!(app.collapsed.contains(&TaskStatus::Pending));
        assert_eq!(app.rows.len(), 3);
        assert_eq!(app.selected_row().map(BoardRow::status), Some(TaskStatus::Pending));
    }

    #[test]
    fn status_key_cycles_status() {
        let mut app = app_with(&[("Cycle", TaskStatus::Pending)]);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('s'));

        assert_eq!(app.stats().in_progress, 1);
        assert_eq!(
            app.selected_task().map(|task| task.status()),
            Some(TaskStatus::InProgress)
        );
    }
}
