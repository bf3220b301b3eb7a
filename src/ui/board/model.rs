use std::collections::HashSet;

use crate::task::{TaskId, TaskStatus};
use crate::view::TaskGroups;

/// One selectable line of the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardRow {
    Section {
        status: TaskStatus,
        count: usize,
        collapsed: bool,
    },
    Task {
        id: TaskId,
        status: TaskStatus,
    },
}

impl BoardRow {
    pub fn status(&self) -> TaskStatus {
        match self {
            BoardRow::Section { status, .. } | BoardRow::Task { status, .. } => *status,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            BoardRow::Task { id, .. } => Some(id),
            BoardRow::Section { .. } => None,
        }
    }
}

/// Flatten groups into rows: a header per section, followed by its tasks
/// unless the section is collapsed
pub fn build_rows(groups: &TaskGroups, collapsed: &HashSet<TaskStatus>) -> Vec<BoardRow> {
    let mut rows = Vec::with_capacity(groups.len() + TaskStatus::ALL.len());
    for (status, tasks) in groups.sections() {
        let is_collapsed = collapsed.contains(&status);
        rows.push(BoardRow::Section {
            status,
            count: tasks.len(),
            collapsed: is_collapsed,
        });
        if is_collapsed {
            continue;
        }
        rows.extend(tasks.iter().map(|task| BoardRow::Task {
            id: task.id.clone(),
            status,
        }));
    }
    rows
}

/// Keep the cursor on the same task across rebuilds. A task that moved to a
/// collapsed section leaves the cursor on that section's header; a task that
/// disappeared keeps the cursor position, clamped.
pub fn select_row(
    rows: &[BoardRow],
    previous_id: Option<&str>,
    previous_status: Option<TaskStatus>,
    previous_pos: Option<usize>,
) -> Option<usize> {
    if rows.is_empty() {
        return None;
    }
    if let Some(id) = previous_id {
        if let Some(pos) = rows.iter().position(|row| row.task_id() == Some(id)) {
            return Some(pos);
        }
    }
    if previous_id.is_none() {
        if let Some(status) = previous_status {
            if let Some(pos) = rows
                .iter()
                .position(|row| matches!(row, BoardRow::Section { status: s, .. } if *s == status))
            {
                return Some(pos);
            }
        }
    }
    Some(previous_pos.unwrap_or(0).min(rows.len() - 1))
}
