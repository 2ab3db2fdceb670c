//! Task board model: three fixed status columns holding ordered tasks
//!
//! The board is an immutable value. Every change goes through
//! [`transition::apply`], which maps an old board and an event to a new
//! board, and [`BoardState`] swaps the whole value so readers never observe a
//! half-applied change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::session::UserId;
use crate::utils::errors::AstraError;

pub mod repository;
pub mod state;
pub mod transition;

pub use repository::TaskRepository;
pub use state::BoardState;
pub use transition::BoardEvent;

/// Lifecycle state of a task; also the id of the column holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "inProgress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl TaskStatus {
    /// Column order on the board
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    /// Wire value stored in the `status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "inProgress",
            TaskStatus::Done => "done",
        }
    }

    /// Display label of the column
    pub fn title(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    fn index(&self) -> usize {
        match self {
            TaskStatus::Todo => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Done => 2,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = AstraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "todo" => Ok(TaskStatus::Todo),
            "inProgress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(AstraError::unknown_status(other)),
        }
    }
}

/// A unit of work on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier, never changed after creation
    pub id: String,
    pub content: String,
    pub status: TaskStatus,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

/// One status column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub id: TaskStatus,
    pub title: &'static str,
    pub tasks: Vec<Task>,
}

impl Column {
    fn empty(id: TaskStatus) -> Self {
        Self {
            id,
            title: id.title(),
            tasks: Vec::new(),
        }
    }
}

/// Location of a task: column plus index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub column: TaskStatus,
    pub index: usize,
}

impl Position {
    pub fn new(column: TaskStatus, index: usize) -> Self {
        Self { column, index }
    }
}

/// Request to move one task between positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommand {
    pub task_id: String,
    pub from: Position,
    pub to: Position,
}

/// The full board: always exactly three columns in [`TaskStatus::ALL`] order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    columns: Vec<Column>,
}

impl Board {
    /// Well-formed board with no tasks
    pub fn empty() -> Self {
        Self {
            columns: TaskStatus::ALL.iter().map(|s| Column::empty(*s)).collect(),
        }
    }

    /// Partition tasks into columns; within a column, creation time ascending
    /// with ties kept in input order
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let mut board = Self::empty();
        for task in tasks {
            board.columns[task.status.index()].tasks.push(task);
        }
        board
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: TaskStatus) -> &Column {
        &self.columns[id.index()]
    }

    pub(crate) fn column_mut(&mut self, id: TaskStatus) -> &mut Column {
        &mut self.columns[id.index()]
    }

    /// Where a task currently sits
    pub fn find(&self, task_id: &str) -> Option<Position> {
        self.columns.iter().find_map(|column| {
            column
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|index| Position::new(column.id, index))
        })
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.find(task_id)
            .map(|pos| &self.columns[pos.column.index()].tasks[pos.index])
    }

    /// All task ids, sorted; equal multisets mean no task was lost or duplicated
    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .columns
            .iter()
            .flat_map(|c| c.tasks.iter().map(|t| t.id.clone()))
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    /// Task with a creation time of `minute` minutes past a fixed epoch
    pub fn task(id: &str, status: TaskStatus, minute: u32) -> Task {
        Task {
            id: id.to_string(),
            content: format!("task {}", id),
            status,
            owner: UserId::new("user-1"),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, minute, 0).unwrap(),
        }
    }

    pub fn ids(board: &Board, column: TaskStatus) -> Vec<&str> {
        board.column(column).tasks.iter().map(|t| t.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{ids, task};
    use super::*;

    #[test]
    fn test_status_round_trip_and_unknown() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        let err = "archived".parse::<TaskStatus>().unwrap_err();
        assert!(matches!(err, AstraError::UnknownStatus { ref value } if value == "archived"));
        assert!("InProgress".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_empty_board_is_well_formed() {
        let board = Board::empty();
        let titles: Vec<_> = board.columns().iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);
        assert!(board.is_empty());
    }

    #[test]
    fn test_from_tasks_partitions_by_creation_time() {
        let board = Board::from_tasks(vec![
            task("c", TaskStatus::Todo, 3),
            task("a", TaskStatus::Todo, 1),
            task("x", TaskStatus::Done, 2),
            task("b", TaskStatus::Todo, 1),
        ]);

        assert_eq!(ids(&board, TaskStatus::Todo), vec!["a", "b", "c"]);
        assert_eq!(ids(&board, TaskStatus::Done), vec!["x"]);
        assert!(board.column(TaskStatus::InProgress).tasks.is_empty());
        assert_eq!(board.find("c"), Some(Position::new(TaskStatus::Todo, 2)));
        assert_eq!(board.task_ids(), vec!["a", "b", "c", "x"]);
    }
}
