//! Pure board transitions: `old board -> event -> new board`

use super::{Board, MoveCommand, Position, Task};

/// Everything that can change the board
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// Authoritative state fetched from the store
    Loaded(Board),
    /// Nobody signed in, or the view was torn down
    Cleared,
    /// A task the store has confirmed
    TaskAdded(Task),
    /// A task the store has deleted
    TaskRemoved { task_id: String },
    /// A (possibly unconfirmed) move
    TaskMoved(MoveCommand),
}

/// Compute the board that results from `event`
pub fn apply(board: &Board, event: &BoardEvent) -> Board {
    match event {
        BoardEvent::Loaded(loaded) => loaded.clone(),
        BoardEvent::Cleared => Board::empty(),
        BoardEvent::TaskAdded(task) => add_task(board, task),
        BoardEvent::TaskRemoved { task_id } => remove_task(board, task_id),
        BoardEvent::TaskMoved(command) => move_task(board, command).unwrap_or_else(|| board.clone()),
    }
}

/// Append a confirmed task to its column; replaying the same task is a no-op
pub fn add_task(board: &Board, task: &Task) -> Board {
    let mut next = board.clone();
    if board.find(&task.id).is_none() {
        next.column_mut(task.status).tasks.push(task.clone());
    }
    next
}

pub fn remove_task(board: &Board, task_id: &str) -> Board {
    let mut next = board.clone();
    for status in super::TaskStatus::ALL {
        next.column_mut(status).tasks.retain(|t| t.id != task_id);
    }
    next
}

/// Move a task, or `None` if it is not on the board
///
/// The task is located by id; `command.from` is only a hint, so a move stays
/// correct when other moves have shifted indexes in the meantime. The
/// destination index is clamped to the column length. Applying the same
/// command twice yields the same board.
pub fn move_task(board: &Board, command: &MoveCommand) -> Option<Board> {
    let from = locate(board, command)?;
    let mut next = board.clone();

    let mut task = next.column_mut(from.column).tasks.remove(from.index);
    task.status = command.to.column;

    let destination = next.column_mut(command.to.column);
    let index = command.to.index.min(destination.tasks.len());
    destination.tasks.insert(index, task);
    Some(next)
}

fn locate(board: &Board, command: &MoveCommand) -> Option<Position> {
    let hinted = board
        .column(command.from.column)
        .tasks
        .get(command.from.index)
        .filter(|t| t.id == command.task_id)
        .map(|_| command.from);
    hinted.or_else(|| board.find(&command.task_id))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ids, task};
    use super::super::TaskStatus::{Done, InProgress, Todo};
    use super::*;

    fn sample() -> Board {
        Board::from_tasks(vec![
            task("a", Todo, 1),
            task("b", Todo, 2),
            task("c", Todo, 3),
            task("d", InProgress, 4),
            task("e", Done, 5),
        ])
    }

    fn mv(id: &str, from: (super::super::TaskStatus, usize), to: (super::super::TaskStatus, usize)) -> MoveCommand {
        MoveCommand {
            task_id: id.to_string(),
            from: Position::new(from.0, from.1),
            to: Position::new(to.0, to.1),
        }
    }

    #[test]
    fn test_move_across_columns_updates_status() {
        let board = sample();
        let next = move_task(&board, &mv("b", (Todo, 1), (InProgress, 0))).unwrap();

        assert_eq!(ids(&next, Todo), vec!["a", "c"]);
        assert_eq!(ids(&next, InProgress), vec!["b", "d"]);
        assert_eq!(next.task("b").unwrap().status, InProgress);
        assert_eq!(next.task_ids(), board.task_ids());
    }

    #[test]
    fn test_reorder_within_column_keeps_relative_order() {
        let board = sample();
        let next = move_task(&board, &mv("a", (Todo, 0), (Todo, 2))).unwrap();
        assert_eq!(ids(&next, Todo), vec!["b", "c", "a"]);

        let back = move_task(&next, &mv("a", (Todo, 2), (Todo, 0))).unwrap();
        assert_eq!(ids(&back, Todo), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_destination_index_is_clamped() {
        let next = move_task(&sample(), &mv("a", (Todo, 0), (Done, 99))).unwrap();
        assert_eq!(ids(&next, Done), vec!["e", "a"]);
    }

    #[test]
    fn test_stale_source_hint_falls_back_to_lookup() {
        // "c" is really at Todo[2]; the hint says Todo[0], which holds "a"
        let next = move_task(&sample(), &mv("c", (Todo, 0), (Done, 0))).unwrap();
        assert_eq!(ids(&next, Todo), vec!["a", "b"]);
        assert_eq!(ids(&next, Done), vec!["c", "e"]);
    }

    #[test]
    fn test_unknown_task_is_not_moved() {
        let board = sample();
        assert!(move_task(&board, &mv("zzz", (Todo, 0), (Done, 0))).is_none());
        assert_eq!(apply(&board, &BoardEvent::TaskMoved(mv("zzz", (Todo, 0), (Done, 0)))), board);
    }

    #[test]
    fn test_move_replay_is_idempotent() {
        let command = mv("a", (Todo, 0), (InProgress, 1));
        let once = apply(&sample(), &BoardEvent::TaskMoved(command.clone()));
        let twice = apply(&once, &BoardEvent::TaskMoved(command));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_add_and_remove() {
        let board = sample();
        let added = apply(&board, &BoardEvent::TaskAdded(task("f", InProgress, 6)));
        assert_eq!(ids(&added, InProgress), vec!["d", "f"]);
        assert_eq!(apply(&added, &BoardEvent::TaskAdded(task("f", InProgress, 6))), added);

        let removed = apply(&added, &BoardEvent::TaskRemoved { task_id: "d".into() });
        assert_eq!(ids(&removed, InProgress), vec!["f"]);
        assert_eq!(apply(&removed, &BoardEvent::TaskRemoved { task_id: "nope".into() }), removed);
    }

    #[test]
    fn test_loaded_and_cleared_replace_everything() {
        let board = sample();
        assert!(apply(&board, &BoardEvent::Cleared).is_empty());
        let other = Board::from_tasks(vec![task("z", Done, 1)]);
        assert_eq!(apply(&board, &BoardEvent::Loaded(other.clone())), other);
    }
}
