//! Shared holder for the current board snapshot

use super::transition::{self, BoardEvent};
use super::Board;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Current board plus an epoch that identifies the view's lifetime
///
/// The board is only ever replaced whole. The epoch changes whenever the view
/// is reset (user switched, view torn down); results of remote calls started
/// under an older epoch are dropped instead of applied.
pub struct BoardState {
    board: watch::Sender<Arc<Board>>,
    epoch: AtomicU64,
}

impl BoardState {
    pub fn new() -> Self {
        let (board, _) = watch::channel(Arc::new(Board::empty()));
        Self {
            board,
            epoch: AtomicU64::new(0),
        }
    }

    /// The current board
    pub fn snapshot(&self) -> Arc<Board> {
        self.board.borrow().clone()
    }

    /// Receiver notified on every replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<Board>> {
        self.board.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Apply an event to the current board and publish the result
    pub fn apply(&self, event: &BoardEvent) -> Arc<Board> {
        self.board.send_modify(|board| {
            *board = Arc::new(transition::apply(board, event));
        });
        self.snapshot()
    }

    /// Apply only if no reset happened since `epoch` was read
    pub fn apply_if_current(&self, epoch: u64, event: &BoardEvent) -> bool {
        self.board.send_if_modified(|board| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *board = Arc::new(transition::apply(board, event));
            true
        })
    }

    /// Start a new view lifetime with an empty board; returns the new epoch
    pub fn reset(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.board.send_replace(Arc::new(Board::empty()));
        epoch
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::task;
    use super::super::TaskStatus;
    use super::*;

    #[test]
    fn test_apply_replaces_snapshot() {
        let state = BoardState::new();
        let before = state.snapshot();
        let after = state.apply(&BoardEvent::TaskAdded(task("a", TaskStatus::Todo, 1)));

        assert!(before.is_empty());
        assert_eq!(after.len(), 1);
        // the old snapshot is untouched
        assert!(before.is_empty());
    }

    #[test]
    fn test_stale_epoch_is_discarded() {
        let state = BoardState::new();
        let epoch = state.epoch();
        let new_epoch = state.reset();
        assert_ne!(epoch, new_epoch);

        let loaded = Board::from_tasks(vec![task("a", TaskStatus::Done, 1)]);
        assert!(!state.apply_if_current(epoch, &BoardEvent::Loaded(loaded.clone())));
        assert!(state.snapshot().is_empty());

        assert!(state.apply_if_current(new_epoch, &BoardEvent::Loaded(loaded)));
        assert_eq!(state.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_whole_boards() {
        let state = BoardState::new();
        let mut rx = state.subscribe();
        state.apply(&BoardEvent::TaskAdded(task("a", TaskStatus::Todo, 1)));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }
}
