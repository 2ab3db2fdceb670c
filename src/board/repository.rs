//! Task repository: loads the board and applies confirmed creates and deletes

use super::transition::BoardEvent;
use super::{Board, BoardState, Task, TaskStatus};
use crate::session::UserId;
use crate::store::StoreAdapter;
use crate::utils::errors::AstraError;
use crate::Result;
use std::sync::Arc;

/// Owner-scoped task operations backed by the remote store
///
/// Creates and deletes are not optimistic: local state changes only after
/// the store has accepted the write.
#[derive(Clone)]
pub struct TaskRepository {
    store: StoreAdapter,
    state: Arc<BoardState>,
}

impl TaskRepository {
    pub fn new(store: StoreAdapter, state: Arc<BoardState>) -> Self {
        Self { store, state }
    }

    pub fn state(&self) -> &Arc<BoardState> {
        &self.state
    }

    /// Authoritative board for `user`, without touching local state
    pub async fn fetch(&self, user: &UserId) -> Result<Board> {
        let tasks = self.store.list_tasks(user).await?;
        Ok(Board::from_tasks(tasks))
    }

    /// Load the user's board into local state
    ///
    /// With nobody signed in the board is cleared and returned empty. On a
    /// remote failure the previous board stays in place and the cause is
    /// returned.
    pub async fn load(&self, user: Option<&UserId>) -> Result<Arc<Board>> {
        let Some(user) = user else {
            return Ok(self.state.apply(&BoardEvent::Cleared));
        };

        let epoch = self.state.epoch();
        match self.fetch(user).await {
            Ok(board) => {
                tracing::debug!("loaded {} tasks for {}", board.len(), user);
                if !self.state.apply_if_current(epoch, &BoardEvent::Loaded(board)) {
                    tracing::debug!("discarding board load from a superseded session");
                }
                Ok(self.state.snapshot())
            }
            Err(e) => {
                tracing::warn!("failed to load tasks for {}: {}", user, e);
                Err(e)
            }
        }
    }

    /// Create a task in `column`; content is stored verbatim
    pub async fn create(&self, user: Option<&UserId>, column: TaskStatus, content: &str) -> Result<Task> {
        let user = user.ok_or(AstraError::NotSignedIn)?;
        if content.trim().is_empty() {
            return Err(AstraError::validation("content", "task content cannot be empty"));
        }

        let epoch = self.state.epoch();
        let task = self.store.insert_task(user, content, column).await?;
        tracing::info!("created task {} in {}", task.id, column);
        if !self.state.apply_if_current(epoch, &BoardEvent::TaskAdded(task.clone())) {
            tracing::debug!("discarding created task {} from a superseded session", task.id);
        }
        Ok(task)
    }

    /// Delete a task; ids the user does not own are a silent no-op
    pub async fn delete(&self, user: Option<&UserId>, column: TaskStatus, task_id: &str) -> Result<()> {
        let user = user.ok_or(AstraError::NotSignedIn)?;

        let epoch = self.state.epoch();
        self.store.delete_task(user, task_id).await?;
        tracing::info!("deleted task {} from {}", task_id, column);
        let removed = BoardEvent::TaskRemoved {
            task_id: task_id.to_string(),
        };
        if !self.state.apply_if_current(epoch, &removed) {
            tracing::debug!("discarding deletion of {} from a superseded session", task_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ids;
    use super::*;
    use crate::store::{Filter, MemoryStore, Order, RemoteStore, Row, StoreError, StoreOp, Table};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn repository() -> (Arc<MemoryStore>, TaskRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = TaskRepository::new(StoreAdapter::new(store.clone()), Arc::new(BoardState::new()));
        (store, repo)
    }

    #[tokio::test]
    async fn test_load_without_user_is_empty() {
        let (store, repo) = repository();
        let board = repo.load(None).await.unwrap();
        assert!(board.is_empty());
        assert_eq!(board.columns().len(), 3);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_then_load_preserves_creation_order() {
        let (_, repo) = repository();
        let user = UserId::new("u1");
        let a = repo.create(Some(&user), TaskStatus::Todo, "first").await.unwrap();
        let b = repo.create(Some(&user), TaskStatus::Done, "second").await.unwrap();
        let c = repo.create(Some(&user), TaskStatus::Todo, "third").await.unwrap();

        let local = repo.state().snapshot();
        let loaded = repo.load(Some(&user)).await.unwrap();
        assert_eq!(ids(&loaded, TaskStatus::Todo), vec![a.id.as_str(), c.id.as_str()]);
        assert_eq!(ids(&loaded, TaskStatus::Done), vec![b.id.as_str()]);
        assert_eq!(*local, *loaded);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_content_without_remote_call() {
        let (store, repo) = repository();
        let result = repo.create(Some(&UserId::new("u1")), TaskStatus::Todo, " \t ").await;
        assert!(matches!(result, Err(AstraError::Validation { .. })));
        assert_eq!(store.call_count(), 0);
        assert!(matches!(
            repo.create(None, TaskStatus::Todo, "x").await,
            Err(AstraError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_failed_create_leaves_state_untouched() {
        let (store, repo) = repository();
        store.fail_next(StoreOp::Insert, Some(Table::Tasks), 1);

        let result = repo.create(Some(&UserId::new("u1")), TaskStatus::Todo, "x").await;
        assert!(matches!(result, Err(AstraError::Store(_))));
        assert!(repo.state().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_delete_filters_local_state() {
        let (_, repo) = repository();
        let user = UserId::new("u1");
        let task = repo.create(Some(&user), TaskStatus::Todo, "x").await.unwrap();
        repo.create(Some(&user), TaskStatus::Todo, "y").await.unwrap();

        repo.delete(Some(&user), TaskStatus::Todo, &task.id).await.unwrap();
        assert_eq!(repo.state().snapshot().len(), 1);
        assert_eq!(repo.fetch(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_board() {
        let (store, repo) = repository();
        let user = UserId::new("u1");
        repo.create(Some(&user), TaskStatus::InProgress, "x").await.unwrap();
        store.fail_next(StoreOp::Select, Some(Table::Tasks), 1);

        assert!(repo.load(Some(&user)).await.is_err());
        assert_eq!(repo.state().snapshot().len(), 1);
    }

    /// Starts a new view whenever a write reaches the store, like a user
    /// switch landing while the write is in flight
    struct SwitchingStore {
        inner: MemoryStore,
        state: Arc<BoardState>,
        switching: AtomicBool,
    }

    impl SwitchingStore {
        /// Reset the view, then show it `next` as the new session's board
        fn switch(&self) {
            if self.switching.load(Ordering::SeqCst) {
                let next = self.state.snapshot();
                self.state.reset();
                self.state.apply(&BoardEvent::Loaded((*next).clone()));
            }
        }
    }

    #[async_trait::async_trait]
    impl RemoteStore for SwitchingStore {
        fn backend_name(&self) -> &str {
            "switching"
        }

        async fn select(
            &self,
            table: Table,
            filters: &[Filter],
            order: Option<&Order>,
        ) -> std::result::Result<Vec<Row>, StoreError> {
            self.inner.select(table, filters, order).await
        }

        async fn insert(&self, table: Table, row: Row) -> std::result::Result<Row, StoreError> {
            let row = self.inner.insert(table, row).await?;
            self.switch();
            Ok(row)
        }

        async fn update(
            &self,
            table: Table,
            id: &str,
            patch: Row,
            filters: &[Filter],
        ) -> std::result::Result<(), StoreError> {
            self.inner.update(table, id, patch, filters).await
        }

        async fn delete(&self, table: Table, id: &str, filters: &[Filter]) -> std::result::Result<(), StoreError> {
            self.inner.delete(table, id, filters).await?;
            self.switch();
            Ok(())
        }
    }

    fn switching_repository() -> (Arc<SwitchingStore>, TaskRepository) {
        let state = Arc::new(BoardState::new());
        let store = Arc::new(SwitchingStore {
            inner: MemoryStore::new(),
            state: state.clone(),
            switching: AtomicBool::new(false),
        });
        let repo = TaskRepository::new(StoreAdapter::new(store.clone()), state);
        (store, repo)
    }

    #[tokio::test]
    async fn test_confirmed_writes_from_a_superseded_session_are_dropped() {
        let (store, repo) = switching_repository();
        let user = UserId::new("alice");
        let kept = repo.create(Some(&user), TaskStatus::Todo, "kept").await.unwrap();
        store.switching.store(true, Ordering::SeqCst);

        let created = repo.create(Some(&user), TaskStatus::Todo, "alice secret").await.unwrap();
        let board = repo.state().snapshot();
        assert!(board.task(&created.id).is_none());
        assert!(board.task(&kept.id).is_some());

        repo.delete(Some(&user), TaskStatus::Todo, &kept.id).await.unwrap();
        assert!(repo.state().snapshot().task(&kept.id).is_some());

        // the store itself took both writes
        let remote = repo.fetch(&user).await.unwrap();
        assert!(remote.task(&created.id).is_some());
        assert!(remote.task(&kept.id).is_none());
    }
}
