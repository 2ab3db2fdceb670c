//! Optimistic move engine
//!
//! A move is shown immediately, then confirmed with a single status write.
//! When the write fails the board is reloaded from the store so the local
//! view converges to the backend's state. Moves of other tasks that are still
//! waiting on their own write, or that committed while the reload was in
//! flight, are replayed on top of the reloaded board, so a reconciliation
//! never hides a move the store has accepted or may still accept.

use crate::board::transition::{self, BoardEvent};
use crate::board::{MoveCommand, Position, TaskRepository};
use crate::session::UserId;
use crate::store::StoreAdapter;
use crate::utils::errors::AstraError;
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One tracked move; `seq` orders moves by when they started
#[derive(Debug, Clone)]
struct Tracked {
    seq: u64,
    command: MoveCommand,
}

/// Moves whose status write is outstanding, plus the ones a running reload
/// may have missed
#[derive(Debug, Default)]
struct InFlight {
    next_seq: u64,
    /// Latest unconfirmed move per task
    pending: HashMap<String, Tracked>,
    /// Moves committed while a reload was running, tagged with a commit number
    committed: Vec<(u64, Tracked)>,
    commits: u64,
    reloads: usize,
}

impl InFlight {
    fn track(&mut self, command: &MoveCommand) -> u64 {
        self.next_seq += 1;
        let tracked = Tracked {
            seq: self.next_seq,
            command: command.clone(),
        };
        self.pending.insert(command.task_id.clone(), tracked);
        self.next_seq
    }

    fn finish(&mut self, command: &MoveCommand, seq: u64, committed: bool) {
        // a newer move of the same task owns the entry now
        if self.pending.get(&command.task_id).map(|t| t.seq) == Some(seq) {
            self.pending.remove(&command.task_id);
        }
        if committed && self.reloads > 0 {
            self.commits += 1;
            let tracked = Tracked {
                seq,
                command: command.clone(),
            };
            self.committed.push((self.commits, tracked));
        }
    }

    /// Mark a reload as started; returns the commit number it started at
    fn begin_reload(&mut self) -> u64 {
        self.reloads += 1;
        self.commits
    }

    /// Moves to replay over a board read after `since`, oldest first
    fn end_reload(&mut self, since: u64) -> Vec<MoveCommand> {
        let mut replay: Vec<Tracked> = self
            .committed
            .iter()
            .filter(|(commit, _)| *commit > since)
            .map(|(_, tracked)| tracked.clone())
            .chain(self.pending.values().cloned())
            .collect();
        replay.sort_by_key(|tracked| tracked.seq);

        self.reloads = self.reloads.saturating_sub(1);
        if self.reloads == 0 {
            self.committed.clear();
        }
        replay.into_iter().map(|tracked| tracked.command).collect()
    }
}

/// How a move ended
#[derive(Debug)]
pub enum MoveOutcome {
    /// Nothing to do: drop cancelled or same position
    Unchanged,
    /// The store accepted the new status
    Committed,
    /// The store rejected the write; the board was reloaded from the store
    Reconciled { cause: AstraError },
}

impl MoveOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MoveOutcome::Committed)
    }
}

/// Runs optimistic moves against the shared board state
#[derive(Clone)]
pub struct SyncEngine {
    store: StoreAdapter,
    tasks: TaskRepository,
    in_flight: Arc<Mutex<InFlight>>,
}

impl SyncEngine {
    pub fn new(store: StoreAdapter, tasks: TaskRepository) -> Self {
        Self {
            store,
            tasks,
            in_flight: Arc::new(Mutex::new(InFlight::default())),
        }
    }

    /// Move `task_id` from `source` to `destination`
    ///
    /// `source` locates the task in the current board; if it is stale the task
    /// is found by id. Safe to call concurrently for different tasks.
    pub async fn move_task(
        &self,
        user: Option<&UserId>,
        task_id: &str,
        source: Position,
        destination: Option<Position>,
    ) -> Result<MoveOutcome> {
        let Some(destination) = destination else {
            return Ok(MoveOutcome::Unchanged);
        };
        if source == destination {
            return Ok(MoveOutcome::Unchanged);
        }
        let user = user.ok_or(AstraError::NotSignedIn)?;

        let state = self.tasks.state();
        let epoch = state.epoch();
        let original = state
            .snapshot()
            .find(task_id)
            .ok_or_else(|| AstraError::not_found(format!("task {}", task_id)))?;

        let command = MoveCommand {
            task_id: task_id.to_string(),
            from: source,
            to: destination,
        };
        let seq = self.track(&command);
        state.apply(&BoardEvent::TaskMoved(command.clone()));
        tracing::debug!(
            "optimistic move of {} from {}[{}] to {}[{}]",
            task_id,
            original.column,
            original.index,
            destination.column,
            destination.index
        );

        let written = self
            .store
            .update_task_status(user, task_id, destination.column)
            .await;
        self.finish(&command, seq, written.is_ok());

        match written {
            Ok(()) => {
                tracing::debug!("move of {} committed", task_id);
                Ok(MoveOutcome::Committed)
            }
            Err(cause) => {
                tracing::warn!("move of {} failed, reconciling: {}", task_id, cause);
                self.reconcile(user, epoch, &command, original).await?;
                Ok(MoveOutcome::Reconciled { cause })
            }
        }
    }

    /// Replace the board with the store's state plus moves the read may miss
    ///
    /// If the reload itself fails, only the failed task is put back where it
    /// was and the reload error is returned.
    async fn reconcile(
        &self,
        user: &UserId,
        epoch: u64,
        failed: &MoveCommand,
        original: Position,
    ) -> Result<()> {
        let state = self.tasks.state();
        let since = self.begin_reload();
        let fetched = self.tasks.fetch(user).await;
        let replay = self.end_reload(since);
        match fetched {
            Ok(board) => {
                let board = replay
                    .iter()
                    .fold(board, |board, command| {
                        transition::move_task(&board, command).unwrap_or(board)
                    });
                if state.apply_if_current(epoch, &BoardEvent::Loaded(board)) {
                    tracing::info!("board reconciled after failed move of {}", failed.task_id);
                } else {
                    tracing::debug!("discarding reconciliation from a superseded session");
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!("reconciliation reload failed: {}", e);
                let current = state
                    .snapshot()
                    .find(&failed.task_id)
                    .unwrap_or(failed.to);
                let revert = MoveCommand {
                    task_id: failed.task_id.clone(),
                    from: current,
                    to: original,
                };
                state.apply_if_current(epoch, &BoardEvent::TaskMoved(revert));
                Err(e)
            }
        }
    }

    fn track(&self, command: &MoveCommand) -> u64 {
        match self.in_flight.lock() {
            Ok(mut in_flight) => in_flight.track(command),
            Err(_) => 0,
        }
    }

    fn finish(&self, command: &MoveCommand, seq: u64, committed: bool) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.finish(command, seq, committed);
        }
    }

    fn begin_reload(&self) -> u64 {
        self.in_flight
            .lock()
            .map(|mut in_flight| in_flight.begin_reload())
            .unwrap_or_default()
    }

    fn end_reload(&self, since: u64) -> Vec<MoveCommand> {
        self.in_flight
            .lock()
            .map(|mut in_flight| in_flight.end_reload(since))
            .unwrap_or_default()
    }
}
