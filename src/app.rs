//! Application wiring: one store, one session, and the components sharing them

use crate::board::{Board, BoardState, TaskRepository};
use crate::calendar::EventRepository;
use crate::chat::ChatOrchestrator;
use crate::completion::{CompletionProvider, CompletionProviderFactory};
use crate::config::{Config, StoreBackend};
use crate::session::{LocalSession, SessionProvider, UserId};
use crate::store::{MemoryStore, RemoteStore, RestStore, StoreAdapter};
use crate::sync::SyncEngine;
use crate::utils::errors::AstraError;
use crate::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Everything a front end needs, built once per process
pub struct App {
    store: StoreAdapter,
    session: Arc<LocalSession>,
    state: Arc<BoardState>,
    tasks: TaskRepository,
    sync: SyncEngine,
    events: EventRepository,
    chat: ChatOrchestrator,
}

impl App {
    /// Build the application described by `config`
    ///
    /// `user` overrides `session.user_id` from the file.
    pub fn from_config(config: &Config, user: Option<UserId>) -> Result<Self> {
        config.validate()?;

        let store = open_store(config)?;
        let user = user.or_else(|| config.session.user_id.as_deref().map(UserId::from));
        let session = Arc::new(match user {
            Some(user) => LocalSession::signed_in(user),
            None => LocalSession::anonymous(),
        });
        let completion = open_completion(config)?;

        Ok(Self::new(store, session, completion).with_context_window(config.chat.context_window))
    }

    /// Wire the components around an existing store and session
    pub fn new(
        store: Arc<dyn RemoteStore>,
        session: Arc<LocalSession>,
        completion: Option<Arc<dyn CompletionProvider>>,
    ) -> Self {
        let store = StoreAdapter::new(store);
        let state = Arc::new(BoardState::new());
        let tasks = TaskRepository::new(store.clone(), state.clone());
        let sync = SyncEngine::new(store.clone(), tasks.clone());
        let events = EventRepository::new(store.clone());
        let provider: Arc<dyn SessionProvider> = session.clone();
        let chat = ChatOrchestrator::new(
            store.clone(),
            provider,
            tasks.clone(),
            events.clone(),
            completion,
        );

        Self {
            store,
            session,
            state,
            tasks,
            sync,
            events,
            chat,
        }
    }

    fn with_context_window(mut self, messages: usize) -> Self {
        self.chat = self.chat.with_context_window(messages);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.store.backend_name()
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.session.current_user()
    }

    pub fn session(&self) -> &Arc<LocalSession> {
        &self.session
    }

    pub fn board(&self) -> Arc<Board> {
        self.state.snapshot()
    }

    pub fn board_state(&self) -> &Arc<BoardState> {
        &self.state
    }

    pub fn tasks(&self) -> &TaskRepository {
        &self.tasks
    }

    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn events(&self) -> &EventRepository {
        &self.events
    }

    pub fn chat(&self) -> &ChatOrchestrator {
        &self.chat
    }

    /// Sign in and load the new user's data
    pub async fn sign_in(&self, user: UserId) -> Result<()> {
        self.session.sign_in(user);
        self.handle_session_change().await
    }

    /// Sign out and clear local data
    pub async fn sign_out(&self) -> Result<()> {
        self.session.sign_out();
        self.handle_session_change().await
    }

    /// Drop everything loaded for the previous identity and load the current one
    ///
    /// Results still in flight for the previous identity are discarded when
    /// they arrive. The board and chat history load concurrently; the first
    /// failure is returned after both have finished.
    pub async fn handle_session_change(&self) -> Result<()> {
        let epoch = self.state.reset();
        let user = self.session.current_user();
        tracing::info!(
            "session changed (epoch {}): {}",
            epoch,
            user.as_ref().map_or("signed out", |u| u.as_str())
        );

        let (board, history) =
            futures::join!(self.tasks.load(user.as_ref()), self.chat.load_history());
        board?;
        history?;
        Ok(())
    }

    /// Reload on every sign-in and sign-out until the session is dropped
    pub fn spawn_session_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let app = Arc::clone(self);
        let mut changes = app.session.subscribe();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                if let Err(e) = app.handle_session_change().await {
                    tracing::warn!("failed to reload after session change: {}", e);
                }
            }
        })
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn RemoteStore>> {
    let store: Arc<dyn RemoteStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Local => Arc::new(MemoryStore::open(config.data_file())?),
        StoreBackend::Rest => {
            let url = config.store.url.as_deref().unwrap_or_default();
            let key = config
                .store_api_key()
                .ok_or_else(|| AstraError::validation("store.api_key", "missing"))?;
            Arc::new(RestStore::new(url, &key)?)
        }
    };
    tracing::debug!("using {} store backend", config.store.backend);
    Ok(store)
}

fn open_completion(config: &Config) -> Result<Option<Arc<dyn CompletionProvider>>> {
    let Some(provider) = config.active_provider() else {
        return Ok(None);
    };
    let completion = CompletionProviderFactory::create_provider(
        provider,
        config.provider_api_key(provider),
        config.provider_base_url(provider),
        config.generation(),
    )?;
    tracing::debug!("completion provider: {}", completion.provider_name());
    Ok(Some(completion))
}
