//! Chat orchestrator
//!
//! Each submitted message goes through the same sequence: the user's text is
//! stored, then it is either executed as a command, sent to the completion
//! provider, or answered with a fixed capability text, and the reply is
//! stored as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::board::{TaskRepository, TaskStatus};
use crate::calendar::EventRepository;
use crate::command::{self, Command, Interpretation};
use crate::completion::{CompletionProvider, Message};
use crate::session::{SessionProvider, UserId};
use crate::store::StoreAdapter;
use crate::utils::errors::AstraError;
use crate::Result;

pub mod texts;

pub use texts::*;

/// Default number of earlier messages sent along with a new one
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// A stored chat message; the log is append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub is_user: bool,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn to_completion(&self) -> Message {
        if self.is_user {
            Message::user(self.text.clone())
        } else {
            Message::assistant(self.text.clone())
        }
    }
}

/// Which path produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    SignInRequired,
    Command,
    CommandRejected,
    Completion,
    Apology,
    Capabilities,
}

/// The assistant's answer to one submitted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub kind: ReplyKind,
    /// Whether the reply reached the chat log
    pub persisted: bool,
}

/// Sequences interpretation, persistence and completion for chat input
pub struct ChatOrchestrator {
    store: StoreAdapter,
    session: Arc<dyn SessionProvider>,
    tasks: TaskRepository,
    events: EventRepository,
    completion: Option<Arc<dyn CompletionProvider>>,
    context_window: usize,
    history: RwLock<Vec<ChatMessage>>,
}

impl ChatOrchestrator {
    pub fn new(
        store: StoreAdapter,
        session: Arc<dyn SessionProvider>,
        tasks: TaskRepository,
        events: EventRepository,
        completion: Option<Arc<dyn CompletionProvider>>,
    ) -> Self {
        Self {
            store,
            session,
            tasks,
            events,
            completion,
            context_window: DEFAULT_CONTEXT_WINDOW,
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn with_context_window(mut self, messages: usize) -> Self {
        self.context_window = messages;
        self
    }

    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    /// Introductory text; not stored
    pub fn greeting(&self) -> &'static str {
        if self.has_completion() {
            GREETING_CONVERSATIONAL
        } else {
            GREETING_COMMANDS_ONLY
        }
    }

    /// Messages loaded or exchanged so far, oldest first
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.read().await.clone()
    }

    /// Replace the in-memory history with the signed-in user's chat log
    pub async fn load_history(&self) -> Result<Vec<ChatMessage>> {
        let Some(user) = self.session.current_user() else {
            self.history.write().await.clear();
            return Ok(Vec::new());
        };

        let messages = self.store.list_messages(&user).await.map_err(|e| {
            tracing::warn!("failed to load chat history for {}: {}", user, e);
            e
        })?;
        if self.session.current_user().as_ref() == Some(&user) {
            *self.history.write().await = messages.clone();
        } else {
            tracing::debug!("discarding chat history for a signed-out user");
        }
        Ok(messages)
    }

    /// Handle one message from the user
    pub async fn submit(&self, text: &str) -> Result<ChatReply> {
        if text.trim().is_empty() {
            return Err(AstraError::validation("message", "message cannot be empty"));
        }
        let Some(user) = self.session.current_user() else {
            return Ok(ChatReply {
                text: SIGN_IN_PROMPT.to_string(),
                kind: ReplyKind::SignInRequired,
                persisted: false,
            });
        };

        let user_message = self.store.insert_message(&user, text, true).await.map_err(|e| {
            tracing::warn!("failed to store user message: {}", e);
            e
        })?;
        let context = self.context_for(&user_message).await;
        self.remember(&user, user_message).await;

        let (reply, kind) = match command::interpret(text) {
            Ok(Interpretation::Command(command)) => {
                (self.execute(&user, command).await, ReplyKind::Command)
            }
            Err(rejected) => {
                tracing::debug!("command rejected: {:?}", rejected);
                (rejected.to_string(), ReplyKind::CommandRejected)
            }
            Ok(Interpretation::NotACommand) => match &self.completion {
                Some(provider) => self.converse(provider.as_ref(), &context).await,
                None => (CAPABILITIES.to_string(), ReplyKind::Capabilities),
            },
        };

        let persisted = match self.store.insert_message(&user, &reply, false).await {
            Ok(stored) => {
                self.remember(&user, stored).await;
                true
            }
            Err(e) => {
                tracing::error!("failed to store assistant reply: {}", e);
                false
            }
        };

        Ok(ChatReply {
            text: reply,
            kind,
            persisted,
        })
    }

    /// Append to the in-memory log while `user` is still the one signed in
    async fn remember(&self, user: &UserId, message: ChatMessage) {
        let mut history = self.history.write().await;
        if self.session.current_user().as_ref() == Some(user) {
            history.push(message);
        } else {
            tracing::debug!("discarding chat message {} for a signed-out user", message.id);
        }
    }

    /// System instruction, the last N messages, then the new message
    async fn context_for(&self, new_message: &ChatMessage) -> Vec<Message> {
        let history = self.history.read().await;
        let start = history.len().saturating_sub(self.context_window);

        let mut context = Vec::with_capacity(self.context_window + 2);
        context.push(Message::system(SYSTEM_PROMPT));
        context.extend(history[start..].iter().map(ChatMessage::to_completion));
        context.push(new_message.to_completion());
        context
    }

    async fn execute(&self, user: &UserId, command: Command) -> String {
        match command {
            Command::CreateTask { content } => {
                match self.tasks.create(Some(user), TaskStatus::Todo, &content).await {
                    Ok(_) => task_added(&content),
                    Err(e) => {
                        tracing::warn!("add task command failed: {}", e);
                        task_failed(&e)
                    }
                }
            }
            Command::ScheduleEvent { date, title } => {
                match self.events.create(Some(user), &title, date.date()).await {
                    Ok(_) => event_scheduled(&title, date.date()),
                    Err(e) => {
                        tracing::warn!("schedule command failed: {}", e);
                        event_failed(&e)
                    }
                }
            }
        }
    }

    async fn converse(&self, provider: &dyn CompletionProvider, context: &[Message]) -> (String, ReplyKind) {
        match provider.complete(context).await {
            Ok(text) if text.trim().is_empty() => (EMPTY_COMPLETION.to_string(), ReplyKind::Completion),
            Ok(text) => (text, ReplyKind::Completion),
            Err(e) => {
                tracing::warn!("completion via {} failed: {}", provider.provider_name(), e);
                (APOLOGY.to_string(), ReplyKind::Apology)
            }
        }
    }
}
