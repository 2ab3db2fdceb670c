//! ASTRA - personal productivity assistant
//!
//! A task board with optimistic moves, a calendar and a chat assistant, all
//! backed by a remote store that stays the source of truth.

pub mod app;
pub mod board;
pub mod calendar;
pub mod chat;
pub mod command;
pub mod completion;
pub mod config;
pub mod session;
pub mod store;
pub mod sync;
pub mod ui;
pub mod utils;

// Re-export commonly used types and traits
pub use app::App;
pub use board::{Board, BoardState, Column, MoveCommand, Position, Task, TaskRepository, TaskStatus};
pub use calendar::{Event, EventRepository};
pub use chat::{ChatMessage, ChatOrchestrator, ChatReply, ReplyKind};
pub use command::{interpret, Command, CommandError, Interpretation};
pub use completion::{CompletionError, CompletionProvider, CompletionProviderFactory, Message};
pub use config::{Config, ConfigManager, StoreBackend};
pub use session::{LocalSession, SessionProvider, UserId};
pub use store::{MemoryStore, RemoteStore, RestStore, StoreAdapter, StoreError};
pub use sync::{MoveOutcome, SyncEngine};
pub use utils::errors::{AstraError, ConfigError};

/// The main result type used throughout the application
pub type Result<T> = std::result::Result<T, AstraError>;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "ASTRA";
