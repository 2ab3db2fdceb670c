//! ASTRA - task board, calendar and chat assistant on the command line

use anyhow::{bail, Context};
use astra::{
    command,
    config::{ApiKeyResolver, ConfigManager, STORE_KEY_NAME},
    ui::{render, ConsoleChat},
    App, AstraError, MoveOutcome, Position, TaskStatus, UserId,
};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// ASTRA: personal productivity assistant
#[derive(Parser)]
#[command(name = "astra")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Act as this user instead of the one in the config file
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Show configuration and backend status
    Status,
    /// Print the task board
    Board,
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Manage calendar events
    Event {
        #[command(subcommand)]
        action: EventAction,
    },
    /// Send one message, or start an interactive chat (default)
    Chat {
        /// Message to send; omit for the interactive console
        message: Vec<String>,
    },
}

#[derive(Subcommand, Clone)]
enum TaskAction {
    /// Add a task
    Add {
        /// Column: todo, inProgress or done
        #[arg(long, default_value = "todo")]
        column: String,
        #[arg(required = true)]
        content: Vec<String>,
    },
    /// Move a task to another column or position
    Move {
        task_id: String,
        /// Destination column: todo, inProgress or done
        column: String,
        /// Position within the destination column (default: end)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Delete a task
    Delete { task_id: String },
}

#[derive(Subcommand, Clone)]
enum EventAction {
    /// List events, optionally for one month
    List {
        /// Month as YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Schedule an event
    Add {
        /// Day as YYYY-MM-DD
        date: String,
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Delete an event
    Delete { event_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => ConfigManager::default_config_path()?,
    };

    if let Some(Commands::Init { force }) = &cli.command {
        init_logging(cli.log_level.as_deref().unwrap_or("warn"))?;
        return init_config(config_path, *force);
    }

    let manager = ConfigManager::open(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let config = manager.config();
    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level))?;

    info!("Starting ASTRA v{}", astra::VERSION);

    let app = App::from_config(config, cli.user.as_deref().map(UserId::from))?;

    match cli.command.clone().unwrap_or(Commands::Chat { message: Vec::new() }) {
        Commands::Init { .. } => Ok(()),
        Commands::Status => show_status(&manager, &app),
        Commands::Board => {
            load_or_warn(&app).await;
            print!("{}", render::board(&app.board()));
            Ok(())
        }
        Commands::Task { action } => handle_task_command(&app, action).await,
        Commands::Event { action } => handle_event_command(&app, action).await,
        Commands::Chat { message } => run_chat(&app, message).await,
    }
}

/// Initialize logging on stderr so command output stays clean
fn init_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level).context("Invalid log level")?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set logger")?;
    Ok(())
}

fn init_config(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        println!("Configuration already exists at {}", path.display());
        println!("   Use --force to reinitialize configuration");
        return Ok(());
    }
    let manager = ConfigManager::init(&path, force)?;
    println!("{} {}", "Configuration written to".green(), manager.path().display());
    println!();
    println!("Next steps:");
    println!("   1. Set your user: [session] user_id = \"...\" (or pass --user)");
    println!("   2. Optionally pick a completion provider: [completion] provider = \"openai\"");
    println!("   3. Start chatting: astra chat");
    Ok(())
}

fn show_status(manager: &ConfigManager, app: &App) -> anyhow::Result<()> {
    let config = manager.config();
    println!("{}", "ASTRA status".bright_green().bold());
    println!("  Config file: {}", manager.path().display());
    println!("  Store backend: {} ({})", config.store.backend, app.backend_name());
    match config.store.backend {
        astra::StoreBackend::Local => println!("  Data file: {}", config.data_file().display()),
        astra::StoreBackend::Rest => {
            println!("  Store URL: {}", config.store.url.as_deref().unwrap_or_default());
            let key = ApiKeyResolver::key_status(STORE_KEY_NAME, config.store.api_key.as_deref());
            println!("  Store key: {}", key.display());
        }
        astra::StoreBackend::Memory => {}
    }
    match app.current_user() {
        Some(user) => println!("  Signed in as: {}", user),
        None => println!("  Signed in as: {}", "nobody".yellow()),
    }
    match config.active_provider() {
        Some(provider) => {
            let configured = config
                .completion
                .providers
                .get(provider)
                .and_then(|p| p.api_key.as_deref());
            let key = ApiKeyResolver::key_status(provider, configured);
            println!(
                "  Completion: {} ({}), key {}",
                provider,
                config.completion.model,
                key.display()
            );
        }
        None => println!("  Completion: {}", "none (commands only)".yellow()),
    }
    println!("  Chat context window: {}", config.chat.context_window);
    Ok(())
}

/// Reads degrade to whatever could be loaded; the cause is shown, not fatal
async fn load_or_warn(app: &App) {
    if let Err(e) = app.handle_session_change().await {
        eprintln!("{} {}", "warning:".yellow(), e);
    }
}

fn parse_column(value: &str) -> Result<TaskStatus, AstraError> {
    value.parse()
}

async fn handle_task_command(app: &App, action: TaskAction) -> anyhow::Result<()> {
    let user = app.current_user();
    let user = user.as_ref();
    if user.is_none() {
        return Err(AstraError::NotSignedIn.into());
    }
    app.handle_session_change().await?;

    match action {
        TaskAction::Add { column, content } => {
            let column = parse_column(&column)?;
            let task = app.tasks().create(user, column, &content.join(" ")).await?;
            println!("Added {} to {}", task.id, column.title());
        }
        TaskAction::Move {
            task_id,
            column,
            index,
        } => {
            let column = parse_column(&column)?;
            let board = app.board();
            let source = board
                .find(&task_id)
                .ok_or_else(|| AstraError::not_found(format!("task {}", task_id)))?;
            let index = index.unwrap_or_else(|| board.column(column).tasks.len());
            let destination = Position::new(column, index);

            match app.sync().move_task(user, &task_id, source, Some(destination)).await? {
                MoveOutcome::Unchanged => println!("{} is already there", task_id),
                MoveOutcome::Committed => println!("Moved {} to {}", task_id, column.title()),
                MoveOutcome::Reconciled { cause } => {
                    print!("{}", render::board(&app.board()));
                    bail!("move was not saved, board reloaded from the store: {}", cause);
                }
            }
        }
        TaskAction::Delete { task_id } => {
            let source = app
                .board()
                .find(&task_id)
                .ok_or_else(|| AstraError::not_found(format!("task {}", task_id)))?;
            app.tasks().delete(user, source.column, &task_id).await?;
            println!("Deleted {}", task_id);
        }
    }
    print!("{}", render::board(&app.board()));
    Ok(())
}

async fn handle_event_command(app: &App, action: EventAction) -> anyhow::Result<()> {
    let user = app.current_user();
    let user = user.as_ref();

    match action {
        EventAction::List { month } => {
            let events = match month {
                Some(month) => {
                    let first = NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
                        .map_err(|_| AstraError::invalid_date(month.clone()))?;
                    app.events().list_month(user, first.year(), first.month()).await?
                }
                None => app.events().list(user).await?,
            };
            print!("{}", render::events(&events));
        }
        EventAction::Add { date, title } => {
            let day = command::parse_date(&date)?;
            let event = app.events().create(user, &title.join(" "), day).await?;
            println!(
                "Scheduled \"{}\" on {} ({})",
                event.title,
                event.day().format("%Y-%m-%d"),
                event.id
            );
        }
        EventAction::Delete { event_id } => {
            app.events().delete(user, &event_id).await?;
            println!("Deleted {}", event_id);
        }
    }
    Ok(())
}

async fn run_chat(app: &App, message: Vec<String>) -> anyhow::Result<()> {
    load_or_warn(app).await;

    if message.is_empty() {
        ConsoleChat::new(app).run().await?;
        return Ok(());
    }

    let reply = app.chat().submit(&message.join(" ")).await?;
    println!("{}", render::reply(&reply));
    Ok(())
}
