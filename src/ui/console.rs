//! Interactive console chat

use super::render;
use crate::app::App;
use crate::utils::errors::AstraError;
use crate::Result;
use colored::*;
use inquire::{InquireError, Text};

/// What the console does with one line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Exit,
    Help,
    Board,
    Skip,
    Message(String),
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => ConsoleInput::Skip,
            "exit" | "quit" => ConsoleInput::Exit,
            "help" => ConsoleInput::Help,
            "board" => ConsoleInput::Board,
            _ => ConsoleInput::Message(line.to_string()),
        }
    }
}

pub struct ConsoleChat<'a> {
    app: &'a App,
}

impl<'a> ConsoleChat<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }

    pub async fn run(&self) -> Result<()> {
        println!("{}", "ASTRA".bright_green().bold());
        println!("{}", "Type a message. Use 'help' for commands, 'exit' to quit.".dimmed());
        println!();

        for message in self.app.chat().history().await {
            println!("{}", render::message(&message));
        }
        println!("{} {}", "ASTRA:".bright_green().bold(), self.app.chat().greeting());
        println!();

        loop {
            let line = match Text::new("›").prompt() {
                Ok(line) => line,
                Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => break,
                Err(e) => return Err(AstraError::unknown(format!("console input failed: {}", e))),
            };

            match ConsoleInput::parse(&line) {
                ConsoleInput::Exit => break,
                ConsoleInput::Skip => continue,
                ConsoleInput::Help => self.show_help(),
                ConsoleInput::Board => print!("{}", render::board(&self.app.board())),
                ConsoleInput::Message(text) => match self.app.chat().submit(&text).await {
                    Ok(reply) => println!("{}", render::reply(&reply)),
                    Err(e) => println!("{}", format!("Error: {}", e).bright_red()),
                },
            }
            println!();
        }

        println!("{}", "Goodbye!".bright_yellow());
        Ok(())
    }

    fn show_help(&self) {
        println!("{}", "Available commands:".bright_cyan().bold());
        println!("  {} - add a task to To Do", "Add task <description>".bright_yellow());
        println!(
            "  {} - schedule an event",
            "Schedule on YYYY-MM-DD \"Event Title\"".bright_yellow()
        );
        println!("  {} - show the task board", "board".bright_yellow());
        println!("  {} - leave the chat", "exit/quit".bright_yellow());
    }
}
