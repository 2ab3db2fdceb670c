//! Chat command interpreter
//!
//! Two commands are recognised, both by case-insensitive prefix:
//!
//! - `add task <content>`
//! - `schedule on <YYYY-MM-DD> "<title>"`
//!
//! Everything else is [`Interpretation::NotACommand`] and falls through to
//! conversational handling.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ADD_TASK: &str = "add task ";
const SCHEDULE_ON: &str = "schedule on ";

lazy_static! {
    static ref ISO_DATE: Option<Regex> = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").ok();
}

/// A recognised command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    CreateTask { content: String },
    ScheduleEvent { date: NaiveDateTime, title: String },
}

/// Result of interpreting one line of chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    Command(Command),
    NotACommand,
}

/// Input that starts like a command but cannot be executed
///
/// The display text is the reply shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Please provide a task description. Try: add task <task description>")]
    EmptyTaskContent,

    #[error("Please provide an event title. Try: schedule on YYYY-MM-DD \"Event Title\"")]
    EmptyEventTitle,

    #[error("Invalid command format. Please use: schedule on YYYY-MM-DD \"Event Title\"")]
    MalformedSchedule,

    #[error("Invalid date format. Please use YYYY-MM-DD format.")]
    InvalidDate { input: String },
}

/// Interpret free-text input; the first matching prefix wins
pub fn interpret(text: &str) -> Result<Interpretation, CommandError> {
    if let Some(content) = strip_prefix_ignore_case(text, ADD_TASK) {
        return create_task(content).map(Interpretation::Command);
    }
    if let Some(rest) = strip_prefix_ignore_case(text, SCHEDULE_ON) {
        return schedule_event(rest).map(Interpretation::Command);
    }
    Ok(Interpretation::NotACommand)
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

fn create_task(content: &str) -> Result<Command, CommandError> {
    if content.trim().is_empty() {
        return Err(CommandError::EmptyTaskContent);
    }
    Ok(Command::CreateTask {
        content: content.to_string(),
    })
}

fn schedule_event(rest: &str) -> Result<Command, CommandError> {
    let parts: Vec<&str> = rest.split('"').collect();
    if parts.len() < 3 {
        return Err(CommandError::MalformedSchedule);
    }

    let date = parse_date(parts[0].trim())?;
    let title = parts[1];
    if title.trim().is_empty() {
        return Err(CommandError::EmptyEventTitle);
    }

    Ok(Command::ScheduleEvent {
        date: date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)),
        title: title.to_string(),
    })
}

/// Strict `YYYY-MM-DD`; anything else, including impossible dates, is rejected
pub fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    let invalid = || CommandError::InvalidDate {
        input: input.to_string(),
    };
    let shaped = ISO_DATE.as_ref().map_or(false, |re| re.is_match(input));
    if !shaped {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())
}
