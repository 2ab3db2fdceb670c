//! Plain-text rendering of board, calendar and chat output

use crate::board::{Board, TaskStatus};
use crate::calendar::Event;
use crate::chat::{ChatMessage, ChatReply, ReplyKind};
use colored::*;
use std::fmt::Write;

fn column_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Todo => Color::Yellow,
        TaskStatus::InProgress => Color::Blue,
        TaskStatus::Done => Color::Green,
    }
}

/// Three columns, each task as `index. content [id]`
pub fn board(board: &Board) -> String {
    let mut out = String::new();
    for column in board.columns() {
        let header = format!("{} ({})", column.title, column.tasks.len());
        let _ = writeln!(out, "{}", header.color(column_color(column.id)).bold());
        if column.tasks.is_empty() {
            let _ = writeln!(out, "  {}", "(empty)".dimmed());
        }
        for (index, task) in column.tasks.iter().enumerate() {
            let _ = writeln!(out, "  {}. {} {}", index, task.content, format!("[{}]", task.id).dimmed());
        }
    }
    out
}

/// One event per line, `YYYY-MM-DD  title  [id]`
pub fn events(events: &[Event]) -> String {
    if events.is_empty() {
        return format!("{}\n", "No events".dimmed());
    }
    let mut out = String::new();
    for event in events {
        let _ = writeln!(
            out,
            "{}  {}  {}",
            event.day().format("%Y-%m-%d").to_string().cyan(),
            event.title,
            format!("[{}]", event.id).dimmed()
        );
    }
    out
}

/// Stored chat message prefixed with its speaker
pub fn message(message: &ChatMessage) -> String {
    if message.is_user {
        format!("{} {}", "You:".bright_blue().bold(), message.text)
    } else {
        format!("{} {}", "ASTRA:".bright_green().bold(), message.text)
    }
}

pub fn reply(reply: &ChatReply) -> String {
    let speaker = "ASTRA:".bright_green().bold();
    let text = match reply.kind {
        ReplyKind::Apology | ReplyKind::CommandRejected | ReplyKind::SignInRequired => {
            reply.text.bright_yellow().to_string()
        }
        _ => reply.text.clone(),
    };
    let mut out = format!("{} {}", speaker, text);
    if !reply.persisted {
        let _ = write!(out, "\n{}", "(reply was not saved to your chat history)".dimmed());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::task;
    use crate::session::UserId;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_board_lists_every_column() {
        let tasks = Board::from_tasks(vec![
            task("a", TaskStatus::Todo, 1),
            task("b", TaskStatus::Done, 2),
        ]);
        let text = board(&tasks);
        assert!(text.contains("To Do (1)"));
        assert!(text.contains("In Progress (0)"));
        assert!(text.contains("Done (1)"));
        assert!(text.contains("[a]"));
        assert!(text.contains("(empty)"));
    }

    #[test]
    fn test_events_and_replies() {
        let event = Event {
            id: "e1".to_string(),
            title: "Team Meeting".to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap(),
            owner: UserId::from("u"),
            created_at: None,
        };
        assert_eq!(event.day(), NaiveDate::from_ymd_opt(2025, 3, 20).unwrap());
        let text = events(&[event]);
        assert!(text.contains("2025-03-20"));
        assert!(text.contains("Team Meeting"));
        assert!(events(&[]).contains("No events"));

        let unsaved = ChatReply {
            text: "hi".to_string(),
            kind: ReplyKind::Completion,
            persisted: false,
        };
        assert!(reply(&unsaved).contains("not saved"));
    }
}
