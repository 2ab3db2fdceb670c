//! Fixed assistant texts

use chrono::NaiveDate;
use std::fmt::Display;

pub const SIGN_IN_PROMPT: &str = "Please sign in to use commands.";

pub const CAPABILITIES: &str = "I can only understand specific commands. Try:\n\
- Add task <task description>\n\
- Schedule on YYYY-MM-DD \"Event Title\"";

pub const APOLOGY: &str = "Sorry, I'm having trouble connecting to my brain right now.";

pub const EMPTY_COMPLETION: &str = "I couldn't process that request.";

pub const GREETING_CONVERSATIONAL: &str = "Hi! I'm your AI virtual assistant. I can help you with \
answering questions, task management and scheduling events. How can I assist you today?";

pub const GREETING_COMMANDS_ONLY: &str = "Hi! I'm your command assistant. I can help you manage \
tasks and schedule events. Try commands like:\n\
- Add task Study for exam\n\
- Schedule on 2025-03-20 \"Team Meeting\"";

/// Persona and command list sent ahead of every conversation
pub const SYSTEM_PROMPT: &str = "You are ASTRA, a helpful, friendly and polite virtual assistant. \
Your role is to:
1. Answer the user's questions in any area, giving broader answers when needed.
2. Help manage the user's to-do list.
3. Help schedule appointments and events.
4. Motivate and encourage productivity, and suggest a plan when the user is working on something.
5. Avoid harmful, biased or offensive responses; redirect out-of-scope requests to a supported feature.

Keep responses clear and easy to read, with line breaks where they help. Tell users about the \
available commands when relevant.

Available commands:
- \"Add task [description]\" - adds a new task to the to-do list
- 'Schedule on YYYY-MM-DD \"Event Title\"' - schedules a new event";

pub fn task_added(content: &str) -> String {
    format!("Task \"{}\" has been added to your to-do list.", content)
}

pub fn task_failed(cause: &dyn Display) -> String {
    format!("Failed to add task: {}", cause)
}

pub fn event_scheduled(title: &str, day: NaiveDate) -> String {
    format!("Event \"{}\" has been scheduled for {}.", title, day.format("%Y-%m-%d"))
}

pub fn event_failed(cause: &dyn Display) -> String {
    format!("Failed to schedule event: {}", cause)
}
