//! Terminal front end

pub mod console;
pub mod render;

pub use console::ConsoleChat;
