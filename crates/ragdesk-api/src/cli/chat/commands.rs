//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    /// Exit the chat.
    Quit,
    /// Create a session and switch to it.
    New(Option<String>),
    /// List sessions.
    Sessions,
    /// Switch to a session by ID or unique prefix.
    Switch(String),
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, Some(rest.trim()).filter(|a| !a.is_empty())),
        None => (trimmed, None),
    };

    match cmd.to_lowercase().as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/quit" | "/exit" | "/q" => Some(ChatCommand::Quit),
        "/new" => Some(ChatCommand::New(arg.map(str::to_string))),
        "/sessions" | "/ls" => Some(ChatCommand::Sessions),
        "/switch" | "/sw" => match arg {
            Some(id) => Some(ChatCommand::Switch(id.to_string())),
            None => Some(ChatCommand::Unknown("/switch requires a session id".to_string())),
        },
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}          {}", style("/help").cyan(), "Show this help message");
    println!("  {}   {}", style("/new [name]").cyan(), "Start a new session");
    println!("  {}      {}", style("/sessions").cyan(), "List sessions");
    println!("  {}   {}", style("/switch <id>").cyan(), "Switch to another session");
    println!("  {}          {}", style("/quit").cyan(), "Leave the chat");
    println!();
    println!(
        "  {}",
        style("Ctrl+C while waiting cancels the pending reply").dim()
    );
    println!();
}
