//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and give in-chat control over messages, response
//! versions and the boost multiplier. Anything else is sent as a message.

use console::style;
use parley_types::budget::BoostMultiplier;
use parley_types::conversation::{Direction, MessageId};

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Exit the chat session.
    Exit,
    /// Re-render every turn of the session.
    History,
    /// Re-read the balance from the server.
    Balance,
    /// Request a new response version for the latest turn.
    Regenerate,
    /// Replace the content of a message.
    Edit { id: MessageId, text: String },
    /// Delete a message (a user message removes its whole turn).
    Delete(MessageId),
    /// Cycle the displayed version of a turn (latest turn when omitted).
    Switch {
        direction: Direction,
        turn: Option<MessageId>,
    },
    /// Select a boost multiplier, or show the options when `None`.
    Boost(Option<BoostMultiplier>),
    /// Unknown command or bad arguments, with a message for the user.
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

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts
        .get(1)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/history" | "/turns" => ChatCommand::History,
        "/balance" | "/bal" => ChatCommand::Balance,
        "/regen" | "/regenerate" | "/r" => ChatCommand::Regenerate,
        "/edit" | "/e" => parse_edit(arg),
        "/delete" | "/del" | "/rm" => match arg.map(str::parse::<MessageId>) {
            Some(Ok(id)) => ChatCommand::Delete(id),
            _ => ChatCommand::Unknown("usage: /delete <message-id>".to_string()),
        },
        "/next" | "/n" => parse_switch(Direction::Next, arg),
        "/prev" | "/p" => parse_switch(Direction::Prev, arg),
        "/boost" | "/b" => match arg.map(str::parse::<BoostMultiplier>) {
            None => ChatCommand::Boost(None),
            Some(Ok(boost)) => ChatCommand::Boost(Some(boost)),
            Some(Err(e)) => ChatCommand::Unknown(e),
        },
        other => ChatCommand::Unknown(format!("unknown command: {other}")),
    };
    Some(command)
}

fn parse_edit(arg: Option<&str>) -> ChatCommand {
    let usage = || ChatCommand::Unknown("usage: /edit <message-id> <new text>".to_string());
    let Some(arg) = arg else {
        return usage();
    };
    let mut split = arg.splitn(2, ' ');
    let id = split.next().and_then(|s| s.parse::<MessageId>().ok());
    let text = split.next().map(str::trim).filter(|s| !s.is_empty());
    match (id, text) {
        (Some(id), Some(text)) => ChatCommand::Edit {
            id,
            text: text.to_string(),
        },
        _ => usage(),
    }
}

fn parse_switch(direction: Direction, arg: Option<&str>) -> ChatCommand {
    match arg.map(str::parse::<MessageId>) {
        None => ChatCommand::Switch {
            direction,
            turn: None,
        },
        Some(Ok(turn)) => ChatCommand::Switch {
            direction,
            turn: Some(turn),
        },
        Some(Err(_)) => ChatCommand::Unknown("usage: /next [turn-id], /prev [turn-id]".to_string()),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    let rows = [
        ("/help", "Show this help message"),
        ("/history", "Show every turn of the session"),
        ("/edit <id> <text>", "Replace the content of a message"),
        ("/delete <id>", "Delete a message (user messages take their turn)"),
        ("/regen", "Generate another response for the latest turn"),
        ("/next [turn]", "Show the next response version"),
        ("/prev [turn]", "Show the previous response version"),
        ("/boost [1|1.5|3|5]", "Select the boost for the next message"),
        ("/balance", "Refresh the point balance"),
        ("/exit", "End the chat session"),
    ];

    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (command, description) in rows {
        println!("  {:<20} {}", style(command).cyan(), description);
    }
    println!();
    println!(
        "  {}",
        style("Message ids are shown as #id next to each message. Ctrl+D to exit").dim()
    );
    println!();
}
