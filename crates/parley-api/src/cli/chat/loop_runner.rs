//! Main chat loop orchestration.
//!
//! Opens the conversation, prints the banner and history, then reads lines:
//! slash commands drive edit, delete, regenerate, version switching and the
//! boost selector; anything else is sent as a message. Failures reach the
//! user through the controller's event stream, drained after each command.
//! A send rejected before any request keeps its text as a draft in the
//! controller; an empty line sends the draft again.

use console::style;
use tracing::{info, warn};

use parley_core::conversation::SessionRequest;
use parley_core::event::EventSubscription;
use parley_types::budget::BoostMultiplier;
use parley_types::conversation::{Direction, MessageId};
use parley_types::event::ConversationEvent;

use crate::cli::spinner;
use crate::state::{AppState, ConcreteController};

use super::banner::{BannerInfo, print_welcome_banner};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{TurnRenderer, preview};

/// Number of turns replayed when a session is resumed.
const RESUME_HISTORY_TURNS: usize = 5;

/// Run the interactive chat loop for a character.
pub async fn run_chat_loop(state: &AppState, request: SessionRequest) -> anyhow::Result<()> {
    let opening = spinner("opening session...");
    let controller = match state.open_conversation(request).await {
        Ok(controller) => controller,
        Err(e) => {
            opening.finish_and_clear();
            return Err(e);
        }
    };
    opening.finish_and_clear();
    let mut events = controller.subscribe();

    let turns = controller.turns();
    let note = controller.note();
    print_welcome_banner(&BannerInfo {
        character_id: controller.character_id(),
        session_id: controller.session_id(),
        note: note.as_deref(),
        turn_count: turns.len(),
        balance: controller.balance(),
        boost: controller.boost(),
        send_cost: controller.send_cost(),
    });

    let renderer = TurnRenderer::new();
    let skip = turns.len().saturating_sub(RESUME_HISTORY_TURNS);
    for turn in &turns[skip..] {
        renderer.print_turn(turn);
    }

    let (mut chat_input, _writer) = ChatInput::new(prompt(&controller))
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => match outgoing(text, &controller.input()) {
                Some(text) => text,
                None => continue,
            },
        };

        match commands::parse(&text) {
            Some(ChatCommand::Exit) => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            Some(command) => {
                run_command(&controller, &renderer, &mut chat_input, command).await;
            }
            None => send(&controller, &renderer, &text).await,
        }

        report_events(&mut events);
        chat_input.update_prompt(&prompt(&controller));
    }

    let session_id = controller.session_id();
    let stats = controller.close().await;
    if stats.drifted > 0 {
        warn!(session_id = %session_id, drifted = stats.drifted, "version selections not saved");
        eprintln!(
            "  {} {} version selection(s) could not be saved and will reset next time.",
            style("!").yellow().bold(),
            stats.drifted
        );
    }
    info!(session_id = %session_id, persisted = stats.persisted, "chat loop finished");
    Ok(())
}

async fn send(controller: &ConcreteController, renderer: &TurnRenderer, text: &str) {
    controller.set_input(text);
    let spinner = spinner("thinking...");
    let result = controller.send_message(&controller.input()).await;
    spinner.finish_and_clear();

    if let Ok(ids) = result {
        println!();
        if let Some(turn) = ids.first().and_then(|id| controller.turn(*id)) {
            renderer.print_turn(&turn);
        }
    }
}

async fn run_command(
    controller: &ConcreteController,
    renderer: &TurnRenderer,
    input: &mut ChatInput,
    command: ChatCommand,
) {
    match command {
        ChatCommand::Help => commands::print_help(),
        ChatCommand::History => {
            println!();
            renderer.print_history(&controller.turns());
        }
        ChatCommand::Balance => match controller.refresh_balance().await {
            Ok(balance) => println!(
                "\n  {} {} points ({} per message at {})\n",
                style("Balance:").bold(),
                style(balance).yellow(),
                controller.send_cost(),
                controller.boost()
            ),
            Err(e) => println!("\n  {} {e}\n", style("!").red().bold()),
        },
        ChatCommand::Regenerate => {
            let Some(turn_id) = controller.latest_turn_id() else {
                println!("\n  {} Nothing to regenerate yet.\n", style("?").yellow().bold());
                return;
            };
            let spinner = spinner("regenerating...");
            let result = controller.regenerate(turn_id).await;
            spinner.finish_and_clear();
            if result.is_ok() {
                print_turn(controller, renderer, turn_id);
            }
        }
        ChatCommand::Switch { direction, turn } => {
            switch(controller, renderer, direction, turn);
        }
        ChatCommand::Edit { id, text } => {
            if controller.edit_message(id, &text).await.is_ok() {
                println!(
                    "\n  {} Message #{id} updated: {}\n",
                    style("*").cyan().bold(),
                    style(preview(&text, 60)).dim()
                );
            }
        }
        ChatCommand::Delete(id) => delete(controller, input, id).await,
        ChatCommand::Boost(None) => print_boost_options(controller),
        ChatCommand::Boost(Some(boost)) => {
            controller.set_boost(boost).await;
            println!(
                "\n  {} Boost {} selected, next message costs {} points.\n",
                style("*").cyan().bold(),
                boost,
                controller.send_cost()
            );
        }
        ChatCommand::Unknown(message) => {
            println!(
                "\n  {} {}. Type /help for available commands.\n",
                style("?").yellow().bold(),
                style(message).dim()
            );
        }
        ChatCommand::Exit => {}
    }
}

fn switch(
    controller: &ConcreteController,
    renderer: &TurnRenderer,
    direction: Direction,
    turn: Option<MessageId>,
) {
    let Some(turn_id) = turn.or_else(|| controller.latest_turn_id()) else {
        println!("\n  {} No turns yet.\n", style("?").yellow().bold());
        return;
    };
    if controller.switch_version(turn_id, direction).is_ok() {
        print_turn(controller, renderer, turn_id);
    }
}

async fn delete(controller: &ConcreteController, input: &mut ChatInput, id: MessageId) {
    let question = match controller.messages().iter().find(|m| m.id == id) {
        Some(message) if message.is_user() => {
            format!("Delete message #{id} and all of its responses?")
        }
        Some(_) => format!("Delete response #{id}?"),
        None => {
            println!("\n  {} Message #{id} not found.\n", style("?").yellow().bold());
            return;
        }
    };
    if !input.confirm(&question).await {
        println!("  {}", style("Cancelled.").dim());
        return;
    }
    if controller.delete_message(id).await.is_ok() {
        println!("\n  {} Message #{id} deleted.\n", style("*").cyan().bold());
    }
}

fn print_turn(controller: &ConcreteController, renderer: &TurnRenderer, turn_id: MessageId) {
    if let Some(turn) = controller.turn(turn_id) {
        println!();
        renderer.print_turn(&turn);
    }
}

fn print_boost_options(controller: &ConcreteController) {
    let current = controller.boost();
    println!();
    println!("  {}", style("Boost options:").bold());
    for boost in BoostMultiplier::ALL {
        let marker = if boost == current { "*" } else { " " };
        println!(
            "  {marker} {:<6} {} points",
            boost.to_string(),
            controller.costs().total_cost(boost)
        );
    }
    println!();
}

/// The line to send: what was typed, or the kept draft for an empty line.
fn outgoing(line: String, draft: &str) -> Option<String> {
    if !line.is_empty() {
        Some(line)
    } else if draft.trim().is_empty() {
        None
    } else {
        Some(draft.to_string())
    }
}

/// Print what the user needs to know about events since the last command.
fn report_events(events: &mut EventSubscription) {
    for event in events.drain() {
        if let Some(line) = describe_event(&event) {
            println!("{line}");
        }
    }
}

fn describe_event(event: &ConversationEvent) -> Option<String> {
    match event {
        ConversationEvent::OperationFailed { operation, error } => Some(format!(
            "\n  {} {operation} failed: {error}\n",
            style("!").red().bold()
        )),
        ConversationEvent::MessagesRestored { message_ids } => Some(format!(
            "  {} Restored {} message(s).\n",
            style("*").yellow().bold(),
            message_ids.len()
        )),
        _ => None,
    }
}

fn prompt(controller: &ConcreteController) -> String {
    format!(
        "  {} {} ",
        style(status_line(controller.balance(), controller.boost(), &controller.input())).dim(),
        style("You >").green().bold()
    )
}

fn status_line(balance: u32, boost: BoostMultiplier, draft: &str) -> String {
    let mut status = format!("[{balance} pts");
    if boost.is_boosted() {
        status.push_str(&format!(", {boost}"));
    }
    if !draft.trim().is_empty() {
        status.push_str(", draft kept: Enter resends");
    }
    status.push(']');
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::event::Operation;

    #[test]
    fn failures_are_reported() {
        let line = describe_event(&ConversationEvent::OperationFailed {
            operation: Operation::Edit,
            error: "server error (503): overloaded".to_string(),
        })
        .unwrap();
        assert!(line.contains("edit failed"));
        assert!(line.contains("overloaded"));
    }

    #[test]
    fn restores_are_reported() {
        let line = describe_event(&ConversationEvent::MessagesRestored {
            message_ids: vec![MessageId(1), MessageId(2)],
        })
        .unwrap();
        assert!(line.contains("Restored 2 message(s)"));
    }

    #[test]
    fn empty_line_resends_kept_draft() {
        assert_eq!(outgoing(String::new(), "Hello"), Some("Hello".to_string()));
        assert_eq!(outgoing(String::new(), ""), None);
        assert_eq!(outgoing("Hi".to_string(), "Hello"), Some("Hi".to_string()));
    }

    #[test]
    fn status_line_shows_boost_and_draft() {
        assert_eq!(status_line(5, BoostMultiplier::Standard, ""), "[5 pts]");
        let status = status_line(2, BoostMultiplier::Boost3, "Hello");
        assert!(status.starts_with("[2 pts, "));
        assert!(status.contains("draft kept"));
    }

    #[test]
    fn routine_events_are_silent() {
        assert!(describe_event(&ConversationEvent::BalanceChanged { balance: 3 }).is_none());
        assert!(
            describe_event(&ConversationEvent::MessagesAppended {
                message_ids: vec![MessageId(4)]
            })
            .is_none()
        );
    }
}
