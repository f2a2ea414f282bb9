//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing. Every conversation command
//! takes the character id and optionally a session id; without one the
//! character's latest session is resumed.

pub mod balance;
pub mod chat;
pub mod delete;
pub mod turns;

use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};

use parley_core::conversation::SessionRequest;
use parley_types::conversation::{CharacterId, MessageId, SessionId};

/// Start a cyan steady-tick spinner with `message`.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Chat with characters and manage response versions.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat with a character.
    Chat {
        /// Character id.
        character: CharacterId,

        #[command(flatten)]
        session: SessionArgs,

        /// Start a fresh session instead of resuming.
        #[arg(long, conflicts_with = "session")]
        new: bool,
    },

    /// Print the turn view of a session.
    Turns {
        /// Character id.
        character: CharacterId,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Delete a message (a user message takes its whole turn with it).
    #[command(alias = "rm")]
    Delete {
        /// Character id.
        character: CharacterId,

        /// Id of the message to delete.
        message: MessageId,

        #[command(flatten)]
        session: SessionArgs,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        force: bool,
    },

    /// Show the current point balance and send costs.
    Balance,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct SessionArgs {
    /// Session id to resume (defaults to the latest session).
    #[arg(long = "session", short = 's')]
    pub session: Option<SessionId>,
}

impl SessionArgs {
    pub fn request(self, character: CharacterId) -> SessionRequest {
        let request = SessionRequest::latest(character);
        match self.session {
            Some(session_id) => request.with_session(session_id),
            None => request,
        }
    }
}
