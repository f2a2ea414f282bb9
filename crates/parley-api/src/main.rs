//! Parley CLI entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, initializes tracing, the local preference database
//! and the server clients, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,parley=debug",
        _ => "trace",
    };
    parley_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    let result = match cli.command {
        Commands::Chat {
            character,
            session,
            new,
        } => {
            let request = session.request(character);
            let request = if new { request.fresh() } else { request };
            cli::chat::loop_runner::run_chat_loop(&state, request).await
        }

        Commands::Turns { character, session } => {
            cli::turns::show_turns(&state, session.request(character), cli.json).await
        }

        Commands::Delete {
            character,
            message,
            session,
            force,
        } => {
            cli::delete::delete_message(&state, session.request(character), message, force, cli.json)
                .await
        }

        Commands::Balance => cli::balance::show_balance(&state, cli.json).await,

        Commands::Completions { .. } => unreachable!("handled above"),
    };

    parley_observe::tracing_setup::shutdown_tracing();
    result
}
