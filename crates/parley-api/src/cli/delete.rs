//! `parley delete` -- delete one message outside the chat loop.

use anyhow::{Result, bail};
use console::style;
use dialoguer::Confirm;

use parley_core::conversation::SessionRequest;
use parley_types::conversation::MessageId;

use crate::cli::chat::renderer::preview;
use crate::cli::spinner;
use crate::state::AppState;

pub async fn delete_message(
    state: &AppState,
    request: SessionRequest,
    message_id: MessageId,
    force: bool,
    json: bool,
) -> Result<()> {
    let controller = state.open_conversation(request).await?;
    let session_id = controller.session_id();

    let Some(message) = controller.messages().into_iter().find(|m| m.id == message_id) else {
        controller.close().await;
        bail!("message {message_id} not found in session {session_id}");
    };
    let removes = match message.turn_key() {
        Some(turn_id) if message.is_user() => controller
            .turn(turn_id)
            .map(|t| t.message_ids().len())
            .unwrap_or(1),
        _ => 1,
    };

    if !force && !json {
        let what = if message.is_user() {
            format!("message #{message_id} and its {} response(s)", removes - 1)
        } else {
            format!("response #{message_id}")
        };
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} ({})?",
                style(what).red().bold(),
                preview(&message.content, 40)
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            controller.close().await;
            return Ok(());
        }
    }

    let spinner = spinner(&format!("Deleting #{message_id}..."));
    let result = controller.delete_message(message_id).await;
    spinner.finish_and_clear();
    controller.close().await;
    result?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "deleted": true,
                "message_id": message_id,
                "session_id": session_id,
                "removed": removes,
            })
        );
    } else {
        println!(
            "  {} Deleted {} message(s).",
            style("✓").red().bold(),
            removes
        );
    }

    Ok(())
}
