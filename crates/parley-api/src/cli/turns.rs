//! `parley turns` -- print the turn view of a session.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;

use parley_core::conversation::SessionRequest;
use parley_types::conversation::{SessionId, Turn};

use crate::cli::chat::renderer::{preview, version_badge};
use crate::state::AppState;

#[derive(Serialize)]
struct TurnsReport<'a> {
    session_id: SessionId,
    note: Option<String>,
    balance: u32,
    turns: &'a [Turn],
}

pub async fn show_turns(state: &AppState, request: SessionRequest, json: bool) -> Result<()> {
    let controller = state.open_conversation(request).await?;
    let turns = controller.turns();

    if json {
        let report = TurnsReport {
            session_id: controller.session_id(),
            note: controller.note(),
            balance: controller.balance(),
            turns: &turns,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if turns.is_empty() {
        println!();
        println!(
            "  {} Session {} has no messages yet. Start with: {}",
            style("i").blue().bold(),
            style(controller.session_id()).dim(),
            style(format!("parley chat {}", controller.character_id())).yellow()
        );
        println!();
    } else {
        println!();
        println!("{}", turns_table(&turns));
        println!(
            "  {} turns in session {}",
            turns.len(),
            style(controller.session_id()).dim()
        );
        println!();
    }

    controller.close().await;
    Ok(())
}

fn turns_table(turns: &[Turn]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Turn").fg(Color::White),
        Cell::new("You").fg(Color::White),
        Cell::new("Response").fg(Color::White),
        Cell::new("Version").fg(Color::White),
        Cell::new("Response Ids").fg(Color::White),
    ]);

    for turn in turns {
        let response = match turn.displayed_content() {
            Some(content) => Cell::new(preview(content, 60)),
            None => Cell::new("(no response)").fg(Color::DarkGrey),
        };
        let version = version_badge(turn).unwrap_or_else(|| match turn.version_count() {
            0 => "-".to_string(),
            _ => "1/1".to_string(),
        });
        let ids = turn
            .versions
            .iter()
            .map(|m| {
                if m.is_active {
                    format!("{}*", m.id)
                } else {
                    m.id.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            Cell::new(turn.turn_id).fg(Color::Cyan),
            Cell::new(preview(&turn.user_message.content, 40)),
            response,
            Cell::new(version).fg(Color::Yellow),
            Cell::new(ids).fg(Color::DarkGrey),
        ]);
    }
    table
}
