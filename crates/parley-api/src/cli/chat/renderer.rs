//! Terminal rendering of turns.
//!
//! `TurnRenderer` prints each turn as the user message followed by the
//! active response version, rendered as markdown through `termimad`, with a
//! `[v/n]` indicator when the turn has more than one version.

use console::style;
use parley_types::conversation::Turn;
use termimad::MadSkin;
use termimad::crossterm::style::Color;

/// Markdown renderer for the turn view.
pub struct TurnRenderer {
    skin: MadSkin,
}

impl TurnRenderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.bold.set_fg(Color::Cyan);
        skin.headers[0].set_fg(Color::Cyan);
        skin.headers[1].set_fg(Color::Cyan);
        skin.inline_code.set_fg(Color::Yellow);
        Self { skin }
    }

    /// Render a markdown response body.
    pub fn render_markdown(&self, markdown: &str) -> String {
        self.skin.term_text(markdown).to_string()
    }

    /// Print one turn: the user message, then the displayed response.
    pub fn print_turn(&self, turn: &Turn) {
        println!(
            "  {} {} {}",
            style("You").green().bold(),
            style(format!("#{}", turn.turn_id)).dim(),
            turn.user_message.content
        );

        match turn.active_version() {
            Some(active) => {
                let badge = version_badge(turn)
                    .map(|b| format!(" {}", style(b).yellow()))
                    .unwrap_or_default();
                println!(
                    "  {}{} {}",
                    style("Character").cyan().bold(),
                    badge,
                    style(format!("#{}", active.id)).dim()
                );
                let rendered = self.render_markdown(&active.content);
                for line in rendered.trim_end().lines() {
                    println!("  {line}");
                }
            }
            None => println!("  {}", style("(no response)").dim()),
        }
        println!();
    }

    /// Print every turn of a session, or a hint when it is empty.
    pub fn print_history(&self, turns: &[Turn]) {
        if turns.is_empty() {
            println!("  {}", style("No messages yet.").dim());
            println!();
            return;
        }
        for turn in turns {
            self.print_turn(turn);
        }
    }
}

impl Default for TurnRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// `[v/n]` position indicator, shown only for turns with several versions.
pub fn version_badge(turn: &Turn) -> Option<String> {
    (turn.version_count() > 1)
        .then(|| format!("[{}/{}]", turn.active_index + 1, turn.version_count()))
}

/// Truncate `content` to `max` characters on a char boundary, adding `...`.
pub fn preview(content: &str, max: usize) -> String {
    let single_line = content.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let truncated: String = single_line.chars().take(max.saturating_sub(3)).collect();
    format!("{truncated}...")
}
