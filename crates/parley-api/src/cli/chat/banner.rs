//! Welcome banner display for chat sessions.

use console::style;
use parley_types::budget::BoostMultiplier;
use parley_types::conversation::{CharacterId, SessionId};

/// Session details shown when a chat starts.
pub struct BannerInfo<'a> {
    pub character_id: CharacterId,
    pub session_id: SessionId,
    pub note: Option<&'a str>,
    pub turn_count: usize,
    pub balance: u32,
    pub boost: BoostMultiplier,
    pub send_cost: u32,
}

/// Print the welcome banner at the start of a chat session.
pub fn print_welcome_banner(info: &BannerInfo<'_>) {
    let session = info.session_id.to_string();

    println!();
    println!(
        "  {} {}",
        style("Parley").cyan().bold(),
        style(info.character_id).dim()
    );
    if let Some(note) = info.note {
        println!("  {}", style(note).dim());
    }
    println!();
    println!(
        "  {}  {} ({} turns)",
        style("Session:").bold(),
        style(&session[..8.min(session.len())]).dim(),
        info.turn_count
    );
    println!(
        "  {}  {} points, boost {}, {} per message",
        style("Balance:").bold(),
        style(info.balance).yellow(),
        info.boost,
        info.send_cost
    );
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
