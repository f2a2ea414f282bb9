//! `parley balance` -- current points and the cost of each boost.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use parley_core::budget::BudgetGate;
use parley_types::budget::{BoostMultiplier, CostTable};

use crate::state::AppState;

pub async fn show_balance(state: &AppState, json: bool) -> Result<()> {
    let balance = state.budget.balance().await?;
    let costs = &state.config.costs;

    if json {
        let options: Vec<_> = BoostMultiplier::ALL
            .into_iter()
            .map(|boost| {
                serde_json::json!({
                    "boost": boost,
                    "cost": costs.total_cost(boost),
                    "affordable": balance >= costs.total_cost(boost),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "balance": balance,
                "options": options,
            }))?
        );
        return Ok(());
    }

    println!();
    println!(
        "  {} {} points",
        style("Balance:").bold(),
        style(balance).yellow().bold()
    );
    println!();
    println!("{}", cost_table(costs, balance));
    println!();
    Ok(())
}

fn cost_table(costs: &CostTable, balance: u32) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Boost").fg(Color::White),
        Cell::new("Cost").fg(Color::White),
        Cell::new("Sends left").fg(Color::White),
    ]);

    for boost in BoostMultiplier::ALL {
        let cost = costs.total_cost(boost);
        let sends = if cost == 0 {
            "unlimited".to_string()
        } else {
            (balance / cost).to_string()
        };
        let sends_cell = if balance >= cost {
            Cell::new(sends).fg(Color::Green)
        } else {
            Cell::new(sends).fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(boost).fg(Color::Cyan),
            Cell::new(cost),
            sends_cell,
        ]);
    }
    table
}
