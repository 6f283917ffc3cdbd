//! Output formatting for CLI commands

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use grantflow_workflow::{RequestStatus, StageProgress, StageState};
use serde::Serialize;

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "-"
    }
}

pub fn status_label(status: RequestStatus) -> String {
    status.as_str().to_uppercase()
}

/// One-line rendering of stage progress, e.g. `[x] Business > [~] Technical > [ ] AM Team`.
pub fn progress_line(progress: &[StageProgress]) -> String {
    progress
        .iter()
        .map(|p| {
            let mark = match p.state {
                StageState::Completed => "[x]",
                StageState::Denied => "[!]",
                StageState::Current => "[~]",
                StageState::Upcoming => "[ ]",
                StageState::NotReached => "[-]",
            };
            format!("{} {}", mark, p.stage)
        })
        .collect::<Vec<_>>()
        .join(" > ")
}
