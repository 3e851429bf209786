//! Text rendering of the directory page.

use std::fmt::Write as _;

use crate::card::CardView;
use crate::model::Palette;

/// Page header.
pub const DIRECTORY_HEADER: &str = "Clinical Supervisor Directory";
/// Search input placeholder.
pub const SEARCH_PLACEHOLDER: &str = "Search by name, title, or specialisation...";
/// Shown when no record matches the search.
pub const EMPTY_MESSAGE: &str = "No supervisors found matching your search criteria.";

/// Render the directory page.
#[must_use]
pub fn directory(cards: &[CardView], search_term: &str, last_updated: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{DIRECTORY_HEADER}");
    let _ = writeln!(out, "{}", "=".repeat(DIRECTORY_HEADER.chars().count()));
    if search_term.is_empty() {
        let _ = writeln!(out, "Search: {SEARCH_PLACEHOLDER}");
    } else {
        let _ = writeln!(out, "Search: {search_term}");
    }
    let _ = writeln!(out);

    if cards.is_empty() {
        let _ = writeln!(out, "{EMPTY_MESSAGE}");
    } else {
        for card in cards {
            let _ = writeln!(out, "{card}");
        }
    }

    let _ = write!(out, "Last updated: {last_updated}");
    out
}

/// Render cards as an aligned table.
#[must_use]
pub fn table(cards: &[CardView]) -> String {
    let rows: Vec<[String; 4]> = cards
        .iter()
        .map(|card| {
            let badges: Vec<&str> = card.badges.iter().map(|b| b.id.as_str()).collect();
            [
                card.name.clone(),
                card.title.clone(),
                card.email.clone(),
                badges.join(","),
            ]
        })
        .collect();

    let header = ["NAME", "TITLE", "EMAIL", "BADGES"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header.map(str::to_string), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out.truncate(out.trim_end().len());
    out
}

fn push_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

/// Render the palette, one badge per line.
#[must_use]
pub fn palette(palette: &Palette) -> String {
    palette
        .iter()
        .map(|badge| format!("{:<10} {:<10} {}", badge.id.as_str(), badge.alt, badge.src))
        .collect::<Vec<_>>()
        .join("\n")
}
