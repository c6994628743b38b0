//! CSV export of the filtered log view.

use crate::domain::money::format_eur;
use crate::domain::timefmt::format_de;
use crate::domain::LogEntry;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "Zeitstempel;Aktion;Artikel;Käufer;Angebotspreis;Käufer-Angebot;Details";

const SEPARATOR: &str = ";";

pub fn file_name(date: NaiveDate) -> String {
    format!("ebay-bot-protokoll-{}.csv", date.format("%Y-%m-%d"))
}

/// Keep one record per line and one value per column.
fn sanitize(field: &str) -> String {
    field
        .chars()
        .map(|c| match c {
            '\r' | '\n' => ' ',
            ';' => ',',
            c => c,
        })
        .collect()
}

fn row(log: &LogEntry) -> String {
    let timestamp = log
        .parsed_timestamp()
        .map(|ts| format_de(&ts))
        .unwrap_or_else(|| log.timestamp.clone());
    [
        timestamp,
        log.action.as_str().to_string(),
        log.offer_title.clone().unwrap_or_default(),
        log.buyer_name.clone().unwrap_or_default(),
        opt_amount(log.listing_price),
        opt_amount(log.offer_price),
        log.payload_text(),
    ]
    .iter()
    .map(|f| sanitize(f))
    .collect::<Vec<_>>()
    .join(SEPARATOR)
}

fn opt_amount(value: Option<f64>) -> String {
    value.map(format_eur).unwrap_or_default()
}

/// Header plus one line per entry, without trailing newline.
pub fn render_csv<'a>(logs: impl IntoIterator<Item = &'a LogEntry>) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    lines.extend(logs.into_iter().map(row));
    lines.join("\n")
}

/// Write `logs` to `<dir>/ebay-bot-protokoll-<date>.csv` and return the path.
pub fn write_csv<'a>(
    dir: &Path,
    date: NaiveDate,
    logs: impl IntoIterator<Item = &'a LogEntry>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Exportverzeichnis {} nicht anlegbar", dir.display()))?;
    let path = dir.join(file_name(date));
    std::fs::write(&path, render_csv(logs))
        .with_context(|| format!("Export nach {} fehlgeschlagen", path.display()))?;
    Ok(path)
}
