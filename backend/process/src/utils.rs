use std::sync::LazyLock;

use anyhow::{Context, bail};
use catalog::payloads::StudentRow;
use csv::{ReaderBuilder, Trim};
use regex::Regex;
use serde_json::{Map, Value};

use crate::models::HEADERS;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("valid pattern"));

static ROW_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Row (\d+):").expect("valid pattern"));

/// Collapses a header cell to letters and digits and maps it onto one of
/// [`HEADERS`] when it matches case-insensitively, so `Roll No`, `roll_no`
/// and `ROLLNO` all become `RollNo`.
pub fn sanitize(header: &str) -> String {
    let collapsed = NON_ALPHANUMERIC.replace_all(header.trim(), "").into_owned();

    HEADERS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(&collapsed))
        .map(|known| known.to_string())
        .unwrap_or(collapsed)
}

/// Parses a roster. The first record is the header row. Quoted cells may
/// span lines; blank records are skipped and empty cells are left out of the
/// row.
pub fn parse_roster(text: &str) -> anyhow::Result<Vec<StudentRow>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("roster header is not valid CSV")?
        .iter()
        .map(sanitize)
        .collect();

    if headers.iter().all(|header| header.is_empty()) {
        bail!("roster is empty");
    }

    let missing: Vec<&str> = HEADERS
        .iter()
        .copied()
        .filter(|known| !headers.iter().any(|h| h == known))
        .collect();
    if !missing.is_empty() {
        bail!("roster header lacks columns: {}", missing.join(", "));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("roster is not valid CSV")?;
        let line = record.position().map_or(0, |position| position.line());

        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(header, cell)| (header.clone(), Value::String(cell.to_string())))
            .collect();

        if row.is_empty() {
            continue;
        }

        rows.push(
            serde_json::from_value(Value::Object(row))
                .with_context(|| format!("line {line} is not a student row"))?,
        );
    }

    Ok(rows)
}

/// Shifts the `Row N:` prefix of a server message by `offset`. The server
/// numbers rows within one upload, starting at 1.
pub fn renumber(message: &str, offset: usize) -> String {
    match ROW_PREFIX
        .captures(message)
        .and_then(|captures| captures[1].parse::<usize>().ok())
    {
        Some(row) => ROW_PREFIX
            .replace(message, format!("Row {}:", row + offset))
            .into_owned(),
        None => message.to_string(),
    }
}
