// src/input.rs
// EIN key lists from delimited text. Minimal CSV handling, quotes and CRLF
// tolerated; no general-purpose parsing beyond what the key files need.

use std::mem::take;
use std::path::Path;
use std::{fs, io};

use tracing::debug;

use crate::config::HEADER_TOKEN;

/// Parse delimited text into rows of fields.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = s!();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if matches!(chars.peek(), Some('"')) => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            c if c == sep => row.push(take(&mut field)),
            '\r' | '\n' => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if row.iter().any(|f| !f.is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // Flush the trailing row even if the text lacks a final newline.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        if row.iter().any(|f| !f.is_empty()) {
            rows.push(row);
        }
    }

    rows
}

/// Extract the EIN column from parsed rows.
///
/// When the first row carries the header token, its column index selects the
/// key column; otherwise column 0 is used. The header cell itself stays in
/// the output — the orchestrator treats it as a skip, not a key.
pub fn keys_from_rows(rows: Vec<Vec<String>>) -> Vec<String> {
    let col = rows
        .first()
        .and_then(|header| {
            header.iter().position(|cell| cell.trim().eq_ignore_ascii_case(HEADER_TOKEN))
        })
        .unwrap_or(0);

    rows.into_iter()
        .filter_map(|mut row| {
            if col < row.len() {
                let key = take(&mut row[col]);
                let key = key.trim();
                (!key.is_empty()).then(|| key.to_owned())
            } else {
                None
            }
        })
        .collect()
}

/// Ordered key list from one CSV file.
pub fn load_keys(path: &Path) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    let keys = keys_from_rows(parse_rows(&text, ','));
    debug!(path = %path.display(), count = keys.len(), "loaded key file");
    Ok(keys)
}

/// Concatenate keys from several files, preserving file order.
pub fn load_keys_many(paths: &[impl AsRef<Path>]) -> io::Result<Vec<String>> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(load_keys(path.as_ref())?);
    }
    Ok(all)
}
