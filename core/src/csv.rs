//! Minimal CSV reading and writing for episode logs and policy tables.
//!
//! Supports a header row, comma separators and double-quoted fields
//! (with `""` as an escaped quote). Every cell is read as text;
//! numeric coercion is the caller's decision.

use crate::{
    error::{PolicyError, PolicyResult},
    table::{Column, Table},
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

/// Read a CSV file into a table of text columns.
pub fn read_csv(path: &Path) -> PolicyResult<Table> {
    let content = fs::read_to_string(path)?;
    parse_csv(&content, &path.display().to_string())
}

pub fn parse_csv(content: &str, origin: &str) -> PolicyResult<Table> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header_line) = lines.next().ok_or_else(|| PolicyError::Csv {
        path:   origin.to_string(),
        line:   1,
        reason: "empty file".into(),
    })?;
    let header = split_record(header_line, origin, 1)?;

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); header.len()];
    for (idx, line) in lines {
        let record = split_record(line, origin, idx + 1)?;
        if record.len() != header.len() {
            return Err(PolicyError::Csv {
                path:   origin.to_string(),
                line:   idx + 1,
                reason: format!("expected {} fields, found {}", header.len(), record.len()),
            });
        }
        for (col, value) in cells.iter_mut().zip(record) {
            col.push(value);
        }
    }

    let mut table = Table::new();
    for (name, values) in header.iter().zip(cells) {
        if table.has_column(name) {
            return Err(PolicyError::Csv {
                path:   origin.to_string(),
                line:   1,
                reason: format!("duplicate column '{name}'"),
            });
        }
        table.set_column(name, Column::Text(values))?;
    }
    Ok(table)
}

fn split_record(line: &str, origin: &str, line_no: usize) -> PolicyResult<Vec<String>> {
    let line = line.trim_end_matches('\r');
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true)  => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            (c, _)       => current.push(c),
        }
    }
    if in_quotes {
        return Err(PolicyError::Csv {
            path:   origin.to_string(),
            line:   line_no,
            reason: "unterminated quoted field".into(),
        });
    }
    fields.push(current);
    Ok(fields.into_iter().map(|f| f.trim().to_string()).collect())
}

fn quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write a table as CSV, creating parent directories as needed.
pub fn write_csv(path: &Path, table: &Table) -> PolicyResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    let header: Vec<String> = table.names().iter().map(|n| quote(n)).collect();
    writeln!(out, "{}", header.join(","))?;
    for row in 0..table.n_rows() {
        let cells: Vec<String> = table.row_text(row).iter().map(|c| quote(c)).collect();
        writeln!(out, "{}", cells.join(","))?;
    }
    out.flush()?;
    Ok(())
}
