//! Episode-log health scan. Reports problems; never fails on them.

use crate::{
    csv::read_csv,
    schema::apply_legacy_renames,
    table::{Column, Table},
};
use std::path::{Path, PathBuf};

/// Columns every healthy log carries.
pub const CORE_COLUMNS: &[&str] = &[
    "stage", "month", "north_mm", "south_mm", "pool_mm", "canal_mm", "lake_mm",
    "pool_ratio", "irrigateN_mm", "irrigateS_mm", "drainN_mm", "drainS_mm",
];

const NON_NEGATIVE: &[&str] = &[
    "north_mm", "south_mm", "pool_mm", "canal_mm", "lake_mm", "rain_mm", "loss_mm",
];

/// Single-day weather values above this are flagged.
const WEATHER_MAX_MM: f64 = 150.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file:   PathBuf,
    pub issues: Vec<String>,
}

impl FileReport {
    pub fn is_clean(&self) -> bool { self.issues.is_empty() }
}

fn count(values: &[f64], pred: impl Fn(f64) -> bool) -> usize {
    values.iter().filter(|v| pred(**v)).count()
}

/// Check one parsed log.
pub fn check_table(mut table: Table, features: &[String], actions: &[String]) -> Vec<String> {
    apply_legacy_renames(&mut table);
    table.coerce_numeric();
    let mut issues = Vec::new();

    let missing: Vec<&str> = CORE_COLUMNS
        .iter()
        .copied()
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() {
        issues.push(format!("missing_cols:{missing:?}"));
    }

    if let Ok(ratio) = table.numeric("pool_ratio") {
        let bad = count(ratio, |r| r < -1e-6 || r > 1.0 + 1e-6);
        if bad > 0 {
            issues.push(format!("pool_ratio_out_of_range:{bad}"));
        }
    }

    for &c in NON_NEGATIVE {
        let Ok(values) = table.numeric(c) else { continue };
        let neg = count(values, |v| v < -1e-9);
        if neg > 0 {
            issues.push(format!("{c}_neg:{neg}"));
        }
        if c == "rain_mm" || c == "loss_mm" {
            let big = count(values, |v| v > WEATHER_MAX_MM);
            if big > 0 {
                issues.push(format!("{c}_very_large:{big}"));
            }
        }
    }

    let mut missing_cells = 0;
    for name in features.iter().chain(actions) {
        if let Some(column) = table.column(name) {
            missing_cells += (0..column.len()).filter(|&i| column.is_missing(i)).count();
        }
    }
    if missing_cells > 0 {
        issues.push(format!("NaNs:{missing_cells}"));
    }

    if let Some(Column::Numeric(stages)) = table.column("stage") {
        let out_of_bounds = stages
            .iter()
            .filter(|s| s.is_finite())
            .any(|s| !(1..=8).contains(&(s.trunc() as i64)));
        if out_of_bounds {
            issues.push("stage_out_of_bounds".into());
        }
    }
    issues
}

/// Scan each file; unreadable files are reported as an issue.
pub fn scan(files: &[PathBuf], features: &[String], actions: &[String]) -> Vec<FileReport> {
    let reports = files
        .iter()
        .map(|f| FileReport {
            file:   f.clone(),
            issues: scan_file(f, features, actions),
        })
        .collect::<Vec<_>>();
    let flagged = reports.iter().filter(|r| !r.is_clean()).count();
    log::info!("diagnostics: {flagged} / {} files with issues", reports.len());
    reports
}

fn scan_file(path: &Path, features: &[String], actions: &[String]) -> Vec<String> {
    match read_csv(path) {
        Ok(table) => check_table(table, features, actions),
        Err(e) => vec![format!("unreadable:{e}")],
    }
}
