//! Concatenate labelled groups of episode logs into one table.

use crate::{
    csv::read_csv,
    error::PolicyResult,
    table::{Column, Table},
};
use std::path::PathBuf;

/// Name of the column recording which group a row came from.
pub const SOURCE_COLUMN: &str = "source";

/// Each group is `(label, files)`; rows keep group order, then file order.
pub fn merge_sources(groups: &[(String, Vec<PathBuf>)]) -> PolicyResult<Table> {
    let mut parts = Vec::new();
    for (label, files) in groups {
        for file in files {
            let mut table = read_csv(file)?;
            table.coerce_numeric();
            let n = table.n_rows();
            table.set_column(SOURCE_COLUMN, Column::Text(vec![label.clone(); n]))?;
            parts.push(table);
        }
        log::info!("merge: {} files labelled '{label}'", files.len());
    }
    let merged = Table::concat(parts);

    log::info!("merge: {} total rows", merged.n_rows());
    if let Ok(stages) = merged.numeric("stage") {
        let finite = stages.iter().copied().filter(|s| s.is_finite());
        let min = finite.clone().fold(f64::INFINITY, f64::min);
        let max = finite.fold(f64::NEG_INFINITY, f64::max);
        log::info!("merge: stage range {min} to {max}");
    }
    Ok(merged)
}
