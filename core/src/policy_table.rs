//! The compiled policy table: state key → recommended actions.

use crate::{
    csv::write_csv,
    error::PolicyResult,
    table::{Column, Table},
};
use std::{cmp::Ordering, path::Path};

/// Key columns, in output order. `norm_day` is not part of the key.
pub const KEY_COLUMNS: [&str; 6] = ["stage", "month", "defN_mm", "defS_mm", "canal_mm", "pool_ratio"];

/// Discretized state key. Stage is zero-based, as in the simulation.
#[derive(Debug, Clone, Copy)]
pub struct PolicyKey {
    pub stage:      i64,
    pub month:      i64,
    pub def_n_mm:   f64,
    pub def_s_mm:   f64,
    pub canal_mm:   f64,
    pub pool_ratio: f64,
}

impl PartialEq for PolicyKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PolicyKey {}

impl PartialOrd for PolicyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic over the key columns, floats by total order.
impl Ord for PolicyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.stage
            .cmp(&other.stage)
            .then(self.month.cmp(&other.month))
            .then(self.def_n_mm.total_cmp(&other.def_n_mm))
            .then(self.def_s_mm.total_cmp(&other.def_s_mm))
            .then(self.canal_mm.total_cmp(&other.canal_mm))
            .then(self.pool_ratio.total_cmp(&other.pool_ratio))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRow {
    pub key:     PolicyKey,
    /// One value per action, in metadata action order.
    pub actions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable {
    action_names: Vec<String>,
    rows:         Vec<PolicyRow>,
}

impl PolicyTable {
    /// Rows must already be sorted by key.
    pub(crate) fn from_sorted(action_names: Vec<String>, rows: Vec<PolicyRow>) -> Self {
        Self { action_names, rows }
    }

    pub fn action_names(&self) -> &[String] { &self.action_names }
    pub fn rows(&self) -> &[PolicyRow] { &self.rows }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Actions for an exact key, or None if the key is not in the table.
    pub fn lookup(&self, key: &PolicyKey) -> Option<&[f64]> {
        self.rows
            .binary_search_by(|row| row.key.cmp(key))
            .ok()
            .map(|i| self.rows[i].actions.as_slice())
    }

    /// Action value by name for an exact key.
    pub fn action(&self, key: &PolicyKey, action: &str) -> Option<f64> {
        let j = self.action_names.iter().position(|a| a == action)?;
        self.lookup(key).map(|values| values[j])
    }

    /// Distinct stages present, ascending.
    pub fn stage_domain(&self) -> Vec<i64> {
        let mut stages: Vec<i64> = self.rows.iter().map(|r| r.key.stage).collect();
        stages.dedup();
        stages
    }

    /// Key columns then action columns.
    pub fn to_table(&self) -> PolicyResult<Table> {
        let mut table = Table::new();
        let key_cols: [fn(&PolicyKey) -> f64; 6] = [
            |k| k.stage as f64,
            |k| k.month as f64,
            |k| k.def_n_mm,
            |k| k.def_s_mm,
            |k| k.canal_mm,
            |k| k.pool_ratio,
        ];
        for (name, get) in KEY_COLUMNS.iter().zip(key_cols) {
            let values = self.rows.iter().map(|r| get(&r.key)).collect();
            table.set_column(name, Column::Numeric(values))?;
        }
        for (j, name) in self.action_names.iter().enumerate() {
            let values = self.rows.iter().map(|r| r.actions[j]).collect();
            table.set_column(name, Column::Numeric(values))?;
        }
        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> PolicyResult<()> {
        write_csv(path, &self.to_table()?)
    }
}
