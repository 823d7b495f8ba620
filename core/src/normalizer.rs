//! Per-episode derived features: stage-relative time and stage flags.
//!
//! Rows must be visited in episode order. `norm_day` is an explicit fold
//! whose accumulator is (current stage, position within the current run).

use crate::{
    config::StageConfig,
    error::{PolicyError, PolicyResult},
    table::{Column, Table},
    types::{flag, StageSet},
};

/// Nominal duration for a one-based stage, clamped to the table's bounds.
pub fn stage_duration(stage: i64, durations: &[u32]) -> u32 {
    if durations.is_empty() {
        return 1;
    }
    let idx = (stage - 1).clamp(0, durations.len() as i64 - 1) as usize;
    durations[idx]
}

/// Fractional progress through each row's stage run.
///
/// Within a run of length L the values are 0, 1/d, ..., (L-1)/d and reset to
/// 0 whenever the stage changes. Values above 1.0 are kept.
pub fn norm_days(stages: &[i64], durations: &[u32]) -> Vec<f64> {
    stages
        .iter()
        .scan(None::<(i64, u32)>, |run, &stage| {
            let position = match *run {
                Some((current, k)) if current == stage => k,
                _ => 0,
            };
            *run = Some((stage, position + 1));
            let d = stage_duration(stage, durations).max(1);
            Some(f64::from(position) / f64::from(d))
        })
        .collect()
}

/// 1.0 where the raw stage value is in `set`, else 0.0.
pub fn stage_flags(stages: &[i64], set: &StageSet) -> Vec<f64> {
    stages.iter().map(|&s| flag(set.contains_raw(s))).collect()
}

/// Read the `stage` column as integers (fractional values truncate).
pub fn stage_values(table: &Table) -> PolicyResult<Vec<i64>> {
    let raw = table.numeric("stage")?;
    raw.iter()
        .enumerate()
        .map(|(row, v)| {
            if v.is_finite() {
                Ok(v.trunc() as i64)
            } else {
                Err(PolicyError::Data(format!("row {row}: stage is not a finite number")))
            }
        })
        .collect()
}

/// Add `norm_day`, `is_drain_stage` and `is_flood_stage` to an episode table.
pub fn normalize_episode(table: &mut Table, stages_cfg: &StageConfig) -> PolicyResult<()> {
    let stages = stage_values(table)?;
    table.set_column("norm_day", Column::Numeric(norm_days(&stages, &stages_cfg.stage_durations)))?;
    table.set_column(
        "is_drain_stage",
        Column::Numeric(stage_flags(&stages, &stages_cfg.drain_stages)),
    )?;
    table.set_column(
        "is_flood_stage",
        Column::Numeric(stage_flags(&stages, &stages_cfg.flood_stages)),
    )?;
    Ok(())
}
