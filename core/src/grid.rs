//! Discretized state grid enumerated for policy compilation.
//!
//! ORDER (fixed, documented, never reordered):
//!   stage → month → norm_day → defN_mm → defS_mm → canal_mm → pool_ratio
//! Stage is outermost and pool_ratio innermost, so identical inputs always
//! give identical row order.

use crate::{
    config::GridConfig,
    error::{PolicyError, PolicyResult},
    types::Stage,
};

/// One point of the state grid. Rows are never mutated after generation;
/// later stages refer to them by index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRow {
    pub stage:      Stage,
    pub month:      i64,
    pub norm_day:   f64,
    pub def_n_mm:   f64,
    pub def_s_mm:   f64,
    pub canal_mm:   f64,
    pub pool_ratio: f64,
    pub target_mm:  f64,
    pub north_mm:   f64,
    pub south_mm:   f64,
}

/// Target level for a zero-based stage.
pub fn target_for(stage: Stage, target_by_stage: &[f64]) -> PolicyResult<f64> {
    usize::try_from(stage.zero_based())
        .ok()
        .and_then(|i| target_by_stage.get(i).copied())
        .ok_or_else(|| {
            PolicyError::Meta(format!(
                "target_by_stage has {} entries; no target for stage {}",
                target_by_stage.len(),
                stage.zero_based()
            ))
        })
}

/// Number of rows `build_grid` will produce.
pub fn grid_len(grid: &GridConfig) -> usize {
    grid.stages.len()
        * grid.months.len()
        * grid.norm_days.len()
        * grid.def_bins.len()
        * grid.def_bins.len()
        * grid.canal_bins.len()
        * grid.pool_ratios.len()
}

/// Full Cartesian product of the grid dimensions.
pub fn build_grid(grid: &GridConfig, target_by_stage: &[f64]) -> PolicyResult<Vec<GridRow>> {
    let mut rows = Vec::with_capacity(grid_len(grid));
    for &st in &grid.stages {
        let stage = Stage::from_zero_based(st);
        let target_mm = target_for(stage, target_by_stage)?;
        for &month in &grid.months {
            for &norm_day in &grid.norm_days {
                for &def_n_mm in &grid.def_bins {
                    for &def_s_mm in &grid.def_bins {
                        for &canal_mm in &grid.canal_bins {
                            for &pool_ratio in &grid.pool_ratios {
                                rows.push(GridRow {
                                    stage,
                                    month,
                                    norm_day,
                                    def_n_mm,
                                    def_s_mm,
                                    canal_mm,
                                    pool_ratio,
                                    target_mm,
                                    north_mm: (target_mm - def_n_mm).max(0.0),
                                    south_mm: (target_mm - def_s_mm).max(0.0),
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    log::debug!("grid: {} rows", rows.len());
    Ok(rows)
}
