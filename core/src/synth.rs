//! Grid rows → the exact feature matrix the model expects.
//!
//! RULES:
//!   - Column order is the aligned feature list, verbatim.
//!   - The model sees one-based stages; the grid carries zero-based ones.
//!   - Stage flags match a configured set in either numbering.
//!   - Features the grid cannot derive get documented nominal constants;
//!     names with no rule at all are filled with 0.0 and reported.

use crate::{
    config::{GridConfig, StageConfig},
    grid::GridRow,
    matrix::Matrix,
    types::flag,
};

/// How one feature column is derived from a grid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureRule {
    Stage,
    NormDay,
    Month,
    NorthMm,
    SouthMm,
    TargetMm,
    DefNMm,
    DefSMm,
    CanalMm,
    PoolRatio,
    IsDrainStage,
    IsFloodStage,
    PoolMm,
    LakeMm,
    WaterQuality,
    Weather,
    /// No rule; filled with 0.0.
    Unknown,
}

impl FeatureRule {
    pub fn for_name(name: &str) -> Self {
        match name {
            "stage"          => Self::Stage,
            "norm_day"       => Self::NormDay,
            "month"          => Self::Month,
            "north_mm"       => Self::NorthMm,
            "south_mm"       => Self::SouthMm,
            "target_mm"      => Self::TargetMm,
            "defN_mm"        => Self::DefNMm,
            "defS_mm"        => Self::DefSMm,
            "canal_mm"       => Self::CanalMm,
            "pool_ratio"     => Self::PoolRatio,
            "is_drain_stage" => Self::IsDrainStage,
            "is_flood_stage" => Self::IsFloodStage,
            "pool_mm"        => Self::PoolMm,
            "lake_mm"        => Self::LakeMm,
            "poolN_mgL" | "poolP_mgL" | "canalN_mgL" | "canalP_mgL" | "lakeN_mgL" | "lakeP_mgL" => {
                Self::WaterQuality
            }
            "rain_mm" | "loss_mm" | "rain_today_mm" | "actual_loss_mm" => Self::Weather,
            _ => Self::Unknown,
        }
    }
}

pub struct FeatureSynthesizer<'a> {
    rules:  Vec<FeatureRule>,
    stages: &'a StageConfig,
    grid:   &'a GridConfig,
}

impl<'a> FeatureSynthesizer<'a> {
    /// Resolve one rule per aligned feature name.
    pub fn new(features: &[String], stages: &'a StageConfig, grid: &'a GridConfig) -> Self {
        let rules: Vec<FeatureRule> = features.iter().map(|f| FeatureRule::for_name(f)).collect();
        let unknown: Vec<&String> = features
            .iter()
            .zip(&rules)
            .filter(|(_, r)| **r == FeatureRule::Unknown)
            .map(|(f, _)| f)
            .collect();
        if !unknown.is_empty() {
            log::warn!("Missing feature(s) with no synthesis rule (filled with 0.0): {unknown:?}");
        }
        Self { rules, stages, grid }
    }

    pub fn rules(&self) -> &[FeatureRule] { &self.rules }

    fn value(&self, rule: FeatureRule, row: &GridRow) -> f64 {
        match rule {
            FeatureRule::Stage        => row.stage.one_based() as f64,
            FeatureRule::NormDay      => row.norm_day,
            FeatureRule::Month        => row.month as f64,
            FeatureRule::NorthMm      => row.north_mm,
            FeatureRule::SouthMm      => row.south_mm,
            FeatureRule::TargetMm     => row.target_mm,
            FeatureRule::DefNMm       => row.def_n_mm,
            FeatureRule::DefSMm       => row.def_s_mm,
            FeatureRule::CanalMm      => row.canal_mm,
            FeatureRule::PoolRatio    => row.pool_ratio.clamp(0.0, 1.0),
            FeatureRule::IsDrainStage => flag(self.stages.drain_stages.contains_either(row.stage)),
            FeatureRule::IsFloodStage => flag(self.stages.flood_stages.contains_either(row.stage)),
            FeatureRule::PoolMm       => row.pool_ratio * self.grid.pool_mm_scale,
            FeatureRule::LakeMm       => self.grid.nominal_lake_mm,
            FeatureRule::WaterQuality => self.grid.nominal_wq,
            FeatureRule::Weather      => 0.0,
            FeatureRule::Unknown      => 0.0,
        }
    }

    /// One feature vector for a single grid row.
    pub fn row_features(&self, row: &GridRow) -> Vec<f64> {
        self.rules.iter().map(|r| self.value(*r, row)).collect()
    }

    /// Feature matrix for a slice of grid rows, same order.
    pub fn synthesize(&self, rows: &[GridRow]) -> Matrix {
        let cols = self.rules.len();
        let mut m = Matrix::zeros(rows.len(), cols);
        for (i, row) in rows.iter().enumerate() {
            for (dst, rule) in m.row_mut(i).iter_mut().zip(&self.rules) {
                *dst = self.value(*rule, row);
            }
        }
        m
    }
}
