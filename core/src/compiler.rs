//! Policy compilation: trained model + metadata → dense policy table.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Feature alignment   (metadata list vs model width)
//!   2. Grid generation
//!   3. Feature synthesis
//!   4. Batched prediction
//!   5. Post-processing     (clip, round, dedupe, sort)
//!
//! RULES:
//!   - Single linear pipeline; every step yields a new value.
//!   - Any failure aborts the whole compilation. No partial tables.

use crate::{
    align::align_features,
    config::{DedupeMode, ExportConfig, GridConfig},
    error::PolicyResult,
    grid::build_grid,
    meta::PolicyMeta,
    policy_table::PolicyTable,
    postprocess::postprocess,
    predict::predict_in_batches,
    regression::RegressionEngine,
    synth::FeatureSynthesizer,
};

/// The compiled table plus what was actually fed to the model.
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    pub table:     PolicyTable,
    pub features:  Vec<String>,
    pub grid_rows: usize,
}

pub struct PolicyCompiler<'a, E: RegressionEngine + ?Sized> {
    engine: &'a E,
    meta:   &'a PolicyMeta,
    grid:   &'a GridConfig,
    export: ExportConfig,
}

impl<'a, E: RegressionEngine + ?Sized> PolicyCompiler<'a, E> {
    pub fn new(engine: &'a E, meta: &'a PolicyMeta, grid: &'a GridConfig) -> Self {
        Self {
            engine,
            meta,
            grid,
            export: ExportConfig::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.export.batch_size = batch_size;
        self
    }

    pub fn with_dedupe(mut self, mode: DedupeMode) -> Self {
        self.export.dedupe = mode;
        self
    }

    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    pub fn compile(&self) -> PolicyResult<CompiledPolicy> {
        let meta = self.meta;
        meta.validate()?;

        let features = align_features(&meta.features, self.engine.expected_width())?;

        let grid = build_grid(self.grid, &meta.stages.target_by_stage)?;
        let synth = FeatureSynthesizer::new(&features, &meta.stages, self.grid);
        let x = synth.synthesize(&grid);

        log::info!(
            "model expected width: {}",
            self.engine
                .expected_width()
                .map_or_else(|| "unknown".to_string(), |w| w.to_string())
        );
        log::info!("features used: {:?} (len={})", features, features.len());
        log::info!("actions: {:?}", meta.actions);
        log::info!("grid rows: {}, X shape: ({}, {})", grid.len(), x.rows(), x.cols());

        let y = predict_in_batches(self.engine, &x, self.export.batch_size, meta.actions.len())?;
        let table = postprocess(&grid, &y, &meta.actions, &meta.limits, self.export.dedupe)?;

        log::info!(
            "compiled policy table: {} rows, stage domain {:?}",
            table.len(),
            table.stage_domain()
        );
        Ok(CompiledPolicy {
            table,
            features,
            grid_rows: grid.len(),
        })
    }
}
