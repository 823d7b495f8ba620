//! Pipeline configuration.
//!
//! RULE: every default lives in this file, once.
//! Components receive `&PipelineConfig` (or one of its sections);
//! nothing reads configuration from globals.

use crate::{
    error::{PolicyError, PolicyResult},
    types::{ActionKind, StageSet},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ── Stage schedule ─────────────────────────────────────────────────

/// Stage schedule shared by training and compilation.
/// Also embedded (flattened) in the metadata artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageConfig {
    /// Nominal run length per stage, indexed by one-based stage minus one.
    #[serde(default = "default_stage_durations")]
    pub stage_durations: Vec<u32>,
    #[serde(default = "default_drain_stages")]
    pub drain_stages:    StageSet,
    #[serde(default = "default_flood_stages")]
    pub flood_stages:    StageSet,
    /// Target water level (mm) per zero-based stage.
    #[serde(default = "default_target_by_stage")]
    pub target_by_stage: Vec<f64>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            stage_durations: default_stage_durations(),
            drain_stages:    default_drain_stages(),
            flood_stages:    default_flood_stages(),
            target_by_stage: default_target_by_stage(),
        }
    }
}

fn default_stage_durations() -> Vec<u32> { vec![20, 30, 30, 10, 30, 25, 20, 15] }
fn default_drain_stages() -> StageSet { StageSet::new(vec![3, 7]) }
fn default_flood_stages() -> StageSet { StageSet::new(vec![1, 2, 5]) }
fn default_target_by_stage() -> Vec<f64> { vec![15.0, 35.0, 25.0, 0.0, 25.0, 25.0, 25.0, 0.0] }

// ── Action limits ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ActionLimits {
    #[serde(default = "default_irrigate_max")]
    pub irrigate_max: f64,
    #[serde(default = "default_drain_max")]
    pub drain_max:    f64,
}

impl Default for ActionLimits {
    fn default() -> Self {
        Self {
            irrigate_max: default_irrigate_max(),
            drain_max:    default_drain_max(),
        }
    }
}

impl ActionLimits {
    pub fn max_for(&self, action: &str) -> f64 {
        match ActionKind::of(action) {
            ActionKind::Irrigate => self.irrigate_max,
            ActionKind::Drain    => self.drain_max,
        }
    }

    /// Clip a raw prediction into [0, max] for the named action.
    pub fn clip(&self, action: &str, value: f64) -> f64 {
        value.max(0.0).min(self.max_for(action))
    }

    /// Both limits must be finite and non-negative.
    pub fn check(&self) -> Result<(), String> {
        for (name, v) in [("irrigate_max", self.irrigate_max), ("drain_max", self.drain_max)] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("limits.{name} must be a finite value >= 0, got {v}"));
            }
        }
        Ok(())
    }
}

fn default_irrigate_max() -> f64 { 5.0 }
fn default_drain_max() -> f64 { 3.0 }

// ── Training ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainConfig {
    #[serde(default = "default_val_split")]
    pub val_split:    f64,
    #[serde(default = "default_true")]
    pub shuffle:      bool,
    #[serde(default = "default_seed")]
    pub seed:         u64,
    #[serde(default = "default_true")]
    pub clip_actions: bool,
    #[serde(default)]
    pub limits:       ActionLimits,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            val_split:    default_val_split(),
            shuffle:      true,
            seed:         default_seed(),
            clip_actions: true,
            limits:       ActionLimits::default(),
        }
    }
}

fn default_val_split() -> f64 { 0.2 }
fn default_seed() -> u64 { 42 }
fn default_true() -> bool { true }

/// Hyperparameters of the built-in forest regressor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators:     usize,
    #[serde(default = "default_max_depth")]
    pub max_depth:        usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` tries all of them.
    #[serde(default)]
    pub max_features:     Option<usize>,
    #[serde(default = "default_seed")]
    pub random_state:     u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_estimators:     default_n_estimators(),
            max_depth:        default_max_depth(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features:     None,
            random_state:     default_seed(),
        }
    }
}

fn default_n_estimators() -> usize { 100 }
fn default_max_depth() -> usize { 12 }
fn default_min_samples_leaf() -> usize { 1 }

// ── Grid ───────────────────────────────────────────────────────────

/// Discretization of the exported state space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    /// Zero-based stages, matching the simulation.
    #[serde(default = "default_stages")]
    pub stages:          Vec<i64>,
    #[serde(default = "default_months")]
    pub months:          Vec<i64>,
    /// Day-fraction samples; one mid-stage value keeps the table compact.
    #[serde(default = "default_norm_days")]
    pub norm_days:       Vec<f64>,
    /// Deficit bins, reused for north and south.
    #[serde(default = "default_def_bins")]
    pub def_bins:        Vec<f64>,
    #[serde(default = "default_canal_bins")]
    pub canal_bins:      Vec<f64>,
    #[serde(default = "default_pool_ratios")]
    pub pool_ratios:     Vec<f64>,
    /// `pool_mm = pool_ratio * pool_mm_scale`
    #[serde(default = "default_pool_mm_scale")]
    pub pool_mm_scale:   f64,
    #[serde(default = "default_nominal_lake_mm")]
    pub nominal_lake_mm: f64,
    /// Water-quality placeholder value.
    #[serde(default)]
    pub nominal_wq:      f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            stages:          default_stages(),
            months:          default_months(),
            norm_days:       default_norm_days(),
            def_bins:        default_def_bins(),
            canal_bins:      default_canal_bins(),
            pool_ratios:     default_pool_ratios(),
            pool_mm_scale:   default_pool_mm_scale(),
            nominal_lake_mm: default_nominal_lake_mm(),
            nominal_wq:      0.0,
        }
    }
}

fn default_stages() -> Vec<i64> { (0..8).collect() }
fn default_months() -> Vec<i64> { (1..=12).collect() }
fn default_norm_days() -> Vec<f64> { vec![0.5] }
fn default_def_bins() -> Vec<f64> {
    vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 7.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0]
}
fn default_canal_bins() -> Vec<f64> {
    vec![0.0, 2.0, 5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 80.0, 100.0]
}
fn default_pool_ratios() -> Vec<f64> {
    vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]
}
fn default_pool_mm_scale() -> f64 { 100.0 }
fn default_nominal_lake_mm() -> f64 { 50.0 }

// ── Export ─────────────────────────────────────────────────────────

/// How rows collapsing to the same state key are combined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupeMode {
    #[default]
    First,
    Median,
    Mean,
    None,
}

impl DedupeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First  => "first",
            Self::Median => "median",
            Self::Mean   => "mean",
            Self::None   => "none",
        }
    }
}

impl FromStr for DedupeMode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first"  => Ok(Self::First),
            "median" => Ok(Self::Median),
            "mean"   => Ok(Self::Mean),
            "none"   => Ok(Self::None),
            other    => Err(PolicyError::Config(format!(
                "unknown dedupe mode '{other}' (expected first|median|mean|none)"
            ))),
        }
    }
}

pub const DEFAULT_BATCH_SIZE: usize = 200_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub dedupe:     DedupeMode,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dedupe:     DedupeMode::First,
        }
    }
}

fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_data_glob")]
    pub data_glob:         String,
    #[serde(default = "default_model_path")]
    pub model_path:        String,
    #[serde(default = "default_meta_path")]
    pub meta_path:         String,
    #[serde(default = "default_policy_table_path")]
    pub policy_table_path: String,
    /// Optional SQLite database receiving compiled tables.
    #[serde(default)]
    pub store_path:        Option<String>,

    #[serde(default = "default_features")]
    pub features: Vec<String>,
    #[serde(default = "default_actions")]
    pub actions:  Vec<String>,

    #[serde(flatten)]
    pub stages: StageConfig,

    #[serde(default)]
    pub train:  TrainConfig,
    #[serde(default)]
    pub model:  ModelConfig,
    #[serde(default)]
    pub grid:   GridConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

fn default_data_glob() -> String { "data/*.csv".into() }
fn default_model_path() -> String { "models/bc_model.json".into() }
fn default_meta_path() -> String { "models/bc_meta.json".into() }
fn default_policy_table_path() -> String { "models/policy_table.csv".into() }

pub fn default_features() -> Vec<String> {
    [
        "stage", "norm_day", "month",
        "north_mm", "south_mm", "pool_mm", "canal_mm", "lake_mm", "pool_ratio",
        "is_drain_stage", "is_flood_stage",
        "rain_mm", "loss_mm",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_actions() -> Vec<String> {
    ["irrigateN_mm", "irrigateS_mm", "drainN_mm", "drainS_mm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl PipelineConfig {
    /// Load from a JSON file. Absent fields take the defaults above.
    pub fn load(path: &str) -> PolicyResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::Config(format!("Cannot read {path}: {e}")))?;
        let config = Self::from_json_str(&content)?;
        log::debug!("config loaded from {path}");
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> PolicyResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PolicyResult<()> {
        if self.features.is_empty() {
            return Err(PolicyError::Config("'features' must not be empty".into()));
        }
        if self.actions.is_empty() {
            return Err(PolicyError::Config("'actions' must not be empty".into()));
        }
        if !(0.0..1.0).contains(&self.train.val_split) {
            return Err(PolicyError::Config(format!(
                "train.val_split must be in [0, 1), got {}",
                self.train.val_split
            )));
        }
        self.train.limits.check().map_err(PolicyError::Config)?;
        if self.model.n_estimators == 0 {
            return Err(PolicyError::Config("model.n_estimators must be > 0".into()));
        }
        if self.export.batch_size == 0 {
            return Err(PolicyError::Config("export.batch_size must be > 0".into()));
        }
        Ok(())
    }

    /// Columns every episode file must provide once derived columns are added.
    pub fn required_columns(&self) -> Vec<String> {
        let mut cols = self.features.clone();
        for a in &self.actions {
            if !cols.contains(a) {
                cols.push(a.clone());
            }
        }
        cols
    }

    /// Config with small hardcoded values for use in tests.
    pub fn default_test() -> Self {
        Self {
            data_glob:         "data/*.csv".into(),
            model_path:        "models/bc_model.json".into(),
            meta_path:         "models/bc_meta.json".into(),
            policy_table_path: "models/policy_table.csv".into(),
            store_path:        None,
            features:          default_features(),
            actions:           default_actions(),
            stages:            StageConfig::default(),
            train: TrainConfig {
                val_split: 0.25,
                ..TrainConfig::default()
            },
            model: ModelConfig {
                n_estimators:     5,
                max_depth:        6,
                min_samples_leaf: 1,
                max_features:     None,
                random_state:     7,
            },
            grid: GridConfig {
                stages:      vec![0, 1, 2, 3],
                months:      vec![1, 6],
                norm_days:   vec![0.5],
                def_bins:    vec![0.0, 5.0, 20.0],
                canal_bins:  vec![0.0, 50.0],
                pool_ratios: vec![0.0, 0.5, 1.0],
                ..GridConfig::default()
            },
            export: ExportConfig {
                batch_size: 50,
                dedupe:     DedupeMode::First,
            },
        }
    }
}
