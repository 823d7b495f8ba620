//! Training metadata: the contract between training and compilation.
//!
//! Written once when training completes and never mutated afterwards.
//! Older training runs wrote `feature_cols` and `target_cols`/`action_cols`;
//! those keys are still accepted on load.

use crate::{
    config::{ActionLimits, StageConfig},
    error::{PolicyError, PolicyResult},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawPolicyMeta")]
pub struct PolicyMeta {
    /// Exact column order fed to the model.
    pub features: Vec<String>,
    /// Output column order of the model.
    pub actions:  Vec<String>,
    pub limits:   ActionLimits,
    #[serde(flatten)]
    pub stages:   StageConfig,

    pub train_mae:  BTreeMap<String, f64>,
    pub val_mae:    BTreeMap<String, f64>,
    pub n_rows:     usize,
    pub n_files:    usize,
    pub trained_at: Option<String>,
}

/// On-disk shape, current and legacy keys side by side.
#[derive(Deserialize)]
struct RawPolicyMeta {
    #[serde(default)]
    features:     Option<Vec<String>>,
    #[serde(default)]
    feature_cols: Option<Vec<String>>,
    #[serde(default)]
    actions:      Option<Vec<String>>,
    #[serde(default)]
    target_cols:  Option<Vec<String>>,
    #[serde(default)]
    action_cols:  Option<Vec<String>>,
    #[serde(default)]
    limits:       ActionLimits,
    #[serde(flatten)]
    stages:       StageConfig,

    #[serde(default)]
    train_mae:  BTreeMap<String, f64>,
    #[serde(default)]
    val_mae:    BTreeMap<String, f64>,
    #[serde(default)]
    n_rows:     usize,
    #[serde(default)]
    n_files:    usize,
    #[serde(default)]
    trained_at: Option<String>,
}

/// First list that is present and non-empty, in key-priority order.
fn first_non_empty<const N: usize>(candidates: [Option<Vec<String>>; N]) -> Vec<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

impl From<RawPolicyMeta> for PolicyMeta {
    fn from(raw: RawPolicyMeta) -> Self {
        Self {
            features:   first_non_empty([raw.features, raw.feature_cols]),
            actions:    first_non_empty([raw.actions, raw.target_cols, raw.action_cols]),
            limits:     raw.limits,
            stages:     raw.stages,
            train_mae:  raw.train_mae,
            val_mae:    raw.val_mae,
            n_rows:     raw.n_rows,
            n_files:    raw.n_files,
            trained_at: raw.trained_at,
        }
    }
}

impl PolicyMeta {
    pub fn new(features: Vec<String>, actions: Vec<String>, stages: StageConfig) -> Self {
        Self {
            features,
            actions,
            limits: ActionLimits::default(),
            stages,
            train_mae:  BTreeMap::new(),
            val_mae:    BTreeMap::new(),
            n_rows:     0,
            n_files:    0,
            trained_at: None,
        }
    }

    pub fn load(path: &Path) -> PolicyResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PolicyError::Meta(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> PolicyResult<Self> {
        let meta: Self = serde_json::from_str(content)?;
        meta.validate()?;
        Ok(meta)
    }

    /// Fail loudly when a required field is absent.
    pub fn validate(&self) -> PolicyResult<()> {
        if self.features.is_empty() {
            return Err(PolicyError::Meta(
                "metadata must include 'features' (or legacy 'feature_cols')".into(),
            ));
        }
        if self.actions.is_empty() {
            return Err(PolicyError::Meta(
                "metadata must include 'actions' (or legacy 'target_cols'/'action_cols')".into(),
            ));
        }
        if self.stages.target_by_stage.is_empty() {
            return Err(PolicyError::Meta("'target_by_stage' must not be empty".into()));
        }
        self.limits.check().map_err(PolicyError::Meta)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> PolicyResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
