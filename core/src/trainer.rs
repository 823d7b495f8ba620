//! Behavior-cloning training: episode logs → fitted model + metadata.

use crate::{
    config::{ActionLimits, PipelineConfig},
    dataset::{assemble, list_episode_files, Dataset},
    error::PolicyResult,
    forest::ForestRegressor,
    matrix::Matrix,
    meta::PolicyMeta,
    regression::RegressionEngine,
    rng::RngBank,
};
use std::{collections::BTreeMap, path::Path};

#[derive(Debug, Clone)]
pub struct TrainArtifacts {
    pub model_path:    String,
    pub meta_path:     String,
    pub feature_names: Vec<String>,
    pub action_names:  Vec<String>,
    pub train_mae:     BTreeMap<String, f64>,
    pub val_mae:       BTreeMap<String, f64>,
    pub n_rows:        usize,
    pub n_files:       usize,
}

/// Row indices for (train, validation).
///
/// The validation share is rounded up. Without shuffling the last rows
/// form the validation set.
pub fn train_val_split(n: usize, val_split: f64, shuffle: bool, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let n_val = ((n as f64) * val_split).ceil() as usize;
    let n_val = n_val.min(n.saturating_sub(1));
    let mut idx: Vec<usize> = (0..n).collect();
    if shuffle {
        RngBank::new(seed).for_split().shuffle(&mut idx);
    }
    let val = idx.split_off(n - n_val);
    (idx, val)
}

/// Clip predictions to action limits, in place.
pub fn clip_predictions(y: &mut Matrix, actions: &[String], limits: &ActionLimits) {
    for i in 0..y.rows() {
        for (v, name) in y.row_mut(i).iter_mut().zip(actions) {
            *v = limits.clip(name, *v);
        }
    }
}

/// Mean absolute error per action column.
pub fn mean_absolute_error(truth: &Matrix, pred: &Matrix, actions: &[String]) -> BTreeMap<String, f64> {
    let n = truth.rows().max(1) as f64;
    actions
        .iter()
        .enumerate()
        .map(|(j, a)| {
            let total: f64 = (0..truth.rows())
                .map(|i| (truth.get(i, j) - pred.get(i, j)).abs())
                .sum();
            (a.clone(), total / n)
        })
        .collect()
}

/// Fit `engine` on an assembled dataset and score it on both splits.
pub fn fit_and_score<E: RegressionEngine>(
    engine: &mut E,
    data: &Dataset,
    config: &PipelineConfig,
) -> PolicyResult<(BTreeMap<String, f64>, BTreeMap<String, f64>)> {
    let tr = &config.train;
    let (train_idx, val_idx) = train_val_split(data.n_rows(), tr.val_split, tr.shuffle, tr.seed);
    let (x_train, y_train) = (data.x.select_rows(&train_idx), data.y.select_rows(&train_idx));
    let (x_val, y_val) = (data.x.select_rows(&val_idx), data.y.select_rows(&val_idx));
    log::info!("split: {} train / {} validation rows", train_idx.len(), val_idx.len());

    engine.fit(&x_train, &y_train)?;

    let mut y_train_hat = engine.predict(&x_train)?.into_matrix();
    let mut y_val_hat = engine.predict(&x_val)?.into_matrix();
    if tr.clip_actions {
        clip_predictions(&mut y_train_hat, &data.action_names, &tr.limits);
        clip_predictions(&mut y_val_hat, &data.action_names, &tr.limits);
    }

    Ok((
        mean_absolute_error(&y_train, &y_train_hat, &data.action_names),
        mean_absolute_error(&y_val, &y_val_hat, &data.action_names),
    ))
}

/// Full training run: discover episodes, fit, write model and metadata.
pub fn train(config: &PipelineConfig) -> PolicyResult<TrainArtifacts> {
    let files = list_episode_files(&config.data_glob)?;
    log::info!("training on {} episode files", files.len());
    let data = assemble(&files, config)?;

    let mut model = ForestRegressor::new(config.model.clone());
    let (train_mae, val_mae) = fit_and_score(&mut model, &data, config)?;

    model.save(Path::new(&config.model_path))?;

    let mut meta = PolicyMeta::new(config.features.clone(), config.actions.clone(), config.stages.clone());
    meta.limits = config.train.limits;
    meta.train_mae = train_mae.clone();
    meta.val_mae = val_mae.clone();
    meta.n_rows = data.n_rows();
    meta.n_files = data.n_files;
    meta.trained_at = Some(chrono::Utc::now().to_rfc3339());
    meta.save(Path::new(&config.meta_path))?;

    log::info!("saved model -> {}", config.model_path);
    log::info!("saved meta  -> {}", config.meta_path);

    Ok(TrainArtifacts {
        model_path:    config.model_path.clone(),
        meta_path:     config.meta_path.clone(),
        feature_names: config.features.clone(),
        action_names:  config.actions.clone(),
        train_mae,
        val_mae,
        n_rows:        data.n_rows(),
        n_files:       data.n_files,
    })
}
