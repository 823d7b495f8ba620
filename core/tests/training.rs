use irrigation_core::{
    compiler::PolicyCompiler,
    config::{ActionLimits, ModelConfig, PipelineConfig},
    error::PolicyError,
    forest::ForestRegressor,
    matrix::Matrix,
    meta::PolicyMeta,
    policy::BcPolicy,
    regression::RegressionEngine,
    trainer::{clip_predictions, mean_absolute_error, train, train_val_split},
};
use std::{collections::HashMap, fs, path::Path};
use tempfile::tempdir;

// ── Helpers ──────────────────────────────────────────────────────────────────

const HEADER: &str = "stage,month,north_mm,south_mm,pool_mm,canal_mm,lake_mm,pool_ratio,\
irrigateN_mm,irrigateS_mm,drainN_mm,drainS_mm,rain_mm,loss_mm";

/// Rule-like episodes: irrigate when a field is below 15 mm, drain in stage 3.
fn write_episodes(dir: &Path, n: usize) {
    for ep in 0..n {
        let mut content = format!("{HEADER}\n");
        for day in 0..24 {
            let stage = 1 + (day / 6) as i64;
            let north = ((day * 7 + ep * 3) % 30) as f64;
            let south = ((day * 5 + ep * 11) % 30) as f64;
            let irr_n = if north < 15.0 { 4.0 } else { 0.0 };
            let irr_s = if south < 15.0 { 4.0 } else { 0.0 };
            let drain = if stage == 3 { 2.0 } else { 0.0 };
            let ratio = (day % 10) as f64 / 10.0;
            content.push_str(&format!(
                "{stage},{},{north},{south},{},{},50,{ratio},{irr_n},{irr_s},{drain},{drain},0,1\n",
                5 + ep % 3,
                ratio * 100.0,
                (day * 4) % 60,
            ));
        }
        fs::write(dir.join(format!("rule_ep{ep:02}.csv")), content).unwrap();
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn trained_config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default_test();
    config.data_glob = dir.join("rule_ep*.csv").to_string_lossy().into_owned();
    config.model_path = dir.join("models/bc_model.json").to_string_lossy().into_owned();
    config.meta_path = dir.join("models/bc_meta.json").to_string_lossy().into_owned();
    config
}

// ── Split and scoring ────────────────────────────────────────────────────────

#[test]
fn validation_share_rounds_up_and_takes_last_rows_unshuffled() {
    let (train_idx, val_idx) = train_val_split(10, 0.25, false, 0);
    assert_eq!(val_idx, vec![7, 8, 9]);
    assert_eq!(train_idx, (0..7).collect::<Vec<_>>());
}

#[test]
fn shuffled_split_partitions_every_row_once() {
    let (mut train_idx, val_idx) = train_val_split(40, 0.2, true, 42);
    assert_eq!(val_idx.len(), 8);
    train_idx.extend(val_idx);
    train_idx.sort_unstable();
    assert_eq!(train_idx, (0..40).collect::<Vec<_>>());
}

#[test]
fn mae_is_per_action() {
    let actions = vec!["irrigateN_mm".to_string(), "drainN_mm".to_string()];
    let truth = Matrix::from_rows(&[vec![1.0, 0.0], vec![3.0, 2.0]]).unwrap();
    let pred = Matrix::from_rows(&[vec![2.0, 0.0], vec![3.0, 1.0]]).unwrap();
    let mae = mean_absolute_error(&truth, &pred, &actions);
    assert_eq!(mae["irrigateN_mm"], 0.5);
    assert_eq!(mae["drainN_mm"], 0.5);
}

#[test]
fn training_predictions_are_clipped_per_action() {
    let actions = vec!["irrigateS_mm".to_string(), "drainS_mm".to_string()];
    let mut y = Matrix::from_rows(&[vec![7.0, 7.0], vec![-1.0, 1.5]]).unwrap();
    clip_predictions(&mut y, &actions, &ActionLimits::default());
    assert_eq!(y.row(0), &[5.0, 3.0]);
    assert_eq!(y.row(1), &[0.0, 1.5]);
}

// ── Forest ───────────────────────────────────────────────────────────────────

#[test]
fn forest_learns_a_step_function() {
    let x = Matrix::from_rows(&(0..40).map(|i| vec![i as f64]).collect::<Vec<_>>()).unwrap();
    let y = Matrix::from_rows(&(0..40).map(|i| vec![if i < 20 { 1.0 } else { 4.0 }]).collect::<Vec<_>>())
        .unwrap();
    let mut forest = ForestRegressor::new(ModelConfig { n_estimators: 8, random_state: 3, ..ModelConfig::default() });
    forest.fit(&x, &y).unwrap();

    let inputs = Matrix::from_rows(&[vec![0.0], vec![39.0]]).unwrap();
    let out = forest.predict(&inputs).unwrap().into_matrix();
    assert!((out.get(0, 0) - 1.0).abs() < 1e-9, "got {}", out.get(0, 0));
    assert!((out.get(1, 0) - 4.0).abs() < 1e-9, "got {}", out.get(1, 0));
    assert_eq!(forest.n_trees(), 8);
    assert_eq!(forest.expected_width(), Some(1));
    assert!(forest.trees().iter().all(|t| t.depth() <= forest.params().max_depth));
}

#[test]
fn unfitted_forest_refuses_to_predict() {
    let forest = ForestRegressor::new(ModelConfig::default());
    let err = forest.predict(&Matrix::zeros(1, 3)).unwrap_err();
    assert!(matches!(err, PolicyError::ModelNotFitted));
    assert_eq!(forest.expected_width(), None);
}

#[test]
fn forest_rejects_wrong_input_width() {
    let x = Matrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
    let y = Matrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();
    let mut forest = ForestRegressor::new(ModelConfig { n_estimators: 2, ..ModelConfig::default() });
    forest.fit(&x, &y).unwrap();
    assert!(matches!(
        forest.predict(&Matrix::zeros(1, 3)).unwrap_err(),
        PolicyError::Shape { expected: 2, actual: 3, .. }
    ));
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[test]
fn train_writes_model_and_metadata_that_compile() {
    init_logging();
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    write_episodes(dir, 4);
    let config = trained_config(dir);

    let arts = train(&config).unwrap();
    assert_eq!(arts.n_files, 4);
    assert_eq!(arts.n_rows, 96);
    assert_eq!(arts.val_mae.len(), config.actions.len());

    let model = ForestRegressor::load(&dir.join("models/bc_model.json")).unwrap();
    let meta = PolicyMeta::load(&dir.join("models/bc_meta.json")).unwrap();
    assert_eq!(meta.features, config.features);
    assert_eq!(meta.actions, config.actions);
    assert_eq!(meta.n_rows, 96);
    assert!(meta.trained_at.is_some());
    assert_eq!(model.expected_width(), Some(config.features.len()));

    let compiled = PolicyCompiler::new(&model, &meta, &config.grid).compile().unwrap();
    assert_eq!(compiled.features, config.features);
    for row in compiled.table.rows() {
        for (v, name) in row.actions.iter().zip(compiled.table.action_names()) {
            assert!(*v >= 0.0 && *v <= meta.limits.max_for(name), "{name}={v} out of range");
        }
    }
}

#[test]
fn saved_model_reloads_identically() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    write_episodes(dir, 2);
    let config = trained_config(dir);
    train(&config).unwrap();

    let a = ForestRegressor::load(&dir.join("models/bc_model.json")).unwrap();
    let path = dir.join("copy.json");
    a.save(&path).unwrap();
    assert_eq!(a, ForestRegressor::load(&path).unwrap());
}

#[test]
fn live_policy_returns_clipped_named_actions() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    write_episodes(dir, 3);
    let config = trained_config(dir);
    train(&config).unwrap();

    let policy = BcPolicy::<ForestRegressor>::load(
        &dir.join("models/bc_model.json"),
        &dir.join("models/bc_meta.json"),
    )
    .unwrap();
    let obs: HashMap<String, f64> = [("stage", 3.0), ("month", 6.0), ("north_mm", 5.0), ("south_mm", 25.0)]
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();

    let act = policy.act(&obs).unwrap();
    assert_eq!(act.len(), 4);
    for (name, v) in &act {
        assert!(*v >= 0.0 && *v <= policy.meta().limits.max_for(name), "{name}={v}");
    }
}
