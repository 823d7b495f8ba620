use irrigation_core::{
    compiler::{CompiledPolicy, PolicyCompiler},
    config::{DedupeMode, PipelineConfig, StageConfig},
    error::PolicyResult,
    matrix::Matrix,
    meta::PolicyMeta,
    policy_table::PolicyKey,
    regression::{EngineOutput, RegressionEngine},
    store::PolicyStore,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// irrigateN = canal / 10, drainN = stage flag input.
struct CanalEngine;

impl RegressionEngine for CanalEngine {
    fn fit(&mut self, _x: &Matrix, _y: &Matrix) -> PolicyResult<()> { Ok(()) }

    fn predict(&self, x: &Matrix) -> PolicyResult<EngineOutput> {
        let rows: Vec<Vec<f64>> = (0..x.rows()).map(|i| vec![x.get(i, 1) / 10.0, x.get(i, 0)]).collect();
        Ok(EngineOutput::Matrix(Matrix::from_rows(&rows)?))
    }

    fn expected_width(&self) -> Option<usize> { Some(2) }
}

fn compiled() -> CompiledPolicy {
    let config = PipelineConfig::default_test();
    let meta = PolicyMeta::new(
        vec!["stage".into(), "canal_mm".into()],
        vec!["irrigateN_mm".into(), "drainN_mm".into()],
        StageConfig::default(),
    );
    PolicyCompiler::new(&CanalEngine, &meta, &config.grid).compile().unwrap()
}

fn store() -> PolicyStore {
    let store = PolicyStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn key(stage: i64, canal_mm: f64) -> PolicyKey {
    PolicyKey { stage, month: 6, def_n_mm: 5.0, def_s_mm: 0.0, canal_mm, pool_ratio: 0.5 }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn migrate_is_idempotent() {
    let store = store();
    store.migrate().unwrap();
    assert_eq!(store.latest_run_id().unwrap(), None);
}

#[test]
fn saved_run_records_shape_and_rows() {
    let store = store();
    let compiled = compiled();
    let run_id = store.save_compiled(&compiled, DedupeMode::First).unwrap();

    let run = store.compile_run(&run_id).unwrap().expect("run exists");
    assert_eq!(run.features, vec!["stage", "canal_mm"]);
    assert_eq!(run.actions, vec!["irrigateN_mm", "drainN_mm"]);
    assert_eq!(run.dedupe, "first");
    assert_eq!(run.grid_rows, compiled.grid_rows);
    assert_eq!(run.row_count, compiled.table.len());
    assert_eq!(store.row_count(&run_id).unwrap() as usize, compiled.table.len());
    assert_eq!(store.latest_run_id().unwrap(), Some(run_id));
}

#[test]
fn stored_lookup_matches_in_memory_table() {
    let store = store();
    let compiled = compiled();
    let run_id = store.save_compiled(&compiled, DedupeMode::First).unwrap();

    // canal 50 → irrigate 5.0; one-based stage 3 → drain capped at 3.0.
    let k = key(2, 50.0);
    let stored = store.lookup(&run_id, &k).unwrap().expect("key stored");
    assert_eq!(stored, compiled.table.lookup(&k).unwrap());
    assert_eq!(stored, vec![5.0, 3.0]);

    assert_eq!(store.lookup(&run_id, &key(9, 0.0)).unwrap(), None);
    assert_eq!(store.compile_run("no-such-run").unwrap(), None);
}

#[test]
fn runs_are_kept_separately() {
    let store = store();
    let compiled = compiled();
    let a = store.save_compiled(&compiled, DedupeMode::First).unwrap();
    let b = store.save_compiled(&compiled, DedupeMode::Mean).unwrap();
    assert_ne!(a, b);
    assert_eq!(store.row_count(&a).unwrap(), store.row_count(&b).unwrap());
    assert_eq!(store.compile_run(&b).unwrap().unwrap().dedupe, "mean");
}
