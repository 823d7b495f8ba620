use irrigation_core::{
    config::{ActionLimits, DedupeMode},
    grid::GridRow,
    matrix::Matrix,
    policy_table::{PolicyKey, PolicyRow},
    postprocess::{clip_and_round, dedupe, postprocess},
    types::Stage,
};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn key(stage: i64, canal: f64) -> PolicyKey {
    PolicyKey {
        stage,
        month: 6,
        def_n_mm: 0.0,
        def_s_mm: 0.0,
        canal_mm: canal,
        pool_ratio: 0.5,
    }
}

fn prow(stage: i64, canal: f64, actions: &[f64]) -> PolicyRow {
    PolicyRow { key: key(stage, canal), actions: actions.to_vec() }
}

fn grid_row(stage0: i64, norm_day: f64, canal: f64) -> GridRow {
    GridRow {
        stage: Stage::from_zero_based(stage0),
        month: 6,
        norm_day,
        def_n_mm: 0.0,
        def_s_mm: 0.0,
        canal_mm: canal,
        pool_ratio: 0.5,
        target_mm: 25.0,
        north_mm: 25.0,
        south_mm: 25.0,
    }
}

fn keys_unique(rows: &[PolicyRow]) -> bool {
    rows.windows(2).all(|w| w[0].key < w[1].key)
}

// ── Clip and round ───────────────────────────────────────────────────────────

#[test]
fn actions_are_clipped_to_their_limits() {
    let actions = names(&["irrigateN_mm", "irrigateS_mm", "drainN_mm", "drainS_mm"]);
    let y = Matrix::from_rows(&[vec![-10.0, 100.0, -10.0, 100.0]]).unwrap();
    let out = clip_and_round(&y, &actions, &ActionLimits::default());
    assert_eq!(out.row(0), &[0.0, 5.0, 0.0, 3.0]);
}

#[test]
fn names_without_irrigate_use_the_drain_limit() {
    let actions = names(&["pumpOut_mm"]);
    let y = Matrix::from_rows(&[vec![4.5]]).unwrap();
    assert_eq!(clip_and_round(&y, &actions, &ActionLimits::default()).get(0, 0), 3.0);
}

#[test]
fn values_are_rounded_to_three_places() {
    let actions = names(&["irrigateN_mm", "drainN_mm"]);
    let y = Matrix::from_rows(&[vec![1.23456, 0.0004]]).unwrap();
    let out = clip_and_round(&y, &actions, &ActionLimits::default());
    assert_eq!(out.row(0), &[1.235, 0.0]);
}

// ── Dedupe ───────────────────────────────────────────────────────────────────

fn duplicated_rows() -> Vec<PolicyRow> {
    vec![
        prow(1, 0.0, &[1.0]),
        prow(0, 5.0, &[2.0]),
        prow(1, 0.0, &[4.0]),
        prow(1, 0.0, &[2.5]),
        prow(0, 5.0, &[3.0]),
    ]
}

#[test]
fn first_keeps_the_first_occurrence_in_grid_order() {
    let rows = dedupe(duplicated_rows(), DedupeMode::First);
    assert_eq!(rows.len(), 2);
    assert!(keys_unique(&rows));
    assert_eq!(rows[0], prow(0, 5.0, &[2.0]));
    assert_eq!(rows[1], prow(1, 0.0, &[1.0]));
}

#[test]
fn median_aggregates_each_action() {
    let rows = dedupe(duplicated_rows(), DedupeMode::Median);
    assert!(keys_unique(&rows));
    assert_eq!(rows[0].actions, vec![2.5]);
    assert_eq!(rows[1].actions, vec![2.5]);
}

#[test]
fn mean_aggregates_and_rounds() {
    let rows = dedupe(duplicated_rows(), DedupeMode::Mean);
    assert!(keys_unique(&rows));
    assert_eq!(rows[0].actions, vec![2.5]);
    assert_eq!(rows[1].actions, vec![2.5]);

    let rows = dedupe(
        vec![prow(0, 0.0, &[1.0]), prow(0, 0.0, &[1.0]), prow(0, 0.0, &[2.0])],
        DedupeMode::Mean,
    );
    assert_eq!(rows[0].actions, vec![1.333]);
}

#[test]
fn none_keeps_duplicates_sorted_stably() {
    let rows = dedupe(duplicated_rows(), DedupeMode::None);
    assert_eq!(rows.len(), 5);
    let actions: Vec<f64> = rows.iter().map(|r| r.actions[0]).collect();
    assert_eq!(actions, vec![2.0, 3.0, 1.0, 4.0, 2.5]);
}

// ── Full post-processing ─────────────────────────────────────────────────────

#[test]
fn norm_day_collapses_into_one_key() {
    let grid = vec![
        grid_row(1, 0.25, 0.0),
        grid_row(1, 0.75, 0.0),
        grid_row(0, 0.25, 10.0),
        grid_row(0, 0.75, 10.0),
    ];
    let y = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![9.0]]).unwrap();
    let actions = names(&["irrigateN_mm"]);

    let table = postprocess(&grid, &y, &actions, &ActionLimits::default(), DedupeMode::First).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.stage_domain(), vec![0, 1]);
    assert_eq!(table.lookup(&PolicyKey { canal_mm: 10.0, ..key(0, 0.0) }), Some(&[3.0][..]));
    assert_eq!(table.action(&key(1, 0.0), "irrigateN_mm"), Some(1.0));
    assert_eq!(table.lookup(&key(5, 0.0)), None);
}

#[test]
fn prediction_count_must_match_grid() {
    let grid = vec![grid_row(0, 0.5, 0.0)];
    let y = Matrix::zeros(2, 1);
    assert!(postprocess(&grid, &y, &names(&["drainN_mm"]), &ActionLimits::default(), DedupeMode::First).is_err());
}

// ── Properties ───────────────────────────────────────────────────────────────

fn grid_strategy() -> impl Strategy<Value = Vec<(i64, f64, f64, f64, f64)>> {
    prop::collection::vec(
        (0i64..3, prop::sample::select(vec![0.0, 0.5, 1.0]), prop::sample::select(vec![10.0, 20.0]), -20.0f64..20.0, -20.0f64..20.0),
        1..80,
    )
}

proptest! {
    #[test]
    fn prop_deduped_keys_are_unique_and_actions_within_limits(
        cells in grid_strategy(),
        mode in prop::sample::select(vec![DedupeMode::First, DedupeMode::Median, DedupeMode::Mean]),
    ) {
        let grid: Vec<GridRow> = cells.iter().map(|c| grid_row(c.0, c.1, c.2)).collect();
        let preds: Vec<Vec<f64>> = cells.iter().map(|c| vec![c.3, c.4]).collect();
        let predictions = Matrix::from_rows(&preds).unwrap();
        let actions = names(&["irrigateN_mm", "drainN_mm"]);
        let limits = ActionLimits::default();

        let table = postprocess(&grid, &predictions, &actions, &limits, mode).unwrap();
        prop_assert!(keys_unique(table.rows()), "duplicate or unsorted keys under {:?}", mode);
        prop_assert!(table.len() <= grid.len());
        for row in table.rows() {
            prop_assert!((0.0..=limits.irrigate_max).contains(&row.actions[0]));
            prop_assert!((0.0..=limits.drain_max).contains(&row.actions[1]));
        }
    }
}
