use irrigation_core::{
    config::{GridConfig, StageConfig},
    error::PolicyError,
    grid::{build_grid, grid_len},
};

fn small_grid() -> GridConfig {
    GridConfig {
        stages:      vec![0, 1],
        months:      vec![1, 6],
        norm_days:   vec![0.5],
        def_bins:    vec![0.0, 10.0, 40.0],
        canal_bins:  vec![0.0, 50.0],
        pool_ratios: vec![0.0, 1.0],
        ..GridConfig::default()
    }
}

#[test]
fn grid_is_full_cartesian_product() {
    let grid = small_grid();
    let rows = build_grid(&grid, &StageConfig::default().target_by_stage).unwrap();
    assert_eq!(rows.len(), 2 * 2 * 1 * 3 * 3 * 2 * 2);
    assert_eq!(rows.len(), grid_len(&grid));
}

#[test]
fn default_grid_size() {
    let grid = GridConfig::default();
    assert_eq!(grid_len(&grid), 8 * 12 * 1 * 14 * 14 * 11 * 11);
}

#[test]
fn pool_ratio_is_innermost_and_stage_outermost() {
    let rows = build_grid(&small_grid(), &StageConfig::default().target_by_stage).unwrap();
    assert_eq!(rows[0].pool_ratio, 0.0);
    assert_eq!(rows[1].pool_ratio, 1.0);
    assert_eq!(rows[0].canal_mm, rows[1].canal_mm);
    assert_eq!(rows[2].canal_mm, 50.0);

    let half = rows.len() / 2;
    assert!(rows[..half].iter().all(|r| r.stage.zero_based() == 0));
    assert!(rows[half..].iter().all(|r| r.stage.zero_based() == 1));
}

#[test]
fn identical_inputs_give_identical_rows() {
    let t = StageConfig::default().target_by_stage;
    assert_eq!(build_grid(&small_grid(), &t).unwrap(), build_grid(&small_grid(), &t).unwrap());
}

#[test]
fn levels_are_target_minus_deficit_floored_at_zero() {
    // Stage 0 target is 15.
    let rows = build_grid(&small_grid(), &StageConfig::default().target_by_stage).unwrap();
    for r in &rows {
        assert_eq!(r.north_mm, (r.target_mm - r.def_n_mm).max(0.0));
        assert_eq!(r.south_mm, (r.target_mm - r.def_s_mm).max(0.0));
        assert!(r.north_mm >= 0.0 && r.south_mm >= 0.0);
    }
    let r = rows
        .iter()
        .find(|r| r.stage.zero_based() == 0 && r.def_n_mm == 10.0 && r.def_s_mm == 40.0)
        .unwrap();
    assert_eq!(r.target_mm, 15.0);
    assert_eq!(r.north_mm, 5.0);
    assert_eq!(r.south_mm, 0.0);
}

#[test]
fn stage_without_target_is_a_meta_error() {
    let grid = GridConfig { stages: vec![0, 5], ..small_grid() };
    let err = build_grid(&grid, &[10.0, 20.0]).unwrap_err();
    assert!(matches!(err, PolicyError::Meta(_)), "got {err:?}");
}
