use irrigation_core::{
    config::{GridConfig, StageConfig},
    grid::GridRow,
    synth::{FeatureRule, FeatureSynthesizer},
    types::{Stage, StageSet},
};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn grid_row(stage0: i64, pool_ratio: f64) -> GridRow {
    GridRow {
        stage: Stage::from_zero_based(stage0),
        month: 7,
        norm_day: 0.5,
        def_n_mm: 5.0,
        def_s_mm: 10.0,
        canal_mm: 20.0,
        pool_ratio,
        target_mm: 25.0,
        north_mm: 20.0,
        south_mm: 15.0,
    }
}

fn stages(drain: &[i64], flood: &[i64]) -> StageConfig {
    StageConfig {
        drain_stages: StageSet::new(drain.to_vec()),
        flood_stages: StageSet::new(flood.to_vec()),
        ..StageConfig::default()
    }
}

#[test]
fn stage_is_fed_one_based() {
    let cfg = StageConfig::default();
    let grid = GridConfig::default();
    let synth = FeatureSynthesizer::new(&names(&["stage"]), &cfg, &grid);
    assert_eq!(synth.row_features(&grid_row(0, 0.5)), vec![1.0]);
    assert_eq!(synth.row_features(&grid_row(6, 0.5)), vec![7.0]);
}

#[test]
fn stage_numberings_share_one_index() {
    let s = Stage::from_one_based(3);
    assert_eq!(s.zero_based(), 2);
    assert_eq!(s, Stage::from_zero_based(2));
    assert_eq!(s.one_based(), 3);
}

#[test]
fn stage_flags_match_either_numbering() {
    let cfg = stages(&[3, 7], &[]);
    let grid = GridConfig::default();
    let synth = FeatureSynthesizer::new(&names(&["is_drain_stage"]), &cfg, &grid);

    // zero-based 3 matches directly; zero-based 2 is one-based 3.
    assert_eq!(synth.row_features(&grid_row(3, 0.0)), vec![1.0]);
    assert_eq!(synth.row_features(&grid_row(2, 0.0)), vec![1.0]);
    assert_eq!(synth.row_features(&grid_row(6, 0.0)), vec![1.0]);
    assert_eq!(synth.row_features(&grid_row(4, 0.0)), vec![0.0]);
}

#[test]
fn nominal_values_fill_what_the_grid_cannot_derive() {
    let cfg = StageConfig::default();
    let grid = GridConfig::default();
    let features = names(&["pool_mm", "lake_mm", "poolN_mgL", "lakeP_mgL", "rain_mm", "loss_mm"]);
    let synth = FeatureSynthesizer::new(&features, &cfg, &grid);

    let v = synth.row_features(&grid_row(1, 0.3));
    assert!((v[0] - 30.0).abs() < 1e-9, "pool_mm = ratio x 100, got {}", v[0]);
    assert_eq!(v[1], 50.0);
    assert_eq!(&v[2..], &[0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn unknown_features_are_zero() {
    let cfg = StageConfig::default();
    let grid = GridConfig::default();
    let synth = FeatureSynthesizer::new(&names(&["month", "wind_speed", "canal_mm"]), &cfg, &grid);
    assert_eq!(synth.rules()[1], FeatureRule::Unknown);
    assert_eq!(synth.row_features(&grid_row(0, 0.0)), vec![7.0, 0.0, 20.0]);
}

#[test]
fn columns_follow_feature_order_exactly() {
    let cfg = stages(&[3], &[1]);
    let grid = GridConfig::default();
    let features = names(&[
        "south_mm", "stage", "norm_day", "defN_mm", "defS_mm", "target_mm",
        "north_mm", "pool_ratio", "is_flood_stage",
    ]);
    let synth = FeatureSynthesizer::new(&features, &cfg, &grid);
    let m = synth.synthesize(&[grid_row(0, 0.4), grid_row(1, 1.0)]);

    assert_eq!(m.rows(), 2);
    assert_eq!(m.cols(), features.len());
    assert_eq!(m.row(0), &[15.0, 1.0, 0.5, 5.0, 10.0, 25.0, 20.0, 0.4, 1.0]);
    assert_eq!(m.row(1)[1], 2.0);
    assert_eq!(m.row(1)[8], 1.0, "zero-based 1 is in the flood set directly");
}
