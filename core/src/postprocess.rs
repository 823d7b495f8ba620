//! Predicted actions → clipped, rounded, deduplicated, sorted policy rows.

use crate::{
    config::{ActionLimits, DedupeMode},
    error::{PolicyError, PolicyResult},
    grid::GridRow,
    matrix::Matrix,
    policy_table::{PolicyKey, PolicyRow, PolicyTable},
};
use std::collections::BTreeMap;

/// Decimal places kept in stored action values.
pub const ACTION_DECIMALS: i32 = 3;

pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Clip each column to its action's range, then round.
pub fn clip_and_round(y: &Matrix, actions: &[String], limits: &ActionLimits) -> Matrix {
    let mut out = y.clone();
    for i in 0..out.rows() {
        for (v, name) in out.row_mut(i).iter_mut().zip(actions) {
            *v = round_to(limits.clip(name, *v), ACTION_DECIMALS);
        }
    }
    out
}

pub fn key_of(row: &GridRow) -> PolicyKey {
    PolicyKey {
        stage:      row.stage.zero_based(),
        month:      row.month,
        def_n_mm:   row.def_n_mm,
        def_s_mm:   row.def_s_mm,
        canal_mm:   row.canal_mm,
        pool_ratio: row.pool_ratio,
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Combine rows sharing a key. Output is sorted by key; with `None` the
/// sort is stable so duplicate keys keep grid order.
pub fn dedupe(rows: Vec<PolicyRow>, mode: DedupeMode) -> Vec<PolicyRow> {
    match mode {
        DedupeMode::None => {
            let mut rows = rows;
            rows.sort_by(|a, b| a.key.cmp(&b.key));
            rows
        }
        DedupeMode::First => {
            let mut first: BTreeMap<PolicyKey, Vec<f64>> = BTreeMap::new();
            for row in rows {
                first.entry(row.key).or_insert(row.actions);
            }
            first
                .into_iter()
                .map(|(key, actions)| PolicyRow { key, actions })
                .collect()
        }
        DedupeMode::Median | DedupeMode::Mean => {
            let mut groups: BTreeMap<PolicyKey, Vec<Vec<f64>>> = BTreeMap::new();
            for row in rows {
                groups.entry(row.key).or_default().push(row.actions);
            }
            groups
                .into_iter()
                .map(|(key, members)| {
                    let n_actions = members[0].len();
                    let actions = (0..n_actions)
                        .map(|j| {
                            let mut col: Vec<f64> = members.iter().map(|m| m[j]).collect();
                            let v = if mode == DedupeMode::Median {
                                median(&mut col)
                            } else {
                                col.iter().sum::<f64>() / col.len() as f64
                            };
                            round_to(v, ACTION_DECIMALS)
                        })
                        .collect();
                    PolicyRow { key, actions }
                })
                .collect()
        }
    }
}

/// Build the final policy table from the grid and raw predictions.
pub fn postprocess(
    grid: &[GridRow],
    predictions: &Matrix,
    actions: &[String],
    limits: &ActionLimits,
    mode: DedupeMode,
) -> PolicyResult<PolicyTable> {
    if predictions.rows() != grid.len() {
        return Err(PolicyError::Shape {
            context:  "predictions vs grid rows",
            expected: grid.len(),
            actual:   predictions.rows(),
        });
    }
    if predictions.cols() != actions.len() {
        return Err(PolicyError::Shape {
            context:  "predictions vs declared actions",
            expected: actions.len(),
            actual:   predictions.cols(),
        });
    }

    let clipped = clip_and_round(predictions, actions, limits);
    let rows: Vec<PolicyRow> = grid
        .iter()
        .enumerate()
        .map(|(i, g)| PolicyRow {
            key:     key_of(g),
            actions: clipped.row(i).to_vec(),
        })
        .collect();

    let before = rows.len();
    let rows = dedupe(rows, mode);
    if rows.len() < before {
        log::info!("dedupe={}: {} -> {} rows", mode.as_str(), before, rows.len());
    }
    Ok(PolicyTable::from_sorted(actions.to_vec(), rows))
}
