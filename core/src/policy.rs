//! Live behavior-cloning policy: one observation in, clipped actions out.
//!
//! Use this when a table lookup is not available; the compiled
//! policy table is the preferred decision-time path.

use crate::{
    error::{PolicyError, PolicyResult},
    forest::ForestRegressor,
    matrix::Matrix,
    meta::PolicyMeta,
    regression::RegressionEngine,
};
use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

pub struct BcPolicy<E: RegressionEngine> {
    engine: E,
    meta:   PolicyMeta,
}

impl BcPolicy<ForestRegressor> {
    pub fn load(model_path: &Path, meta_path: &Path) -> PolicyResult<Self> {
        Ok(Self::new(ForestRegressor::load(model_path)?, PolicyMeta::load(meta_path)?))
    }
}

impl<E: RegressionEngine> BcPolicy<E> {
    pub fn new(engine: E, meta: PolicyMeta) -> Self {
        Self { engine, meta }
    }

    pub fn meta(&self) -> &PolicyMeta { &self.meta }

    /// Observation values are looked up by feature name; absent ones are 0.0.
    pub fn act(&self, obs: &HashMap<String, f64>) -> PolicyResult<BTreeMap<String, f64>> {
        let row: Vec<f64> = self
            .meta
            .features
            .iter()
            .map(|f| obs.get(f).copied().unwrap_or(0.0))
            .collect();
        let x = Matrix::new(1, row.len(), row)?;
        let y = self.engine.predict(&x)?.into_matrix();
        if y.rows() != 1 {
            return Err(PolicyError::Shape {
                context:  "live policy output rows",
                expected: 1,
                actual:   y.rows(),
            });
        }
        if y.cols() != self.meta.actions.len() {
            return Err(PolicyError::Shape {
                context:  "live policy output columns vs declared actions",
                expected: self.meta.actions.len(),
                actual:   y.cols(),
            });
        }
        Ok(self
            .meta
            .actions
            .iter()
            .enumerate()
            .map(|(j, a)| (a.clone(), self.meta.limits.clip(a, y.get(0, j))))
            .collect())
    }
}
