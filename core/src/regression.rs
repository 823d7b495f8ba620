//! Regression engine contract.
//!
//! RULE: The pipeline knows nothing about how a model is trained.
//! Training and compilation talk to any engine through RegressionEngine;
//! the only introspection allowed is the declared input width.

use crate::{error::PolicyResult, matrix::Matrix};

/// What an engine returns from `predict`.
///
/// Single-output engines may return a flat column; the pipeline reshapes
/// it into a one-column matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Column(Vec<f64>),
    Matrix(Matrix),
}

impl EngineOutput {
    pub fn into_matrix(self) -> Matrix {
        match self {
            Self::Column(values) => Matrix::from_column(values),
            Self::Matrix(m)      => m,
        }
    }
}

/// The contract every regression engine must fulfill.
pub trait RegressionEngine {
    /// Fit on features `x` (rows x features) and labels `y` (rows x outputs).
    fn fit(&mut self, x: &Matrix, y: &Matrix) -> PolicyResult<()>;

    /// Predict one output row per input row, same order.
    fn predict(&self, x: &Matrix) -> PolicyResult<EngineOutput>;

    /// Number of input columns the engine was fit on, if it declares one.
    fn expected_width(&self) -> Option<usize>;
}
