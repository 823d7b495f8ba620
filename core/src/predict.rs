//! Batched inference over a feature matrix.
//!
//! Chunks are contiguous, run one at a time to completion, and stacked in
//! order. Batch size bounds peak memory only; it never changes the output.
//! Any failing chunk aborts the whole call.

use crate::{
    error::{PolicyError, PolicyResult},
    matrix::Matrix,
    regression::RegressionEngine,
};

pub fn predict_in_batches<E: RegressionEngine + ?Sized>(
    engine: &E,
    x: &Matrix,
    batch_size: usize,
    n_actions: usize,
) -> PolicyResult<Matrix> {
    let batch = batch_size.max(1);
    let n = x.rows();
    let mut blocks = Vec::with_capacity(n.div_ceil(batch));

    for start in (0..n).step_by(batch) {
        let stop = (start + batch).min(n);
        let chunk = x.slice_rows(start..stop);
        let out = engine.predict(&chunk)?.into_matrix();

        if out.rows() != chunk.rows() {
            return Err(PolicyError::Shape {
                context:  "prediction rows",
                expected: chunk.rows(),
                actual:   out.rows(),
            });
        }
        if out.cols() != n_actions {
            return Err(PolicyError::Shape {
                context:  "prediction columns vs declared actions",
                expected: n_actions,
                actual:   out.cols(),
            });
        }
        log::debug!("predict: rows {start}..{stop} done");
        blocks.push(out);
    }

    Matrix::vstack(blocks, n_actions)
}
