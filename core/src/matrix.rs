//! Dense row-major matrix fed to and returned from the regression engine.

use crate::error::{PolicyError, PolicyResult};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> PolicyResult<Self> {
        if data.len() != rows * cols {
            return Err(PolicyError::Shape {
                context:  "matrix construction",
                expected: rows * cols,
                actual:   data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Build from row vectors; every row must have the same width.
    pub fn from_rows(rows: &[Vec<f64>]) -> PolicyResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(PolicyError::Shape {
                    context:  "matrix rows",
                    expected: cols,
                    actual:   row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { rows: rows.len(), cols, data })
    }

    /// Reshape a flat vector into a single-column matrix.
    pub fn from_column(values: Vec<f64>) -> Self {
        Self { rows: values.len(), cols: 1, data: values }
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn cols(&self) -> usize { self.cols }
    pub fn as_slice(&self) -> &[f64] { &self.data }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let cols = self.cols;
        &mut self.data[i * cols..(i + 1) * cols]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }

    /// Copy of a contiguous block of rows.
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        let start = range.start.min(self.rows);
        let end = range.end.min(self.rows).max(start);
        Self {
            rows: end - start,
            cols: self.cols,
            data: self.data[start * self.cols..end * self.cols].to_vec(),
        }
    }

    /// Copy of the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self { rows: indices.len(), cols: self.cols, data }
    }

    /// Stack blocks vertically. All blocks must share a width.
    pub fn vstack(blocks: Vec<Matrix>, cols: usize) -> PolicyResult<Self> {
        let rows = blocks.iter().map(|b| b.rows).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for block in blocks {
            if block.cols != cols {
                return Err(PolicyError::Shape {
                    context:  "vertical stack",
                    expected: cols,
                    actual:   block.cols,
                });
            }
            data.extend(block.data);
        }
        Ok(Self { rows, cols, data })
    }
}
