//! Built-in regression engine: a deterministic multi-output random forest.
//!
//! Each tree is grown on a bootstrap sample with its own RNG stream.
//! Splits minimise the summed squared error over all outputs jointly,
//! so one forest predicts every action column.

use crate::{
    config::ModelConfig,
    error::{PolicyError, PolicyResult},
    matrix::Matrix,
    regression::{EngineOutput, RegressionEngine},
    rng::{RngBank, StreamRng},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Split improvements smaller than this are treated as no improvement.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: Vec<f64>,
    },
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict_row(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct SplitCandidate {
    feature:   usize,
    threshold: f64,
    sse:       f64,
}

struct TreeBuilder<'a> {
    x:      &'a Matrix,
    y:      &'a Matrix,
    params: &'a ModelConfig,
    rng:    StreamRng,
    nodes:  Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn mean(&self, samples: &[usize]) -> Vec<f64> {
        let mut acc = vec![0.0; self.y.cols()];
        for &s in samples {
            for (a, v) in acc.iter_mut().zip(self.y.row(s)) {
                *a += v;
            }
        }
        let n = samples.len().max(1) as f64;
        acc.iter().map(|a| a / n).collect()
    }

    fn sums(&self, samples: &[usize]) -> (Vec<f64>, Vec<f64>) {
        let mut sum = vec![0.0; self.y.cols()];
        let mut sq = vec![0.0; self.y.cols()];
        for &s in samples {
            for (j, v) in self.y.row(s).iter().enumerate() {
                sum[j] += v;
                sq[j] += v * v;
            }
        }
        (sum, sq)
    }

    fn sse(sum: &[f64], sq: &[f64], n: f64) -> f64 {
        sum.iter().zip(sq).map(|(s, q)| q - s * s / n).sum()
    }

    fn best_split(&mut self, samples: &[usize]) -> Option<SplitCandidate> {
        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let (total_sum, total_sq) = self.sums(samples);
        let parent_sse = Self::sse(&total_sum, &total_sq, n as f64);

        let n_features = self.x.cols();
        let k = self.params.max_features.unwrap_or(n_features).clamp(1, n_features);
        let features = self.rng.sample_indices(n_features, k);

        let mut best: Option<SplitCandidate> = None;
        let mut order = samples.to_vec();
        for f in features {
            order.sort_by(|a, b| self.x.get(*a, f).total_cmp(&self.x.get(*b, f)));

            let mut left_sum = vec![0.0; self.y.cols()];
            let mut left_sq = vec![0.0; self.y.cols()];
            for i in 0..n - 1 {
                for (j, v) in self.y.row(order[i]).iter().enumerate() {
                    left_sum[j] += v;
                    left_sq[j] += v * v;
                }
                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let here = self.x.get(order[i], f);
                let next = self.x.get(order[i + 1], f);
                if next <= here {
                    continue;
                }

                let right_sum: Vec<f64> = total_sum.iter().zip(&left_sum).map(|(t, l)| t - l).collect();
                let right_sq: Vec<f64> = total_sq.iter().zip(&left_sq).map(|(t, l)| t - l).collect();
                let sse = Self::sse(&left_sum, &left_sq, n_left as f64)
                    + Self::sse(&right_sum, &right_sq, n_right as f64);

                if best.as_ref().map_or(true, |b| sse < b.sse - MIN_GAIN) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitCandidate { feature: f, threshold, sse });
                }
            }
        }
        best.filter(|b| b.sse < parent_sse - MIN_GAIN)
    }

    /// Grow a subtree; returns its root's node index.
    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let value = self.mean(&samples);
        self.nodes.push(Node::Leaf { value });

        let min_leaf = self.params.min_samples_leaf.max(1);
        if depth >= self.params.max_depth || samples.len() < 2 * min_leaf {
            return idx;
        }
        let Some(split) = self.best_split(&samples) else {
            return idx;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| self.x.get(s, split.feature) <= split.threshold);
        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestRegressor {
    params:     ModelConfig,
    n_features: Option<usize>,
    n_outputs:  usize,
    trees:      Vec<RegressionTree>,
}

impl ForestRegressor {
    pub fn new(params: ModelConfig) -> Self {
        Self {
            params,
            n_features: None,
            n_outputs:  0,
            trees:      Vec::new(),
        }
    }

    pub fn params(&self) -> &ModelConfig { &self.params }
    pub fn n_trees(&self) -> usize { self.trees.len() }
    pub fn n_outputs(&self) -> usize { self.n_outputs }
    pub fn trees(&self) -> &[RegressionTree] { &self.trees }

    /// Write the fitted model as JSON.
    pub fn save(&self, path: &Path) -> PolicyResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> PolicyResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl RegressionEngine for ForestRegressor {
    fn fit(&mut self, x: &Matrix, y: &Matrix) -> PolicyResult<()> {
        if x.rows() != y.rows() {
            return Err(PolicyError::Shape {
                context:  "forest fit rows",
                expected: x.rows(),
                actual:   y.rows(),
            });
        }
        if x.rows() == 0 || x.cols() == 0 || y.cols() == 0 {
            return Err(PolicyError::Data("cannot fit on an empty matrix".into()));
        }

        let bank = RngBank::new(self.params.random_state);
        let n = x.rows();
        self.trees = (0..self.params.n_estimators)
            .map(|t| {
                let mut rng = bank.for_tree(t);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.below(n)).collect();
                let mut builder = TreeBuilder {
                    x,
                    y,
                    params: &self.params,
                    rng,
                    nodes: Vec::new(),
                };
                builder.grow(bootstrap, 0);
                RegressionTree { nodes: builder.nodes }
            })
            .collect();
        self.n_features = Some(x.cols());
        self.n_outputs = y.cols();

        log::info!(
            "forest: fitted {} trees on {} rows x {} features -> {} outputs",
            self.trees.len(), n, x.cols(), y.cols()
        );
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> PolicyResult<EngineOutput> {
        let width = self.n_features.ok_or(PolicyError::ModelNotFitted)?;
        if self.trees.is_empty() {
            return Err(PolicyError::ModelNotFitted);
        }
        if x.cols() != width {
            return Err(PolicyError::Shape {
                context:  "forest predict width",
                expected: width,
                actual:   x.cols(),
            });
        }

        let scale = 1.0 / self.trees.len() as f64;
        let mut out = Matrix::zeros(x.rows(), self.n_outputs);
        for i in 0..x.rows() {
            let row = x.row(i);
            let acc = out.row_mut(i);
            for tree in &self.trees {
                for (a, v) in acc.iter_mut().zip(tree.predict_row(row)) {
                    *a += v;
                }
            }
            for a in acc.iter_mut() {
                *a *= scale;
            }
        }
        Ok(EngineOutput::Matrix(out))
    }

    fn expected_width(&self) -> Option<usize> {
        self.n_features
    }
}
