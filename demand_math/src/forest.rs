//! Regression trees and random forests

use crate::{MathError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Regression tree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree (None = grow until leaves are pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Regression tree grown by variance reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl RegressionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Train the tree on all rows
    pub fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        let n_features = validate_training_data(features, targets)?;
        let indices: Vec<usize> = (0..targets.len()).collect();
        self.fit_indices(features, targets, &indices, n_features);
        Ok(())
    }

    /// Train on a (possibly repeated) subset of rows. Inputs are already validated.
    fn fit_indices(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        n_features: usize,
    ) {
        self.n_features = n_features;
        self.feature_importances = vec![0.0; n_features];

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let root = self.build_tree(features, targets, indices, 0, &mut rng);
        self.root = Some(root);

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    fn build_tree(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            (s + targets[i], sq + targets[i] * targets[i])
        });
        let mean = sum / n as f64;
        let sse = (sum_sq - sum * sum / n as f64).max(0.0);

        let depth_reached = self.config.max_depth.map_or(false, |max| depth >= max);
        if depth_reached || n < self.config.min_samples_split || sse < 1e-12 {
            return TreeNode::Leaf {
                value: mean,
                n_samples: n,
            };
        }

        match self.find_best_split(features, targets, indices, sse, rng) {
            Some(split) => {
                self.feature_importances[split.feature] += split.gain;
                let left = self.build_tree(features, targets, &split.left, depth + 1, rng);
                let right = self.build_tree(features, targets, &split.right, depth + 1, rng);
                TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            None => TreeNode::Leaf {
                value: mean,
                n_samples: n,
            },
        }
    }

    /// Scan every candidate feature in sorted order with running sums
    fn find_best_split(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        parent_sse: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut feature_order: Vec<usize> = (0..self.n_features).collect();
        feature_order.shuffle(rng);
        if let Some(max) = self.config.max_features {
            feature_order.truncate(max.clamp(1, self.n_features));
        }

        let total_sum: f64 = indices.iter().map(|&i| targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| targets[i] * targets[i]).sum();

        let mut best: Option<(usize, f64, f64)> = None;
        for &feature in &feature_order {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let y = targets[sorted[pos]];
                left_sum += y;
                left_sq += y * y;

                let here = features[sorted[pos]][feature];
                let next = features[sorted[pos + 1]][feature];
                let n_left = pos + 1;
                let n_right = n - n_left;
                if here >= next || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left as f64)
                    + (right_sq - right_sum * right_sum / n_right as f64);
                let gain = parent_sse - sse;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, (here + next) / 2.0, gain));
                }
            }
        }

        best.map(|(feature, threshold, gain)| {
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| features[i][feature] <= threshold);
            SplitCandidate {
                feature,
                threshold,
                gain,
                left,
                right,
            }
        })
    }

    /// Predict for a single sample
    pub fn predict_one(&self, row: &[f64]) -> Result<f64> {
        let root = self.root.as_ref().ok_or_else(|| {
            MathError::CalculationError("Regression tree has not been fitted".to_string())
        })?;
        check_width(row, self.n_features)?;
        Ok(root.predict(row))
    }

    /// Predict for multiple samples
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }
}

/// Random forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Max features per split (all if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
    /// Out-of-bag R² calculation
    pub oob_score: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
            oob_score: false,
        }
    }
}

/// Random forest regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
    oob_score_value: Option<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
            oob_score_value: None,
        }
    }

    /// Train the forest. Trees are grown in parallel; each draws from its
    /// own seed so the result does not depend on scheduling.
    pub fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        if self.config.n_trees == 0 {
            return Err(MathError::InvalidInput(
                "A random forest needs at least one tree".to_string(),
            ));
        }
        let n_features = validate_training_data(features, targets)?;
        let n_samples = targets.len();

        let trees: Vec<RegressionTree> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = self.config.seed.wrapping_add(i as u64);
                let mut tree = RegressionTree::new(TreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: self.config.min_samples_split,
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_features: self.config.max_features,
                    seed,
                });

                let indices = if self.config.bootstrap {
                    bootstrap_indices(n_samples, seed)
                } else {
                    (0..n_samples).collect()
                };
                tree.fit_indices(features, targets, &indices, n_features);
                tree
            })
            .collect();

        self.trees = trees;
        self.n_features = n_features;

        self.feature_importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (i, &imp) in tree.feature_importances().iter().enumerate() {
                self.feature_importances[i] += imp;
            }
        }
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        self.oob_score_value = if self.config.oob_score && self.config.bootstrap {
            self.calculate_oob_score(features, targets)
        } else {
            None
        };

        debug!(
            trees = self.trees.len(),
            samples = n_samples,
            features = n_features,
            "fitted random forest"
        );
        Ok(())
    }

    /// R² over the samples each tree did not see
    fn calculate_oob_score(&self, features: &[Vec<f64>], targets: &[f64]) -> Option<f64> {
        let n_samples = targets.len();
        let mut sums = vec![0.0; n_samples];
        let mut counts = vec![0usize; n_samples];

        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let seed = self.config.seed.wrapping_add(tree_idx as u64);
            let mut in_bag = vec![false; n_samples];
            for i in bootstrap_indices(n_samples, seed) {
                in_bag[i] = true;
            }
            for i in (0..n_samples).filter(|&i| !in_bag[i]) {
                if let Some(root) = tree.root() {
                    sums[i] += root.predict(&features[i]);
                    counts[i] += 1;
                }
            }
        }

        let scored: Vec<(f64, f64)> = (0..n_samples)
            .filter(|&i| counts[i] > 0)
            .map(|i| (sums[i] / counts[i] as f64, targets[i]))
            .collect();
        if scored.is_empty() {
            return None;
        }

        let mean = scored.iter().map(|(_, y)| y).sum::<f64>() / scored.len() as f64;
        let ss_res: f64 = scored.iter().map(|(p, y)| (y - p).powi(2)).sum();
        let ss_tot: f64 = scored.iter().map(|(_, y)| (y - mean).powi(2)).sum();
        if ss_tot == 0.0 {
            None
        } else {
            Some(1.0 - ss_res / ss_tot)
        }
    }

    /// Predict for a single sample: the mean over all trees
    pub fn predict_one(&self, row: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(MathError::CalculationError(
                "Random forest has not been fitted".to_string(),
            ));
        }
        check_width(row, self.n_features)?;

        let total: f64 = self
            .trees
            .iter()
            .filter_map(|t| t.root())
            .map(|root| root.predict(row))
            .sum();
        Ok(total / self.trees.len() as f64)
    }

    /// Predict for multiple samples
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.par_iter().map(|row| self.predict_one(row)).collect()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn oob_score(&self) -> Option<f64> {
        self.oob_score_value
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

fn bootstrap_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

fn validate_training_data(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    if features.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "{} feature rows but {} targets",
            features.len(),
            targets.len()
        )));
    }
    if targets.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot train on zero samples".to_string(),
        ));
    }

    let width = features[0].len();
    if width == 0 {
        return Err(MathError::InvalidInput(
            "Samples need at least one feature".to_string(),
        ));
    }
    for row in features {
        check_width(row, width)?;
        if row.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Features contain non-finite values".to_string(),
            ));
        }
    }
    if targets.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Targets contain non-finite values".to_string(),
        ));
    }
    Ok(width)
}

fn check_width(row: &[f64], expected: usize) -> Result<()> {
    if row.len() != expected {
        return Err(MathError::InvalidInput(format!(
            "Sample has {} features, expected {}",
            row.len(),
            expected
        )));
    }
    Ok(())
}
