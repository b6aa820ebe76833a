//! Gradient-boosted tree classifier with second-order (XGBoost-style) updates
//!
//! - Logistic loss: grad = p - y, hess = p * (1 - p)
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Split gain: 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - Seeded row and column subsampling per tree
//!
//! Training is deterministic for a fixed `random_state`: the parallel split
//! search reduces with a total order (gain, then lowest feature index), so
//! thread scheduling never changes the chosen split.
//!
//! Missing values (NaN) never become thresholds and always route right.

use super::config::BoosterConfig;
use crate::error::{Result, RetentionError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A single node in a boosted tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, sample: ArrayView1<'_, f64>) -> f64 {
        match self {
            TreeNode::Leaf { weight } => *weight,
            TreeNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn count_splits(&self, counts: &mut [f64]) {
        if let TreeNode::Split { feature, left, right, .. } = self {
            if let Some(c) = counts.get_mut(*feature) {
                *c += 1.0;
            }
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

/// Best split found for one feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl SplitCandidate {
    /// Higher gain wins; ties go to the lower feature index.
    fn better(a: Self, b: Self) -> Self {
        match a.gain.total_cmp(&b.gain) {
            std::cmp::Ordering::Greater => a,
            std::cmp::Ordering::Less => b,
            std::cmp::Ordering::Equal => {
                if a.feature <= b.feature { a } else { b }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    grad: &'a Array1<f64>,
    hess: &'a Array1<f64>,
    features: &'a [usize],
    config: &'a BoosterConfig,
}

impl TreeBuilder<'_> {
    /// Build a tree using exact greedy split finding
    fn build(&self, indices: &[usize], depth: usize) -> TreeNode {
        let g_sum: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h_sum: f64 = indices.iter().map(|&i| self.hess[i]).sum();
        let leaf_weight = compute_leaf_weight(g_sum, h_sum, self.config.reg_lambda, self.config.reg_alpha);

        if depth >= self.config.max_depth || indices.len() < 2 || h_sum < self.config.min_child_weight {
            return TreeNode::Leaf { weight: leaf_weight };
        }

        let best = self
            .features
            .par_iter()
            .filter_map(|&f| self.best_split_for_feature(indices, f))
            .reduce_with(SplitCandidate::better);

        match best {
            Some(split) if split.gain > self.config.gamma => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);

                if left_idx.is_empty() || right_idx.is_empty() {
                    return TreeNode::Leaf { weight: leaf_weight };
                }

                TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(self.build(&left_idx, depth + 1)),
                    right: Box::new(self.build(&right_idx, depth + 1)),
                }
            }
            _ => TreeNode::Leaf { weight: leaf_weight },
        }
    }

    fn best_split_for_feature(&self, indices: &[usize], feature: usize) -> Option<SplitCandidate> {
        let x = self.x;

        // NaN rows stay out of the scan and therefore always land on the right
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| !x[[i, feature]].is_nan())
            .collect();
        sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]).then(a.cmp(&b)));

        let g_total: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h_total: f64 = indices.iter().map(|&i| self.hess[i]).sum();
        let lambda = self.config.reg_lambda;
        let parent_score = (g_total * g_total) / (h_total + lambda);

        let mut g_left = 0.0;
        let mut h_left = 0.0;
        let mut best: Option<SplitCandidate> = None;

        for (pos, &idx) in sorted.iter().enumerate() {
            g_left += self.grad[idx];
            h_left += self.hess[idx];

            let Some(&next_idx) = sorted.get(pos + 1) else {
                break;
            };
            let (value, next_value) = (x[[idx, feature]], x[[next_idx, feature]]);
            if next_value - value < 1e-12 {
                continue;
            }

            let g_right = g_total - g_left;
            let h_right = h_total - h_left;
            if h_left < self.config.min_child_weight || h_right < self.config.min_child_weight {
                continue;
            }

            let gain = 0.5
                * ((g_left * g_left) / (h_left + lambda) + (g_right * g_right) / (h_right + lambda)
                    - parent_score);

            if best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (value + next_value) / 2.0,
                    gain,
                });
            }
        }

        best
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g_sum > alpha {
        g_sum - alpha
    } else if g_sum < -alpha {
        g_sum + alpha
    } else {
        return 0.0;
    };
    -g_adj / (h_sum + lambda)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Binary classifier minimizing log-loss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedClassifier {
    config: BoosterConfig,
    trees: Vec<TreeNode>,
    base_score: f64,
    n_features: usize,
}

impl BoostedClassifier {
    pub fn new(config: BoosterConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    /// Fit on a feature matrix and 0/1 labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples == 0 || n_features == 0 {
            return Err(RetentionError::TrainingError("cannot fit on an empty matrix".to_string()));
        }
        if y.len() != n_samples {
            return Err(RetentionError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: format!("{} labels", y.len()),
            });
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(RetentionError::TrainingError("labels must be 0 or 1".to_string()));
        }

        self.n_features = n_features;

        // Base score in log-odds space
        let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for round in 0..self.config.n_estimators {
            let probs: Array1<f64> = raw_preds.mapv(sigmoid);
            let grad: Array1<f64> = &probs - y;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7));

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                features: &col_indices,
                config: &self.config,
            };
            let tree = builder.build(&row_indices, 0);

            for (i, row) in x.rows().into_iter().enumerate() {
                raw_preds[i] += self.config.learning_rate * tree.predict(row);
            }

            if (round + 1) % 50 == 0 {
                tracing::debug!(round = round + 1, "Boosting progress");
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    fn raw_score(&self, sample: ArrayView1<'_, f64>) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + self.config.learning_rate * tree.predict(sample))
    }

    /// Positive-class probability for one encoded row
    pub fn predict_proba_row(&self, sample: ArrayView1<'_, f64>) -> Result<f64> {
        self.check_fitted(sample.len())?;
        Ok(sigmoid(self.raw_score(sample)))
    }

    /// Positive-class probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_fitted(x.ncols())?;
        let probs: Vec<f64> = x
            .rows()
            .into_iter()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|row| sigmoid(self.raw_score(row.view())))
            .collect();
        Ok(Array1::from(probs))
    }

    /// Class labels (1.0 iff probability > 0.5)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Holdout accuracy
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let preds = self.predict(x)?;
        let correct = preds.iter().zip(y.iter()).filter(|(p, a)| (*p - *a).abs() < 0.5).count();
        Ok(correct as f64 / y.len().max(1) as f64)
    }

    /// Split-count feature importances, normalized to sum to 1
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        Some(Array1::from(counts))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &BoosterConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn check_fitted(&self, n_cols: usize) -> Result<()> {
        if !self.is_fitted() {
            return Err(RetentionError::ModelNotFitted);
        }
        if n_cols != self.n_features {
            return Err(RetentionError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", n_cols),
            });
        }
        Ok(())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] + r[1] > 5.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    fn small_config() -> BoosterConfig {
        BoosterConfig::default().with_n_estimators(50).with_max_depth(4)
    }

    #[test]
    fn test_classifier_fits_separable_data() {
        let (x, y) = classification_data();
        let mut model = BoostedClassifier::new(small_config());
        model.fit(&x, &y).unwrap();
        let acc = model.score(&x, &y).unwrap();
        assert!(acc >= 0.9, "accuracy = {}", acc);
        assert_eq!(model.n_trees(), 50);
    }

    #[test]
    fn test_predict_proba_in_unit_interval() {
        let (x, y) = classification_data();
        let mut model = BoostedClassifier::new(small_config());
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), x.nrows());
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));

        let labels = model.predict(&x).unwrap();
        for (p, l) in proba.iter().zip(labels.iter()) {
            assert_eq!(*l == 1.0, *p > 0.5);
        }
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let (x, y) = classification_data();
        let mut a = BoostedClassifier::new(small_config());
        let mut b = BoostedClassifier::new(small_config());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.trees, b.trees);
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_nan_routes_right() {
        let mut x = Array2::from_shape_vec((40, 1), (0..40).map(|i| i as f64).collect()).unwrap();
        let y: Array1<f64> = (0..40).map(|i| if i >= 20 { 1.0 } else { 0.0 }).collect();
        x[[0, 0]] = f64::NAN;

        let mut model = BoostedClassifier::new(small_config());
        model.fit(&x, &y).unwrap();

        let probe = Array1::from(vec![f64::NAN]);
        let high = Array1::from(vec![39.0]);
        let p_nan = model.predict_proba_row(probe.view()).unwrap();
        let p_high = model.predict_proba_row(high.view()).unwrap();
        assert!((p_nan - p_high).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_and_shape_errors() {
        let model = BoostedClassifier::new(BoosterConfig::default());
        let row = Array1::from(vec![1.0, 2.0]);
        assert!(matches!(model.predict_proba_row(row.view()), Err(RetentionError::ModelNotFitted)));

        let (x, y) = classification_data();
        let mut model = BoostedClassifier::new(small_config());
        model.fit(&x, &y).unwrap();
        let wrong = Array1::from(vec![1.0, 2.0, 3.0]);
        assert!(matches!(model.predict_proba_row(wrong.view()), Err(RetentionError::ShapeError { .. })));
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let (x, _) = classification_data();
        let y = Array1::from_elem(50, 2.0);
        let mut model = BoostedClassifier::new(small_config());
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_feature_importances_normalized() {
        let (x, y) = classification_data();
        let mut model = BoostedClassifier::new(small_config());
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert!((imp.sum() - 1.0).abs() < 1e-9);
    }
}
