//! Holdout evaluation metrics for the binary classifier

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for model evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub log_loss: f64,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute metrics from 0/1 labels and positive-class probabilities.
    ///
    /// Predictions use the same `p > 0.5` rule as inference. Precision and
    /// recall are 0 when their denominator is empty.
    pub fn compute_binary(y_true: &Array1<f64>, probabilities: &Array1<f64>) -> Self {
        let n = y_true.len().min(probabilities.len());
        let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
        let mut loss = 0.0;

        for (&y, &p) in y_true.iter().zip(probabilities.iter()) {
            let positive = y > 0.5;
            match (p > 0.5, positive) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                (false, true) => fn_ += 1,
            }
            let p = p.clamp(1e-15, 1.0 - 1e-15);
            loss -= if positive { p.ln() } else { (1.0 - p).ln() };
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: ratio(tp + tn, n),
            precision,
            recall,
            f1_score,
            log_loss: if n == 0 { 0.0 } else { loss / n as f64 },
            n_samples: n,
        }
    }
}
