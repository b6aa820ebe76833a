//! Seeded stratified train/holdout split

use crate::error::{Result, RetentionError};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::BTreeMap;

/// Rows of one side of a split
#[derive(Debug, Clone)]
pub struct SplitPart {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// Original row indices, ascending
    pub indices: Vec<usize>,
}

/// Split `x`/`y` so each class keeps its proportion on both sides.
///
/// Every class contributes `round(len * test_size)` rows to the holdout,
/// clamped so a class with two or more rows stays on both sides. The same
/// seed always yields the same partition.
pub fn stratified_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<(SplitPart, SplitPart)> {
    if x.nrows() != y.len() {
        return Err(RetentionError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(RetentionError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    // Group indices by class label
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        class_indices.entry(label as i64).or_default().push(i);
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(y.len());
    let mut test_indices = Vec::new();

    for indices in class_indices.values_mut() {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let mut n_test = ((n as f64) * test_size).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = n_test.min(n);
        }
        test_indices.extend_from_slice(&indices[..n_test]);
        train_indices.extend_from_slice(&indices[n_test..]);
    }

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(RetentionError::DataError(
            "Stratified split resulted in empty train or holdout set".to_string(),
        ));
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok((take(x, y, train_indices), take(x, y, test_indices)))
}

fn take(x: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>) -> SplitPart {
    SplitPart {
        x: x.select(Axis(0), &indices),
        y: y.select(Axis(0), &indices),
        indices,
    }
}
