//! Elementwise helpers and softmax.

use ndarray::{Array1, ArrayView1, ArrayViewMut2, Axis};

/// Numerically stable softmax over a non-empty, finite vector.
pub fn softmax(x: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut out = x.to_owned();
    softmax_row_inplace(out.view_mut());
    out
}

pub fn softmax_rows_inplace(mut scores: ArrayViewMut2<'_, f64>) {
    for row in scores.axis_iter_mut(Axis(0)) {
        softmax_row_inplace(row);
    }
}

fn softmax_row_inplace(mut row: ndarray::ArrayViewMut1<'_, f64>) {
    assert!(!row.is_empty(), "softmax requires a non-empty input");
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    row.mapv_inplace(|x| (x - max).exp());
    // The max element contributes exp(0) = 1, so the sum is never below 1.
    let sum = row.sum();
    row /= sum;
}

pub fn relu(x: ArrayView1<'_, f64>) -> Array1<f64> {
    x.mapv(|v| v.max(0.0))
}

pub fn vec_add(lhs: ArrayView1<'_, f64>, rhs: ArrayView1<'_, f64>) -> Array1<f64> {
    check_lengths("vec_add", &lhs, &rhs);
    &lhs + &rhs
}

pub fn vec_sub(lhs: ArrayView1<'_, f64>, rhs: ArrayView1<'_, f64>) -> Array1<f64> {
    check_lengths("vec_sub", &lhs, &rhs);
    &lhs - &rhs
}

pub fn vec_scale(x: ArrayView1<'_, f64>, factor: f64) -> Array1<f64> {
    x.mapv(|v| v * factor)
}

/// Index of the largest element; the first index wins on ties.
pub fn argmax(x: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (idx, &value) in x.iter().enumerate() {
        if value > x[best] {
            best = idx;
        }
    }
    best
}

fn check_lengths(op: &str, lhs: &ArrayView1<'_, f64>, rhs: &ArrayView1<'_, f64>) {
    assert!(
        lhs.len() == rhs.len(),
        "{op} length mismatch: {} vs {}",
        lhs.len(),
        rhs.len()
    );
}
