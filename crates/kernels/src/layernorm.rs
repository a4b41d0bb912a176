//! Layer normalization without learned scale or shift.

use ndarray::{Array1, ArrayView1, ArrayViewMut1, ArrayViewMut2, Axis};

/// Lower bound applied to the variance before taking its square root.
pub const LAYER_NORM_EPS: f64 = 1e-5;

/// Non-mutating layer norm that returns a new vector.
pub fn layer_norm(x: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut out = x.to_owned();
    normalize_inplace(out.view_mut());
    out
}

pub fn layer_norm_rows_inplace(mut data: ArrayViewMut2<'_, f64>) {
    for row in data.axis_iter_mut(Axis(0)) {
        normalize_inplace(row);
    }
}

fn normalize_inplace(mut row: ArrayViewMut1<'_, f64>) {
    assert!(!row.is_empty(), "layer norm requires a non-empty input");
    let len = row.len() as f64;
    let mean = row.sum() / len;
    let var = row.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / len;
    let inv_std = 1.0 / var.max(LAYER_NORM_EPS).sqrt();
    row.mapv_inplace(|x| (x - mean) * inv_std);
}
