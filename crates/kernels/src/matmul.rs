//! Dot products and matrix multiplication.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub fn validate_matmul_inputs(lhs: &ArrayView2<'_, f64>, rhs: &ArrayView2<'_, f64>) {
    assert!(
        lhs.ncols() == rhs.nrows(),
        "matmul dimension mismatch: lhs {}x{} vs rhs {}x{}",
        lhs.nrows(),
        lhs.ncols(),
        rhs.nrows(),
        rhs.ncols()
    );
}

pub fn dot_product(lhs: ArrayView1<'_, f64>, rhs: ArrayView1<'_, f64>) -> f64 {
    assert_eq!(
        lhs.len(),
        rhs.len(),
        "dot product length mismatch: {} vs {}",
        lhs.len(),
        rhs.len()
    );
    lhs.dot(&rhs)
}

/// Row vector times matrix: `out[j] = sum_i vector[i] * matrix[i][j]`.
///
/// Weight matrices are stored `[in x out]`, so this is the projection used
/// for every per-position linear map in the model.
pub fn mat_vec_mul(vector: ArrayView1<'_, f64>, matrix: ArrayView2<'_, f64>) -> Array1<f64> {
    assert_eq!(
        vector.len(),
        matrix.nrows(),
        "vector length {} must equal matrix rows {}",
        vector.len(),
        matrix.nrows()
    );
    vector.dot(&matrix)
}

pub fn mat_mul(lhs: ArrayView2<'_, f64>, rhs: ArrayView2<'_, f64>) -> Array2<f64> {
    validate_matmul_inputs(&lhs, &rhs);
    lhs.dot(&rhs)
}

pub fn transpose(matrix: ArrayView2<'_, f64>) -> Array2<f64> {
    matrix.t().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Array2};

    #[test]
    fn dot_product_of_known_vectors() {
        let a = arr1(&[1.0, 2.0, 3.0]);
        let b = arr1(&[4.0, -5.0, 6.0]);
        assert_abs_diff_eq!(dot_product(a.view(), b.view()), 12.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "dot product length mismatch")]
    fn dot_product_rejects_length_mismatch() {
        let a = arr1(&[1.0, 2.0]);
        let b = arr1(&[1.0]);
        dot_product(a.view(), b.view());
    }

    #[test]
    fn mat_vec_mul_projects_row_vector() {
        // [1, 2] x [[1, 2, 3], [4, 5, 6]] = [9, 12, 15]
        let v = arr1(&[1.0, 2.0]);
        let m = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let out = mat_vec_mul(v.view(), m.view());
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0], 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2], 15.0, epsilon = 1e-12);
    }

    #[test]
    fn mat_mul_matches_manual_product() {
        let lhs = Array2::from_shape_fn((3, 4), |(i, j)| (i + j) as f64 * 0.5);
        let rhs = Array2::from_shape_fn((4, 2), |(i, j)| (i * j + 1) as f64 * 0.25);
        let out = mat_mul(lhs.view(), rhs.view());
        assert_eq!(out.dim(), (3, 2));

        for i in 0..3 {
            for j in 0..2 {
                let expected: f64 = (0..4).map(|k| lhs[(i, k)] * rhs[(k, j)]).sum();
                assert_abs_diff_eq!(out[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    #[should_panic(expected = "matmul dimension mismatch")]
    fn mat_mul_rejects_inner_dimension_mismatch() {
        let lhs = Array2::<f64>::zeros((2, 3));
        let rhs = Array2::<f64>::zeros((2, 3));
        mat_mul(lhs.view(), rhs.view());
    }

    #[test]
    fn transpose_swaps_axes() {
        let m = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let t = transpose(m.view());
        assert_eq!(t.dim(), (3, 2));
        assert_eq!(t[(2, 0)], 3.0);
        assert_eq!(t[(0, 1)], 4.0);
    }
}
