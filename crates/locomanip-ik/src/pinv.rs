//! Truncated pseudo-inverses.
//!
//! Singular values at or below an absolute threshold are treated as zero, so
//! directions that are nearly singular produce no motion instead of a huge one.

use nalgebra::{DMatrix, DVector};

/// A pseudo-inverse together with the rank it kept.
#[derive(Debug, Clone)]
pub struct PseudoInverse {
    /// `n × m` pseudo-inverse of an `m × n` matrix.
    pub matrix: DMatrix<f64>,
    /// Number of singular values above the threshold.
    pub rank: usize,
}

/// Moore-Penrose pseudo-inverse through SVD, dropping singular values
/// `<= threshold`.
pub fn pseudo_inverse(a: &DMatrix<f64>, threshold: f64) -> PseudoInverse {
    let (m, n) = a.shape();
    if m == 0 || n == 0 {
        return PseudoInverse {
            matrix: DMatrix::zeros(n, m),
            rank: 0,
        };
    }

    let svd = a.clone().svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return PseudoInverse {
            matrix: DMatrix::zeros(n, m),
            rank: 0,
        };
    };

    // NaN singular values fail the comparison and are dropped as well
    let inverted: DVector<f64> = svd
        .singular_values
        .map(|s| if s > threshold { 1.0 / s } else { 0.0 });
    let rank = inverted.iter().filter(|s| **s != 0.0).count();

    // V * S^+ * U^T
    let mut v_scaled = v_t.transpose();
    for (mut column, scale) in v_scaled.column_iter_mut().zip(inverted.iter()) {
        column *= *scale;
    }
    PseudoInverse {
        matrix: v_scaled * u.transpose(),
        rank,
    }
}

/// Pseudo-inverse in the metric `W Wᵀ`: `W · pinv(A · W)`.
///
/// With `W = L⁻ᵀ` for a mass matrix `M = L Lᵀ` this is the inertia-weighted
/// pseudo-inverse. The threshold applies to the singular values of `A · W`.
pub fn weighted_pseudo_inverse(
    a: &DMatrix<f64>,
    weight: &DMatrix<f64>,
    threshold: f64,
) -> PseudoInverse {
    let inner = pseudo_inverse(&(a * weight), threshold);
    PseudoInverse {
        matrix: weight * inner.matrix,
        rank: inner.rank,
    }
}

/// Metric factor `L⁻ᵀ` of a symmetric positive-definite matrix `M = L Lᵀ`.
///
/// Returns `None` when `M` is not positive definite.
pub fn inverse_cholesky_factor(mass: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let lower = mass.clone().cholesky()?.unpack();
    Some(lower.try_inverse()?.transpose())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn full_rank_square_is_inverse() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let p = pseudo_inverse(&a, 1e-4);
        assert_eq!(p.rank, 2);
        assert_relative_eq!(&a * &p.matrix, DMatrix::identity(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn wide_matrix_is_right_inverse() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, 1.0, -1.0]);
        let p = pseudo_inverse(&a, 1e-4);
        assert_eq!(p.matrix.shape(), (3, 2));
        assert_relative_eq!(&a * &p.matrix, DMatrix::identity(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn small_singular_values_are_dropped() {
        // Second row nearly parallel to the first
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1e-6]);
        let p = pseudo_inverse(&a, 1e-4);
        assert_eq!(p.rank, 1);
        assert!(p.matrix.norm() < 10.0);
    }

    #[test]
    fn penrose_conditions_hold_when_rank_deficient() {
        let a = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0]);
        let p = pseudo_inverse(&a, 1e-4).matrix;
        assert_relative_eq!(&a * &p * &a, a.clone(), epsilon = 1e-10);
        assert_relative_eq!(&p * &a * &p, p.clone(), epsilon = 1e-10);
    }

    #[test]
    fn empty_matrix_has_empty_inverse() {
        let a = DMatrix::<f64>::zeros(0, 4);
        let p = pseudo_inverse(&a, 1e-4);
        assert_eq!(p.matrix.shape(), (4, 0));
        assert_eq!(p.rank, 0);
    }

    #[test]
    fn zero_matrix_has_zero_inverse() {
        let a = DMatrix::<f64>::zeros(2, 3);
        let p = pseudo_inverse(&a, 1e-4);
        assert_eq!(p.rank, 0);
        assert_relative_eq!(p.matrix, DMatrix::zeros(3, 2));
    }

    #[test]
    fn weighted_inverse_solves_the_constraint() {
        let a = DMatrix::from_row_slice(1, 3, &[1.0, 1.0, 1.0]);
        let mass = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 4.0, 9.0]));
        let w = inverse_cholesky_factor(&mass).unwrap();
        let p = weighted_pseudo_inverse(&a, &w, 1e-4);
        assert_relative_eq!(&a * &p.matrix, DMatrix::identity(1, 1), epsilon = 1e-12);
        // Heavier joints move less
        assert!(p.matrix[(0, 0)] > p.matrix[(1, 0)]);
        assert!(p.matrix[(1, 0)] > p.matrix[(2, 0)]);
    }

    #[test]
    fn metric_factor_reconstructs_inverse_mass() {
        let mass = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let w = inverse_cholesky_factor(&mass).unwrap();
        let inverse = mass.clone().try_inverse().unwrap();
        assert_relative_eq!(&w * w.transpose(), inverse, epsilon = 1e-12);
    }

    #[test]
    fn indefinite_matrix_has_no_factor() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(inverse_cholesky_factor(&m).is_none());
    }
}
