//! Nullspace cascade over priority levels.
//!
//! Level `i` only acts inside the nullspace left by levels `0..i`:
//!
//! ```text
//! JN_i   = J_i · N_{i-1}                       (N_{-1} = I)
//! dq    += pinv(JN_i) · (dx_i - J_i · dq)
//! N_i    = N_{i-1} - pinv(JN_i) · JN_i
//! ```
//!
//! With a metric factor `W` the pseudo-inverse becomes `W · pinv(JN_i · W)`,
//! which keeps every `N_i` idempotent while minimizing `dqᵀ (W Wᵀ)⁻¹ dq`.

use nalgebra::{DMatrix, DVector};

use crate::pinv::{pseudo_inverse, weighted_pseudo_inverse};

/// Work arrays of one priority level, sized once per hierarchy.
#[derive(Debug, Clone)]
pub struct PriorityLevel {
    /// Task Jacobian `J_i` (`dim × nv`).
    pub jacobian: DMatrix<f64>,
    /// Task error `dx_i` (`dim`).
    pub error: DVector<f64>,
    /// Projected Jacobian `J_i · N_{i-1}`.
    pub projected: DMatrix<f64>,
    /// Truncated pseudo-inverse of `projected` (`nv × dim`).
    pub pinv: DMatrix<f64>,
    /// Nullspace projector `N_i` after this level (`nv × nv`).
    pub projector: DMatrix<f64>,
    /// Rank kept by the pseudo-inverse.
    pub rank: usize,
}

impl PriorityLevel {
    pub fn new(dim: usize, nv: usize) -> Self {
        Self {
            jacobian: DMatrix::zeros(dim, nv),
            error: DVector::zeros(dim),
            projected: DMatrix::zeros(dim, nv),
            pinv: DMatrix::zeros(nv, dim),
            projector: DMatrix::identity(nv, nv),
            rank: 0,
        }
    }

    /// Number of task rows.
    pub fn dim(&self) -> usize {
        self.error.len()
    }
}

/// Accumulates the joint-velocity step and projector across levels.
#[derive(Debug, Clone)]
pub struct NullspaceCascade {
    threshold: f64,
    metric: Option<DMatrix<f64>>,
    step: DVector<f64>,
    projector: DMatrix<f64>,
}

impl NullspaceCascade {
    /// Start a cascade in `nv` velocity coordinates: `N = I`, `dq = 0`.
    pub fn new(nv: usize, threshold: f64) -> Self {
        Self {
            threshold,
            metric: None,
            step: DVector::zeros(nv),
            projector: DMatrix::identity(nv, nv),
        }
    }

    /// Use the metric factor `W` for every pseudo-inverse.
    #[must_use]
    pub fn with_metric(mut self, metric: DMatrix<f64>) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Process one level, filling its work arrays.
    ///
    /// Reads `level.jacobian` and `level.error`; writes `projected`, `pinv`,
    /// `projector` and `rank`.
    pub fn push(&mut self, level: &mut PriorityLevel) {
        level.projected = &level.jacobian * &self.projector;
        let pinv = match &self.metric {
            Some(metric) => weighted_pseudo_inverse(&level.projected, metric, self.threshold),
            None => pseudo_inverse(&level.projected, self.threshold),
        };

        let residual = &level.error - &level.jacobian * &self.step;
        self.step += &pinv.matrix * residual;
        self.projector -= &pinv.matrix * &level.projected;

        level.pinv = pinv.matrix;
        level.rank = pinv.rank;
        level.projector.copy_from(&self.projector);
    }

    /// Accumulated step `dq`.
    pub const fn step(&self) -> &DVector<f64> {
        &self.step
    }

    /// Projector onto the nullspace of every level pushed so far.
    pub const fn projector(&self) -> &DMatrix<f64> {
        &self.projector
    }

    /// Consume the cascade, returning the step.
    pub fn into_step(self) -> DVector<f64> {
        self.step
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
