//! Solver parameters.
//!
//! [`IkConfig`] can be built in code, or loaded from TOML where every field
//! is optional and falls back to its default.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_singular_value_threshold() -> f64 {
    1e-4
}
const fn default_max_iters() -> u32 {
    100
}
const fn default_max_line_search_iters() -> u32 {
    400
}
const fn default_beta() -> f64 {
    0.8
}
const fn default_alpha() -> f64 {
    0.5
}
const fn default_error_tol() -> f64 {
    1e-4
}
const fn default_grad_tol() -> f64 {
    1e-6
}
const fn default_k_min_step() -> f64 {
    1e-20
}

// ---------------------------------------------------------------------------
// LineSearchRule
// ---------------------------------------------------------------------------

/// Acceptance test used by the backtracking line search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSearchRule {
    /// Compare levels in priority order: the highest unsatisfied level that
    /// changes decides, and no level may rise above its old error or the
    /// tolerance share `error_tol² / levels`. Ties fall back to `Descent`.
    #[default]
    Priority,
    /// Accept any step whose summed cost is strictly below the current cost.
    Descent,
    /// Accept when `f_new <= f_old - alpha * k_step * ||dq||^2`.
    Armijo,
}

// ---------------------------------------------------------------------------
// IkConfig
// ---------------------------------------------------------------------------

/// Parameters of the prioritized IK solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IkConfig {
    /// Singular values at or below this are dropped from pseudo-inverses.
    #[serde(default = "default_singular_value_threshold")]
    pub singular_value_threshold: f64,

    /// Maximum number of outer (Newton) iterations.
    #[serde(default = "default_max_iters")]
    pub max_iters: u32,

    /// Maximum number of step-size reductions per line search.
    #[serde(default = "default_max_line_search_iters")]
    pub max_line_search_iters: u32,

    /// Step shrink factor of the backtracking line search, in `(0, 1)`.
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Sufficient-decrease coefficient, only read by [`LineSearchRule::Armijo`].
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Aggregate error norm at which the solve is `Optimal`.
    #[serde(default = "default_error_tol")]
    pub error_tol: f64,

    /// `||dq||` below which the solve is declared stationary (`Suboptimal`).
    #[serde(default = "default_grad_tol")]
    pub grad_tol: f64,

    /// Smallest step size the line search may try.
    #[serde(default = "default_k_min_step")]
    pub k_min_step: f64,

    /// Line-search acceptance rule.
    #[serde(default)]
    pub line_search: LineSearchRule,

    /// Per-level cost weights. Missing entries weigh 1.0.
    #[serde(default)]
    pub level_weights: Vec<f64>,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            singular_value_threshold: default_singular_value_threshold(),
            max_iters: default_max_iters(),
            max_line_search_iters: default_max_line_search_iters(),
            beta: default_beta(),
            alpha: default_alpha(),
            error_tol: default_error_tol(),
            grad_tol: default_grad_tol(),
            k_min_step: default_k_min_step(),
            line_search: LineSearchRule::default(),
            level_weights: Vec::new(),
        }
    }
}

impl IkConfig {
    /// Validate configuration. Returns Err on invalid values, NaN included.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.singular_value_threshold >= 0.0) {
            return Err(ConfigError::invalid(
                "singular_value_threshold",
                "must be >= 0",
            ));
        }
        if self.max_iters == 0 {
            return Err(ConfigError::invalid("max_iters", "must be > 0"));
        }
        if self.max_line_search_iters == 0 {
            return Err(ConfigError::invalid("max_line_search_iters", "must be > 0"));
        }
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(ConfigError::invalid("beta", "must be in (0, 1)"));
        }
        if !(self.alpha >= 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::invalid("alpha", "must be in [0, 1)"));
        }
        if !(self.error_tol > 0.0) {
            return Err(ConfigError::invalid("error_tol", "must be > 0"));
        }
        if !(self.grad_tol >= 0.0) {
            return Err(ConfigError::invalid("grad_tol", "must be >= 0"));
        }
        if !(self.k_min_step > 0.0 && self.k_min_step < 1.0) {
            return Err(ConfigError::invalid("k_min_step", "must be in (0, 1)"));
        }
        if let Some(w) = self.level_weights.iter().find(|w| !(**w >= 0.0)) {
            return Err(ConfigError::invalid(
                "level_weights",
                format!("weights must be >= 0, got {w}"),
            ));
        }
        Ok(())
    }

    /// Cost weight of priority level `level`.
    pub fn level_weight(&self, level: usize) -> f64 {
        self.level_weights.get(level).copied().unwrap_or(1.0)
    }

    /// Parse from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
