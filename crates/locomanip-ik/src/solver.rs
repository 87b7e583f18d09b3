//! Prioritized task-space IK solver.
//!
//! Each iteration evaluates every priority level at the current
//! configuration, runs the nullspace cascade to get a joint-velocity step,
//! backtracks along that step until the acceptance rule holds, and
//! integrates the accepted step on the configuration manifold. The default
//! rule compares levels in priority order, so a lower level never vetoes a
//! step that improves a higher one.
//!
//! Convergence failures are not errors: [`IkSolver::solve`] returns `Ok` with
//! a [`SolveStatus`] and the configuration reached so far.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, trace, warn};

use crate::config::{IkConfig, LineSearchRule};
use crate::error::IkError;
use crate::hierarchy::{NullspaceCascade, PriorityLevel};
use crate::kinematics::RobotKinematics;
use crate::pinv::inverse_cholesky_factor;
use crate::task::Task;

// ---------------------------------------------------------------------------
// SolveStatus
// ---------------------------------------------------------------------------

/// State of a solve. Every state except `Iterating` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    Iterating,
    /// Aggregate error norm within `error_tol`.
    Optimal,
    /// Step norm fell below `grad_tol` before the error did: a stationary point.
    Suboptimal,
    /// Iteration budget exhausted.
    MaxItersExceeded,
    /// Line search found no acceptable step, either because the step fell
    /// below `k_min_step` or because `max_line_search_iters` trials ran out.
    MinStepHit,
}

impl SolveStatus {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Iterating)
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Optimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Iterating => "ITERATING",
            Self::Optimal => "OPTIMAL",
            Self::Suboptimal => "SUBOPTIMAL",
            Self::MaxItersExceeded => "MAX_ITERS_EXCEEDED",
            Self::MinStepHit => "MIN_STEP_HIT",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// IkResult
// ---------------------------------------------------------------------------

/// Outcome of [`IkSolver::solve`].
#[derive(Debug, Clone)]
pub struct IkResult {
    /// Terminal status.
    pub status: SolveStatus,
    /// Whether the status is `Optimal`.
    pub converged: bool,
    /// `sqrt(Σ ||dx_i||²)` at the final configuration.
    pub error_norm: f64,
    /// `||dx_i||` per priority level at the final configuration.
    pub task_error_norms: Vec<f64>,
    /// Task name per priority level.
    pub task_names: Vec<String>,
    /// Final configuration.
    pub q: DVector<f64>,
    /// Number of accepted steps.
    pub iterations: u32,
    /// Cost at the seed, then after every accepted step.
    pub cost_history: Vec<f64>,
}

impl fmt::Display for IkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} after {} iterations, error norm {:.3e}",
            self.status, self.iterations, self.error_norm
        )?;
        for (level, (name, norm)) in self
            .task_names
            .iter()
            .zip(&self.task_error_norms)
            .enumerate()
        {
            writeln!(f, "  [{level}] {name}: {norm:.3e}")?;
        }
        write!(f, "  q = {:?}", self.q.as_slice())
    }
}

// ---------------------------------------------------------------------------
// IkSolver
// ---------------------------------------------------------------------------

enum LineSearch {
    Accepted { q: DVector<f64>, cost: f64, step: f64 },
    Collapsed,
}

/// Prioritized IK solver owning its kinematics provider and task hierarchy.
///
/// ```text
/// add_task* -> prepare -> set_initial_config -> solve
/// ```
///
/// Changing the hierarchy requires another [`prepare`](Self::prepare).
/// References and gains can be changed between solves through
/// [`task_mut`](Self::task_mut) without re-preparing.
pub struct IkSolver<K: RobotKinematics> {
    kinematics: K,
    config: IkConfig,
    hierarchy: Vec<Box<dyn Task>>,
    levels: Vec<PriorityLevel>,
    prepared: bool,
    q_start: Option<DVector<f64>>,
}

impl<K: RobotKinematics> IkSolver<K> {
    /// Create a solver with a validated configuration.
    pub fn new(kinematics: K, config: IkConfig) -> Result<Self, IkError> {
        config.validate()?;
        Ok(Self {
            kinematics,
            config,
            hierarchy: Vec::new(),
            levels: Vec::new(),
            prepared: false,
            q_start: None,
        })
    }

    /// Create a solver with default configuration.
    pub fn with_defaults(kinematics: K) -> Self {
        Self {
            kinematics,
            config: IkConfig::default(),
            hierarchy: Vec::new(),
            levels: Vec::new(),
            prepared: false,
            q_start: None,
        }
    }

    pub const fn config(&self) -> &IkConfig {
        &self.config
    }

    /// Replace the whole configuration.
    pub fn set_config(&mut self, config: IkConfig) -> Result<(), IkError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_error_tol(&mut self, error_tol: f64) {
        self.config.error_tol = error_tol;
    }

    pub fn set_max_iters(&mut self, max_iters: u32) {
        self.config.max_iters = max_iters;
    }

    pub fn set_max_line_search_iters(&mut self, max_line_search_iters: u32) {
        self.config.max_line_search_iters = max_line_search_iters;
    }

    pub fn set_line_search(&mut self, rule: LineSearchRule) {
        self.config.line_search = rule;
    }

    /// The kinematics provider, evaluated at the last configuration the
    /// solver pushed.
    pub const fn kinematics(&self) -> &K {
        &self.kinematics
    }

    pub fn into_kinematics(self) -> K {
        self.kinematics
    }

    /// Seed the next solve.
    ///
    /// A seed of the wrong size, or one the provider cannot evaluate (such as
    /// a zero base quaternion), is rejected here and also clears any previous
    /// seed, so a later `solve` fails instead of silently reusing it.
    pub fn set_initial_config(&mut self, q: DVector<f64>) -> Result<(), IkError> {
        self.q_start = None;
        let expected = self.kinematics.position_dim();
        if q.len() != expected {
            return Err(IkError::InitialConfigMismatch {
                expected,
                got: q.len(),
            });
        }
        self.kinematics.validate_configuration(&q)?;
        self.q_start = Some(q);
        Ok(())
    }

    pub const fn initial_config(&self) -> Option<&DVector<f64>> {
        self.q_start.as_ref()
    }

    /// Append a task at the lowest priority.
    pub fn add_task(&mut self, task: Box<dyn Task>) {
        self.hierarchy.push(task);
        self.prepared = false;
    }

    /// Remove every task.
    pub fn clear_hierarchy(&mut self) {
        self.hierarchy.clear();
        self.levels.clear();
        self.prepared = false;
    }

    /// Number of priority levels.
    pub fn hierarchy_len(&self) -> usize {
        self.hierarchy.len()
    }

    /// Task names in priority order.
    pub fn task_names(&self) -> Vec<&str> {
        self.hierarchy.iter().map(|t| t.name()).collect()
    }

    /// Find a task, or a task nested in a stack, by name.
    pub fn task_mut(&mut self, name: &str) -> Option<&mut dyn Task> {
        self.hierarchy.iter_mut().find_map(|t| t.find_mut(name))
    }

    /// Validate the hierarchy against the provider and size the per-level
    /// work arrays.
    pub fn prepare(&mut self) -> Result<(), IkError> {
        self.prepared = false;
        if self.hierarchy.is_empty() {
            return Err(IkError::EmptyHierarchy);
        }
        for task in &self.hierarchy {
            task.validate(&self.kinematics)?;
        }
        let nv = self.kinematics.velocity_dim();
        self.levels = self
            .hierarchy
            .iter()
            .map(|t| PriorityLevel::new(t.dim(), nv))
            .collect();
        self.prepared = true;
        debug!(levels = self.levels.len(), nv, "ik hierarchy prepared");
        Ok(())
    }

    /// Per-level work arrays from the last iteration.
    pub fn levels(&self) -> &[PriorityLevel] {
        &self.levels
    }

    /// Nullspace projector after `level`, from the last iteration.
    pub fn projector(&self, level: usize) -> Option<&DMatrix<f64>> {
        self.levels.get(level).map(|l| &l.projector)
    }

    /// Run the solve from the seed set by [`set_initial_config`](Self::set_initial_config).
    ///
    /// With `inertia_weighted`, pseudo-inverses use the provider's mass matrix
    /// as metric; a provider without one falls back to the identity.
    pub fn solve(&mut self, inertia_weighted: bool) -> Result<IkResult, IkError> {
        self.config.validate()?;
        if !self.prepared {
            return Err(IkError::NotPrepared);
        }
        let mut q = self.q_start.clone().ok_or(IkError::MissingInitialConfig)?;
        let expected = self.kinematics.position_dim();
        if q.len() != expected {
            return Err(IkError::InitialConfigMismatch {
                expected,
                got: q.len(),
            });
        }

        self.kinematics.validate_configuration(&q)?;
        let mut cost = self.evaluate(&q)?;
        let mut cost_history = vec![cost];
        let mut iterations = 0;
        let mut metric_warned = false;

        let status = loop {
            let error_norm = self.error_norm();
            if error_norm <= self.config.error_tol {
                break SolveStatus::Optimal;
            }

            self.update_jacobians()?;
            let metric = if inertia_weighted {
                self.inertia_metric(&mut metric_warned)
            } else {
                None
            };
            let dq = self.cascade(metric);
            if dq.norm() <= self.config.grad_tol {
                break SolveStatus::Suboptimal;
            }
            if iterations >= self.config.max_iters {
                break SolveStatus::MaxItersExceeded;
            }
            iterations += 1;

            match self.line_search(&q, &dq, cost)? {
                LineSearch::Accepted {
                    q: next,
                    cost: next_cost,
                    step,
                } => {
                    debug!(
                        iteration = iterations,
                        error_norm,
                        cost = next_cost,
                        step,
                        "ik iteration"
                    );
                    q = next;
                    cost = next_cost;
                    cost_history.push(cost);
                }
                LineSearch::Collapsed => {
                    // Leave the provider and task errors at the last accepted iterate
                    self.evaluate(&q)?;
                    break SolveStatus::MinStepHit;
                }
            }
        };

        let error_norm = self.error_norm();
        info!(%status, iterations, error_norm, "ik solve finished");

        Ok(IkResult {
            status,
            converged: status.is_success(),
            error_norm,
            task_error_norms: self.levels.iter().map(|l| l.error.norm()).collect(),
            task_names: self.hierarchy.iter().map(|t| t.name().to_owned()).collect(),
            q,
            iterations,
            cost_history,
        })
    }

    /// Push `q` into the provider, recompute every task error and return the
    /// weighted cost `Σ w_i ||dx_i||²`.
    fn evaluate(&mut self, q: &DVector<f64>) -> Result<f64, IkError> {
        self.kinematics.update_kinematics(q)?;
        let mut cost = 0.0;
        let levels = self.hierarchy.iter_mut().zip(&mut self.levels);
        for (i, (task, level)) in levels.enumerate() {
            task.compute_error(&self.kinematics)?;
            level.error = task.error().clone();
            cost += self.config.level_weight(i) * level.error.norm_squared();
        }
        Ok(cost)
    }

    fn update_jacobians(&mut self) -> Result<(), IkError> {
        for (task, level) in self.hierarchy.iter().zip(&mut self.levels) {
            level.jacobian = task.jacobian(&self.kinematics)?;
        }
        Ok(())
    }

    fn level_errors_sq(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.error.norm_squared()).collect()
    }

    fn error_norm(&self) -> f64 {
        self.levels
            .iter()
            .map(|l| l.error.norm_squared())
            .sum::<f64>()
            .sqrt()
    }

    fn inertia_metric(&self, warned: &mut bool) -> Option<DMatrix<f64>> {
        let metric = self
            .kinematics
            .mass_matrix()
            .as_ref()
            .and_then(inverse_cholesky_factor);
        if metric.is_none() && !*warned {
            warn!("mass matrix unavailable or not positive definite, using identity metric");
            *warned = true;
        }
        metric
    }

    fn cascade(&mut self, metric: Option<DMatrix<f64>>) -> DVector<f64> {
        let nv = self.kinematics.velocity_dim();
        let mut cascade = NullspaceCascade::new(nv, self.config.singular_value_threshold);
        if let Some(metric) = metric {
            cascade = cascade.with_metric(metric);
        }
        for level in &mut self.levels {
            cascade.push(level);
        }
        cascade.into_step()
    }

    fn line_search(
        &mut self,
        q: &DVector<f64>,
        dq: &DVector<f64>,
        cost: f64,
    ) -> Result<LineSearch, IkError> {
        let dq_norm_sq = dq.norm_squared();
        let current = self.level_errors_sq();
        // Levels at or below this are satisfied and may drift within it
        let floor = self.config.error_tol.powi(2) / current.len().max(1) as f64;
        let mut step = 1.0;
        for trial in 0..self.config.max_line_search_iters {
            let candidate = self.kinematics.integrate(q, &(dq * step));
            let candidate_cost = self.evaluate(&candidate)?;
            let accepted = match self.config.line_search {
                LineSearchRule::Priority => {
                    lexicographic_decrease(&current, &self.level_errors_sq(), floor)
                        .unwrap_or(candidate_cost < cost)
                }
                LineSearchRule::Descent => candidate_cost < cost,
                LineSearchRule::Armijo => {
                    candidate_cost <= cost - self.config.alpha * step * dq_norm_sq
                }
            };
            trace!(trial, step, cost = candidate_cost, accepted, "line search");
            if accepted {
                return Ok(LineSearch::Accepted {
                    q: candidate,
                    cost: candidate_cost,
                    step,
                });
            }
            step *= self.config.beta;
            if step < self.config.k_min_step {
                debug!(trial, step, "line search step below k_min_step");
                return Ok(LineSearch::Collapsed);
            }
        }
        debug!(
            trials = self.config.max_line_search_iters,
            step, "line search trials exhausted"
        );
        Ok(LineSearch::Collapsed)
    }
}

/// Compare per-level squared errors in priority order.
///
/// The first level that is above `floor` and changes decides: it accepts on
/// a decrease and rejects on an increase. A level may never rise above
/// `max(old, floor)`. Returns `None` when no level decides.
fn lexicographic_decrease(old: &[f64], new: &[f64], floor: f64) -> Option<bool> {
    for (&o, &n) in old.iter().zip(new) {
        if !n.is_finite() || n > o.max(floor) {
            return Some(false);
        }
        if o > floor && n < o {
            return Some(true);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
