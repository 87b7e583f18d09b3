//! One-sided distance tasks: keep frames away from obstacle points or from
//! each other.
//!
//! Both tasks are one row. Every (frame, obstacle) or (frame, frame) pair
//! closer than `margin` contributes `½ (margin - d)²` to a potential `V`; the
//! error is `-gain · V` and the Jacobian is `∂V/∂q`. Outside the margin the
//! pair contributes nothing, so the task is silent until a margin is violated.

use nalgebra::{DMatrix, DVector, Vector3};

use super::{
    margin_potential, margin_potential_slope, require_frame, Task, TaskCore, TaskReference,
};
use crate::error::{IkError, KinematicsError, TaskError};
use crate::kinematics::RobotKinematics;

/// Distances below this have no usable direction and are skipped in the Jacobian.
const MIN_DISTANCE: f64 = 1e-9;

/// Accumulate `slope · uᵀ · J` into `row`, where `u` is the unit vector of `delta`.
fn add_distance_gradient(
    row: &mut DMatrix<f64>,
    delta: &Vector3<f64>,
    slope: f64,
    jac_linear: &DMatrix<f64>,
) {
    let distance = delta.norm();
    if slope == 0.0 || distance < MIN_DISTANCE {
        return;
    }
    let direction = delta / distance;
    for col in 0..jac_linear.ncols() {
        let projected = direction.x * jac_linear[(0, col)]
            + direction.y * jac_linear[(1, col)]
            + direction.z * jac_linear[(2, col)];
        row[(0, col)] += slope * projected;
    }
}

// ---------------------------------------------------------------------------
// PointAvoidance
// ---------------------------------------------------------------------------

/// Keep robot frames at least `margin` away from a set of world points.
///
/// The reference is the obstacle list, flattened as `[x0, y0, z0, x1, ...]`.
#[derive(Debug, Clone)]
pub struct PointAvoidance {
    core: TaskCore,
    frames: Vec<String>,
    obstacles: Vec<Vector3<f64>>,
    margin: f64,
}

impl PointAvoidance {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        frames: impl IntoIterator<Item = S>,
        margin: f64,
    ) -> Self {
        Self {
            core: TaskCore::new(name, 1),
            frames: frames.into_iter().map(Into::into).collect(),
            obstacles: Vec::new(),
            margin,
        }
    }

    /// Replace the obstacle points.
    pub fn set_obstacles(&mut self, obstacles: Vec<Vector3<f64>>) {
        self.obstacles = obstacles;
    }

    pub fn obstacles(&self) -> &[Vector3<f64>] {
        &self.obstacles
    }

    pub const fn margin(&self) -> f64 {
        self.margin
    }

    /// Potential `V` at the provider's current configuration.
    pub fn potential(&self, kinematics: &dyn RobotKinematics) -> Result<f64, KinematicsError> {
        let mut total = 0.0;
        for frame in &self.frames {
            let position = kinematics.frame_pose(frame)?.translation.vector;
            total += self
                .obstacles
                .iter()
                .map(|o| margin_potential((position - o).norm(), self.margin))
                .sum::<f64>();
        }
        Ok(total)
    }
}

impl Task for PointAvoidance {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn dim(&self) -> usize {
        1
    }

    fn gain(&self) -> f64 {
        self.core.gain
    }

    fn set_gain(&mut self, gain: f64) {
        self.core.gain = gain;
    }

    fn jacobian(&self, kinematics: &dyn RobotKinematics) -> Result<DMatrix<f64>, KinematicsError> {
        let mut row = DMatrix::zeros(1, kinematics.velocity_dim());
        for frame in &self.frames {
            let position = kinematics.frame_pose(frame)?.translation.vector;
            let active: Vec<_> = self
                .obstacles
                .iter()
                .map(|o| position - o)
                .filter(|delta| delta.norm() < self.margin)
                .collect();
            if active.is_empty() {
                continue;
            }
            let jac_linear = kinematics.frame_jacobian(frame)?.rows(0, 3).into_owned();
            for delta in &active {
                let slope = margin_potential_slope(delta.norm(), self.margin);
                add_distance_gradient(&mut row, delta, slope, &jac_linear);
            }
        }
        Ok(row)
    }

    fn set_reference(&mut self, reference: TaskReference) -> Result<(), TaskError> {
        match reference {
            TaskReference::Vector(v) => {
                if v.len() % 3 != 0 {
                    return Err(TaskError::ReferenceDimension {
                        task: self.core.name.clone(),
                        expected: 3 * v.len().div_ceil(3),
                        got: v.len(),
                    });
                }
                self.obstacles = v
                    .as_slice()
                    .chunks_exact(3)
                    .map(Vector3::from_column_slice)
                    .collect();
                Ok(())
            }
            other => Err(self.core.mismatch("vector", &other)),
        }
    }

    fn reference(&self) -> Option<TaskReference> {
        let flat: Vec<f64> = self.obstacles.iter().flat_map(|o| [o.x, o.y, o.z]).collect();
        Some(TaskReference::Vector(DVector::from_vec(flat)))
    }

    fn compute_error(&mut self, kinematics: &dyn RobotKinematics) -> Result<(), KinematicsError> {
        let potential = self.potential(kinematics)?;
        self.core.error = DVector::from_element(1, -self.core.gain * potential);
        Ok(())
    }

    fn error(&self) -> &DVector<f64> {
        &self.core.error
    }

    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError> {
        self.core.set_error(error)
    }

    fn validate(&self, kinematics: &dyn RobotKinematics) -> Result<(), IkError> {
        if self.frames.is_empty() {
            return Err(TaskError::Empty(self.core.name.clone()).into());
        }
        self.frames
            .iter()
            .try_for_each(|frame| require_frame(kinematics, frame))
    }
}

// ---------------------------------------------------------------------------
// SelfCollision
// ---------------------------------------------------------------------------

/// Keep pairs of robot frames at least `margin` apart.
///
/// Takes no reference: the pairs and margin fully define the objective.
#[derive(Debug, Clone)]
pub struct SelfCollision {
    core: TaskCore,
    pairs: Vec<(String, String)>,
    margin: f64,
}

impl SelfCollision {
    pub fn new<A: Into<String>, B: Into<String>>(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (A, B)>,
        margin: f64,
    ) -> Self {
        Self {
            core: TaskCore::new(name, 1),
            pairs: pairs.into_iter().map(|(a, b)| (a.into(), b.into())).collect(),
            margin,
        }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub const fn margin(&self) -> f64 {
        self.margin
    }

    fn separation(
        kinematics: &dyn RobotKinematics,
        a: &str,
        b: &str,
    ) -> Result<Vector3<f64>, KinematicsError> {
        let a = kinematics.frame_pose(a)?.translation.vector;
        let b = kinematics.frame_pose(b)?.translation.vector;
        Ok(a - b)
    }

    /// Potential `V` at the provider's current configuration.
    pub fn potential(&self, kinematics: &dyn RobotKinematics) -> Result<f64, KinematicsError> {
        let mut total = 0.0;
        for (a, b) in &self.pairs {
            total += margin_potential(Self::separation(kinematics, a, b)?.norm(), self.margin);
        }
        Ok(total)
    }
}

impl Task for SelfCollision {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn dim(&self) -> usize {
        1
    }

    fn gain(&self) -> f64 {
        self.core.gain
    }

    fn set_gain(&mut self, gain: f64) {
        self.core.gain = gain;
    }

    fn jacobian(&self, kinematics: &dyn RobotKinematics) -> Result<DMatrix<f64>, KinematicsError> {
        let mut row = DMatrix::zeros(1, kinematics.velocity_dim());
        for (a, b) in &self.pairs {
            let delta = Self::separation(kinematics, a, b)?;
            let slope = margin_potential_slope(delta.norm(), self.margin);
            if slope == 0.0 {
                continue;
            }
            let relative = kinematics.frame_jacobian(a)?.rows(0, 3)
                - kinematics.frame_jacobian(b)?.rows(0, 3);
            add_distance_gradient(&mut row, &delta, slope, &relative);
        }
        Ok(row)
    }

    fn set_reference(&mut self, reference: TaskReference) -> Result<(), TaskError> {
        Err(self.core.mismatch("none", &reference))
    }

    fn reference(&self) -> Option<TaskReference> {
        None
    }

    fn compute_error(&mut self, kinematics: &dyn RobotKinematics) -> Result<(), KinematicsError> {
        let potential = self.potential(kinematics)?;
        self.core.error = DVector::from_element(1, -self.core.gain * potential);
        Ok(())
    }

    fn error(&self) -> &DVector<f64> {
        &self.core.error
    }

    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError> {
        self.core.set_error(error)
    }

    fn validate(&self, kinematics: &dyn RobotKinematics) -> Result<(), IkError> {
        if self.pairs.is_empty() {
            return Err(TaskError::Empty(self.core.name.clone()).into());
        }
        for (a, b) in &self.pairs {
            require_frame(kinematics, a)?;
            require_frame(kinematics, b)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
