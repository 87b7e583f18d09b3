//! Kinematic objectives ("tasks") and their composite.
//!
//! A task turns the provider's current state into a Jacobian and an error
//! `gain * (reference ⊖ current)`. Tasks own no robot state: every query
//! receives the provider by shared reference.

mod avoidance;
mod com;
mod contact;
mod joint;
mod midfeet;
mod pose;
mod stack;

pub use avoidance::{PointAvoidance, SelfCollision};
pub use com::CenterOfMass;
pub use contact::ContactNormal;
pub use joint::JointSubset;
pub use midfeet::MidfeetPose6D;
pub use pose::{Orientation3D, Pose6D};
pub use stack::TaskStack;

use nalgebra::{DMatrix, DVector, Isometry3, UnitQuaternion, Vector3};

use crate::error::{IkError, KinematicsError, TaskError};
use crate::kinematics::RobotKinematics;

// ---------------------------------------------------------------------------
// TaskReference
// ---------------------------------------------------------------------------

/// Desired value of a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskReference {
    /// Translational, joint-space or task-specific vector target.
    Vector(DVector<f64>),
    /// Orientation target.
    Rotation(UnitQuaternion<f64>),
    /// Position and orientation target.
    Pose(Vector3<f64>, UnitQuaternion<f64>),
}

impl TaskReference {
    /// Short name of the variant, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Vector(_) => "vector",
            Self::Rotation(_) => "rotation",
            Self::Pose(..) => "pose",
        }
    }
}

impl From<Isometry3<f64>> for TaskReference {
    fn from(pose: Isometry3<f64>) -> Self {
        Self::Pose(pose.translation.vector, pose.rotation)
    }
}

impl From<Vector3<f64>> for TaskReference {
    fn from(v: Vector3<f64>) -> Self {
        Self::Vector(DVector::from_column_slice(v.as_slice()))
    }
}

impl From<UnitQuaternion<f64>> for TaskReference {
    fn from(r: UnitQuaternion<f64>) -> Self {
        Self::Rotation(r)
    }
}

// ---------------------------------------------------------------------------
// Task trait
// ---------------------------------------------------------------------------

/// Upcast helper so default methods can hand out `&mut dyn Task`.
pub trait AsDynTask {
    fn as_dyn_task_mut(&mut self) -> &mut dyn Task;
}

impl<T: Task> AsDynTask for T {
    fn as_dyn_task_mut(&mut self) -> &mut dyn Task {
        self
    }
}

/// One kinematic objective.
pub trait Task: AsDynTask + Send {
    /// Name used for lookup and diagnostics.
    fn name(&self) -> &str;

    /// Number of error rows.
    fn dim(&self) -> usize;

    /// Proportional gain applied to the error.
    fn gain(&self) -> f64;

    /// Set the proportional gain. The Jacobian is unaffected.
    fn set_gain(&mut self, gain: f64);

    /// `dim × velocity_dim` Jacobian at the provider's current configuration.
    fn jacobian(&self, kinematics: &dyn RobotKinematics) -> Result<DMatrix<f64>, KinematicsError>;

    /// Store a new target. The variant must match the task.
    fn set_reference(&mut self, reference: TaskReference) -> Result<(), TaskError>;

    /// Current target, if the task takes one.
    fn reference(&self) -> Option<TaskReference>;

    /// Recompute the error at the provider's current configuration.
    fn compute_error(&mut self, kinematics: &dyn RobotKinematics) -> Result<(), KinematicsError>;

    /// Last computed (or injected) error.
    fn error(&self) -> &DVector<f64>;

    /// Overwrite the stored error.
    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError>;

    /// Check frame and joint names against the provider.
    fn validate(&self, kinematics: &dyn RobotKinematics) -> Result<(), IkError>;

    /// Error vector, recomputed first when `recompute` is set.
    fn error_vector(
        &mut self,
        kinematics: &dyn RobotKinematics,
        recompute: bool,
    ) -> Result<DVector<f64>, KinematicsError> {
        if recompute {
            self.compute_error(kinematics)?;
        }
        Ok(self.error().clone())
    }

    /// This task or a nested one named `name`.
    fn find_mut(&mut self, name: &str) -> Option<&mut dyn Task> {
        if self.name() == name {
            Some(self.as_dyn_task_mut())
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Shared task state
// ---------------------------------------------------------------------------

/// Name, gain and error storage common to every leaf task.
#[derive(Debug, Clone)]
struct TaskCore {
    name: String,
    gain: f64,
    error: DVector<f64>,
}

impl TaskCore {
    fn new(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            gain: 1.0,
            error: DVector::zeros(dim),
        }
    }

    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError> {
        if error.len() != self.error.len() {
            return Err(TaskError::ErrorDimension {
                task: self.name.clone(),
                expected: self.error.len(),
                got: error.len(),
            });
        }
        self.error = error;
        Ok(())
    }

    fn mismatch(&self, expected: &'static str, got: &TaskReference) -> TaskError {
        TaskError::ReferenceMismatch {
            task: self.name.clone(),
            expected,
            got: got.kind(),
        }
    }

    fn check_len(&self, expected: usize, got: usize) -> Result<(), TaskError> {
        if expected == got {
            Ok(())
        } else {
            Err(TaskError::ReferenceDimension {
                task: self.name.clone(),
                expected,
                got,
            })
        }
    }
}

/// Fail with `UnknownFrame` unless the provider has `frame`.
fn require_frame(kinematics: &dyn RobotKinematics, frame: &str) -> Result<(), IkError> {
    if kinematics.has_frame(frame) {
        Ok(())
    } else {
        Err(KinematicsError::UnknownFrame(frame.into()).into())
    }
}

/// Smooth one-sided penalty `½ (margin - d)²` for `d < margin`, else 0.
fn margin_potential(distance: f64, margin: f64) -> f64 {
    let violation = (margin - distance).max(0.0);
    0.5 * violation * violation
}

/// Derivative of [`margin_potential`] with respect to the distance.
fn margin_potential_slope(distance: f64, margin: f64) -> f64 {
    -(margin - distance).max(0.0)
}
