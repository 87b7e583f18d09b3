//! Frame pose and orientation tasks.

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};

use super::{require_frame, Task, TaskCore, TaskReference};
use crate::error::{IkError, KinematicsError, TaskError};
use crate::kinematics::RobotKinematics;
use crate::manifold::rotation_error;

// ---------------------------------------------------------------------------
// Pose6D
// ---------------------------------------------------------------------------

/// Drive a frame to a world position and orientation.
///
/// Error rows are `[p_ref - p; log(R_ref R⁻¹)]`, scaled by the gain.
#[derive(Debug, Clone)]
pub struct Pose6D {
    core: TaskCore,
    frame: String,
    position: Vector3<f64>,
    rotation: UnitQuaternion<f64>,
}

impl Pose6D {
    pub fn new(name: impl Into<String>, frame: impl Into<String>) -> Self {
        Self {
            core: TaskCore::new(name, 6),
            frame: frame.into(),
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Frame this task drives.
    pub fn frame(&self) -> &str {
        &self.frame
    }
}

impl Task for Pose6D {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn dim(&self) -> usize {
        6
    }

    fn gain(&self) -> f64 {
        self.core.gain
    }

    fn set_gain(&mut self, gain: f64) {
        self.core.gain = gain;
    }

    fn jacobian(&self, kinematics: &dyn RobotKinematics) -> Result<DMatrix<f64>, KinematicsError> {
        kinematics.frame_jacobian(&self.frame)
    }

    fn set_reference(&mut self, reference: TaskReference) -> Result<(), TaskError> {
        match reference {
            TaskReference::Pose(position, rotation) => {
                self.position = position;
                self.rotation = rotation;
                Ok(())
            }
            other => Err(self.core.mismatch("pose", &other)),
        }
    }

    fn reference(&self) -> Option<TaskReference> {
        Some(TaskReference::Pose(self.position, self.rotation))
    }

    fn compute_error(&mut self, kinematics: &dyn RobotKinematics) -> Result<(), KinematicsError> {
        let pose = kinematics.frame_pose(&self.frame)?;
        let linear = self.position - pose.translation.vector;
        let angular = rotation_error(&self.rotation, &pose.rotation);
        let mut error = DVector::zeros(6);
        error.fixed_rows_mut::<3>(0).copy_from(&linear);
        error.fixed_rows_mut::<3>(3).copy_from(&angular);
        self.core.error = error * self.core.gain;
        Ok(())
    }

    fn error(&self) -> &DVector<f64> {
        &self.core.error
    }

    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError> {
        self.core.set_error(error)
    }

    fn validate(&self, kinematics: &dyn RobotKinematics) -> Result<(), IkError> {
        require_frame(kinematics, &self.frame)
    }
}

// ---------------------------------------------------------------------------
// Orientation3D
// ---------------------------------------------------------------------------

/// Drive a frame to a world orientation, position left free.
#[derive(Debug, Clone)]
pub struct Orientation3D {
    core: TaskCore,
    frame: String,
    rotation: UnitQuaternion<f64>,
}

impl Orientation3D {
    pub fn new(name: impl Into<String>, frame: impl Into<String>) -> Self {
        Self {
            core: TaskCore::new(name, 3),
            frame: frame.into(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Frame this task drives.
    pub fn frame(&self) -> &str {
        &self.frame
    }
}

impl Task for Orientation3D {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn dim(&self) -> usize {
        3
    }

    fn gain(&self) -> f64 {
        self.core.gain
    }

    fn set_gain(&mut self, gain: f64) {
        self.core.gain = gain;
    }

    fn jacobian(&self, kinematics: &dyn RobotKinematics) -> Result<DMatrix<f64>, KinematicsError> {
        Ok(kinematics.frame_jacobian(&self.frame)?.rows(3, 3).into_owned())
    }

    fn set_reference(&mut self, reference: TaskReference) -> Result<(), TaskError> {
        match reference {
            TaskReference::Rotation(rotation) => {
                self.rotation = rotation;
                Ok(())
            }
            other => Err(self.core.mismatch("rotation", &other)),
        }
    }

    fn reference(&self) -> Option<TaskReference> {
        Some(TaskReference::Rotation(self.rotation))
    }

    fn compute_error(&mut self, kinematics: &dyn RobotKinematics) -> Result<(), KinematicsError> {
        let pose = kinematics.frame_pose(&self.frame)?;
        let angular = rotation_error(&self.rotation, &pose.rotation) * self.core.gain;
        self.core.error = DVector::from_column_slice(angular.as_slice());
        Ok(())
    }

    fn error(&self) -> &DVector<f64> {
        &self.core.error
    }

    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError> {
        self.core.set_error(error)
    }

    fn validate(&self, kinematics: &dyn RobotKinematics) -> Result<(), IkError> {
        require_frame(kinematics, &self.frame)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
