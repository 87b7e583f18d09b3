//! Joint-space posture task over a subset of joints.

use nalgebra::{DMatrix, DVector};

use super::{Task, TaskCore, TaskReference};
use crate::error::{IkError, KinematicsError, TaskError};
use crate::kinematics::RobotKinematics;

/// Drive selected joints to reference positions.
///
/// The Jacobian is a selection matrix with a single 1 per row at the
/// joint's velocity column. References are given in the order of
/// [`JointSubset::joints`].
#[derive(Debug, Clone)]
pub struct JointSubset {
    core: TaskCore,
    joints: Vec<String>,
    positions: DVector<f64>,
}

impl JointSubset {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        joints: impl IntoIterator<Item = S>,
    ) -> Self {
        let joints: Vec<String> = joints.into_iter().map(Into::into).collect();
        let dim = joints.len();
        Self {
            core: TaskCore::new(name, dim),
            joints,
            positions: DVector::zeros(dim),
        }
    }

    /// Controlled joint names, in row order.
    pub fn joints(&self) -> &[String] {
        &self.joints
    }
}

impl Task for JointSubset {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn dim(&self) -> usize {
        self.joints.len()
    }

    fn gain(&self) -> f64 {
        self.core.gain
    }

    fn set_gain(&mut self, gain: f64) {
        self.core.gain = gain;
    }

    fn jacobian(&self, kinematics: &dyn RobotKinematics) -> Result<DMatrix<f64>, KinematicsError> {
        let mut jac = DMatrix::zeros(self.joints.len(), kinematics.velocity_dim());
        for (row, joint) in self.joints.iter().enumerate() {
            jac[(row, kinematics.joint_index(joint)?.velocity)] = 1.0;
        }
        Ok(jac)
    }

    fn set_reference(&mut self, reference: TaskReference) -> Result<(), TaskError> {
        match reference {
            TaskReference::Vector(v) => {
                self.core.check_len(self.joints.len(), v.len())?;
                self.positions = v;
                Ok(())
            }
            other => Err(self.core.mismatch("vector", &other)),
        }
    }

    fn reference(&self) -> Option<TaskReference> {
        Some(TaskReference::Vector(self.positions.clone()))
    }

    fn compute_error(&mut self, kinematics: &dyn RobotKinematics) -> Result<(), KinematicsError> {
        let q = kinematics.configuration();
        let mut error = DVector::zeros(self.joints.len());
        for (row, joint) in self.joints.iter().enumerate() {
            let index = kinematics.joint_index(joint)?.position;
            error[row] = self.core.gain * (self.positions[row] - q[index]);
        }
        self.core.error = error;
        Ok(())
    }

    fn error(&self) -> &DVector<f64> {
        &self.core.error
    }

    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError> {
        self.core.set_error(error)
    }

    fn validate(&self, kinematics: &dyn RobotKinematics) -> Result<(), IkError> {
        if self.joints.is_empty() {
            return Err(TaskError::Empty(self.core.name.clone()).into());
        }
        for joint in &self.joints {
            kinematics.joint_index(joint)?;
        }
        Ok(())
    }
}
