//! Center-of-mass position task.

use nalgebra::{DMatrix, DVector, Vector3};

use super::{Task, TaskCore, TaskReference};
use crate::error::{IkError, KinematicsError, TaskError};
use crate::kinematics::RobotKinematics;

/// Drive the whole-body center of mass to a world position.
#[derive(Debug, Clone)]
pub struct CenterOfMass {
    core: TaskCore,
    position: Vector3<f64>,
}

impl CenterOfMass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: TaskCore::new(name, 3),
            position: Vector3::zeros(),
        }
    }
}

impl Task for CenterOfMass {
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
        Ok(kinematics.com_jacobian())
    }

    fn set_reference(&mut self, reference: TaskReference) -> Result<(), TaskError> {
        match reference {
            TaskReference::Vector(v) => {
                self.core.check_len(3, v.len())?;
                self.position = Vector3::new(v[0], v[1], v[2]);
                Ok(())
            }
            other => Err(self.core.mismatch("vector", &other)),
        }
    }

    fn reference(&self) -> Option<TaskReference> {
        Some(self.position.into())
    }

    fn compute_error(&mut self, kinematics: &dyn RobotKinematics) -> Result<(), KinematicsError> {
        let error = (self.position - kinematics.com_position()) * self.core.gain;
        self.core.error = DVector::from_column_slice(error.as_slice());
        Ok(())
    }

    fn error(&self) -> &DVector<f64> {
        &self.core.error
    }

    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError> {
        self.core.set_error(error)
    }

    fn validate(&self, _kinematics: &dyn RobotKinematics) -> Result<(), IkError> {
        Ok(())
    }
}
