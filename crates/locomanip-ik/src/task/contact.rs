//! Planar contact task: keep a frame on a plane with a given orientation.

use nalgebra::{DMatrix, DVector, UnitQuaternion, UnitVector3, Vector3};

use super::{require_frame, Task, TaskCore, TaskReference};
use crate::error::{IkError, KinematicsError, TaskError};
use crate::kinematics::RobotKinematics;
use crate::manifold::rotation_error;

/// Hold a frame within `±margin` of a plane and at a reference orientation.
///
/// Row 0 acts on the signed plane distance `d = n·(p - c)`. With the band
/// violation `o = d - clamp(d, -margin, margin)` its value is `½ o |o|`, so
/// both the error and the Jacobian row vanish while `|d| <= margin` and
/// grow smoothly beyond it. Rows 1..4 are the orientation error. Tangential
/// position along the plane is left free.
#[derive(Debug, Clone)]
pub struct ContactNormal {
    core: TaskCore,
    frame: String,
    normal: UnitVector3<f64>,
    plane_point: Vector3<f64>,
    margin: f64,
    rotation: UnitQuaternion<f64>,
}

impl ContactNormal {
    pub fn new(
        name: impl Into<String>,
        frame: impl Into<String>,
        normal: UnitVector3<f64>,
        plane_point: Vector3<f64>,
    ) -> Self {
        Self {
            core: TaskCore::new(name, 4),
            frame: frame.into(),
            normal,
            plane_point,
            margin: 0.0,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Half-width of the band around the plane where the distance row is zero.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin.abs();
        self
    }

    pub fn frame(&self) -> &str {
        &self.frame
    }

    /// Signed distance of the frame origin above the plane.
    pub fn plane_distance(&self, kinematics: &dyn RobotKinematics) -> Result<f64, KinematicsError> {
        let position = kinematics.frame_pose(&self.frame)?.translation.vector;
        Ok(self.normal.dot(&(position - self.plane_point)))
    }

    fn band_violation(&self, distance: f64) -> f64 {
        distance - distance.clamp(-self.margin, self.margin)
    }
}

impl Task for ContactNormal {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn dim(&self) -> usize {
        4
    }

    fn gain(&self) -> f64 {
        self.core.gain
    }

    fn set_gain(&mut self, gain: f64) {
        self.core.gain = gain;
    }

    fn jacobian(&self, kinematics: &dyn RobotKinematics) -> Result<DMatrix<f64>, KinematicsError> {
        let full = kinematics.frame_jacobian(&self.frame)?;
        let mut jac = DMatrix::zeros(4, full.ncols());
        // d/dd of ½ o|o| is |o|, zero inside the band
        let slope = self.band_violation(self.plane_distance(kinematics)?).abs();
        if slope > 0.0 {
            let distance_row = self.normal.transpose() * full.rows(0, 3) * slope;
            jac.row_mut(0).copy_from(&distance_row);
        }
        jac.rows_mut(1, 3).copy_from(&full.rows(3, 3));
        Ok(jac)
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
        let outside = self.band_violation(self.plane_distance(kinematics)?);
        let rotation = kinematics.frame_pose(&self.frame)?.rotation;
        let angular = rotation_error(&self.rotation, &rotation);

        let gain = self.core.gain;
        self.core.error = DVector::from_vec(vec![
            -gain * 0.5 * outside * outside.abs(),
            gain * angular.x,
            gain * angular.y,
            gain * angular.z,
        ]);
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
