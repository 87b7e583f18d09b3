//! The robot kinematics provider consumed by tasks and the solver.
//!
//! A provider caches frame placements and Jacobians for one configuration.
//! The solver is the only caller of [`RobotKinematics::update_kinematics`];
//! tasks receive a shared reference and read whatever the solver pushed last.

use nalgebra::{DMatrix, DVector, Isometry3, Vector3};

use crate::error::KinematicsError;

/// Where a joint's coordinate lives in the configuration and velocity vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointIndex {
    /// Index into the configuration vector `q` (size `position_dim`).
    pub position: usize,
    /// Index into the velocity vector `v` (size `velocity_dim`).
    pub velocity: usize,
}

/// Forward kinematics, Jacobians and configuration-space integration.
///
/// Jacobians are `6 × velocity_dim` (frames) or `3 × velocity_dim` (CoM) and
/// map a velocity vector to world-aligned `[linear; angular]` velocities.
pub trait RobotKinematics {
    /// Size of the configuration vector.
    fn position_dim(&self) -> usize;

    /// Size of the velocity (tangent) vector.
    fn velocity_dim(&self) -> usize;

    /// Check that `q` is a configuration this provider can evaluate.
    ///
    /// The default only checks the length. Providers with extra structure,
    /// such as a floating-base quaternion, should also check that.
    fn validate_configuration(&self, q: &DVector<f64>) -> Result<(), KinematicsError> {
        if q.len() != self.position_dim() {
            return Err(KinematicsError::DimensionMismatch {
                expected: self.position_dim(),
                got: q.len(),
            });
        }
        Ok(())
    }

    /// Recompute placements and Jacobians for `q`.
    fn update_kinematics(&mut self, q: &DVector<f64>) -> Result<(), KinematicsError>;

    /// The configuration of the last successful update.
    fn configuration(&self) -> &DVector<f64>;

    /// World pose of a named frame.
    fn frame_pose(&self, frame: &str) -> Result<Isometry3<f64>, KinematicsError>;

    /// World-aligned `6 × velocity_dim` Jacobian of a named frame's origin.
    fn frame_jacobian(&self, frame: &str) -> Result<DMatrix<f64>, KinematicsError>;

    /// World position of the center of mass.
    fn com_position(&self) -> Vector3<f64>;

    /// `3 × velocity_dim` Jacobian of the center of mass.
    fn com_jacobian(&self) -> DMatrix<f64>;

    /// Integrate `q` by the tangent-space increment `v` on the configuration manifold.
    fn integrate(&self, q: &DVector<f64>, v: &DVector<f64>) -> DVector<f64>;

    /// Configuration and velocity indices of a named joint.
    fn joint_index(&self, joint: &str) -> Result<JointIndex, KinematicsError>;

    /// Joint-space inertia matrix at the current configuration, if available.
    fn mass_matrix(&self) -> Option<DMatrix<f64>> {
        None
    }

    /// Whether `frame` names a frame of this robot.
    fn has_frame(&self, frame: &str) -> bool {
        self.frame_pose(frame).is_ok()
    }
}
