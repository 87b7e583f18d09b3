//! Pose task expressed in the midfeet frame of a biped.

use nalgebra::{DMatrix, DVector, Isometry3, Translation3, UnitQuaternion, Vector3};

use super::{require_frame, Task, TaskCore, TaskReference};
use crate::error::{IkError, KinematicsError, TaskError};
use crate::kinematics::RobotKinematics;
use crate::manifold::{
    rotation_error, rotation_midpoint, so3_left_jacobian, so3_right_jacobian_inverse,
};

/// Drive a frame to a pose given relative to the midfeet frame.
///
/// The midfeet frame sits halfway between the two sole frames and is rotated
/// to the geodesic midpoint of their orientations. The world target
/// `M · T_ref` moves with the feet, so the Jacobian is the frame Jacobian
/// minus the target's.
#[derive(Debug, Clone)]
pub struct MidfeetPose6D {
    core: TaskCore,
    frame: String,
    left: String,
    right: String,
    position: Vector3<f64>,
    rotation: UnitQuaternion<f64>,
}

impl MidfeetPose6D {
    pub fn new(
        name: impl Into<String>,
        frame: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        Self {
            core: TaskCore::new(name, 6),
            frame: frame.into(),
            left: left.into(),
            right: right.into(),
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Frame this task drives.
    pub fn frame(&self) -> &str {
        &self.frame
    }

    /// Left and right sole frames.
    pub fn feet(&self) -> (&str, &str) {
        (&self.left, &self.right)
    }

    /// World pose of the midfeet frame.
    pub fn midfeet_pose(
        &self,
        kinematics: &dyn RobotKinematics,
    ) -> Result<Isometry3<f64>, KinematicsError> {
        let left = kinematics.frame_pose(&self.left)?;
        let right = kinematics.frame_pose(&self.right)?;
        Ok(Isometry3::from_parts(
            Translation3::from((left.translation.vector + right.translation.vector) * 0.5),
            rotation_midpoint(&left.rotation, &right.rotation),
        ))
    }

    /// World pose the frame is driven to.
    pub fn target_pose(
        &self,
        kinematics: &dyn RobotKinematics,
    ) -> Result<Isometry3<f64>, KinematicsError> {
        let reference = Isometry3::from_parts(Translation3::from(self.position), self.rotation);
        Ok(self.midfeet_pose(kinematics)? * reference)
    }

    /// `6 × nv` Jacobian of the world target pose.
    fn target_jacobian(
        &self,
        kinematics: &dyn RobotKinematics,
    ) -> Result<DMatrix<f64>, KinematicsError> {
        let left = kinematics.frame_pose(&self.left)?;
        let right = kinematics.frame_pose(&self.right)?;
        let j_left = kinematics.frame_jacobian(&self.left)?;
        let j_right = kinematics.frame_jacobian(&self.right)?;

        // ω_mid = ω_l + ½ R_l J_l(φ/2) J_r⁻¹(φ) R_rᵀ (ω_r - ω_l), φ = Log(R_lᵀ R_r)
        let relative = (left.rotation.inverse() * right.rotation).scaled_axis();
        let blend = left.rotation.to_rotation_matrix().into_inner()
            * so3_left_jacobian(&(relative * 0.5))
            * so3_right_jacobian_inverse(&relative)
            * right.rotation.to_rotation_matrix().into_inner().transpose()
            * 0.5;
        let blend = DMatrix::from_column_slice(3, 3, blend.as_slice());
        let w_left = j_left.rows(3, 3).into_owned();
        let w_right = j_right.rows(3, 3).into_owned();
        let omega = &w_left + blend * (w_right - &w_left);

        // Target point: midpoint velocity plus ω_mid × (R_mid p_ref)
        let lever = rotation_midpoint(&left.rotation, &right.rotation) * self.position;
        let lever = DMatrix::from_column_slice(3, 3, lever.cross_matrix().as_slice());
        let linear = (j_left.rows(0, 3) + j_right.rows(0, 3)) * 0.5 - lever * &omega;

        let mut jac = DMatrix::zeros(6, j_left.ncols());
        jac.rows_mut(0, 3).copy_from(&linear);
        jac.rows_mut(3, 3).copy_from(&omega);
        Ok(jac)
    }
}

impl Task for MidfeetPose6D {
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
        Ok(kinematics.frame_jacobian(&self.frame)? - self.target_jacobian(kinematics)?)
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
        let target = self.target_pose(kinematics)?;
        let pose = kinematics.frame_pose(&self.frame)?;
        let linear = target.translation.vector - pose.translation.vector;
        let angular = rotation_error(&target.rotation, &pose.rotation);
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
        require_frame(kinematics, &self.frame)?;
        require_frame(kinematics, &self.left)?;
        require_frame(kinematics, &self.right)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use locomanip_test_utils::fixtures::FLOATING_BIPED;
    use locomanip_test_utils::{random_configuration, seeded_rng};

    use crate::manifold::write_base_pose;
    use crate::model::{BaseType, KinematicModel};

    fn biped() -> KinematicModel {
        KinematicModel::from_urdf_str(FLOATING_BIPED, BaseType::Floating).unwrap()
    }

    fn pelvis_task() -> MidfeetPose6D {
        let mut task = MidfeetPose6D::new("pelvis", "pelvis", "left_sole", "right_sole");
        task.set_reference(TaskReference::Pose(
            Vector3::new(0.02, -0.01, 0.7),
            UnitQuaternion::from_euler_angles(0.1, 0.0, 0.2),
        ))
        .unwrap();
        task
    }

    #[test]
    fn midfeet_frame_is_between_soles() {
        let model = biped();
        let task = pelvis_task();
        let mid = task.midfeet_pose(&model).unwrap();
        let left = model.frame_pose("left_sole").unwrap();
        let right = model.frame_pose("right_sole").unwrap();
        assert_relative_eq!(
            (mid.translation.vector - left.translation.vector).norm(),
            (mid.translation.vector - right.translation.vector).norm(),
            epsilon = 1e-12
        );
        assert_relative_eq!(mid.rotation.angle_to(&left.rotation), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn error_vanishes_at_relative_reference() {
        let mut model = biped();
        let mut rng = seeded_rng(5);
        let q = random_configuration(&model.position_limits(), true, &mut rng);
        model.update_kinematics(&q).unwrap();

        let mut task = MidfeetPose6D::new("pelvis", "pelvis", "left_sole", "right_sole");
        let relative = task.midfeet_pose(&model).unwrap().inverse()
            * model.frame_pose("pelvis").unwrap();
        task.set_reference(relative.into()).unwrap();
        let error = task.error_vector(&model, true).unwrap();
        assert_relative_eq!(error.norm(), 0.0, epsilon = 1e-12);
    }

    /// Floating-base configuration with the given base pose and joint angles.
    fn posed(
        model: &KinematicModel,
        base: Isometry3<f64>,
        joints: &[(&str, f64)],
    ) -> DVector<f64> {
        let mut q = model.neutral_configuration();
        write_base_pose(&mut q, &base);
        for &(joint, angle) in joints {
            q[model.joint_index(joint).unwrap().position] = angle;
        }
        q
    }

    #[test]
    fn jacobian_matches_finite_difference() {
        let mut model = biped();
        let task = pelvis_task();
        let nv = model.velocity_dim();
        let h = 1e-6;

        // Soles parallel, then apart in yaw, pitch and roll
        let base = Isometry3::new(Vector3::new(0.1, -0.2, 0.9), Vector3::new(0.2, -0.1, 0.6));
        let configurations = [
            posed(&model, base, &[("left_knee", 0.6), ("right_knee", 0.6)]),
            posed(
                &model,
                base,
                &[
                    ("left_hip_yaw", 0.4),
                    ("left_knee", 0.9),
                    ("right_hip_pitch", -0.5),
                    ("right_ankle_roll", -0.3),
                ],
            ),
            posed(
                &model,
                Isometry3::identity(),
                &[("left_hip_roll", 0.6), ("right_hip_yaw", -0.7), ("right_knee", 1.4)],
            ),
        ];

        for q in configurations {
            model.update_kinematics(&q).unwrap();
            let analytic = task.jacobian(&model).unwrap();
            let frame = model.frame_jacobian("pelvis").unwrap();

            let mut numeric = DMatrix::zeros(6, nv);
            for i in 0..nv {
                let mut dv = DVector::zeros(nv);
                dv[i] = h;
                let q_plus = model.integrate(&q, &dv);
                let q_minus = model.integrate(&q, &(-&dv));
                model.update_kinematics(&q_plus).unwrap();
                let plus = task.target_pose(&model).unwrap();
                model.update_kinematics(&q_minus).unwrap();
                let minus = task.target_pose(&model).unwrap();

                let linear = (plus.translation.vector - minus.translation.vector) / (2.0 * h);
                let angular = rotation_error(&plus.rotation, &minus.rotation) / (2.0 * h);
                numeric.fixed_view_mut::<3, 1>(0, i).copy_from(&linear);
                numeric.fixed_view_mut::<3, 1>(3, i).copy_from(&angular);
            }
            assert_relative_eq!(analytic, frame - numeric, epsilon = 1e-5);
        }
    }

    #[test]
    fn rejects_rotation_reference() {
        let mut task = pelvis_task();
        let err = task
            .set_reference(TaskReference::Rotation(UnitQuaternion::identity()))
            .unwrap_err();
        assert!(matches!(err, TaskError::ReferenceMismatch { expected: "pose", .. }));
    }

    #[test]
    fn unknown_sole_fails_validation() {
        let model = biped();
        let task = MidfeetPose6D::new("pelvis", "pelvis", "left_sole", "right_heel");
        assert!(matches!(
            task.validate(&model),
            Err(IkError::Kinematics(KinematicsError::UnknownFrame(_)))
        ));
    }
}
