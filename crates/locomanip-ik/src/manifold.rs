//! Rotation-manifold helpers shared by tasks and the kinematics model.
//!
//! Rotations live on SO(3); every update goes through the exponential map and
//! every difference through the log map, so the quaternion block of a
//! floating-base configuration is never touched by plain vector arithmetic.

use nalgebra::{DVector, Isometry3, Matrix3, Quaternion, Translation3, UnitQuaternion, Vector3};

/// Number of position coordinates of a quaternion floating base.
pub const FLOATING_BASE_NQ: usize = 7;
/// Number of velocity coordinates of a floating base.
pub const FLOATING_BASE_NV: usize = 6;

/// Axis-angle vector of `reference * current⁻¹`, expressed in the world frame.
///
/// The result takes the short way around: its norm is in `[0, π]`.
pub fn rotation_error(
    reference: &UnitQuaternion<f64>,
    current: &UnitQuaternion<f64>,
) -> Vector3<f64> {
    (reference * current.inverse()).scaled_axis()
}

/// Apply a world-frame rotation increment through the exponential map.
pub fn integrate_rotation(
    rotation: &UnitQuaternion<f64>,
    omega: &Vector3<f64>,
) -> UnitQuaternion<f64> {
    UnitQuaternion::from_scaled_axis(*omega) * rotation
}

/// Below this angle the SO(3) Jacobians use their series expansions.
const SMALL_ANGLE: f64 = 1e-6;

/// Left Jacobian of SO(3): `d/dt Exp(x) = [J_l(x) ẋ]× Exp(x)`.
pub fn so3_left_jacobian(x: &Vector3<f64>) -> Matrix3<f64> {
    let theta = x.norm();
    let skew = x.cross_matrix();
    if theta < SMALL_ANGLE {
        return Matrix3::identity() + skew * 0.5 + skew * skew / 6.0;
    }
    let theta2 = theta * theta;
    Matrix3::identity()
        + skew * ((1.0 - theta.cos()) / theta2)
        + skew * skew * ((theta - theta.sin()) / (theta2 * theta))
}

/// Inverse of the right Jacobian `J_r(x) = J_l(-x)`.
///
/// Singular at `|x| = π`.
pub fn so3_right_jacobian_inverse(x: &Vector3<f64>) -> Matrix3<f64> {
    let theta = x.norm();
    let skew = x.cross_matrix();
    if theta < SMALL_ANGLE {
        return Matrix3::identity() + skew * 0.5 + skew * skew / 12.0;
    }
    let coeff = 1.0 / (theta * theta) - (1.0 + theta.cos()) / (2.0 * theta * theta.sin());
    Matrix3::identity() + skew * 0.5 + skew * skew * coeff
}

/// Geodesic midpoint of two rotations, `a · Exp(½ Log(a⁻¹ b))`.
///
/// Matches `a.slerp(b, 0.5)` on the short arc without its antipodal panic.
pub fn rotation_midpoint(
    a: &UnitQuaternion<f64>,
    b: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    a * UnitQuaternion::from_scaled_axis((a.inverse() * b).scaled_axis() * 0.5)
}

/// Read a floating-base pose from `q = [x, y, z, qx, qy, qz, qw, ...]`.
///
/// The quaternion block is renormalized, so slightly drifted inputs still
/// produce a valid rotation.
pub fn read_base_pose(q: &DVector<f64>) -> Isometry3<f64> {
    let translation = Translation3::new(q[0], q[1], q[2]);
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(q[6], q[3], q[4], q[5]));
    Isometry3::from_parts(translation, rotation)
}

/// Write a floating-base pose into the first seven coordinates of `q`.
pub fn write_base_pose(q: &mut DVector<f64>, pose: &Isometry3<f64>) {
    let t = &pose.translation.vector;
    let r = pose.rotation.quaternion();
    q[0] = t.x;
    q[1] = t.y;
    q[2] = t.z;
    q[3] = r.i;
    q[4] = r.j;
    q[5] = r.k;
    q[6] = r.w;
}

/// Integrate a floating-base pose by a world-frame twist `[v; ω]`.
///
/// Translation is added directly; rotation goes through [`integrate_rotation`].
pub fn integrate_base_pose(
    pose: &Isometry3<f64>,
    linear: &Vector3<f64>,
    angular: &Vector3<f64>,
) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(pose.translation.vector + linear),
        integrate_rotation(&pose.rotation, angular),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
