//! Tree kinematics built from a URDF [`RobotModel`].
//!
//! A [`KinematicModel`] flattens the link tree into bodies ordered parents
//! first, so one forward pass computes every placement. It stores the static
//! joint origins and axes plus link inertials, and caches world placements,
//! joint axes and the center of mass for the configuration last passed to
//! [`RobotKinematics::update_kinematics`].
//!
//! # Configuration layout
//!
//! ```text
//! fixed base:     q = [joints...]                          v = [joints...]
//! floating base:  q = [x, y, z, qx, qy, qz, qw, joints...] v = [v_world, ω_world, joints...]
//! ```
//!
//! Joint coordinates are ordered depth-first from the root link, siblings
//! sorted by joint name.

use std::collections::HashMap;
use std::f64::consts::PI;

use nalgebra::{
    DMatrix, DVector, Isometry3, Matrix3, Point3, Translation3, Unit, UnitQuaternion,
    UnitVector3, Vector3,
};

use locomanip_urdf::{Inertial, JointType, Origin, RobotModel, UrdfError};

use crate::error::KinematicsError;
use crate::kinematics::{JointIndex, RobotKinematics};
use crate::manifold::{self, FLOATING_BASE_NQ, FLOATING_BASE_NV};

/// Diagonal regularization added to the mass matrix so joints that move no
/// mass still get a positive-definite metric.
const ARMATURE: f64 = 1e-6;

/// Smallest base quaternion norm still normalized on read.
const MIN_BASE_QUATERNION_NORM: f64 = 1e-9;

/// How the root link is attached to the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaseType {
    /// Root link welded to the world frame.
    #[default]
    Fixed,
    /// Root link free in 6-DoF, parameterized by translation + unit quaternion.
    Floating,
}

/// A single degree of freedom of the model.
#[derive(Debug, Clone)]
pub struct ModelJoint {
    /// Name of this joint (from URDF).
    pub name: String,
    /// Whether this is a prismatic joint (false = revolute).
    pub is_prismatic: bool,
    /// Lower position limit (rad or m).
    pub lower_limit: f64,
    /// Upper position limit (rad or m).
    pub upper_limit: f64,
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    Fixed,
    Revolute(usize),
    Prismatic(usize),
}

#[derive(Debug, Clone)]
struct Body {
    parent: Option<usize>,
    /// Static transform from the parent link frame to the joint frame.
    origin: Isometry3<f64>,
    axis: UnitVector3<f64>,
    motion: Motion,
    mass: f64,
    com_local: Vector3<f64>,
    inertia_local: Matrix3<f64>,
    /// Degrees of freedom between the root and this body, root first.
    support: Vec<usize>,
}

/// Kinematic tree with a cached evaluation at one configuration.
#[derive(Debug, Clone)]
pub struct KinematicModel {
    name: String,
    base: BaseType,
    bodies: Vec<Body>,
    joints: Vec<ModelJoint>,
    frames: HashMap<String, usize>,
    joint_lookup: HashMap<String, usize>,
    total_mass: f64,
    q: DVector<f64>,
    placements: Vec<Isometry3<f64>>,
    axes_world: Vec<Vector3<f64>>,
    origins_world: Vec<Vector3<f64>>,
    com: Vector3<f64>,
}

impl KinematicModel {
    /// Build the model from a parsed URDF and evaluate it at the neutral
    /// configuration.
    pub fn from_model(model: &RobotModel, base: BaseType) -> Result<Self, KinematicsError> {
        let root = model.link(&model.root_link)?;

        let mut builder = TreeBuilder::default();
        builder.push_body(
            &root.name,
            None,
            Isometry3::identity(),
            Vector3::z_axis(),
            Motion::Fixed,
            root.inertial,
            Vec::new(),
        )?;
        builder.add_subtree(model, &model.root_link, 0)?;

        let TreeBuilder {
            bodies,
            joints,
            frames,
        } = builder;
        let joint_lookup = joints
            .iter()
            .enumerate()
            .map(|(i, j)| (j.name.clone(), i))
            .collect();
        let total_mass = bodies.iter().map(|b| b.mass).sum();
        let n_bodies = bodies.len();
        let n_dof = joints.len();

        let mut kinematics = Self {
            name: model.name.clone(),
            base,
            bodies,
            joints,
            frames,
            joint_lookup,
            total_mass,
            q: DVector::zeros(0),
            placements: vec![Isometry3::identity(); n_bodies],
            axes_world: vec![Vector3::zeros(); n_dof],
            origins_world: vec![Vector3::zeros(); n_dof],
            com: Vector3::zeros(),
        };
        let neutral = kinematics.neutral_configuration();
        kinematics.update_kinematics(&neutral)?;
        Ok(kinematics)
    }

    /// Parse URDF XML and build the model in one step.
    pub fn from_urdf_str(xml: &str, base: BaseType) -> Result<Self, KinematicsError> {
        let model = locomanip_urdf::parse_string(xml)?;
        Self::from_model(&model, base)
    }

    /// Robot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base attachment.
    pub const fn base_type(&self) -> BaseType {
        self.base
    }

    /// Number of joint degrees of freedom, floating base excluded.
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    /// Joint definitions in coordinate order.
    pub fn joints(&self) -> &[ModelJoint] {
        &self.joints
    }

    /// Joint names in coordinate order.
    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    /// All frame (link) names, sorted.
    pub fn frame_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.frames.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sum of link masses.
    pub const fn total_mass(&self) -> f64 {
        self.total_mass
    }

    /// Zero joint positions, base at the origin with identity orientation.
    pub fn neutral_configuration(&self) -> DVector<f64> {
        let mut q = DVector::zeros(self.position_dim());
        if self.base == BaseType::Floating {
            q[6] = 1.0;
        }
        q
    }

    /// Joint position limits in coordinate order.
    pub fn position_limits(&self) -> Vec<(f64, f64)> {
        self.joints
            .iter()
            .map(|j| (j.lower_limit, j.upper_limit))
            .collect()
    }

    const fn base_offsets(&self) -> (usize, usize) {
        match self.base {
            BaseType::Fixed => (0, 0),
            BaseType::Floating => (FLOATING_BASE_NQ, FLOATING_BASE_NV),
        }
    }

    fn body_index(&self, frame: &str) -> Result<usize, KinematicsError> {
        self.frames
            .get(frame)
            .copied()
            .ok_or_else(|| KinematicsError::UnknownFrame(frame.into()))
    }

    /// World-aligned `6 × nv` Jacobian of a point rigidly attached to `body`.
    fn point_jacobian(&self, body: usize, point: &Vector3<f64>) -> DMatrix<f64> {
        let (_, v_offset) = self.base_offsets();
        let mut jac = DMatrix::zeros(6, self.velocity_dim());

        if self.base == BaseType::Floating {
            let r = point - self.placements[0].translation.vector;
            jac.fixed_view_mut::<3, 3>(0, 0).fill_with_identity();
            jac.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-r.cross_matrix()));
            jac.fixed_view_mut::<3, 3>(3, 3).fill_with_identity();
        }

        for &dof in &self.bodies[body].support {
            let col = v_offset + dof;
            let axis = &self.axes_world[dof];
            if self.joints[dof].is_prismatic {
                jac.fixed_view_mut::<3, 1>(0, col).copy_from(axis);
            } else {
                // Revolute joint: linear velocity z_i x (p - o_i), angular z_i
                let linear = axis.cross(&(point - self.origins_world[dof]));
                jac.fixed_view_mut::<3, 1>(0, col).copy_from(&linear);
                jac.fixed_view_mut::<3, 1>(3, col).copy_from(axis);
            }
        }

        jac
    }

    fn body_com(&self, body: usize) -> Vector3<f64> {
        (self.placements[body] * Point3::from(self.bodies[body].com_local)).coords
    }
}

impl RobotKinematics for KinematicModel {
    fn position_dim(&self) -> usize {
        self.base_offsets().0 + self.dof()
    }

    fn velocity_dim(&self) -> usize {
        self.base_offsets().1 + self.dof()
    }

    fn validate_configuration(&self, q: &DVector<f64>) -> Result<(), KinematicsError> {
        if q.len() != self.position_dim() {
            return Err(KinematicsError::DimensionMismatch {
                expected: self.position_dim(),
                got: q.len(),
            });
        }
        if let Some(index) = q.iter().position(|x| !x.is_finite()) {
            return Err(KinematicsError::NonFinite { index });
        }
        if self.base == BaseType::Floating {
            let norm = q.fixed_rows::<4>(3).norm();
            if norm < MIN_BASE_QUATERNION_NORM {
                return Err(KinematicsError::DegenerateBaseRotation { norm });
            }
        }
        Ok(())
    }

    fn update_kinematics(&mut self, q: &DVector<f64>) -> Result<(), KinematicsError> {
        self.validate_configuration(q)?;

        let base_pose = match self.base {
            BaseType::Fixed => Isometry3::identity(),
            BaseType::Floating => manifold::read_base_pose(q),
        };
        let (q_offset, _) = self.base_offsets();

        for i in 0..self.bodies.len() {
            let body = &self.bodies[i];
            let parent_pose = body.parent.map_or(base_pose, |p| self.placements[p]);
            let joint_frame = parent_pose * body.origin;

            let motion = match body.motion {
                Motion::Fixed => Isometry3::identity(),
                Motion::Revolute(dof) | Motion::Prismatic(dof) => {
                    // Record joint origin and axis in world frame BEFORE joint motion
                    self.origins_world[dof] = joint_frame.translation.vector;
                    self.axes_world[dof] = joint_frame.rotation * body.axis.into_inner();
                    joint_transform(&body.axis, body.motion, q[q_offset + dof])
                }
            };
            self.placements[i] = joint_frame * motion;
        }

        self.com = if self.total_mass > 0.0 {
            (0..self.bodies.len())
                .map(|b| self.body_com(b) * self.bodies[b].mass)
                .sum::<Vector3<f64>>()
                / self.total_mass
        } else {
            base_pose.translation.vector
        };

        self.q = q.clone();
        Ok(())
    }

    fn configuration(&self) -> &DVector<f64> {
        &self.q
    }

    fn frame_pose(&self, frame: &str) -> Result<Isometry3<f64>, KinematicsError> {
        Ok(self.placements[self.body_index(frame)?])
    }

    fn frame_jacobian(&self, frame: &str) -> Result<DMatrix<f64>, KinematicsError> {
        let body = self.body_index(frame)?;
        Ok(self.point_jacobian(body, &self.placements[body].translation.vector))
    }

    fn com_position(&self) -> Vector3<f64> {
        self.com
    }

    fn com_jacobian(&self) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(3, self.velocity_dim());
        if self.total_mass <= 0.0 {
            return jac;
        }
        for (b, body) in self.bodies.iter().enumerate() {
            if body.mass > 0.0 {
                let full = self.point_jacobian(b, &self.body_com(b));
                jac += full.rows(0, 3) * (body.mass / self.total_mass);
            }
        }
        jac
    }

    fn integrate(&self, q: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(q.len(), self.position_dim());
        debug_assert_eq!(v.len(), self.velocity_dim());

        let (q_offset, v_offset) = self.base_offsets();
        let mut next = q.clone();
        if self.base == BaseType::Floating {
            let pose = manifold::read_base_pose(q);
            let linear = v.fixed_rows::<3>(0).into_owned();
            let angular = v.fixed_rows::<3>(3).into_owned();
            manifold::write_base_pose(
                &mut next,
                &manifold::integrate_base_pose(&pose, &linear, &angular),
            );
        }
        for dof in 0..self.dof() {
            next[q_offset + dof] += v[v_offset + dof];
        }
        next
    }

    fn joint_index(&self, joint: &str) -> Result<JointIndex, KinematicsError> {
        let dof = self
            .joint_lookup
            .get(joint)
            .copied()
            .ok_or_else(|| KinematicsError::UnknownJoint(joint.into()))?;
        let (q_offset, v_offset) = self.base_offsets();
        Ok(JointIndex {
            position: q_offset + dof,
            velocity: v_offset + dof,
        })
    }

    fn mass_matrix(&self) -> Option<DMatrix<f64>> {
        let nv = self.velocity_dim();
        let mut mass = DMatrix::identity(nv, nv) * ARMATURE;
        for (b, body) in self.bodies.iter().enumerate() {
            if body.mass <= 0.0 {
                continue;
            }
            let jac = self.point_jacobian(b, &self.body_com(b));
            let jv = jac.rows(0, 3);
            let jw = jac.rows(3, 3);
            let rot = self.placements[b].rotation.to_rotation_matrix();
            let inertia_world = rot.matrix() * body.inertia_local * rot.matrix().transpose();
            mass += jv.transpose() * jv * body.mass + jw.transpose() * inertia_world * jw;
        }
        Some(mass)
    }

    fn has_frame(&self, frame: &str) -> bool {
        self.frames.contains_key(frame)
    }
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TreeBuilder {
    bodies: Vec<Body>,
    joints: Vec<ModelJoint>,
    frames: HashMap<String, usize>,
}

impl TreeBuilder {
    #[allow(clippy::too_many_arguments)]
    fn push_body(
        &mut self,
        link: &str,
        parent: Option<usize>,
        origin: Isometry3<f64>,
        axis: UnitVector3<f64>,
        motion: Motion,
        inertial: Option<Inertial>,
        support: Vec<usize>,
    ) -> Result<usize, KinematicsError> {
        let index = self.bodies.len();
        if self.frames.insert(link.to_owned(), index).is_some() {
            return Err(UrdfError::Parse(format!("link '{link}' has more than one parent")).into());
        }
        let inertial = inertial.unwrap_or_default();
        let inertial_rotation = rotation_from_rpy(&inertial.origin).to_rotation_matrix();
        self.bodies.push(Body {
            parent,
            origin,
            axis,
            motion,
            mass: inertial.mass,
            com_local: Vector3::from(inertial.origin.xyz),
            inertia_local: inertial_rotation.matrix()
                * inertia_tensor(&inertial.inertia)
                * inertial_rotation.matrix().transpose(),
            support,
        });
        Ok(index)
    }

    /// Depth-first walk adding every descendant of `link`.
    fn add_subtree(
        &mut self,
        model: &RobotModel,
        link: &str,
        body: usize,
    ) -> Result<(), KinematicsError> {
        for joint in model.child_joints(link) {
            let mut support = self.bodies[body].support.clone();
            let motion = match joint.joint_type {
                JointType::Fixed => Motion::Fixed,
                JointType::Prismatic => Motion::Prismatic(self.joints.len()),
                JointType::Revolute | JointType::Continuous => Motion::Revolute(self.joints.len()),
            };

            let axis = if joint.joint_type.is_actuated() {
                Unit::try_new(Vector3::from(joint.axis), 1e-12).ok_or_else(|| {
                    UrdfError::Parse(format!("joint '{}' has a zero axis", joint.name))
                })?
            } else {
                Vector3::z_axis()
            };

            if let Motion::Revolute(dof) | Motion::Prismatic(dof) = motion {
                // Continuous joints carry no limits and land on the fallback
                let (lower, upper) = joint.limits.range_or((-PI, PI));
                self.joints.push(ModelJoint {
                    name: joint.name.clone(),
                    is_prismatic: joint.joint_type.is_prismatic(),
                    lower_limit: lower,
                    upper_limit: upper,
                });
                support.push(dof);
            }

            let child = model.link(&joint.child)?;
            let index = self.push_body(
                &child.name,
                Some(body),
                origin_to_isometry(&joint.origin),
                axis,
                motion,
                child.inertial,
                support,
            )?;
            self.add_subtree(model, &child.name, index)?;
        }
        Ok(())
    }
}

/// Convert a URDF [`Origin`] (xyz + rpy) to an [`Isometry3`].
fn origin_to_isometry(origin: &Origin) -> Isometry3<f64> {
    let [x, y, z] = origin.xyz;
    Isometry3::from_parts(Translation3::new(x, y, z), rotation_from_rpy(origin))
}

/// URDF roll-pitch-yaw (extrinsic XYZ) as a unit quaternion.
fn rotation_from_rpy(origin: &Origin) -> UnitQuaternion<f64> {
    let [roll, pitch, yaw] = origin.rpy;
    UnitQuaternion::from_euler_angles(roll, pitch, yaw)
}

/// Symmetric inertia tensor from `[ixx, ixy, ixz, iyy, iyz, izz]`.
fn inertia_tensor(i: &[f64; 6]) -> Matrix3<f64> {
    Matrix3::new(i[0], i[1], i[2], i[1], i[3], i[4], i[2], i[4], i[5])
}

/// Compute the transform for a single joint at a given position.
fn joint_transform(axis: &UnitVector3<f64>, motion: Motion, position: f64) -> Isometry3<f64> {
    match motion {
        Motion::Prismatic(_) => Isometry3::from_parts(
            Translation3::from(axis.into_inner() * position),
            UnitQuaternion::identity(),
        ),
        Motion::Revolute(_) => Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(axis, position),
        ),
        Motion::Fixed => Isometry3::identity(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
