//! Core data types for the in-memory robot description.
//!
//! These types are the crate's canonical representation of a robot model,
//! independent of the XML parsing layer. Only the kinematic and inertial
//! parts of URDF are kept: geometry and materials never reach the solver.

use std::collections::HashMap;

use crate::error::UrdfError;

// ---------------------------------------------------------------------------
// JointType
// ---------------------------------------------------------------------------

/// URDF joint type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Rotation about a single axis, with position limits.
    Revolute,
    /// Unlimited rotation about a single axis.
    Continuous,
    /// Translation along an axis, with position limits.
    Prismatic,
    /// No relative motion between parent and child.
    Fixed,
}

impl JointType {
    /// Whether this joint type contributes a degree of freedom.
    pub const fn is_actuated(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous | Self::Prismatic)
    }

    /// Whether motion along the axis is a translation.
    pub const fn is_prismatic(self) -> bool {
        matches!(self, Self::Prismatic)
    }
}

// ---------------------------------------------------------------------------
// JointLimits
// ---------------------------------------------------------------------------

/// Position limits of a joint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointLimits {
    /// Lower position limit (rad or m). `None` means unbounded.
    pub lower: Option<f64>,
    /// Upper position limit (rad or m). `None` means unbounded.
    pub upper: Option<f64>,
}

impl JointLimits {
    /// Limits as a closed interval, substituting `fallback` for missing bounds.
    pub fn range_or(&self, fallback: (f64, f64)) -> (f64, f64) {
        (
            self.lower.unwrap_or(fallback.0),
            self.upper.unwrap_or(fallback.1),
        )
    }
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// A 3D pose specified as position + roll-pitch-yaw.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Origin {
    /// Translation `[x, y, z]` in meters.
    pub xyz: [f64; 3],
    /// Rotation `[roll, pitch, yaw]` in radians.
    pub rpy: [f64; 3],
}

// ---------------------------------------------------------------------------
// Inertial
// ---------------------------------------------------------------------------

/// Inertial properties of a link.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Inertial {
    /// Origin of the inertial frame (center of mass) relative to the link frame.
    pub origin: Origin,
    /// Mass in kilograms.
    pub mass: f64,
    /// Inertia tensor elements `[ixx, ixy, ixz, iyy, iyz, izz]` about the CoM.
    pub inertia: [f64; 6],
}

// ---------------------------------------------------------------------------
// LinkData
// ---------------------------------------------------------------------------

/// In-memory representation of a URDF link.
#[derive(Debug, Clone)]
pub struct LinkData {
    /// Link name.
    pub name: String,
    /// Inertial properties. `None` for massless frames.
    pub inertial: Option<Inertial>,
}

impl LinkData {
    /// Create a massless link with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inertial: None,
        }
    }

    /// Link mass, zero for massless frames.
    pub fn mass(&self) -> f64 {
        self.inertial.map_or(0.0, |i| i.mass)
    }
}

// ---------------------------------------------------------------------------
// JointData
// ---------------------------------------------------------------------------

/// In-memory representation of a URDF joint.
#[derive(Debug, Clone)]
pub struct JointData {
    /// Joint name.
    pub name: String,
    /// Joint type.
    pub joint_type: JointType,
    /// Parent link name.
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Joint origin relative to parent link.
    pub origin: Origin,
    /// Joint axis in the joint frame (default `[0, 0, 1]`).
    pub axis: [f64; 3],
    /// Position limits.
    pub limits: JointLimits,
}

// ---------------------------------------------------------------------------
// RobotModel
// ---------------------------------------------------------------------------

/// Complete in-memory representation of a URDF robot.
///
/// Contains the full kinematic tree: links, joints, and root link name.
#[derive(Debug, Clone)]
pub struct RobotModel {
    /// Robot name.
    pub name: String,
    /// All links, keyed by name.
    pub links: HashMap<String, LinkData>,
    /// All joints, keyed by name.
    pub joints: HashMap<String, JointData>,
    /// Name of the root link (the one never referenced as a child).
    pub root_link: String,
}

impl RobotModel {
    /// Get a link by name.
    pub fn link(&self, name: &str) -> Result<&LinkData, UrdfError> {
        self.links
            .get(name)
            .ok_or_else(|| UrdfError::MissingLink(name.into()))
    }

    /// Get a joint by name.
    pub fn joint(&self, name: &str) -> Result<&JointData, UrdfError> {
        self.joints
            .get(name)
            .ok_or_else(|| UrdfError::MissingJoint(name.into()))
    }

    /// Iterate over joints that carry a degree of freedom.
    pub fn actuated_joints(&self) -> impl Iterator<Item = &JointData> {
        self.joints.values().filter(|j| j.joint_type.is_actuated())
    }

    /// Number of joint degrees of freedom (floating base excluded).
    pub fn dof(&self) -> usize {
        self.actuated_joints().count()
    }

    /// Joints whose parent is `link`, sorted by joint name.
    ///
    /// The sort makes tree traversals independent of hash-map order.
    pub fn child_joints(&self, link: &str) -> Vec<&JointData> {
        let mut children: Vec<&JointData> =
            self.joints.values().filter(|j| j.parent == link).collect();
        children.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Sum of all link masses.
    pub fn total_mass(&self) -> f64 {
        self.links.values().map(LinkData::mass).sum()
    }

    /// Names of all joints, sorted alphabetically.
    pub fn joint_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.joints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn joint(name: &str, joint_type: JointType, parent: &str, child: &str) -> JointData {
        JointData {
            name: name.into(),
            joint_type,
            parent: parent.into(),
            child: child.into(),
            origin: Origin::default(),
            axis: [0.0, 0.0, 1.0],
            limits: JointLimits::default(),
        }
    }

    fn sample_model() -> RobotModel {
        let mut links = HashMap::new();
        links.insert("base".into(), LinkData::new("base"));
        links.insert(
            "link1".into(),
            LinkData {
                name: "link1".into(),
                inertial: Some(Inertial {
                    mass: 2.0,
                    ..Inertial::default()
                }),
            },
        );
        links.insert("link2".into(), LinkData::new("link2"));
        links.insert("tool".into(), LinkData::new("tool"));

        let mut joints = HashMap::new();
        joints.insert(
            "joint_b".into(),
            joint("joint_b", JointType::Revolute, "base", "link1"),
        );
        joints.insert(
            "joint_a".into(),
            joint("joint_a", JointType::Prismatic, "base", "link2"),
        );
        joints.insert(
            "tool_fixed".into(),
            joint("tool_fixed", JointType::Fixed, "link1", "tool"),
        );

        RobotModel {
            name: "test_robot".into(),
            links,
            joints,
            root_link: "base".into(),
        }
    }

    // -- JointType --

    #[test]
    fn joint_type_is_actuated() {
        assert!(JointType::Revolute.is_actuated());
        assert!(JointType::Continuous.is_actuated());
        assert!(JointType::Prismatic.is_actuated());
        assert!(!JointType::Fixed.is_actuated());
        assert!(JointType::Prismatic.is_prismatic());
        assert!(!JointType::Revolute.is_prismatic());
    }

    // -- JointLimits --

    #[test]
    fn limits_range_fills_missing_bounds() {
        let lim = JointLimits {
            lower: Some(-1.0),
            upper: None,
        };
        assert_eq!(lim.range_or((-3.0, 3.0)), (-1.0, 3.0));
        assert_eq!(JointLimits::default().range_or((-2.0, 2.0)), (-2.0, 2.0));
    }

    // -- RobotModel --

    #[test]
    fn model_lookups() {
        let model = sample_model();
        assert!(model.link("base").is_ok());
        assert!(model.link("missing").is_err());
        assert!(model.joint("joint_a").is_ok());
        assert!(matches!(
            model.joint("missing"),
            Err(UrdfError::MissingJoint(_))
        ));
    }

    #[test]
    fn model_dof_skips_fixed_joints() {
        assert_eq!(sample_model().dof(), 2);
    }

    #[test]
    fn child_joints_sorted_by_name() {
        let model = sample_model();
        let names: Vec<&str> = model
            .child_joints("base")
            .iter()
            .map(|j| j.name.as_str())
            .collect();
        assert_eq!(names, vec!["joint_a", "joint_b"]);
        assert!(model.child_joints("tool").is_empty());
    }

    #[test]
    fn total_mass_ignores_massless_links() {
        assert!((sample_model().total_mass() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn joint_names_sorted() {
        assert_eq!(
            sample_model().joint_names(),
            vec!["joint_a", "joint_b", "tool_fixed"]
        );
    }
}
