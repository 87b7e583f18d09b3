//! URDF XML parsing using `urdf-rs`.
//!
//! Converts `urdf_rs` types into the crate's canonical [`RobotModel`]
//! representation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::UrdfError;
use crate::types::{Inertial, JointData, JointLimits, JointType, LinkData, Origin, RobotModel};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a URDF file from disk into a [`RobotModel`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<RobotModel, UrdfError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| UrdfError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_string(&content)
}

/// Parse a URDF XML string into a [`RobotModel`].
pub fn parse_string(xml: &str) -> Result<RobotModel, UrdfError> {
    let robot = urdf_rs::read_from_string(xml).map_err(|e| UrdfError::Parse(e.to_string()))?;
    convert_robot(&robot)
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn convert_robot(robot: &urdf_rs::Robot) -> Result<RobotModel, UrdfError> {
    let links: HashMap<String, LinkData> = robot
        .links
        .iter()
        .map(|l| (l.name.clone(), convert_link(l)))
        .collect();

    let joints: HashMap<String, JointData> = robot
        .joints
        .iter()
        .map(|j| convert_joint(j).map(|jd| (jd.name.clone(), jd)))
        .collect::<Result<_, _>>()?;

    for joint in joints.values() {
        if !links.contains_key(&joint.parent) {
            return Err(UrdfError::MissingLink(joint.parent.clone()));
        }
        if !links.contains_key(&joint.child) {
            return Err(UrdfError::MissingLink(joint.child.clone()));
        }
    }

    // Root link = a link that is never a child of any joint.
    let child_links: HashSet<&str> = joints.values().map(|j| j.child.as_str()).collect();
    let mut roots: Vec<&String> = links
        .keys()
        .filter(|name| !child_links.contains(name.as_str()))
        .collect();
    roots.sort_unstable();
    let root_link = match roots.as_slice() {
        [] => return Err(UrdfError::NoRootLink),
        [root] => (*root).clone(),
        _ => {
            return Err(UrdfError::MultipleRoots(
                roots.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", "),
            ));
        }
    };

    Ok(RobotModel {
        name: robot.name.clone(),
        links,
        joints,
        root_link,
    })
}

fn convert_link(link: &urdf_rs::Link) -> LinkData {
    // urdf-rs fills a zero-mass inertial when the element is absent.
    let inertial = (link.inertial.mass.value > 0.0).then(|| convert_inertial(&link.inertial));
    LinkData {
        name: link.name.clone(),
        inertial,
    }
}

fn convert_joint(joint: &urdf_rs::Joint) -> Result<JointData, UrdfError> {
    let joint_type = convert_joint_type(&joint.joint_type)?;

    Ok(JointData {
        name: joint.name.clone(),
        joint_type,
        parent: joint.parent.link.clone(),
        child: joint.child.link.clone(),
        origin: convert_pose(&joint.origin),
        axis: vec3(&joint.axis.xyz),
        limits: convert_limits(joint_type, &joint.limit),
    })
}

fn convert_joint_type(jt: &urdf_rs::JointType) -> Result<JointType, UrdfError> {
    match jt {
        urdf_rs::JointType::Revolute => Ok(JointType::Revolute),
        urdf_rs::JointType::Continuous => Ok(JointType::Continuous),
        urdf_rs::JointType::Prismatic => Ok(JointType::Prismatic),
        urdf_rs::JointType::Fixed => Ok(JointType::Fixed),
        urdf_rs::JointType::Floating => Err(UrdfError::UnsupportedJointType("floating".into())),
        urdf_rs::JointType::Planar => Err(UrdfError::UnsupportedJointType("planar".into())),
        urdf_rs::JointType::Spherical => Err(UrdfError::UnsupportedJointType("spherical".into())),
    }
}

fn convert_limits(joint_type: JointType, limit: &urdf_rs::JointLimit) -> JointLimits {
    // urdf-rs defaults lower/upper to 0.0 for joints without limits, and
    // continuous joints ignore limits entirely.
    let has_limits = joint_type != JointType::Continuous
        && (limit.lower - limit.upper).abs() > f64::EPSILON;
    if has_limits {
        JointLimits {
            lower: Some(limit.lower),
            upper: Some(limit.upper),
        }
    } else {
        JointLimits::default()
    }
}

fn convert_pose(pose: &urdf_rs::Pose) -> Origin {
    Origin {
        xyz: vec3(&pose.xyz),
        rpy: vec3(&pose.rpy),
    }
}

fn convert_inertial(inertial: &urdf_rs::Inertial) -> Inertial {
    let i = &inertial.inertia;
    Inertial {
        origin: convert_pose(&inertial.origin),
        mass: inertial.mass.value,
        inertia: [i.ixx, i.ixy, i.ixz, i.iyy, i.iyz, i.izz],
    }
}

const fn vec3(v: &[f64; 3]) -> [f64; 3] {
    [v[0], v[1], v[2]]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
