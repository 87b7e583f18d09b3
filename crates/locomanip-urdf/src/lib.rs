//! URDF parsing and robot model representation for Locomanip.
//!
//! Provides types for representing a robot's kinematic tree (links, joints,
//! inertials) and parsing URDF XML into them. The IK crate builds its
//! kinematics provider on top of [`RobotModel`].

pub mod error;
pub mod parser;
pub mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::UrdfError;
pub use parser::{parse_file, parse_string};
pub use types::{Inertial, JointData, JointLimits, JointType, LinkData, Origin, RobotModel};
