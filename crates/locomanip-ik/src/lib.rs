//! Prioritized task-space inverse kinematics for fixed- and floating-base
//! robots.
//!
//! Tasks (frame poses, centre of mass, joint targets, contact and
//! avoidance constraints) are arranged in a strict priority hierarchy. Each
//! iteration solves the levels in order, every level restricted to the
//! nullspace of the ones above it, then backtracks along the resulting step
//! until no level is made worse than the levels above it allow.
//!
//! # Architecture
//!
//! ```text
//! RobotModel ──► KinematicModel ──► IkSolver ◄── Task hierarchy
//!                 (RobotKinematics)    │
//!                                      ▼
//!                                  IkResult
//! ```
//!
//! [`KinematicModel`] builds a [`RobotKinematics`] provider from a
//! [`RobotModel`](locomanip_urdf::RobotModel). Any other provider can be
//! plugged into [`IkSolver`] through the same trait.

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod kinematics;
pub mod manifold;
pub mod model;
pub mod pinv;
pub mod solver;
pub mod task;

pub use config::{IkConfig, LineSearchRule};
pub use error::{ConfigError, IkError, KinematicsError, TaskError};
pub use hierarchy::{NullspaceCascade, PriorityLevel};
pub use kinematics::{JointIndex, RobotKinematics};
pub use model::{BaseType, KinematicModel, ModelJoint};
pub use solver::{IkResult, IkSolver, SolveStatus};
pub use task::{
    CenterOfMass, ContactNormal, JointSubset, MidfeetPose6D, Orientation3D, PointAvoidance,
    Pose6D, SelfCollision, Task, TaskReference, TaskStack,
};
