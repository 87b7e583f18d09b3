//! Error types for the IK crate.
//!
//! Only set-up problems are errors. Convergence failures are reported as a
//! [`SolveStatus`](crate::solver::SolveStatus) inside a successful result.

use thiserror::Error;

use locomanip_urdf::UrdfError;

/// Top-level error type for locomanip-ik.
#[derive(Debug, Error)]
pub enum IkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Kinematics error: {0}")]
    Kinematics(#[from] KinematicsError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Initial configuration has {got} coordinates, model expects {expected}")]
    InitialConfigMismatch { expected: usize, got: usize },

    #[error("Initial configuration was never set")]
    MissingInitialConfig,

    #[error("Task hierarchy is empty")]
    EmptyHierarchy,

    #[error("Task hierarchy changed since the last prepare()")]
    NotPrepared,
}

/// Solver configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by a kinematics provider.
#[derive(Debug, Error)]
pub enum KinematicsError {
    #[error("Unknown frame: {0}")]
    UnknownFrame(String),

    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    #[error("Configuration dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Configuration entry {index} is not finite")]
    NonFinite { index: usize },

    #[error("Base quaternion norm {norm} cannot be normalized")]
    DegenerateBaseRotation { norm: f64 },

    #[error("Model error: {0}")]
    Model(#[from] UrdfError),
}

/// Errors raised while configuring a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task '{task}' expects a {expected} reference, got {got}")]
    ReferenceMismatch {
        task: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("Task '{task}' expects a reference of length {expected}, got {got}")]
    ReferenceDimension {
        task: String,
        expected: usize,
        got: usize,
    },

    #[error("Task stack '{0}' does not take references; set them on its sub-tasks")]
    StackReference(String),

    #[error("Task '{task}' error has length {got}, task dimension is {expected}")]
    ErrorDimension {
        task: String,
        expected: usize,
        got: usize,
    },

    #[error("Task '{0}' has no rows")]
    Empty(String),
}
