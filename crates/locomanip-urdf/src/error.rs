//! Error types for URDF parsing.

use std::path::PathBuf;

/// Errors that can occur during URDF processing.
#[derive(Debug, thiserror::Error)]
pub enum UrdfError {
    /// Failed to read the URDF file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse URDF XML content.
    #[error("URDF parse error: {0}")]
    Parse(String),

    /// A referenced link was not found in the model.
    #[error("missing link: {0}")]
    MissingLink(String),

    /// A referenced joint was not found in the model.
    #[error("missing joint: {0}")]
    MissingJoint(String),

    /// Invalid or unsupported joint type.
    #[error("unsupported joint type: {0}")]
    UnsupportedJointType(String),

    /// The URDF has no root link (no link that is never a child).
    #[error("no root link found")]
    NoRootLink,

    /// More than one link is never referenced as a child.
    #[error("multiple root links: {0}")]
    MultipleRoots(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
