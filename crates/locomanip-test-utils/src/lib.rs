//! Shared test fixtures and utilities for locomanip crates.
//!
//! Provides URDF robot descriptions and deterministic RNG setup.

pub mod fixtures;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use rng::{random_configuration, seeded_rng};
