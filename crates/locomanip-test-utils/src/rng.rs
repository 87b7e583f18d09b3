//! Deterministic RNG utilities for reproducible tests.

use nalgebra::{DVector, UnitQuaternion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Draw a configuration uniformly inside joint `limits`.
///
/// With `floating_base`, the vector is prefixed by a base pose
/// `[x, y, z, qx, qy, qz, qw]` with position in `[-1, 1]^3` and a random
/// unit quaternion.
pub fn random_configuration(
    limits: &[(f64, f64)],
    floating_base: bool,
    rng: &mut impl Rng,
) -> DVector<f64> {
    let offset = if floating_base { 7 } else { 0 };
    let mut q = DVector::zeros(offset + limits.len());

    if floating_base {
        for i in 0..3 {
            q[i] = rng.gen_range(-1.0..=1.0);
        }
        let pi = std::f64::consts::PI;
        let rotation = UnitQuaternion::from_euler_angles(
            rng.gen_range(-pi..=pi),
            rng.gen_range(-pi / 2.0..=pi / 2.0),
            rng.gen_range(-pi..=pi),
        );
        let r = rotation.quaternion();
        q[3] = r.i;
        q[4] = r.j;
        q[5] = r.k;
        q[6] = r.w;
    }

    for (i, &(lower, upper)) in limits.iter().enumerate() {
        q[offset + i] = rng.gen_range(lower..=upper);
    }
    q
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
