//! Random-number helpers shared by the diffusion step and the domains.
//!
//! Nothing in this crate touches a global random source: every draw goes
//! through a caller-owned [`fastrand::Rng`].

use nalgebra::DMatrix;

/// Build an RNG from an optional seed, falling back to a fresh random seed.
#[must_use]
pub fn seeded(seed: Option<u64>) -> fastrand::Rng {
    seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed)
}

/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Sample a value from the standard normal distribution using Box-Muller transform.
#[inline]
pub fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    // u1 in (0, 1] keeps ln finite
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64() * core::f64::consts::TAU;
    (-2.0 * u1.ln()).sqrt() * u2.cos()
}

/// Draw an `rows × cols` matrix of independent standard-normal values.
///
/// This is the usual starting population `x_T ~ N(0, I)` of a reverse
/// diffusion chain.
#[must_use]
pub fn standard_normal_matrix(rng: &mut fastrand::Rng, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| standard_normal(rng))
}
