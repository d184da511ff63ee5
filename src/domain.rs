//! Coordinate domains that generated populations are normalized into.
//!
//! The diffusion arithmetic is unbounded; the search space usually is not.
//! A [`Normalize`] implementation maps every generated batch back into the
//! caller's domain. Implementations must be idempotent and shape-preserving.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::rng_util;

/// Maps a batch of points (one per row) into a valid coordinate domain.
///
/// Any `Fn(DMatrix<f64>) -> DMatrix<f64>` is a `Normalize`.
///
/// # Examples
///
/// ```
/// use diffevo::domain::Normalize;
/// use nalgebra::DMatrix;
///
/// let unit_ball = |x: DMatrix<f64>| x.map(|v| v.tanh());
/// let out = unit_ball.normalize(DMatrix::from_element(2, 2, 10.0)).unwrap();
/// assert!(out.iter().all(|v| *v < 1.0));
/// ```
pub trait Normalize {
    /// Returns `x` mapped into the domain.
    ///
    /// # Errors
    ///
    /// Implementations return an error when `x` cannot belong to the domain,
    /// e.g. `Error::DimensionMismatch` for the wrong number of columns.
    fn normalize(&self, x: DMatrix<f64>) -> Result<DMatrix<f64>>;
}

impl<F> Normalize for F
where
    F: Fn(DMatrix<f64>) -> DMatrix<f64>,
{
    fn normalize(&self, x: DMatrix<f64>) -> Result<DMatrix<f64>> {
        Ok(self(x))
    }
}

/// The whole of `R^D`: normalization is the identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unbounded;

impl Normalize for Unbounded {
    fn normalize(&self, x: DMatrix<f64>) -> Result<DMatrix<f64>> {
        Ok(x)
    }
}

/// An axis-aligned box `[low_d, high_d]` per dimension; normalization clamps.
///
/// # Examples
///
/// ```
/// use diffevo::domain::{BoxDomain, Normalize};
/// use nalgebra::DMatrix;
///
/// let domain = BoxDomain::symmetric(2, 1.0).unwrap();
/// let x = DMatrix::from_row_slice(1, 2, &[3.0, -0.5]);
/// let clipped = domain.normalize(x).unwrap();
/// assert_eq!(clipped, DMatrix::from_row_slice(1, 2, &[1.0, -0.5]));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BoxDomain {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl BoxDomain {
    /// Creates a box from per-dimension bounds.
    ///
    /// # Errors
    ///
    /// Returns `Error::ZeroDimensions` if no bounds are given.
    /// Returns `Error::DimensionMismatch` if `low` and `high` differ in length.
    /// Returns `Error::InvalidBounds` if any `low_d > high_d` or a bound is NaN.
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Result<Self> {
        if low.is_empty() {
            return Err(Error::ZeroDimensions);
        }
        if low.len() != high.len() {
            return Err(Error::DimensionMismatch {
                expected: low.len(),
                got: high.len(),
            });
        }
        for (&lo, &hi) in low.iter().zip(&high) {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(Error::InvalidBounds { low: lo, high: hi });
            }
        }
        Ok(Self { low, high })
    }

    /// Creates the box `[low, high]^n_dims`.
    ///
    /// # Errors
    ///
    /// Same as [`BoxDomain::new`].
    pub fn uniform(n_dims: usize, low: f64, high: f64) -> Result<Self> {
        Self::new(vec![low; n_dims], vec![high; n_dims])
    }

    /// Creates the box `[-bound, bound]^n_dims`.
    ///
    /// # Errors
    ///
    /// Same as [`BoxDomain::new`]; a negative `bound` is an inverted box.
    pub fn symmetric(n_dims: usize, bound: f64) -> Result<Self> {
        Self::uniform(n_dims, -bound, bound)
    }

    /// Returns the dimensionality of the box.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.low.len()
    }

    /// Returns the lower bounds.
    #[must_use]
    pub fn low(&self) -> &[f64] {
        &self.low
    }

    /// Returns the upper bounds.
    #[must_use]
    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Returns `true` if every point of `x` lies inside the box.
    #[must_use]
    pub fn contains(&self, x: &DMatrix<f64>) -> bool {
        x.ncols() == self.n_dims()
            && x.row_iter().all(|row| {
                row.iter()
                    .enumerate()
                    .all(|(d, &v)| v >= self.low[d] && v <= self.high[d])
            })
    }

    /// Draws `n` points uniformly from the box.
    #[must_use]
    pub fn sample(&self, rng: &mut fastrand::Rng, n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, self.n_dims(), |_, d| {
            rng_util::f64_range(rng, self.low[d], self.high[d])
        })
    }
}

impl Normalize for BoxDomain {
    fn normalize(&self, mut x: DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.ncols() != self.n_dims() {
            return Err(Error::DimensionMismatch {
                expected: self.n_dims(),
                got: x.ncols(),
            });
        }
        for (d, mut column) in x.column_iter_mut().enumerate() {
            let (lo, hi) = (self.low[d], self.high[d]);
            for v in column.iter_mut() {
                *v = v.clamp(lo, hi);
            }
        }
        Ok(x)
    }
}
