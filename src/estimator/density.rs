//! Query-batch density models.
//!
//! The estimator divides every importance weight by the density of the
//! query point it is computed for. Density methods form a closed set so the
//! weighting logic never has to change when a method is added.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// How the density of each query point within its batch is modelled.
///
/// # Examples
///
/// ```
/// use diffevo::estimator::DensityMethod;
///
/// let method: DensityMethod = "uniform".parse().unwrap();
/// assert_eq!(method, DensityMethod::Uniform);
///
/// assert!("gaussian_kde".parse::<DensityMethod>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DensityMethod {
    /// Every query point of an `M`-point batch gets density `1 / M`.
    #[default]
    Uniform,
}

impl DensityMethod {
    /// Returns the configuration name of this method.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
        }
    }

    /// Returns one density value per row of `queries`.
    ///
    /// An empty batch yields an empty vector.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn density(self, queries: &DMatrix<f64>) -> Vec<f64> {
        let m = queries.nrows();
        match self {
            Self::Uniform => vec![1.0 / m as f64; m],
        }
    }
}

impl FromStr for DensityMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            _ => Err(Error::UnsupportedDensity(s.to_owned())),
        }
    }
}

impl fmt::Display for DensityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
