//! Fitness-weighted Bayesian estimate of diffusion origins.
//!
//! Given a stored population `{(x_i, f_i)}` at noise level `α` and a batch of
//! noisy queries `x_t`, the origin of each query is estimated as a kernel
//! regression over the population:
//!
//! `x̂_0(x_t) = Σ_i w_i x_i / (Σ_i w_i + ε)`
//!
//! `w_i = (f_i + ε) · (N(x_t; sqrt(α) x_i, (1 - α) I) + ε) / (p(x_t) + ε)`
//!
//! The Gaussian is left unnormalized (its constant cancels in the ratio) and
//! `ε = 1e-9` keeps every factor away from zero, so the estimate stays finite
//! when fitness, likelihood or density underflow. Fitness above 1 is divided
//! by the population maximum first, so huge scores cannot overflow the sums.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::estimator::density::DensityMethod;
use crate::population::Population;

/// Additive floor applied to every factor of an importance weight.
pub const WEIGHT_EPSILON: f64 = 1e-9;

const DEFAULT_BANDWIDTH: f64 = 0.1;

/// Estimates clean origins of noisy points from an evaluated population.
///
/// The population only grows through [`BayesianEstimator::append`]; queries
/// never modify it.
///
/// # Examples
///
/// ```
/// use diffevo::estimator::BayesianEstimator;
/// use diffevo::population::Population;
/// use nalgebra::DMatrix;
///
/// let population = Population::new(
///     DMatrix::from_row_slice(2, 1, &[0.0, 1.0]),
///     vec![1.0, 0.0],
/// )
/// .unwrap();
/// let estimator = BayesianEstimator::new(population, 0.99).unwrap();
///
/// let x0 = estimator.estimate(&DMatrix::from_row_slice(1, 1, &[0.05])).unwrap();
/// assert!(x0[(0, 0)].abs() < 1e-3);
/// ```
#[derive(Clone, Debug)]
pub struct BayesianEstimator {
    population: Population,
    alpha: f64,
    density: DensityMethod,
    bandwidth: f64,
}

impl BayesianEstimator {
    /// Creates an estimator with uniform query density and default bandwidth.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidAlpha` if `alpha` is not in `(0, 1)`.
    pub fn new(population: Population, alpha: f64) -> Result<Self> {
        Self::builder(population).alpha(alpha).build()
    }

    /// Creates a builder for configuring a `BayesianEstimator`.
    #[must_use]
    pub fn builder(population: Population) -> BayesianEstimatorBuilder {
        BayesianEstimatorBuilder::new(population)
    }

    /// Pools `other`'s population into this one.
    ///
    /// Order is irrelevant to the estimate, which is a weighted sum over the
    /// union. `alpha`, density and bandwidth of `self` are kept.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the two populations have
    /// different dimensionality.
    pub fn append(&mut self, other: &BayesianEstimator) -> Result<()> {
        self.population.append(&other.population)?;
        trace_debug!(
            n_samples = self.population.len(),
            added = other.population.len(),
            "estimator population extended"
        );
        Ok(())
    }

    /// Returns the density of each query point within its own batch.
    #[must_use]
    pub fn density(&self, x_t: &DMatrix<f64>) -> Vec<f64> {
        self.density.density(x_t)
    }

    /// Returns the `M × N` matrix of importance weights, one row per query.
    ///
    /// When the largest fitness exceeds 1, every fitness is divided by it
    /// before weighting.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `x_t` does not have the
    /// population's dimensionality.
    pub fn weights(&self, x_t: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.check_dims(x_t)?;

        let samples = self.population.samples();
        let fitness = self.population.fitness();
        let fitness_scale = fitness.iter().copied().fold(1.0, f64::max);
        let means = samples * self.alpha.sqrt();
        let two_var = 2.0 * (1.0 - self.alpha);
        let density = self.density(x_t);

        Ok(DMatrix::from_fn(x_t.nrows(), samples.nrows(), |j, i| {
            let likelihood = (-squared_distance(x_t, j, &means, i) / two_var).exp();
            (fitness[i] / fitness_scale + WEIGHT_EPSILON) * (likelihood + WEIGHT_EPSILON)
                / (density[j] + WEIGHT_EPSILON)
        }))
    }

    /// Estimates the clean origin of every row of `x_t`.
    ///
    /// Each output row depends only on the matching query row: permuting the
    /// batch permutes the result the same way. An empty batch yields an
    /// empty `0 × D` result.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `x_t` does not have the
    /// population's dimensionality.
    pub fn estimate(&self, x_t: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let weights = self.weights(x_t)?;
        let mut origins = &weights * self.population.samples();

        for (j, mut row) in origins.row_iter_mut().enumerate() {
            let z = weights.row(j).sum();
            row /= z + WEIGHT_EPSILON;
        }
        Ok(origins)
    }

    /// Returns the stored population.
    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Returns the number of stored samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.population.len()
    }

    /// Always `false`: an estimator cannot be built without samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    /// Returns the noise level the population is conditioned on.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns the query density method.
    #[must_use]
    pub fn density_method(&self) -> DensityMethod {
        self.density
    }

    /// Returns the density bandwidth `h`.
    ///
    /// The uniform method does not read it.
    #[must_use]
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    fn check_dims(&self, x_t: &DMatrix<f64>) -> Result<()> {
        if x_t.ncols() == self.population.n_dims() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.population.n_dims(),
                got: x_t.ncols(),
            })
        }
    }
}

impl core::fmt::Display for BayesianEstimator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "<BayesianEstimator {} samples>", self.population.len())
    }
}

/// Squared Euclidean distance between row `j` of `a` and row `i` of `b`.
///
/// One-dimensional points take a direct path; the result is bit-identical
/// to [`squared_distance_dense`].
#[inline]
fn squared_distance(a: &DMatrix<f64>, j: usize, b: &DMatrix<f64>, i: usize) -> f64 {
    if a.ncols() == 1 {
        let d = a[(j, 0)] - b[(i, 0)];
        d * d
    } else {
        squared_distance_dense(a, j, b, i)
    }
}

#[inline]
fn squared_distance_dense(a: &DMatrix<f64>, j: usize, b: &DMatrix<f64>, i: usize) -> f64 {
    (0..a.ncols())
        .map(|k| {
            let d = a[(j, k)] - b[(i, k)];
            d * d
        })
        .sum()
}

/// Builder for configuring a [`BayesianEstimator`].
///
/// Defaults:
/// - `alpha`: unset, must be provided
/// - `density`: [`DensityMethod::Uniform`]
/// - `bandwidth`: 0.1
///
/// Density can also be set by name; unknown names make `build()` fail.
///
/// # Examples
///
/// ```
/// use diffevo::estimator::{BayesianEstimator, DensityMethod};
/// use diffevo::population::Population;
/// use diffevo::Error;
/// use nalgebra::DMatrix;
///
/// let population = Population::new(DMatrix::from_element(3, 2, 0.5), vec![1.0; 3]).unwrap();
///
/// let estimator = BayesianEstimator::builder(population.clone())
///     .alpha(0.5)
///     .density(DensityMethod::Uniform)
///     .bandwidth(0.2)
///     .build()
///     .unwrap();
/// assert_eq!(estimator.len(), 3);
///
/// let result = BayesianEstimator::builder(population)
///     .alpha(0.5)
///     .density_name("kde")
///     .build();
/// assert!(matches!(result, Err(Error::UnsupportedDensity(_))));
/// ```
#[derive(Clone, Debug)]
pub struct BayesianEstimatorBuilder {
    population: Population,
    alpha: Option<f64>,
    density: DensityMethod,
    raw_density: Option<String>,
    bandwidth: f64,
}

impl BayesianEstimatorBuilder {
    /// Creates a builder around `population` with default settings.
    #[must_use]
    pub fn new(population: Population) -> Self {
        Self {
            population,
            alpha: None,
            density: DensityMethod::default(),
            raw_density: None,
            bandwidth: DEFAULT_BANDWIDTH,
        }
    }

    /// Sets the noise level `α ∈ (0, 1)` the population is conditioned on.
    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Sets the query density method.
    #[must_use]
    pub fn density(mut self, density: DensityMethod) -> Self {
        self.density = density;
        self.raw_density = None;
        self
    }

    /// Sets the query density method by configuration name.
    ///
    /// Parsing is deferred to `build()`, which returns
    /// `Err(Error::UnsupportedDensity)` for an unknown name.
    #[must_use]
    pub fn density_name(mut self, name: impl Into<String>) -> Self {
        self.raw_density = Some(name.into());
        self
    }

    /// Sets the density bandwidth `h`.
    ///
    /// `build()` returns `Err(Error::InvalidBandwidth)` unless it is positive.
    #[must_use]
    pub fn bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Builds the configured [`BayesianEstimator`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidAlpha` if alpha is unset or not in `(0, 1)`.
    /// Returns `Error::UnsupportedDensity` for an unknown density name.
    /// Returns `Error::InvalidBandwidth` if bandwidth is not positive.
    pub fn build(self) -> Result<BayesianEstimator> {
        let alpha = self.alpha.unwrap_or(f64::NAN);
        if alpha.is_nan() || alpha <= 0.0 || alpha >= 1.0 {
            return Err(Error::InvalidAlpha(alpha));
        }
        let density = match self.raw_density {
            Some(name) => name.parse()?,
            None => self.density,
        };
        if self.bandwidth.is_nan() || self.bandwidth <= 0.0 {
            return Err(Error::InvalidBandwidth(self.bandwidth));
        }

        trace_debug!(
            n_samples = self.population.len(),
            n_dims = self.population.n_dims(),
            alpha,
            %density,
            "bayesian estimator built"
        );

        Ok(BayesianEstimator {
            population: self.population,
            alpha,
            density,
            bandwidth: self.bandwidth,
        })
    }
}
