//! One generation of diffusion-guided population sampling.
//!
//! A [`BayesianGenerator`] couples a [`BayesianEstimator`] conditioned on the
//! current population with a DDIM reverse step:
//!
//! 1. estimate the origin `x̂_0` of every noisy point,
//! 2. step the noisy points from `α_t` to `α_{t-1}` toward that estimate,
//! 3. normalize the result into the caller's coordinate domain.
//!
//! The surrounding loop (fitness evaluation, schedule traversal, selection)
//! belongs to the caller.
//!
//! # Examples
//!
//! ```
//! use diffevo::prelude::*;
//! use nalgebra::DMatrix;
//!
//! let mut rng = rng_util::seeded(Some(42));
//! let domain = BoxDomain::symmetric(2, 1.0).unwrap();
//! let schedule = DiffusionSchedule::new(ScheduleKind::Cosine, 20).unwrap();
//!
//! let mut x = rng_util::standard_normal_matrix(&mut rng, 64, 2);
//! for (alpha, alpha_past) in schedule.pairs() {
//!     // Fitness peaks at (0.5, 0.5).
//!     let fitness: Vec<f64> = x
//!         .row_iter()
//!         .map(|p| (-((p[0] - 0.5).powi(2) + (p[1] - 0.5).powi(2)) * 10.0).exp())
//!         .collect();
//!     let population = Population::new(x.clone(), fitness).unwrap();
//!     let generator = BayesianGenerator::builder(population)
//!         .alphas(alpha, alpha_past)
//!         .build()
//!         .unwrap();
//!     x = generator.generate(&x, Some(1.0), 0.0, &domain, &mut rng).unwrap().x_next;
//! }
//! assert!(domain.contains(&x));
//! ```

use nalgebra::DMatrix;

use crate::diffusion::ddim;
use crate::domain::Normalize;
use crate::error::{Error, Result};
use crate::estimator::{BayesianEstimator, BayesianEstimatorBuilder, DensityMethod};
use crate::population::Population;

/// Output of [`BayesianGenerator::generate`].
#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    /// The next-generation noisy population, normalized into the domain.
    pub x_next: DMatrix<f64>,
    /// The estimated origins the step moved toward, before normalization.
    pub x0_est: DMatrix<f64>,
    /// How many top-fitness individuals the caller may carry forward unchanged.
    pub elite_count: usize,
}

/// Produces the next noisy population from the current one.
///
/// Owns one [`BayesianEstimator`] built from the population it was given at
/// noise level `alpha`, and steps toward `alpha_past`.
#[derive(Clone, Debug)]
pub struct BayesianGenerator {
    estimator: BayesianEstimator,
    alpha_past: f64,
    elite_strategy: bool,
}

impl BayesianGenerator {
    /// Creates a generator with default estimator settings.
    ///
    /// # Errors
    ///
    /// Same as [`BayesianGeneratorBuilder::build`].
    pub fn new(population: Population, alpha: f64, alpha_past: f64) -> Result<Self> {
        Self::builder(population).alphas(alpha, alpha_past).build()
    }

    /// Creates a builder for configuring a `BayesianGenerator`.
    #[must_use]
    pub fn builder(population: Population) -> BayesianGeneratorBuilder {
        BayesianGeneratorBuilder::new(population)
    }

    /// Runs one generation on the noisy batch `x`.
    ///
    /// `noise_scale` is passed to [`ddim::ddim_step`] (`None` = full ancestral
    /// noise, `Some(0.0)` = deterministic). `elite_rate` only sizes
    /// [`Generation::elite_count`]; when the elite strategy is off the count
    /// is always zero. The step always advances from `x`, never from `x0_est`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidEliteRate` if `elite_rate` is not in `[0, 1]`.
    /// Returns `Error::DimensionMismatch` if `x` does not match the
    /// population's dimensionality.
    /// Propagates errors from the diffusion step and from `domain`.
    pub fn generate<N>(
        &self,
        x: &DMatrix<f64>,
        noise_scale: Option<f64>,
        elite_rate: f64,
        domain: &N,
        rng: &mut fastrand::Rng,
    ) -> Result<Generation>
    where
        N: Normalize + ?Sized,
    {
        if !(0.0..=1.0).contains(&elite_rate) {
            return Err(Error::InvalidEliteRate(elite_rate));
        }

        let alpha = self.estimator.alpha();
        trace_debug!(
            n_queries = x.nrows(),
            n_samples = self.estimator.len(),
            alpha,
            alpha_past = self.alpha_past,
            ?noise_scale,
            "generating next population"
        );

        let x0_est = self.estimator.estimate(x)?;
        let x_next = ddim::ddim_step(x, &x0_est, alpha, self.alpha_past, noise_scale, rng)?;
        let x_next = domain.normalize(x_next)?;

        Ok(Generation {
            x_next,
            x0_est,
            elite_count: self.elite_count(elite_rate, x.nrows()),
        })
    }

    /// Number of individuals out of `n` covered by `elite_rate`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn elite_count(&self, elite_rate: f64, n: usize) -> usize {
        if self.elite_strategy {
            ((elite_rate * n as f64).floor() as usize).min(n)
        } else {
            0
        }
    }

    /// Returns the owned estimator.
    #[must_use]
    pub fn estimator(&self) -> &BayesianEstimator {
        &self.estimator
    }

    /// Returns the owned estimator mutably, e.g. to pool earlier generations
    /// with [`BayesianEstimator::append`].
    pub fn estimator_mut(&mut self) -> &mut BayesianEstimator {
        &mut self.estimator
    }

    /// Returns the current noise level `α_t`.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.estimator.alpha()
    }

    /// Returns the target noise level `α_{t-1}`.
    #[must_use]
    pub fn alpha_past(&self) -> f64 {
        self.alpha_past
    }

    /// Returns whether the caller asked for elites to be carried forward.
    #[must_use]
    pub fn elite_strategy(&self) -> bool {
        self.elite_strategy
    }
}

/// Builder for configuring a [`BayesianGenerator`].
///
/// Defaults:
/// - `alphas`: unset, must be provided
/// - `density`: [`DensityMethod::Uniform`]
/// - `bandwidth`: 0.1
/// - `elite_strategy`: `false`
#[derive(Clone, Debug)]
pub struct BayesianGeneratorBuilder {
    estimator: BayesianEstimatorBuilder,
    alpha_past: Option<f64>,
    elite_strategy: bool,
}

impl BayesianGeneratorBuilder {
    /// Creates a builder around `population` with default settings.
    #[must_use]
    pub fn new(population: Population) -> Self {
        Self {
            estimator: BayesianEstimatorBuilder::new(population),
            alpha_past: None,
            elite_strategy: false,
        }
    }

    /// Sets the current level `alpha` and the target level `alpha_past`.
    #[must_use]
    pub fn alphas(mut self, alpha: f64, alpha_past: f64) -> Self {
        self.estimator = self.estimator.alpha(alpha);
        self.alpha_past = Some(alpha_past);
        self
    }

    /// Sets the estimator's query density method.
    #[must_use]
    pub fn density(mut self, density: DensityMethod) -> Self {
        self.estimator = self.estimator.density(density);
        self
    }

    /// Sets the estimator's query density method by configuration name.
    #[must_use]
    pub fn density_name(mut self, name: impl Into<String>) -> Self {
        self.estimator = self.estimator.density_name(name);
        self
    }

    /// Sets the estimator's density bandwidth `h`.
    #[must_use]
    pub fn bandwidth(mut self, bandwidth: f64) -> Self {
        self.estimator = self.estimator.bandwidth(bandwidth);
        self
    }

    /// Enables reporting an elite count on every [`Generation`].
    #[must_use]
    pub fn elite_strategy(mut self, enabled: bool) -> Self {
        self.elite_strategy = enabled;
        self
    }

    /// Builds the configured [`BayesianGenerator`].
    ///
    /// # Errors
    ///
    /// Returns the errors of [`BayesianEstimatorBuilder::build`].
    /// Returns `Error::InvalidAlpha` if `alpha_past` is unset or not in `(0, 1]`.
    /// Returns `Error::InvalidSchedule` if `alpha_past < alpha`.
    pub fn build(self) -> Result<BayesianGenerator> {
        let estimator = self.estimator.build()?;
        let alpha_past = self.alpha_past.unwrap_or(f64::NAN);
        // Validates the (alpha, alpha_past) pair exactly as the step will.
        ddim::ddpm_sigma(estimator.alpha(), alpha_past)?;

        trace_info!(
            n_samples = estimator.len(),
            alpha = estimator.alpha(),
            alpha_past,
            elite_strategy = self.elite_strategy,
            "bayesian generator built"
        );

        Ok(BayesianGenerator {
            estimator,
            alpha_past,
            elite_strategy: self.elite_strategy,
        })
    }
}
