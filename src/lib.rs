#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Diffusion-guided, fitness-weighted population sampling for black-box
//! optimization. A population of candidate points is treated as a noisy
//! sample of a reverse diffusion chain: each generation estimates the clean
//! origin of every point from the evaluated population (weighting stored
//! samples by diffusion likelihood and observed fitness) and then takes one
//! DDIM step toward it.
//!
//! # Getting Started
//!
//! ```
//! use diffevo::prelude::*;
//!
//! let mut rng = rng_util::seeded(Some(7));
//! let domain = BoxDomain::symmetric(1, 2.0).unwrap();
//! let schedule = DiffusionSchedule::new(ScheduleKind::Cosine, 25).unwrap();
//!
//! // Fitness is highest at x = 1.
//! let fitness_of = |x: &nalgebra::DMatrix<f64>| -> Vec<f64> {
//!     x.iter().map(|v| (-(v - 1.0).powi(2) * 4.0).exp()).collect()
//! };
//!
//! let mean = |f: Vec<f64>| f.iter().sum::<f64>() / f.len() as f64;
//!
//! let mut x = rng_util::standard_normal_matrix(&mut rng, 128, 1);
//! let initial = mean(fitness_of(&x));
//! for (alpha, alpha_past) in schedule.pairs() {
//!     let population = Population::new(x.clone(), fitness_of(&x)).unwrap();
//!     let generator = BayesianGenerator::new(population, alpha, alpha_past).unwrap();
//!     x = generator.generate(&x, Some(1.0), 0.0, &domain, &mut rng).unwrap().x_next;
//! }
//!
//! assert!(mean(fitness_of(&x)) > initial);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Population`](population::Population) | Evaluated samples (`N × D`) and their non-negative fitness. |
//! | [`BayesianEstimator`](estimator::BayesianEstimator) | Fitness- and likelihood-weighted estimate of the clean origin of noisy points. |
//! | [`ddim_step`](diffusion::ddim_step) | One reverse DDIM/DDPM step from a noisy batch toward its origin estimate. |
//! | [`BayesianGenerator`](generator::BayesianGenerator) | Estimate, step, normalize: one generation. |
//! | [`DiffusionSchedule`](diffusion::DiffusionSchedule) | The `(α_t, α_{t-1})` pairs a generation loop walks through. |
//! | [`Normalize`](domain::Normalize) | Maps generated points back into the search domain. |
//!
//! Points are rows of a [`nalgebra::DMatrix<f64>`]. All randomness goes
//! through a caller-owned [`fastrand::Rng`], so a seeded RNG makes a whole
//! run reproducible.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on configuration enums and meters | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) when generators and estimators are built and run | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod diffusion;
pub mod domain;
mod error;
pub mod estimator;
pub mod generator;
pub mod meters;
pub mod population;
pub mod rng_util;

pub use error::{Error, Result};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use diffevo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::diffusion::{DiffusionSchedule, ScheduleKind, ddim_step, ddpm_sigma};
    pub use crate::domain::{BoxDomain, Normalize, Unbounded};
    pub use crate::error::{Error, Result};
    pub use crate::estimator::{BayesianEstimator, DensityMethod};
    pub use crate::generator::{BayesianGenerator, Generation};
    pub use crate::meters::{AverageMeter, RecorderMeter};
    pub use crate::population::Population;
    pub use crate::rng_util;
}
