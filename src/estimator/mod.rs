//! Origin estimation from an evaluated population.
//!
//! - [`bayesian`] - fitness-weighted kernel regression under the diffusion likelihood
//! - [`density`] - query-batch density models used to normalize the weights

pub mod bayesian;
pub mod density;

pub use bayesian::{BayesianEstimator, BayesianEstimatorBuilder, WEIGHT_EPSILON};
pub use density::DensityMethod;
