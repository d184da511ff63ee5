/// Errors returned by the estimator, the diffusion step and their builders.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a density method name is not one of the supported variants.
    #[error("density estimator '{0}' is not implemented")]
    UnsupportedDensity(String),

    /// Returned when an estimator is built from zero samples.
    #[error("population requires at least one sample")]
    EmptyPopulation,

    /// Returned when samples have zero dimensions.
    #[error("samples must have at least one dimension")]
    ZeroDimensions,

    /// Returned when the fitness vector is not co-indexed with the samples.
    #[error("length mismatch: {samples} samples but {fitness} fitness values")]
    LengthMismatch {
        /// Number of sample rows.
        samples: usize,
        /// Number of fitness values.
        fitness: usize,
    },

    /// Returned when two point sets that must share a coordinate space do not.
    #[error("dimension mismatch: expected {expected} dimensions but got {got}")]
    DimensionMismatch {
        /// The dimensionality of the stored population.
        expected: usize,
        /// The dimensionality that was supplied.
        got: usize,
    },

    /// Returned when the noisy batch and the origin estimate differ in shape.
    #[error("shape mismatch: expected {expected:?} but got {got:?}")]
    ShapeMismatch {
        /// Shape of `xt` as `(rows, cols)`.
        expected: (usize, usize),
        /// Shape of `x0` as `(rows, cols)`.
        got: (usize, usize),
    },

    /// Returned when a fitness value is negative, NaN or infinite.
    #[error("invalid fitness at index {index}: {value} must be finite and non-negative")]
    InvalidFitness {
        /// Position of the offending value.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when a signal-retention coefficient lies outside its valid range.
    #[error("invalid alpha: {0} is outside the valid range")]
    InvalidAlpha(f64),

    /// Returned when a reverse step would move toward more noise.
    #[error("invalid schedule: alpha_past ({alpha_past}) must be >= alpha ({alpha})")]
    InvalidSchedule {
        /// Current noise level.
        alpha: f64,
        /// Target noise level.
        alpha_past: f64,
    },

    /// Returned when the noise scale is negative or not finite.
    #[error("invalid noise scale: {0} must be finite and non-negative")]
    InvalidNoiseScale(f64),

    /// Returned when the elite rate is not in `[0.0, 1.0]`.
    #[error("invalid elite rate: {0} must be in [0.0, 1.0]")]
    InvalidEliteRate(f64),

    /// Returned when bandwidth is not positive.
    #[error("invalid bandwidth: {0} must be positive")]
    InvalidBandwidth(f64),

    /// Returned when a box domain has inverted or misaligned bounds.
    #[error("invalid bounds: low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a diffusion schedule is requested with zero steps.
    #[error("diffusion schedule requires at least one step")]
    InvalidStepCount,
}

pub type Result<T> = core::result::Result<T, Error>;
