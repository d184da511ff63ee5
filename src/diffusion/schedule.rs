//! Cumulative signal-retention schedules.
//!
//! A [`DiffusionSchedule`] holds `α_0 ≥ α_1 ≥ … ≥ α_T` for `T` steps. The
//! driving loop walks it backwards with [`DiffusionSchedule::pairs`], feeding
//! each `(α_t, α_{t-1})` to a generator.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest alpha a schedule emits; keeps `sqrt(α)` away from zero.
pub const MIN_ALPHA: f64 = 1e-5;
/// Highest alpha a schedule emits; keeps `1 - α` away from zero.
pub const MAX_ALPHA: f64 = 1.0 - 1e-5;

const COSINE_OFFSET: f64 = 0.008;
const LINEAR_BETA_START: f64 = 1e-4;
const LINEAR_BETA_END: f64 = 0.02;

/// The family of curve used to generate alphas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScheduleKind {
    /// `α_t = f(t) / f(0)` with `f(t) = cos²(π/2 · (t/T + s) / (1 + s))`, `s = 0.008`.
    #[default]
    Cosine,
    /// `α_t = Π_{k ≤ t} (1 - β_k)` with `β` spaced linearly from `1e-4` to `0.02`.
    Linear,
}

/// A monotone sequence of `T + 1` alphas, from the clean level `α_0` to the
/// noisiest level `α_T`.
///
/// # Examples
///
/// ```
/// use diffevo::diffusion::{DiffusionSchedule, ScheduleKind};
///
/// let schedule = DiffusionSchedule::new(ScheduleKind::Cosine, 10).unwrap();
/// assert_eq!(schedule.n_steps(), 10);
///
/// for (alpha, alpha_past) in schedule.pairs() {
///     assert!(alpha_past >= alpha);
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DiffusionSchedule {
    kind: ScheduleKind,
    alphas: Vec<f64>,
}

impl DiffusionSchedule {
    /// Builds a schedule with `n_steps` reverse steps.
    ///
    /// Every alpha is clamped into `[MIN_ALPHA, MAX_ALPHA]`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStepCount` if `n_steps` is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(kind: ScheduleKind, n_steps: usize) -> Result<Self> {
        if n_steps == 0 {
            return Err(Error::InvalidStepCount);
        }

        let raw: Vec<f64> = match kind {
            ScheduleKind::Cosine => {
                let f = |t: usize| {
                    let phase = (t as f64 / n_steps as f64 + COSINE_OFFSET) / (1.0 + COSINE_OFFSET);
                    (phase * core::f64::consts::FRAC_PI_2).cos().powi(2)
                };
                let f0 = f(0);
                (0..=n_steps).map(|t| f(t) / f0).collect()
            }
            ScheduleKind::Linear => {
                let mut alphas = Vec::with_capacity(n_steps + 1);
                let mut acc = 1.0;
                alphas.push(acc);
                for k in 0..n_steps {
                    let frac = if n_steps == 1 {
                        0.0
                    } else {
                        k as f64 / (n_steps - 1) as f64
                    };
                    let beta = LINEAR_BETA_START + frac * (LINEAR_BETA_END - LINEAR_BETA_START);
                    acc *= 1.0 - beta;
                    alphas.push(acc);
                }
                alphas
            }
        };

        let alphas: Vec<f64> = raw
            .into_iter()
            .map(|a| a.clamp(MIN_ALPHA, MAX_ALPHA))
            .collect();

        trace_debug!(
            ?kind,
            n_steps,
            alpha_min = alphas[n_steps],
            "diffusion schedule built"
        );

        Ok(Self { kind, alphas })
    }

    /// Returns the curve family.
    #[must_use]
    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    /// Returns the number of reverse steps `T`.
    #[must_use]
    pub fn n_steps(&self) -> usize {
        self.alphas.len() - 1
    }

    /// Returns all `T + 1` alphas, cleanest first.
    #[must_use]
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Returns `α_t`, or `None` if `t > T`.
    #[must_use]
    pub fn alpha(&self, t: usize) -> Option<f64> {
        self.alphas.get(t).copied()
    }

    /// Iterates `(α_t, α_{t-1})` from `t = T` down to `t = 1`.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.alphas.windows(2).rev().map(|w| (w[1], w[0]))
    }
}
