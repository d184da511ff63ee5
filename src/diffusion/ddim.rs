//! One reverse step of the DDIM recursion.
//!
//! Under the forward corruption model `x_t = sqrt(α_t) x_0 + sqrt(1 - α_t) ε`,
//! a noisy batch and an estimate of its origin determine the implied noise
//! `ε̂ = (x_t - sqrt(α_t) x̂_0) / sqrt(1 - α_t)`. The step then re-noises the
//! origin to the less noisy level `α_{t-1}`:
//!
//! `x_{t-1} = sqrt(α_{t-1}) x̂_0 + sqrt(1 - α_{t-1} - σ²) ε̂ + σ z`,  `z ~ N(0, I)`
//!
//! with `σ = η · σ_DDPM(α_t, α_{t-1})`. `η = 0` gives the deterministic DDIM
//! update, `η = 1` gives ancestral (DDPM-equivalent) sampling.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::rng_util;

/// The ancestral-sampling standard deviation for a step from `alpha` to `alpha_past`.
///
/// `σ = sqrt((1 - α_{t-1}) / (1 - α_t) · (1 - α_t / α_{t-1}))`
///
/// # Errors
///
/// Returns `Error::InvalidAlpha` if `alpha` is outside `(0, 1)` or
/// `alpha_past` is outside `(0, 1]`.
/// Returns `Error::InvalidSchedule` if `alpha_past < alpha`.
pub fn ddpm_sigma(alpha: f64, alpha_past: f64) -> Result<f64> {
    validate_alphas(alpha, alpha_past)?;
    Ok(((1.0 - alpha_past) / (1.0 - alpha) * (1.0 - alpha / alpha_past)).sqrt())
}

/// Advances the noisy batch `xt` one reverse-diffusion step toward `x0`.
///
/// `xt` and `x0` hold one point per row and must have the same shape; the
/// result has that shape too. `noise_scale` multiplies the ancestral
/// standard deviation: `None` means a unit scale (full DDPM stochasticity),
/// `Some(0.0)` makes the step deterministic and leaves `rng` untouched.
///
/// A `noise_scale` above 1 can push `σ²` past `1 - α_{t-1}`; the coefficient
/// of the recovered noise is clamped at zero in that case.
///
/// # Errors
///
/// Returns `Error::ShapeMismatch` if `xt` and `x0` differ in shape.
/// Returns `Error::InvalidNoiseScale` for a negative or non-finite scale.
/// Returns the errors of [`ddpm_sigma`] for an invalid `(alpha, alpha_past)` pair.
pub fn ddim_step(
    xt: &DMatrix<f64>,
    x0: &DMatrix<f64>,
    alpha: f64,
    alpha_past: f64,
    noise_scale: Option<f64>,
    rng: &mut fastrand::Rng,
) -> Result<DMatrix<f64>> {
    if xt.shape() != x0.shape() {
        return Err(Error::ShapeMismatch {
            expected: xt.shape(),
            got: x0.shape(),
        });
    }
    let eta = noise_scale.unwrap_or(1.0);
    if !eta.is_finite() || eta < 0.0 {
        return Err(Error::InvalidNoiseScale(eta));
    }

    let sigma = eta * ddpm_sigma(alpha, alpha_past)?;
    let sqrt_alpha = alpha.sqrt();
    let inv_sqrt_one_minus_alpha = 1.0 / (1.0 - alpha).sqrt();
    let sqrt_alpha_past = alpha_past.sqrt();
    let eps_coef = (1.0 - alpha_past - sigma * sigma).max(0.0).sqrt();

    let mut x_next = DMatrix::from_fn(xt.nrows(), xt.ncols(), |i, j| {
        let origin = x0[(i, j)];
        let eps = (xt[(i, j)] - sqrt_alpha * origin) * inv_sqrt_one_minus_alpha;
        sqrt_alpha_past * origin + eps_coef * eps
    });

    if sigma > 0.0 {
        for v in x_next.iter_mut() {
            *v += sigma * rng_util::standard_normal(rng);
        }
    }

    Ok(x_next)
}

fn validate_alphas(alpha: f64, alpha_past: f64) -> Result<()> {
    if alpha.is_nan() || alpha <= 0.0 || alpha >= 1.0 {
        return Err(Error::InvalidAlpha(alpha));
    }
    if alpha_past.is_nan() || alpha_past <= 0.0 || alpha_past > 1.0 {
        return Err(Error::InvalidAlpha(alpha_past));
    }
    if alpha_past < alpha {
        return Err(Error::InvalidSchedule { alpha, alpha_past });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> fastrand::Rng {
        fastrand::Rng::with_seed(42)
    }

    #[test]
    fn test_identity_step_when_alpha_unchanged() {
        let xt = DMatrix::from_row_slice(1, 1, &[1.0]);
        let x0 = DMatrix::from_row_slice(1, 1, &[0.0]);
        let next = ddim_step(&xt, &x0, 0.5, 0.5, Some(0.0), &mut rng()).unwrap();
        assert!((next[(0, 0)] - 1.0).abs() < 1e-12, "got {}", next[(0, 0)]);
    }

    #[test]
    fn test_unchanged_alpha_keeps_batch_even_with_noise_scale() {
        // σ_DDPM is zero when α does not move, so the scale has nothing to multiply.
        let xt = DMatrix::from_row_slice(2, 2, &[0.3, -1.2, 2.0, 0.7]);
        let x0 = DMatrix::from_row_slice(2, 2, &[0.1, -0.5, 1.0, 0.2]);
        let next = ddim_step(&xt, &x0, 0.7, 0.7, Some(1.0), &mut rng()).unwrap();
        for (a, b) in next.iter().zip(xt.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_noise_is_deterministic() {
        let xt = DMatrix::from_row_slice(3, 2, &[0.3, -1.2, 2.0, 0.7, -0.4, 0.9]);
        let x0 = DMatrix::from_row_slice(3, 2, &[0.1, -0.5, 1.0, 0.2, 0.0, 0.4]);
        let a = ddim_step(&xt, &x0, 0.3, 0.6, Some(0.0), &mut fastrand::Rng::with_seed(1)).unwrap();
        let b = ddim_step(&xt, &x0, 0.3, 0.6, Some(0.0), &mut fastrand::Rng::with_seed(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_preserved() {
        let xt = DMatrix::from_element(7, 3, 0.5);
        let x0 = DMatrix::from_element(7, 3, 0.1);
        let next = ddim_step(&xt, &x0, 0.2, 0.4, None, &mut rng()).unwrap();
        assert_eq!(next.shape(), (7, 3));
        assert!(next.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_unset_noise_scale_is_unit_scale() {
        let xt = DMatrix::from_row_slice(3, 2, &[0.3, -1.2, 2.0, 0.7, -0.4, 0.9]);
        let x0 = DMatrix::from_row_slice(3, 2, &[0.1, -0.5, 1.0, 0.2, 0.0, 0.4]);
        let unset = ddim_step(&xt, &x0, 0.3, 0.6, None, &mut fastrand::Rng::with_seed(9)).unwrap();
        let unit =
            ddim_step(&xt, &x0, 0.3, 0.6, Some(1.0), &mut fastrand::Rng::with_seed(9)).unwrap();
        for (a, b) in unset.iter().zip(unit.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }

        let deterministic =
            ddim_step(&xt, &x0, 0.3, 0.6, Some(0.0), &mut fastrand::Rng::with_seed(9)).unwrap();
        assert_ne!(unset, deterministic);
    }

    #[test]
    fn test_large_noise_scale_clamps_recovered_noise() {
        // σ² exceeds 1 - α_{t-1}; the eps term drops out instead of going NaN.
        let xt = DMatrix::from_element(5, 2, 0.8);
        let x0 = DMatrix::from_element(5, 2, -0.3);
        let next = ddim_step(&xt, &x0, 0.3, 0.6, Some(3.0), &mut rng()).unwrap();
        assert_eq!(next.shape(), (5, 2));
        assert!(next.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_final_step_lands_on_origin() {
        // α_{t-1} = 1 means no noise left: the step returns the origin exactly.
        let xt = DMatrix::from_row_slice(1, 2, &[0.9, -0.3]);
        let x0 = DMatrix::from_row_slice(1, 2, &[0.25, 0.75]);
        let next = ddim_step(&xt, &x0, 0.5, 1.0, None, &mut rng()).unwrap();
        assert!((next[(0, 0)] - 0.25).abs() < 1e-12);
        assert!((next[(0, 1)] - 0.75).abs() < 1e-12);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_stochastic_step_spread_matches_sigma() {
        let alpha = 0.2;
        let alpha_past = 0.5;
        let sigma = ddpm_sigma(alpha, alpha_past).unwrap();
        let xt = DMatrix::from_element(4000, 1, 0.0);
        let x0 = DMatrix::from_element(4000, 1, 0.0);
        let next = ddim_step(&xt, &x0, alpha, alpha_past, Some(1.0), &mut rng()).unwrap();

        let n = next.len() as f64;
        let mean = next.iter().sum::<f64>() / n;
        let std = (next.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        assert!(mean.abs() < 0.05, "mean = {mean}");
        assert!((std - sigma).abs() < 0.05, "std = {std}, sigma = {sigma}");
    }

    #[test]
    fn test_ddpm_sigma_known_value() {
        // (1 - 0.5) / (1 - 0.2) * (1 - 0.2 / 0.5) = 0.625 * 0.6 = 0.375
        let sigma = ddpm_sigma(0.2, 0.5).unwrap();
        assert!((sigma - 0.375_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_alpha_past() {
        let result = ddpm_sigma(0.5, 0.0);
        assert!(matches!(result, Err(Error::InvalidAlpha(_))));
    }

    #[test]
    fn test_rejects_reverse_schedule() {
        let result = ddpm_sigma(0.6, 0.4);
        assert!(matches!(result, Err(Error::InvalidSchedule { .. })));
    }

    #[test]
    fn test_rejects_alpha_one() {
        let result = ddpm_sigma(1.0, 1.0);
        assert!(matches!(result, Err(Error::InvalidAlpha(_))));
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let xt = DMatrix::from_element(2, 2, 0.0);
        let x0 = DMatrix::from_element(2, 3, 0.0);
        let result = ddim_step(&xt, &x0, 0.5, 0.6, None, &mut rng());
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_rejects_negative_noise_scale() {
        let xt = DMatrix::from_element(1, 1, 0.0);
        let result = ddim_step(&xt, &xt, 0.5, 0.6, Some(-0.1), &mut rng());
        assert!(matches!(result, Err(Error::InvalidNoiseScale(_))));
    }
}
