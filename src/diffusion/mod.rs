//! Reverse-diffusion arithmetic: the DDIM step and alpha schedules.
//!
//! - [`ddim`] - one reverse step from a noisy batch and its origin estimate
//! - [`schedule`] - cosine and linear `α_t` sequences

pub mod ddim;
pub mod schedule;

pub use ddim::{ddim_step, ddpm_sigma};
pub use schedule::{DiffusionSchedule, ScheduleKind};
