//! Evaluated samples and their fitness scores.
//!
//! A [`Population`] is the evidence an estimator conditions on: `N` points in
//! a shared `D`-dimensional coordinate space (one point per matrix row) and
//! `N` co-indexed, non-negative fitness values. It only ever grows, through
//! [`Population::append`].

use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// `N` evaluated samples (`N × D`) and their `N` fitness values.
#[derive(Clone, Debug, PartialEq)]
pub struct Population {
    samples: DMatrix<f64>,
    fitness: Vec<f64>,
}

impl Population {
    /// Creates a population after checking that it is non-empty, that every
    /// point has at least one coordinate, and that fitness is co-indexed,
    /// finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyPopulation` if `samples` has no rows.
    /// Returns `Error::ZeroDimensions` if `samples` has no columns.
    /// Returns `Error::LengthMismatch` if `fitness.len() != samples.nrows()`.
    /// Returns `Error::InvalidFitness` for a negative or non-finite fitness value.
    pub fn new(samples: DMatrix<f64>, fitness: Vec<f64>) -> Result<Self> {
        if samples.nrows() == 0 {
            return Err(Error::EmptyPopulation);
        }
        if samples.ncols() == 0 {
            return Err(Error::ZeroDimensions);
        }
        if fitness.len() != samples.nrows() {
            return Err(Error::LengthMismatch {
                samples: samples.nrows(),
                fitness: fitness.len(),
            });
        }
        if let Some((index, &value)) = fitness
            .iter()
            .enumerate()
            .find(|(_, f)| !f.is_finite() || **f < 0.0)
        {
            return Err(Error::InvalidFitness { index, value });
        }

        Ok(Self { samples, fitness })
    }

    /// Creates a population from row vectors, as an evaluation loop usually
    /// collects them.
    ///
    /// # Errors
    ///
    /// Same as [`Population::new`], plus `Error::DimensionMismatch` when the
    /// rows do not all have the same length.
    pub fn from_rows(rows: &[Vec<f64>], fitness: Vec<f64>) -> Result<Self> {
        let n_dims = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().find(|r| r.len() != n_dims) {
            return Err(Error::DimensionMismatch {
                expected: n_dims,
                got: row.len(),
            });
        }
        let samples = DMatrix::from_fn(rows.len(), n_dims, |i, j| rows[i][j]);
        Self::new(samples, fitness)
    }

    /// Concatenates `other` onto this population along the sample axis.
    ///
    /// No deduplication and no reordering takes place.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the two populations live in
    /// coordinate spaces of different dimensionality. `self` is unchanged
    /// in that case.
    pub fn append(&mut self, other: &Population) -> Result<()> {
        if other.n_dims() != self.n_dims() {
            return Err(Error::DimensionMismatch {
                expected: self.n_dims(),
                got: other.n_dims(),
            });
        }

        let n_self = self.len();
        let n_total = n_self + other.len();
        let merged = DMatrix::from_fn(n_total, self.n_dims(), |i, j| {
            if i < n_self {
                self.samples[(i, j)]
            } else {
                other.samples[(i - n_self, j)]
            }
        });
        self.samples = merged;
        self.fitness.extend_from_slice(&other.fitness);
        Ok(())
    }

    /// Returns the number of samples `N`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.nrows()
    }

    /// Always `false`: construction rejects empty populations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.nrows() == 0
    }

    /// Returns the dimensionality `D` of the coordinate space.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.samples.ncols()
    }

    /// Returns the samples, one point per row.
    #[must_use]
    pub fn samples(&self) -> &DMatrix<f64> {
        &self.samples
    }

    /// Returns the fitness values, co-indexed with [`Population::samples`].
    #[must_use]
    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    /// Returns the index and fitness of the fittest sample.
    ///
    /// Ties resolve to the lowest index.
    #[must_use]
    pub fn best(&self) -> (usize, f64) {
        self.fitness
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, f)| {
                if f > best.1 { (i, f) } else { best }
            })
    }
}
