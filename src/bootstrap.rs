//! Bootstrap nearest-neighbour estimation.
//!
//! Each iteration draws a random subset of feature columns (with
//! replacement), computes item-to-item distances on that subset, and credits
//! every item's nearest admissible neighbour. After all iterations the tally
//! is divided by the iteration count, giving for every ordered pair `(i, j)`
//! the fraction of iterations in which `j` was selected for `i`.
//!
//! An item is never its own neighbour. With a time index, `j` is admissible
//! for `i` only when `time(j) <= time(i)`.
//!
//! # Earliest item
//!
//! An item without any admissible candidate, such as the chronologically
//! first item, is skipped in every iteration and ends up with an all-zero
//! frequency row. There is no fallback for it.

use crate::distance::{distances_for_mode, DistanceMode};
use crate::error::{Error, Result};
use crate::features::FeatureMatrix;
use crate::matrix::DenseMatrix;
use crate::metric::Metric;
use crate::progress::{NoProgress, Progress};
use crate::time::TimeIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Default tolerance for [`Selection::AllMinima`].
pub const DEFAULT_MIN_TOL: f64 = 0.001;

/// Which candidates a row credits per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Selection {
    /// The single closest candidate, ties to the lowest index.
    #[default]
    Nearest,
    /// Every candidate within `tol` of the row minimum.
    AllMinima { tol: f64 },
}

impl Selection {
    /// All minima with the default tolerance.
    pub fn all_minima() -> Self {
        Selection::AllMinima {
            tol: DEFAULT_MIN_TOL,
        }
    }
}

/// Parameters of a bootstrap run.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Number of bootstrap iterations.
    pub n_iter: usize,
    /// Proportion of features drawn per iteration, in (0, 1].
    pub sample_prop: f64,
    pub metric: Metric,
    /// Number of row blocks the distance computation is split into.
    pub n_jobs: usize,
    pub selection: Selection,
    pub mode: DistanceMode,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_iter: 1000,
            sample_prop: 0.5,
            metric: Metric::Cosine,
            n_jobs: 1,
            selection: Selection::Nearest,
            mode: DistanceMode::Plain,
        }
    }
}

impl BootstrapConfig {
    /// Check the configuration against the input and return the number of
    /// features drawn per iteration.
    pub fn validate(&self, x: &FeatureMatrix, time_index: Option<&TimeIndex>) -> Result<usize> {
        let (n, d) = x.shape();
        if n < 2 {
            return Err(Error::invalid("x", format!("need at least 2 items, got {n}")));
        }
        if self.n_iter == 0 {
            return Err(Error::invalid("n_iter", "must be >= 1"));
        }
        if !(self.sample_prop > 0.0 && self.sample_prop <= 1.0) {
            return Err(Error::invalid(
                "sample_prop",
                format!("must lie in (0, 1], got {}", self.sample_prop),
            ));
        }
        if self.n_jobs == 0 {
            return Err(Error::invalid("n_jobs", "must be >= 1"));
        }
        if let Selection::AllMinima { tol } = self.selection {
            if !(tol >= 0.0) {
                return Err(Error::invalid("tol", format!("must be >= 0, got {tol}")));
            }
        }
        if let Some(ti) = time_index {
            ti.check_len(n)?;
        }
        if let DistanceMode::Grouped { groupby } = self.mode {
            if time_index.is_none() {
                return Err(Error::MissingTimeIndex);
            }
            if groupby < 1 {
                return Err(Error::invalid("groupby", format!("must be >= 1, got {groupby}")));
            }
        }
        let sample_size = (d as f64 * self.sample_prop) as usize;
        if sample_size == 0 {
            return Err(Error::invalid(
                "sample_prop",
                format!("{} of {} features rounds down to zero", self.sample_prop, d),
            ));
        }
        Ok(sample_size)
    }
}

/// Normalized neighbour-selection frequencies (n x n).
///
/// Entry `(i, j)` is the fraction of iterations in which `j` was selected as
/// a neighbour of `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyMatrix {
    values: DenseMatrix,
    n_iter: usize,
}

impl FrequencyMatrix {
    /// Wrap precomputed frequencies, e.g. loaded from an earlier run.
    pub fn from_matrix(values: DenseMatrix, n_iter: usize) -> Result<Self> {
        if values.nrows() != values.ncols() {
            return Err(Error::DimensionMismatch {
                what: "frequency matrix columns",
                expected: values.nrows(),
                found: values.ncols(),
            });
        }
        if let Some(v) = values.as_slice().iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(Error::invalid("frequencies", format!("{v} outside [0, 1]")));
        }
        Ok(Self { values, n_iter })
    }

    /// Number of items.
    #[inline]
    pub fn n(&self) -> usize {
        self.values.nrows()
    }

    /// Number of iterations the tally was normalized by.
    #[inline]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        self.values.row(i)
    }

    /// First off-diagonal column holding the row maximum, with its value.
    pub fn row_argmax(&self, i: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for j in (0..self.n()).filter(|&j| j != i) {
            let v = self.get(i, j);
            if best.map_or(true, |(_, b)| v > b) {
                best = Some((j, v));
            }
        }
        best
    }

    /// Off-diagonal columns whose frequency in row `i` is at least `sigma`.
    pub fn row_above(&self, i: usize, sigma: f64) -> Vec<usize> {
        (0..self.n())
            .filter(|&j| j != i && self.get(i, j) >= sigma)
            .collect()
    }

    pub fn as_matrix(&self) -> &DenseMatrix {
        &self.values
    }

    pub fn into_matrix(self) -> DenseMatrix {
        self.values
    }
}

/// Mask the diagonal and, with a time index, every acausal pair.
///
/// The diagonal becomes `+inf`; pairs with `time(j) > time(i)` become NaN,
/// which selection treats as "not comparable".
fn mask_candidates(dm: &mut DenseMatrix, time_index: Option<&TimeIndex>) {
    dm.fill_diagonal(f64::INFINITY);
    if let Some(ti) = time_index {
        let n = dm.nrows();
        for j in 0..n {
            for i in 0..n {
                if !ti.is_causal(i, j) {
                    dm[(i, j)] = f64::NAN;
                }
            }
        }
    }
}

/// Smallest finite entry of row `i` and its first column.
fn row_min(dm: &DenseMatrix, i: usize) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for j in 0..dm.ncols() {
        let v = dm[(i, j)];
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| v < b) {
            best = Some((j, v));
        }
    }
    best.filter(|(_, v)| v.is_finite())
}

/// Credit the selected neighbours of every row; returns the number of rows
/// that had no admissible candidate.
fn credit_neighbors(tally: &mut DenseMatrix, dm: &DenseMatrix, selection: Selection) -> usize {
    let mut degenerate = 0usize;
    for i in 0..dm.nrows() {
        let Some((argmin, min)) = row_min(dm, i) else {
            degenerate += 1;
            continue;
        };
        match selection {
            Selection::Nearest => tally[(i, argmin)] += 1.0,
            Selection::AllMinima { tol } => {
                for j in 0..dm.ncols() {
                    if (dm[(i, j)] - min).abs() < tol {
                        tally[(i, j)] += 1.0;
                    }
                }
            }
        }
    }
    degenerate
}

/// Estimate neighbour-selection frequencies by feature bootstrapping.
///
/// # Arguments
/// * `x` - Feature matrix (n x d), rows are items
/// * `time_index` - Optional timestamps; restricts candidates to earlier or
///   simultaneous items
/// * `config` - Run parameters
/// * `rng` - Source of the feature samples
/// * `progress` - Receives one tick per completed iteration
///
/// # Returns
/// n x n [`FrequencyMatrix`] with entries in [0, 1] and a zero diagonal.
pub fn bootstrap_neighbors<R, P>(
    x: &FeatureMatrix,
    time_index: Option<&TimeIndex>,
    config: &BootstrapConfig,
    rng: &mut R,
    mut progress: P,
) -> Result<FrequencyMatrix>
where
    R: Rng + ?Sized,
    P: Progress,
{
    let sample_size = config.validate(x, time_index)?;
    let (n, d) = x.shape();
    log::debug!(
        "bootstrap: {} items, {} of {} features per iteration, {} iterations, metric {}, {:?}",
        n,
        sample_size,
        d,
        config.n_iter,
        config.metric,
        config.mode
    );

    let mut tally = DenseMatrix::zeros(n, n);
    let mut degenerate = 0usize;
    for iteration in 0..config.n_iter {
        let features: Vec<usize> = (0..sample_size).map(|_| rng.gen_range(0..d)).collect();
        let reduced = x.select_columns(&features);
        let mut dm = distances_for_mode(&reduced, time_index, &config.metric, config.mode, config.n_jobs)?;
        mask_candidates(&mut dm, time_index);
        let skipped = credit_neighbors(&mut tally, &dm, config.selection);
        degenerate = degenerate.max(skipped);
        log::trace!("iteration {} done, {} rows without candidates", iteration + 1, skipped);
        progress.tick();
    }
    progress.finish();

    if degenerate > 0 {
        log::debug!(
            "up to {} items per iteration had no admissible neighbour and were skipped",
            degenerate
        );
    }
    tally.scale(1.0 / config.n_iter as f64);
    Ok(FrequencyMatrix {
        values: tally,
        n_iter: config.n_iter,
    })
}

/// [`bootstrap_neighbors`] with a `StdRng` seeded from `seed` and no progress
/// reporting. Identical inputs and seed give bit-identical output.
pub fn bootstrap_neighbors_seeded(
    x: &FeatureMatrix,
    time_index: Option<&TimeIndex>,
    config: &BootstrapConfig,
    seed: u64,
) -> Result<FrequencyMatrix> {
    let mut rng = StdRng::seed_from_u64(seed);
    bootstrap_neighbors(x, time_index, config, &mut rng, NoProgress)
}
