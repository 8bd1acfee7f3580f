//! Pairwise distance engine.
//!
//! Two entry points:
//! - [`pairwise_distances`]: every query row against every candidate row.
//! - [`time_grouped_pairwise_distances`]: n x n distances restricted to
//!   time-causal blocks. Items are bucketed by `floor(year / groupby) *
//!   groupby`; each bucket is compared only against itself and earlier
//!   buckets. Pairs outside every block are never computed and stay 0.
//!
//! Query rows are split into [`RowBlocks`] of `n_jobs` disjoint slices that
//! are computed independently and written back in block order.

use crate::error::{Error, Result};
use crate::features::FeatureMatrix;
use crate::matrix::DenseMatrix;
use crate::metric::Metric;
use crate::parallel::RowBlocks;
use crate::time::TimeIndex;
use serde::{Deserialize, Serialize};

/// How the bootstrap obtains its per-iteration distance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMode {
    /// One global n x n computation.
    #[default]
    Plain,
    /// Time-causal blocks of `groupby` years. Requires a time index.
    Grouped { groupby: i32 },
}

/// Distance matrix between the rows of `x` (queries) and the rows of `y`
/// (candidates), or of `x` with itself when `y` is `None`.
///
/// # Arguments
/// * `x` - Query feature matrix (n_x x d)
/// * `y` - Optional candidate feature matrix (n_y x d)
/// * `metric` - Distance metric
/// * `n_jobs` - Number of row blocks computed in parallel (>= 1)
///
/// # Returns
/// n_x x n_y distance matrix
pub fn pairwise_distances(
    x: &FeatureMatrix,
    y: Option<&FeatureMatrix>,
    metric: &Metric,
    n_jobs: usize,
) -> Result<DenseMatrix> {
    check_jobs(n_jobs)?;
    if let Some(y) = y {
        if x.ncols() != y.ncols() {
            return Err(Error::DimensionMismatch {
                what: "candidate feature count",
                expected: x.ncols(),
                found: y.ncols(),
            });
        }
    }

    let queries = x.to_rows();
    let separate = y.map(FeatureMatrix::to_rows);
    let prepared = metric.prepare(&queries, separate.as_ref())?;
    let candidates = separate.as_ref().unwrap_or(&queries);
    let (nx, ny) = (queries.len(), candidates.len());

    let blocks = RowBlocks::new(nx, n_jobs);
    // Each block holds its rows' distances row-major: (i - start) * ny + j.
    let computed: Vec<(usize, Vec<f64>)> = blocks.map(|range| {
        let start = range.start;
        let mut out = Vec::with_capacity(range.len() * ny);
        for i in range {
            for j in 0..ny {
                out.push(prepared.between(&queries, i, candidates, j));
            }
        }
        (start, out)
    });

    let mut dm = DenseMatrix::zeros(nx, ny);
    for (start, block) in computed {
        for (k, &v) in block.iter().enumerate() {
            dm[(start + k / ny, k % ny)] = v;
        }
    }
    Ok(dm)
}

/// Distances between each item and its potential predecessors.
///
/// Items are grouped into buckets of `groupby` years. For each bucket the
/// distances between its members (queries) and all members of the same or
/// earlier buckets (candidates) are computed and scattered into the full
/// n x n matrix. Every other entry is 0 and must not be read as a distance;
/// callers mask acausal pairs themselves.
///
/// # Arguments
/// * `x` - Feature matrix (n x d)
/// * `time_index` - One timestamp per row of `x`
/// * `metric` - Distance metric
/// * `groupby` - Bucket width in years (>= 1)
/// * `n_jobs` - Number of row blocks computed in parallel per bucket
pub fn time_grouped_pairwise_distances(
    x: &FeatureMatrix,
    time_index: &TimeIndex,
    metric: &Metric,
    groupby: i32,
    n_jobs: usize,
) -> Result<DenseMatrix> {
    time_index.check_len(x.nrows())?;
    if groupby < 1 {
        return Err(Error::invalid("groupby", format!("must be >= 1, got {groupby}")));
    }
    check_jobs(n_jobs)?;

    let n = x.nrows();
    let buckets = time_index.year_buckets(groupby);
    let mut years = buckets.clone();
    years.sort_unstable();
    years.dedup();

    let mut dm = DenseMatrix::zeros(n, n);
    for year in years {
        let query_idx: Vec<usize> = (0..n).filter(|&i| buckets[i] == year).collect();
        let cand_idx: Vec<usize> = (0..n).filter(|&i| buckets[i] <= year).collect();
        if query_idx.is_empty() || cand_idx.is_empty() {
            continue;
        }
        log::trace!(
            "bucket {}: {} queries x {} candidates",
            year,
            query_idx.len(),
            cand_idx.len()
        );
        let chunk = pairwise_distances(
            &x.select_rows(&query_idx),
            Some(&x.select_rows(&cand_idx)),
            metric,
            n_jobs,
        )?;
        for (a, &i) in query_idx.iter().enumerate() {
            for (b, &j) in cand_idx.iter().enumerate() {
                dm[(i, j)] = chunk[(a, b)];
            }
        }
    }
    Ok(dm)
}

/// Compute the n x n distance matrix of `x` according to `mode`.
pub fn distances_for_mode(
    x: &FeatureMatrix,
    time_index: Option<&TimeIndex>,
    metric: &Metric,
    mode: DistanceMode,
    n_jobs: usize,
) -> Result<DenseMatrix> {
    match mode {
        DistanceMode::Plain => pairwise_distances(x, None, metric, n_jobs),
        DistanceMode::Grouped { groupby } => {
            let ti = time_index.ok_or(Error::MissingTimeIndex)?;
            time_grouped_pairwise_distances(x, ti, metric, groupby, n_jobs)
        }
    }
}

fn check_jobs(n_jobs: usize) -> Result<()> {
    if n_jobs == 0 {
        return Err(Error::invalid("n_jobs", "must be >= 1"));
    }
    Ok(())
}
