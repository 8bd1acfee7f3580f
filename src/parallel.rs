//! Parallel fan-out for distance computations.
//!
//! With the `parallel` feature (on by default) work is spread over a rayon
//! thread pool; without it the same code runs sequentially, which keeps the
//! crate usable on WASM. Work is always split into [`RowBlocks`] that are
//! computed independently and merged in block order, so results never
//! depend on how many workers actually ran.

use std::ops::Range;

/// Conditionally parallel `into_iter()`.
///
/// With the `parallel` feature this is `into_par_iter()`, otherwise plain
/// `into_iter()`. Callers need `rayon::iter::ParallelIterator` in scope
/// under the feature to chain adaptors.
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

pub use iter_maybe_parallel;

/// Split of `0..n` query rows into at most `n_jobs` contiguous, disjoint,
/// nearly equal blocks. Block sizes differ by at most one row and the
/// larger blocks come first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBlocks {
    ranges: Vec<Range<usize>>,
}

impl RowBlocks {
    /// `n_jobs` is clamped to `1..=n`. `n == 0` gives no blocks.
    pub fn new(n: usize, n_jobs: usize) -> Self {
        if n == 0 {
            return Self { ranges: Vec::new() };
        }
        let jobs = n_jobs.clamp(1, n);
        let base = n / jobs;
        let extra = n % jobs;
        let mut ranges = Vec::with_capacity(jobs);
        let mut start = 0;
        for b in 0..jobs {
            let len = base + usize::from(b < extra);
            ranges.push(start..start + len);
            start += len;
        }
        Self { ranges }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Evaluate `f` on every block and return the results in block order.
    ///
    /// With the `parallel` feature and more than one block, blocks run on
    /// rayon's global pool. The output order, and therefore any merge of it,
    /// is the same either way.
    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(Range<usize>) -> T + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        if self.ranges.len() > 1 {
            use rayon::iter::ParallelIterator;

            return iter_maybe_parallel!(self.ranges.clone()).map(&f).collect();
        }
        self.ranges.iter().cloned().map(f).collect()
    }
}
