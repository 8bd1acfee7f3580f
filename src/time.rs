//! Time index: one timestamp per item, defining the causal order.
//!
//! Item `j` is a valid neighbour candidate of item `i` iff
//! `time(j) <= time(i)`. Timestamps are calendar datetimes; years, month
//! buckets and multi-year buckets are derived from them.

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Ordered sequence of timestamps, parallel to the rows of a feature matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeIndex {
    stamps: Vec<NaiveDateTime>,
}

impl TimeIndex {
    pub fn new(stamps: Vec<NaiveDateTime>) -> Self {
        Self { stamps }
    }

    /// Midnight of each date.
    pub fn from_dates(dates: &[NaiveDate]) -> Self {
        Self::new(dates.iter().map(|d| d.and_time(chrono::NaiveTime::MIN)).collect())
    }

    /// January 1st of each year.
    pub fn from_years(years: &[i32]) -> Result<Self> {
        let dates = years
            .iter()
            .map(|&y| {
                NaiveDate::from_ymd_opt(y, 1, 1)
                    .ok_or_else(|| Error::invalid("time_index", format!("year {y} out of range")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_dates(&dates))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> NaiveDateTime {
        self.stamps[i]
    }

    pub fn as_slice(&self) -> &[NaiveDateTime] {
        &self.stamps
    }

    pub fn year(&self, i: usize) -> i32 {
        self.stamps[i].year()
    }

    /// True when item `j` may serve as a neighbour of item `i`.
    #[inline]
    pub fn is_causal(&self, i: usize, j: usize) -> bool {
        self.stamps[j] <= self.stamps[i]
    }

    /// Bucket key per item: `floor(year / width) * width`.
    pub fn year_buckets(&self, width: i32) -> Vec<i32> {
        self.stamps.iter().map(by_years(width)).collect()
    }

    /// Item indices sorted by timestamp. Stable, so simultaneous items keep
    /// their input order.
    pub fn argsort(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.stamps.len()).collect();
        order.sort_by_key(|&i| self.stamps[i]);
        order
    }

    pub(crate) fn check_len(&self, rows: usize) -> Result<()> {
        if self.len() != rows {
            return Err(Error::DimensionMismatch {
                what: "time index length",
                expected: rows,
                found: self.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<NaiveDateTime>> for TimeIndex {
    fn from(stamps: Vec<NaiveDateTime>) -> Self {
        Self::new(stamps)
    }
}

/// Group by calendar year.
pub fn by_year(t: &NaiveDateTime) -> i32 {
    t.year()
}

/// Group by decade, keyed by its first year (1990 for 1990..=1999).
pub fn by_decade(t: &NaiveDateTime) -> i32 {
    t.year().div_euclid(10) * 10
}

/// Group by `(year, month)`.
pub fn by_month(t: &NaiveDateTime) -> (i32, u32) {
    (t.year(), t.month())
}

/// Group into buckets of `width` years, keyed by the bucket's first year.
///
/// # Panics
/// The returned closure panics if `width` is zero.
pub fn by_years(width: i32) -> impl Fn(&NaiveDateTime) -> i32 {
    move |t| t.year().div_euclid(width) * width
}
