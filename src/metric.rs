//! Distance metrics between feature vectors.
//!
//! This module provides the metric family accepted by the distance engine:
//! - Sparse-capable metrics: cosine, euclidean (l2), cityblock (manhattan, l1)
//! - Real-valued dense metrics: braycurtis, canberra, chebyshev, correlation,
//!   minkowski, sqeuclidean, seuclidean, mahalanobis, hamming, jaccard
//! - Boolean dense metrics (nonzero counts as true): dice, kulsinski,
//!   matching, rogerstanimoto, russellrao, sokalmichener, sokalsneath, yule
//! - User-supplied two-argument distance functions
//!
//! Formulas follow scipy's `cdist` conventions. Cosine follows
//! scikit-learn: zero vectors are at distance 1 from everything and the
//! result is clipped to `[0, 2]`.

use crate::error::{Error, Result};
use crate::features::{Rows, SparseRow};
use nalgebra::DMatrix;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// User-supplied distance between two dense vectors of equal length.
pub type DistanceFn = Arc<dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync>;

/// Distance metric, resolvable by name with [`FromStr`].
#[derive(Clone)]
pub enum Metric {
    Cosine,
    Euclidean,
    Cityblock,
    SqEuclidean,
    Minkowski { p: f64 },
    Chebyshev,
    BrayCurtis,
    Canberra,
    Correlation,
    /// Euclidean distance standardized by per-feature sample variance.
    SEuclidean,
    /// Uses the inverse sample covariance of the compared rows.
    Mahalanobis,
    Hamming,
    Jaccard,
    Dice,
    Kulsinski,
    Matching,
    RogersTanimoto,
    RussellRao,
    SokalMichener,
    SokalSneath,
    Yule,
    Custom(DistanceFn),
}

impl Metric {
    /// Wrap a closure as a metric.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        Metric::Custom(Arc::new(f))
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::Cityblock => "cityblock",
            Metric::SqEuclidean => "sqeuclidean",
            Metric::Minkowski { .. } => "minkowski",
            Metric::Chebyshev => "chebyshev",
            Metric::BrayCurtis => "braycurtis",
            Metric::Canberra => "canberra",
            Metric::Correlation => "correlation",
            Metric::SEuclidean => "seuclidean",
            Metric::Mahalanobis => "mahalanobis",
            Metric::Hamming => "hamming",
            Metric::Jaccard => "jaccard",
            Metric::Dice => "dice",
            Metric::Kulsinski => "kulsinski",
            Metric::Matching => "matching",
            Metric::RogersTanimoto => "rogerstanimoto",
            Metric::RussellRao => "russellrao",
            Metric::SokalMichener => "sokalmichener",
            Metric::SokalSneath => "sokalsneath",
            Metric::Yule => "yule",
            Metric::Custom(_) => "custom",
        }
    }

    /// Whether the metric accepts sparse feature matrices. Custom metrics
    /// do, they receive densified rows.
    pub fn supports_sparse(&self) -> bool {
        matches!(
            self,
            Metric::Cosine | Metric::Euclidean | Metric::Cityblock | Metric::Custom(_)
        )
    }

    /// Estimate data-dependent parameters from the compared rows and return
    /// a metric ready for evaluation.
    ///
    /// `candidates` is `None` when the queries are compared with themselves;
    /// their rows then enter the estimates once, as in scipy's `pdist`.
    pub(crate) fn prepare(&self, queries: &Rows, candidates: Option<&Rows>) -> Result<PreparedMetric> {
        let sparse = matches!(queries, Rows::Sparse { .. }) || matches!(candidates, Some(Rows::Sparse { .. }));
        if sparse && !self.supports_sparse() {
            return Err(Error::SparseUnsupported {
                metric: self.name().to_string(),
            });
        }
        if let Metric::Minkowski { p } = self {
            if !(*p > 0.0) {
                return Err(Error::invalid("p", format!("minkowski order must be positive, got {p}")));
            }
        }

        let params = match self {
            Metric::SEuclidean => Params::Variances(column_variances(queries, candidates)),
            Metric::Mahalanobis => Params::InverseCovariance(inverse_covariance(queries, candidates)?),
            _ => Params::None,
        };
        Ok(PreparedMetric {
            metric: self.clone(),
            params,
        })
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Minkowski { p } => write!(f, "Minkowski {{ p: {} }}", p),
            Metric::Custom(_) => write!(f, "Custom(<fn>)"),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let metric = match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Metric::Cosine,
            "euclidean" | "l2" => Metric::Euclidean,
            "cityblock" | "manhattan" | "l1" => Metric::Cityblock,
            "sqeuclidean" => Metric::SqEuclidean,
            "minkowski" => Metric::Minkowski { p: 2.0 },
            "chebyshev" => Metric::Chebyshev,
            "braycurtis" => Metric::BrayCurtis,
            "canberra" => Metric::Canberra,
            "correlation" => Metric::Correlation,
            "seuclidean" => Metric::SEuclidean,
            "mahalanobis" => Metric::Mahalanobis,
            "hamming" => Metric::Hamming,
            "jaccard" => Metric::Jaccard,
            "dice" => Metric::Dice,
            "kulsinski" => Metric::Kulsinski,
            "matching" => Metric::Matching,
            "rogerstanimoto" => Metric::RogersTanimoto,
            "russellrao" => Metric::RussellRao,
            "sokalmichener" => Metric::SokalMichener,
            "sokalsneath" => Metric::SokalSneath,
            "yule" => Metric::Yule,
            _ => return Err(Error::UnknownMetric(s.to_string())),
        };
        Ok(metric)
    }
}

#[derive(Debug, Clone)]
enum Params {
    None,
    Variances(Vec<f64>),
    InverseCovariance(DMatrix<f64>),
}

/// A metric together with the parameters estimated for one computation.
#[derive(Debug, Clone)]
pub(crate) struct PreparedMetric {
    metric: Metric,
    params: Params,
}

impl PreparedMetric {
    /// Distance between row `i` of `a` and row `j` of `b`.
    pub fn between(&self, a: &Rows, i: usize, b: &Rows, j: usize) -> f64 {
        match (a, b) {
            (Rows::Sparse { rows: ra, dim }, Rows::Sparse { rows: rb, .. }) => match self.metric {
                Metric::Cosine => sparse_cosine(&ra[i], &rb[j]),
                Metric::Euclidean => sparse_euclidean(&ra[i], &rb[j]),
                Metric::Cityblock => sparse_cityblock(&ra[i], &rb[j]),
                _ => self.dense(&ra[i].to_dense(*dim), &rb[j].to_dense(*dim)),
            },
            _ => self.dense(&a.dense(i), &b.dense(j)),
        }
    }

    /// Distance between two dense vectors.
    pub fn dense(&self, u: &[f64], v: &[f64]) -> f64 {
        match &self.metric {
            Metric::Cosine => cosine(u, v),
            Metric::Euclidean => sq_euclidean(u, v).sqrt(),
            Metric::Cityblock => minkowski_sum(u, v, 1.0),
            Metric::SqEuclidean => sq_euclidean(u, v),
            Metric::Minkowski { p } => minkowski_sum(u, v, *p).powf(1.0 / p),
            Metric::Chebyshev => u
                .iter()
                .zip(v)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
            Metric::BrayCurtis => {
                let num: f64 = u.iter().zip(v).map(|(a, b)| (a - b).abs()).sum();
                let den: f64 = u.iter().zip(v).map(|(a, b)| (a + b).abs()).sum();
                num / den
            }
            Metric::Canberra => u
                .iter()
                .zip(v)
                .map(|(a, b)| {
                    let den = a.abs() + b.abs();
                    if den == 0.0 {
                        0.0
                    } else {
                        (a - b).abs() / den
                    }
                })
                .sum(),
            Metric::Correlation => correlation(u, v),
            Metric::SEuclidean => match &self.params {
                Params::Variances(var) => u
                    .iter()
                    .zip(v)
                    .zip(var)
                    .map(|((a, b), s)| (a - b) * (a - b) / s)
                    .sum::<f64>()
                    .sqrt(),
                _ => f64::NAN,
            },
            Metric::Mahalanobis => match &self.params {
                Params::InverseCovariance(vi) => mahalanobis(u, v, vi),
                _ => f64::NAN,
            },
            Metric::Hamming => {
                let diff = u.iter().zip(v).filter(|(a, b)| a != b).count();
                diff as f64 / u.len() as f64
            }
            Metric::Jaccard => {
                let mut nonzero = 0usize;
                let mut unequal = 0usize;
                for (a, b) in u.iter().zip(v) {
                    if *a != 0.0 || *b != 0.0 {
                        nonzero += 1;
                        if a != b {
                            unequal += 1;
                        }
                    }
                }
                if nonzero == 0 {
                    0.0
                } else {
                    unequal as f64 / nonzero as f64
                }
            }
            Metric::Dice => {
                let c = BoolCounts::new(u, v);
                let diff = (c.tf + c.ft) as f64;
                let den = 2.0 * c.tt as f64 + diff;
                if den == 0.0 {
                    0.0
                } else {
                    diff / den
                }
            }
            Metric::Kulsinski => {
                let c = BoolCounts::new(u, v);
                let n = u.len() as f64;
                let diff = (c.tf + c.ft) as f64;
                (diff - c.tt as f64 + n) / (diff + n)
            }
            Metric::Matching => {
                let c = BoolCounts::new(u, v);
                (c.tf + c.ft) as f64 / u.len() as f64
            }
            Metric::RogersTanimoto | Metric::SokalMichener => {
                let c = BoolCounts::new(u, v);
                let r = 2.0 * (c.tf + c.ft) as f64;
                r / ((c.tt + c.ff) as f64 + r)
            }
            Metric::RussellRao => {
                let c = BoolCounts::new(u, v);
                let n = u.len() as f64;
                (n - c.tt as f64) / n
            }
            Metric::SokalSneath => {
                let c = BoolCounts::new(u, v);
                let r = 2.0 * (c.tf + c.ft) as f64;
                // 0/0 for two all-false vectors, left as NaN
                r / (c.tt as f64 + r)
            }
            Metric::Yule => {
                let c = BoolCounts::new(u, v);
                let half_r = (c.tf * c.ft) as f64;
                if half_r == 0.0 {
                    0.0
                } else {
                    2.0 * half_r / ((c.tt * c.ff) as f64 + half_r)
                }
            }
            Metric::Custom(f) => f(u, v),
        }
    }
}

/// Contingency counts of two vectors read as booleans (nonzero = true).
struct BoolCounts {
    tt: usize,
    tf: usize,
    ft: usize,
    ff: usize,
}

impl BoolCounts {
    fn new(u: &[f64], v: &[f64]) -> Self {
        let mut c = BoolCounts {
            tt: 0,
            tf: 0,
            ft: 0,
            ff: 0,
        };
        for (a, b) in u.iter().zip(v) {
            match (*a != 0.0, *b != 0.0) {
                (true, true) => c.tt += 1,
                (true, false) => c.tf += 1,
                (false, true) => c.ft += 1,
                (false, false) => c.ff += 1,
            }
        }
        c
    }
}

fn sq_euclidean(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v).map(|(a, b)| (a - b) * (a - b)).sum()
}

fn minkowski_sum(u: &[f64], v: &[f64], p: f64) -> f64 {
    if p == 1.0 {
        return u.iter().zip(v).map(|(a, b)| (a - b).abs()).sum();
    }
    u.iter().zip(v).map(|(a, b)| (a - b).abs().powf(p)).sum()
}

/// Cosine distance from a dot product and two norms. A zero norm counts as
/// one, so zero vectors have similarity 0.
fn cosine_from_parts(dot: f64, norm_u: f64, norm_v: f64) -> f64 {
    let nu = if norm_u == 0.0 { 1.0 } else { norm_u };
    let nv = if norm_v == 0.0 { 1.0 } else { norm_v };
    (1.0 - dot / (nu * nv)).clamp(0.0, 2.0)
}

fn cosine(u: &[f64], v: &[f64]) -> f64 {
    let dot: f64 = u.iter().zip(v).map(|(a, b)| a * b).sum();
    let nu = u.iter().map(|a| a * a).sum::<f64>().sqrt();
    let nv = v.iter().map(|b| b * b).sum::<f64>().sqrt();
    cosine_from_parts(dot, nu, nv)
}

fn correlation(u: &[f64], v: &[f64]) -> f64 {
    let n = u.len() as f64;
    let mu = u.iter().sum::<f64>() / n;
    let mv = v.iter().sum::<f64>() / n;
    let mut dot = 0.0;
    let mut su = 0.0;
    let mut sv = 0.0;
    for (a, b) in u.iter().zip(v) {
        let (da, db) = (a - mu, b - mv);
        dot += da * db;
        su += da * da;
        sv += db * db;
    }
    1.0 - dot / (su.sqrt() * sv.sqrt())
}

fn mahalanobis(u: &[f64], v: &[f64], vi: &DMatrix<f64>) -> f64 {
    let d = u.len();
    let delta: Vec<f64> = u.iter().zip(v).map(|(a, b)| a - b).collect();
    let mut total = 0.0;
    for r in 0..d {
        let mut acc = 0.0;
        for c in 0..d {
            acc += vi[(r, c)] * delta[c];
        }
        total += delta[r] * acc;
    }
    total.max(0.0).sqrt()
}

/// Walk two sorted sparse rows in lockstep, calling `f(a_val, b_val)` for
/// every column present in either row (missing entries are 0).
fn merge_sparse(a: &SparseRow, b: &SparseRow, mut f: impl FnMut(f64, f64)) {
    let (mut p, mut q) = (0, 0);
    while p < a.indices.len() || q < b.indices.len() {
        let ia = a.indices.get(p).copied().unwrap_or(usize::MAX);
        let ib = b.indices.get(q).copied().unwrap_or(usize::MAX);
        if ia == ib {
            f(a.values[p], b.values[q]);
            p += 1;
            q += 1;
        } else if ia < ib {
            f(a.values[p], 0.0);
            p += 1;
        } else {
            f(0.0, b.values[q]);
            q += 1;
        }
    }
}

fn sparse_cosine(a: &SparseRow, b: &SparseRow) -> f64 {
    let mut dot = 0.0;
    let mut na = 0.0;
    let mut nb = 0.0;
    merge_sparse(a, b, |x, y| {
        dot += x * y;
        na += x * x;
        nb += y * y;
    });
    cosine_from_parts(dot, na.sqrt(), nb.sqrt())
}

fn sparse_euclidean(a: &SparseRow, b: &SparseRow) -> f64 {
    let mut total = 0.0;
    merge_sparse(a, b, |x, y| total += (x - y) * (x - y));
    total.sqrt()
}

fn sparse_cityblock(a: &SparseRow, b: &SparseRow) -> f64 {
    let mut total = 0.0;
    merge_sparse(a, b, |x, y| total += (x - y).abs());
    total
}

/// Dense rows of `queries` followed by those of `candidates`, if any.
fn stacked(queries: &Rows, candidates: Option<&Rows>) -> Vec<Vec<f64>> {
    let mut rows: Vec<Vec<f64>> = (0..queries.len()).map(|i| queries.dense(i).into_owned()).collect();
    if let Some(c) = candidates {
        rows.extend((0..c.len()).map(|j| c.dense(j).into_owned()));
    }
    rows
}

/// Per-column sample variance (ddof = 1) of the stacked rows.
fn column_variances(queries: &Rows, candidates: Option<&Rows>) -> Vec<f64> {
    let rows = stacked(queries, candidates);
    let m = rows.len();
    let d = rows.first().map_or(0, Vec::len);
    (0..d)
        .map(|c| {
            let mean = rows.iter().map(|r| r[c]).sum::<f64>() / m as f64;
            rows.iter().map(|r| (r[c] - mean).powi(2)).sum::<f64>() / (m as f64 - 1.0)
        })
        .collect()
}

/// Inverse of the sample covariance (ddof = 1) of the stacked rows.
fn inverse_covariance(queries: &Rows, candidates: Option<&Rows>) -> Result<DMatrix<f64>> {
    let rows = stacked(queries, candidates);
    let m = rows.len();
    let d = rows.first().map_or(0, Vec::len);
    if m < 2 {
        return Err(Error::SingularCovariance);
    }
    let x = DMatrix::from_fn(m, d, |r, c| rows[r][c]);
    let means = x.row_mean();
    let centered = DMatrix::from_fn(m, d, |r, c| x[(r, c)] - means[c]);
    let cov = (centered.transpose() * &centered) / (m as f64 - 1.0);
    cov.try_inverse().ok_or(Error::SingularCovariance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureMatrix;

    const EPS: f64 = 1e-12;

    fn prepared(metric: Metric) -> PreparedMetric {
        PreparedMetric {
            metric,
            params: Params::None,
        }
    }

    fn d(metric: Metric, u: &[f64], v: &[f64]) -> f64 {
        prepared(metric).dense(u, v)
    }

    // ============== Name resolution ==============

    #[test]
    fn test_parse_aliases() {
        assert_eq!("l2".parse::<Metric>().unwrap().name(), "euclidean");
        assert_eq!("Manhattan".parse::<Metric>().unwrap().name(), "cityblock");
        assert_eq!("l1".parse::<Metric>().unwrap().name(), "cityblock");
        assert!(matches!(
            "minkowski".parse::<Metric>().unwrap(),
            Metric::Minkowski { p } if p == 2.0
        ));
    }

    #[test]
    fn test_parse_unknown() {
        let err = "levenshtein".parse::<Metric>().unwrap_err();
        assert_eq!(err, Error::UnknownMetric("levenshtein".to_string()));
    }

    #[test]
    fn test_every_name_roundtrips() {
        for name in [
            "cosine",
            "euclidean",
            "cityblock",
            "sqeuclidean",
            "minkowski",
            "chebyshev",
            "braycurtis",
            "canberra",
            "correlation",
            "seuclidean",
            "mahalanobis",
            "hamming",
            "jaccard",
            "dice",
            "kulsinski",
            "matching",
            "rogerstanimoto",
            "russellrao",
            "sokalmichener",
            "sokalsneath",
            "yule",
        ] {
            assert_eq!(name.parse::<Metric>().unwrap().name(), name);
        }
    }

    // ============== Real-valued metrics ==============

    #[test]
    fn test_euclidean_family() {
        let u = [0.0, 3.0, 1.0];
        let v = [4.0, 0.0, 1.0];
        assert!((d(Metric::Euclidean, &u, &v) - 5.0).abs() < EPS);
        assert!((d(Metric::SqEuclidean, &u, &v) - 25.0).abs() < EPS);
        assert!((d(Metric::Cityblock, &u, &v) - 7.0).abs() < EPS);
        assert!((d(Metric::Chebyshev, &u, &v) - 4.0).abs() < EPS);
        assert!((d(Metric::Minkowski { p: 2.0 }, &u, &v) - 5.0).abs() < 1e-9);
        assert!((d(Metric::Minkowski { p: 1.0 }, &u, &v) - 7.0).abs() < EPS);
    }

    #[test]
    fn test_cosine() {
        assert!(d(Metric::Cosine, &[1.0, 0.0], &[2.0, 0.0]).abs() < EPS);
        assert!((d(Metric::Cosine, &[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < EPS);
        assert!((d(Metric::Cosine, &[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert!((d(Metric::Cosine, &[0.0, 0.0], &[1.0, 2.0]) - 1.0).abs() < EPS);
        assert!((d(Metric::Cosine, &[0.0, 0.0], &[0.0, 0.0]) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_braycurtis_canberra() {
        let u = [1.0, 0.0, 2.0];
        let v = [3.0, 0.0, 2.0];
        // |u-v| = 2,0,0 ; |u+v| = 4,0,4
        assert!((d(Metric::BrayCurtis, &u, &v) - 0.25).abs() < EPS);
        // 2/4 + (0/0 -> 0) + 0/4
        assert!((d(Metric::Canberra, &u, &v) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_correlation() {
        assert!(d(Metric::Correlation, &[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).abs() < EPS);
        assert!((d(Metric::Correlation, &[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) - 2.0).abs() < EPS);
        assert!(d(Metric::Correlation, &[1.0, 1.0], &[1.0, 2.0]).is_nan());
    }

    #[test]
    fn test_hamming_and_jaccard_compare_values() {
        let u = [1.0, 2.0, 0.0, 0.0];
        let v = [1.0, 3.0, 5.0, 0.0];
        assert!((d(Metric::Hamming, &u, &v) - 0.5).abs() < EPS);
        // nonzero in either: 3 positions, unequal among them: 2
        assert!((d(Metric::Jaccard, &u, &v) - 2.0 / 3.0).abs() < EPS);
        assert_eq!(d(Metric::Jaccard, &[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    // ============== Boolean metrics ==============

    #[test]
    fn test_boolean_metrics() {
        // tt = 1, tf = 1, ft = 1, ff = 1
        let u = [1.0, 1.0, 0.0, 0.0];
        let v = [2.0, 0.0, 7.0, 0.0];
        assert!((d(Metric::Dice, &u, &v) - 0.5).abs() < EPS);
        assert!((d(Metric::Kulsinski, &u, &v) - 5.0 / 6.0).abs() < EPS);
        assert!((d(Metric::Matching, &u, &v) - 0.5).abs() < EPS);
        assert!((d(Metric::RogersTanimoto, &u, &v) - 4.0 / 6.0).abs() < EPS);
        assert!((d(Metric::SokalMichener, &u, &v) - 4.0 / 6.0).abs() < EPS);
        assert!((d(Metric::RussellRao, &u, &v) - 0.75).abs() < EPS);
        assert!((d(Metric::SokalSneath, &u, &v) - 0.8).abs() < EPS);
        assert!((d(Metric::Yule, &u, &v) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_boolean_degenerate() {
        let z = [0.0, 0.0];
        assert_eq!(d(Metric::Dice, &z, &z), 0.0);
        assert_eq!(d(Metric::Yule, &z, &z), 0.0);
        assert!(d(Metric::SokalSneath, &z, &z).is_nan());
    }

    #[test]
    fn test_custom() {
        let metric = Metric::custom(|u, v| (u[0] - v[0]).abs() * 10.0);
        assert!((d(metric, &[1.0], &[3.0]) - 20.0).abs() < EPS);
    }

    // ============== Data-dependent metrics ==============

    #[test]
    fn test_seuclidean_uses_sample_variance() {
        let x = FeatureMatrix::from_rows(&[vec![0.0, 0.0], vec![2.0, 4.0]])
            .unwrap()
            .to_rows();
        let y = FeatureMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap().to_rows();
        let pm = Metric::SEuclidean.prepare(&x, Some(&y)).unwrap();
        // stacked rows: (0,0), (2,4), (1,2): variances 1 and 4
        let dist = pm.between(&x, 0, &x, 1);
        assert!((dist - (4.0f64 / 1.0 + 16.0 / 4.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_mahalanobis_identity_like() {
        let rows = FeatureMatrix::from_rows(&[
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, -1.0],
        ])
        .unwrap()
        .to_rows();
        let pm = Metric::Mahalanobis.prepare(&rows, None).unwrap();
        // covariance = diag(2/3, 2/3), so VI = 1.5 I
        let dist = pm.between(&rows, 0, &rows, 1);
        assert!((dist - (4.0f64 * 1.5).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_mahalanobis_singular() {
        let rows = FeatureMatrix::from_rows(&[vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]])
            .unwrap()
            .to_rows();
        let res = Metric::Mahalanobis.prepare(&rows, None);
        assert!(matches!(res, Err(Error::SingularCovariance)));
    }

    // ============== Sparse kernels ==============

    #[test]
    fn test_sparse_matches_dense() {
        let dense = FeatureMatrix::from_rows(&[
            vec![1.0, 0.0, 2.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.0, 3.0, 1.0, 4.0],
        ])
        .unwrap();
        let sparse = FeatureMatrix::from_csr(
            (3, 4),
            vec![0, 2, 2, 5],
            vec![0, 2, 1, 2, 3],
            vec![1.0, 2.0, 3.0, 1.0, 4.0],
        )
        .unwrap();
        let (dr, sr) = (dense.to_rows(), sparse.to_rows());
        for metric in [Metric::Cosine, Metric::Euclidean, Metric::Cityblock] {
            let pd = metric.prepare(&dr, None).unwrap();
            let ps = metric.prepare(&sr, None).unwrap();
            for i in 0..3 {
                for j in 0..3 {
                    let a = pd.between(&dr, i, &dr, j);
                    let b = ps.between(&sr, i, &sr, j);
                    assert!((a - b).abs() < 1e-12, "{} ({}, {}): {} vs {}", metric, i, j, a, b);
                }
            }
        }
    }

    #[test]
    fn test_sparse_rejected_for_dense_only_metrics() {
        let sparse = FeatureMatrix::from_csr((1, 2), vec![0, 1], vec![0], vec![1.0])
            .unwrap()
            .to_rows();
        let err = Metric::Canberra.prepare(&sparse, None).unwrap_err();
        assert_eq!(
            err,
            Error::SparseUnsupported {
                metric: "canberra".to_string()
            }
        );
        assert!(Metric::custom(|_, _| 0.0).prepare(&sparse, Some(&sparse)).is_ok());
    }

    #[test]
    fn test_minkowski_order_validated() {
        let rows = FeatureMatrix::from_rows(&[vec![1.0]]).unwrap().to_rows();
        assert!(Metric::Minkowski { p: 0.0 }.prepare(&rows, None).is_err());
    }
}
