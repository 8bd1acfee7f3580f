//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Metric {metric} does not support sparse input")]
    SparseUnsupported { metric: String },

    #[error("Covariance matrix is singular, mahalanobis distance is undefined")]
    SingularCovariance,

    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Grouped distance computation requires a time index")]
    MissingTimeIndex,

    #[error("Number of labels ({labels}) should be equal to number of data points ({rows})")]
    LabelCountMismatch { labels: usize, rows: usize },

    #[error("Labels must be unique, found duplicate: {0}")]
    DuplicateLabels(String),

    #[error("Invalid sparse matrix: {0}")]
    InvalidSparse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
