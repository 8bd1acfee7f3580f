//! Run configuration for network estimation.
//!
//! [`NetworkConfig`] bundles every knob of a bootstrap network run with the
//! customary defaults, and deserializes from JSON so runs can be described
//! in files next to the data they analyse. Unknown keys are rejected.

use crate::bootstrap::{BootstrapConfig, Selection, DEFAULT_MIN_TOL};
use crate::distance::DistanceMode;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Minimum selection frequency for an edge.
    pub sigma: f64,
    /// Proportion of features drawn per iteration.
    pub sample_prop: f64,
    pub n_iter: usize,
    /// Metric name, see [`crate::metric::Metric`].
    pub metric: String,
    pub n_jobs: usize,
    /// Link each item only to its most frequent neighbour.
    pub only_best: bool,
    /// Credit every candidate within `min_tol` of the nearest one.
    pub all_min: bool,
    pub min_tol: f64,
    /// Compute distances in time-causal blocks of `groupby` years.
    pub grouped_pairwise: bool,
    pub groupby: i32,
    /// Fixed seed for reproducible runs; fresh entropy when absent.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            sigma: 0.5,
            sample_prop: 0.5,
            n_iter: 1000,
            metric: "cosine".to_string(),
            n_jobs: 1,
            only_best: false,
            all_min: false,
            min_tol: DEFAULT_MIN_TOL,
            grouped_pairwise: false,
            groupby: 5,
            seed: None,
        }
    }
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Estimator parameters; fails on an unknown metric name.
    pub fn bootstrap_config(&self) -> Result<BootstrapConfig> {
        Ok(BootstrapConfig {
            n_iter: self.n_iter,
            sample_prop: self.sample_prop,
            metric: self.metric.parse()?,
            n_jobs: self.n_jobs,
            selection: if self.all_min {
                Selection::AllMinima { tol: self.min_tol }
            } else {
                Selection::Nearest
            },
            mode: if self.grouped_pairwise {
                DistanceMode::Grouped {
                    groupby: self.groupby,
                }
            } else {
                DistanceMode::Plain
            },
        })
    }
}
