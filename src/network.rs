//! One-call network estimation: validate, bootstrap, threshold.

use crate::bootstrap::{bootstrap_neighbors, FrequencyMatrix};
use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::features::FeatureMatrix;
use crate::graph::{check_sigma, to_graph, DirectedGraph};
use crate::progress::{NoProgress, Progress};
use crate::time::TimeIndex;
use rand::prelude::*;
use std::collections::HashSet;

/// Estimated network together with the frequencies it was cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapNetwork {
    pub frequencies: FrequencyMatrix,
    pub graph: DirectedGraph,
}

/// Labels must be unique and match the number of items.
pub fn validate_labels(labels: &[String], rows: usize) -> Result<()> {
    if labels.len() != rows {
        return Err(Error::LabelCountMismatch {
            labels: labels.len(),
            rows,
        });
    }
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(Error::DuplicateLabels(label.clone()));
        }
    }
    Ok(())
}

/// Estimate the derivation network of `x`.
///
/// Labels and `sigma` are checked before any distance is computed. The graph is built
/// with `config.sigma` and `config.only_best`; node dates come from
/// `time_index`.
pub fn bootstrap_network<R, P>(
    x: &FeatureMatrix,
    labels: Option<&[String]>,
    time_index: Option<&TimeIndex>,
    config: &NetworkConfig,
    rng: &mut R,
    progress: P,
) -> Result<BootstrapNetwork>
where
    R: Rng + ?Sized,
    P: Progress,
{
    if let Some(labels) = labels {
        validate_labels(labels, x.nrows())?;
    }
    check_sigma(config.sigma)?;
    let bootstrap = config.bootstrap_config()?;
    let frequencies = bootstrap_neighbors(x, time_index, &bootstrap, rng, progress)?;
    let graph = to_graph(&frequencies, time_index, config.sigma, config.only_best)?;
    log::debug!(
        "network: {} nodes, {} edges at sigma {}",
        graph.node_count(),
        graph.edge_count(),
        config.sigma
    );
    Ok(BootstrapNetwork { frequencies, graph })
}

/// [`bootstrap_network`] seeded from `config.seed` (fresh entropy when
/// unset), without progress reporting.
pub fn bootstrap_network_seeded(
    x: &FeatureMatrix,
    labels: Option<&[String]>,
    time_index: Option<&TimeIndex>,
    config: &NetworkConfig,
) -> Result<BootstrapNetwork> {
    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    bootstrap_network(x, labels, time_index, config, &mut rng, NoProgress)
}
