//! # textnet
//!
//! Bootstrap nearest-neighbour estimation of derivation networks between
//! texts (or any items described by numeric feature vectors).
//!
//! Repeatedly subsampling the feature columns and recording each item's
//! nearest earlier neighbour gives, for every ordered pair of items, the
//! frequency with which one was picked as the other's source. Thresholding
//! those frequencies yields a directed graph; replaying it through time
//! yields a sequence of growing graphs.
//!
//! This crate provides:
//! - Pairwise distances over dense or CSR sparse features, optionally in
//!   time-causal year blocks
//! - The bootstrap neighbour-frequency estimator
//! - Graph construction by frequency threshold or best neighbour
//! - Evolving graphs grouped by year, decade, month or any custom key
//!
//! ## Data Layout
//!
//! Dense features are column-major matrices stored in flat vectors:
//! for n items with d features, `data[i + j * n]` is item i's feature j.
//! Frequency and distance matrices are n x n in the same layout.

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod parallel;

pub mod bootstrap;
pub mod config;
pub mod distance;
pub mod error;
pub mod evolving;
pub mod features;
pub mod graph;
pub mod matrix;
pub mod metric;
pub mod network;
pub mod progress;
pub mod time;

// Re-export commonly used items
pub use error::{Error, Result};
pub use features::FeatureMatrix;
pub use matrix::DenseMatrix;
pub use metric::Metric;
pub use time::TimeIndex;

// Re-export the estimation pipeline
pub use bootstrap::{
    bootstrap_neighbors, bootstrap_neighbors_seeded, BootstrapConfig, FrequencyMatrix, Selection,
};
pub use config::NetworkConfig;
pub use distance::{pairwise_distances, time_grouped_pairwise_distances, DistanceMode};
pub use evolving::{evolving_graphs, EvolvingGraphs, GraphDelta, GraphSnapshot};
pub use graph::{build_graph_into, to_graph, DirectedGraph, GraphSink, NodeAttrs};
pub use network::{bootstrap_network, bootstrap_network_seeded, BootstrapNetwork};
