//! Derivation graphs that grow over time.
//!
//! Items are sorted by timestamp and partitioned by a grouping function
//! (year, decade, month, or any ordered key of a timestamp). Groups are
//! replayed in ascending key order, each adding its items and their
//! above-threshold edges to the graph accumulated so far. Every step yields
//! an independent snapshot of the cumulative graph plus the delta the group
//! introduced; consuming further never alters snapshots already handed out.
//!
//! After the last group the snapshot equals [`to_graph`] on the full
//! frequency matrix with `only_best = false`.
//!
//! [`to_graph`]: crate::graph::to_graph

use crate::bootstrap::FrequencyMatrix;
use crate::error::Result;
use crate::graph::{add_row, check_sigma, check_time_index, DirectedGraph, GraphSink, NodeAttrs};
use crate::time::TimeIndex;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::iter::FusedIterator;

/// Nodes and edges first introduced by one group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphDelta {
    pub nodes_added: Vec<usize>,
    pub edges_added: Vec<(usize, usize)>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.nodes_added.is_empty() && self.edges_added.is_empty()
    }
}

/// Cumulative graph after a group, with the group's key and delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot<K> {
    pub key: K,
    pub graph: DirectedGraph,
    pub delta: GraphDelta,
}

/// Sink that writes into a graph and records what was new.
struct RecordingSink<'g> {
    graph: &'g mut DirectedGraph,
    delta: GraphDelta,
}

impl GraphSink for RecordingSink<'_> {
    fn add_node(&mut self, id: usize, attrs: NodeAttrs) {
        if !self.graph.contains_node(id) {
            self.delta.nodes_added.push(id);
        }
        self.graph.add_node(id, attrs);
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if !self.graph.contains_edge(from, to) {
            self.delta.edges_added.push((from, to));
        }
        self.graph.add_edge(from, to);
    }
}

/// Pure step: the graph after adding `rows` (original item indices) to
/// `graph`, and what changed.
pub fn apply_group(
    graph: &DirectedGraph,
    rows: &[usize],
    freq: &FrequencyMatrix,
    time_index: &TimeIndex,
    sigma: f64,
) -> (DirectedGraph, GraphDelta) {
    let mut next = graph.clone();
    let mut sink = RecordingSink {
        graph: &mut next,
        delta: GraphDelta::default(),
    };
    for &i in rows {
        add_row(&mut sink, freq, Some(time_index), i, sigma, false);
    }
    let delta = sink.delta;
    (next, delta)
}

/// Lazy, ordered, finite sequence of cumulative graph snapshots.
///
/// Created by [`evolving_graphs`]. Not restartable; dropping it midway is
/// fine and [`EvolvingGraphs::current`] keeps exposing the graph built so
/// far.
#[derive(Debug)]
pub struct EvolvingGraphs<'a, K> {
    freq: &'a FrequencyMatrix,
    time_index: &'a TimeIndex,
    sigma: f64,
    groups: std::vec::IntoIter<(K, Vec<usize>)>,
    current: DirectedGraph,
}

impl<K> EvolvingGraphs<'_, K> {
    /// Graph accumulated over the groups consumed so far.
    pub fn current(&self) -> &DirectedGraph {
        &self.current
    }

    /// Groups not yet consumed.
    pub fn remaining(&self) -> usize {
        self.groups.len()
    }
}

impl<K: Clone> Iterator for EvolvingGraphs<'_, K> {
    type Item = GraphSnapshot<K>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, rows) = self.groups.next()?;
        let (graph, delta) = apply_group(&self.current, &rows, self.freq, self.time_index, self.sigma);
        log::trace!(
            "group with {} items added {} nodes and {} edges",
            rows.len(),
            delta.nodes_added.len(),
            delta.edges_added.len()
        );
        self.current = graph;
        Some(GraphSnapshot {
            key,
            graph: self.current.clone(),
            delta,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.groups.size_hint()
    }
}

impl<K: Clone> ExactSizeIterator for EvolvingGraphs<'_, K> {}

impl<K: Clone> FusedIterator for EvolvingGraphs<'_, K> {}

/// Replay graph construction group by group through time.
///
/// # Arguments
/// * `freq` - Output of the bootstrap estimator
/// * `time_index` - One timestamp per item
/// * `group_fn` - Maps a timestamp to its group key, e.g. [`by_year`]
/// * `sigma` - Minimum frequency for an edge, in [0, 1]
///
/// # Example
///
/// ```
/// use textnet::bootstrap::FrequencyMatrix;
/// use textnet::evolving::evolving_graphs;
/// use textnet::matrix::DenseMatrix;
/// use textnet::time::{by_decade, TimeIndex};
///
/// let freq = FrequencyMatrix::from_matrix(
///     DenseMatrix::from_rows(&[vec![0.0, 0.0], vec![0.9, 0.0]]).unwrap(),
///     10,
/// )
/// .unwrap();
/// let ti = TimeIndex::from_years(&[1901, 1915]).unwrap();
/// let keys: Vec<i32> = evolving_graphs(&freq, &ti, by_decade, 0.5)
///     .unwrap()
///     .map(|snap| snap.key)
///     .collect();
/// assert_eq!(keys, vec![1900, 1910]);
/// ```
///
/// [`by_year`]: crate::time::by_year
pub fn evolving_graphs<'a, K, F>(
    freq: &'a FrequencyMatrix,
    time_index: &'a TimeIndex,
    group_fn: F,
    sigma: f64,
) -> Result<EvolvingGraphs<'a, K>>
where
    K: Ord + Clone,
    F: Fn(&NaiveDateTime) -> K,
{
    check_sigma(sigma)?;
    check_time_index(freq, Some(time_index))?;

    let mut grouped: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for i in time_index.argsort() {
        grouped.entry(group_fn(&time_index.get(i))).or_default().push(i);
    }
    log::debug!("evolving graph over {} groups", grouped.len());

    Ok(EvolvingGraphs {
        freq,
        time_index,
        sigma,
        groups: grouped.into_iter().collect::<Vec<_>>().into_iter(),
        current: DirectedGraph::new(),
    })
}
