//! Directed derivation graphs built from neighbour-selection frequencies.
//!
//! An edge `i -> j` means that item `i` is estimated to derive from (point
//! to) item `j`: `j` was selected as `i`'s neighbour in at least a fraction
//! `sigma` of the bootstrap iterations.

use crate::bootstrap::FrequencyMatrix;
use crate::error::{Error, Result};
use crate::time::TimeIndex;
use chrono::NaiveDateTime;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Attributes carried by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeAttrs {
    pub date: Option<NaiveDateTime>,
}

/// Anything edges can be poured into.
///
/// `add_node` must be idempotent: re-adding an existing node never creates
/// a duplicate.
pub trait GraphSink {
    fn add_node(&mut self, id: usize, attrs: NodeAttrs);
    fn add_edge(&mut self, from: usize, to: usize);
}

/// Directed graph over item indices with ordered nodes and edges.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectedGraph {
    nodes: BTreeMap<usize, NodeAttrs>,
    edges: BTreeSet<(usize, usize)>,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: usize) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn contains_edge(&self, from: usize, to: usize) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn node(&self, id: usize) -> Option<&NodeAttrs> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (usize, &NodeAttrs)> + '_ {
        self.nodes.iter().map(|(&id, attrs)| (id, attrs))
    }

    /// Edges in ascending `(from, to)` order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().copied()
    }

    /// Targets of the edges leaving `id`, ascending.
    pub fn successors(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .range((id, 0)..=(id, usize::MAX))
            .map(|&(_, to)| to)
    }

    pub fn out_degree(&self, id: usize) -> usize {
        self.successors(id).count()
    }

    /// Copy into a petgraph map, dropping node attributes.
    pub fn to_petgraph(&self) -> DiGraphMap<usize, ()> {
        let mut g = DiGraphMap::new();
        for (id, attrs) in self.nodes() {
            GraphSink::add_node(&mut g, id, *attrs);
        }
        for (from, to) in self.edges() {
            GraphSink::add_edge(&mut g, from, to);
        }
        g
    }
}

impl GraphSink for DirectedGraph {
    /// Inserts the node or replaces its attributes.
    fn add_node(&mut self, id: usize, attrs: NodeAttrs) {
        self.nodes.insert(id, attrs);
    }

    /// Missing endpoints are created without attributes.
    fn add_edge(&mut self, from: usize, to: usize) {
        self.nodes.entry(from).or_default();
        self.nodes.entry(to).or_default();
        self.edges.insert((from, to));
    }
}

impl GraphSink for DiGraphMap<usize, ()> {
    fn add_node(&mut self, id: usize, _attrs: NodeAttrs) {
        DiGraphMap::add_node(self, id);
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        DiGraphMap::add_edge(self, from, to, ());
    }
}

pub(crate) fn attrs_for(time_index: Option<&TimeIndex>, id: usize) -> NodeAttrs {
    NodeAttrs {
        date: time_index.map(|ti| ti.get(id)),
    }
}

pub(crate) fn check_sigma(sigma: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&sigma) {
        return Err(Error::invalid("sigma", format!("must lie in [0, 1], got {sigma}")));
    }
    Ok(())
}

pub(crate) fn check_time_index(freq: &FrequencyMatrix, time_index: Option<&TimeIndex>) -> Result<()> {
    match time_index {
        Some(ti) => ti.check_len(freq.n()),
        None => Ok(()),
    }
}

/// Add node `i` and its edges for the threshold rule to `sink`.
pub(crate) fn add_row<S: GraphSink + ?Sized>(
    sink: &mut S,
    freq: &FrequencyMatrix,
    time_index: Option<&TimeIndex>,
    i: usize,
    sigma: f64,
    only_best: bool,
) {
    sink.add_node(i, attrs_for(time_index, i));
    let neighbors = if only_best {
        match freq.row_argmax(i) {
            Some((best, v)) if v >= sigma => vec![best],
            _ => Vec::new(),
        }
    } else {
        freq.row_above(i, sigma)
    };
    for j in neighbors {
        sink.add_node(j, attrs_for(time_index, j));
        sink.add_edge(i, j);
    }
}

/// Pour the thresholded frequency graph into any [`GraphSink`].
///
/// Every row becomes a node (annotated with its date when a time index is
/// given), even without outgoing edges. With `only_best`, a row links only
/// to its most frequent neighbour and only if that frequency reaches
/// `sigma`; otherwise it links to every neighbour at or above `sigma`.
pub fn build_graph_into<S: GraphSink + ?Sized>(
    sink: &mut S,
    freq: &FrequencyMatrix,
    time_index: Option<&TimeIndex>,
    sigma: f64,
    only_best: bool,
) -> Result<()> {
    check_sigma(sigma)?;
    check_time_index(freq, time_index)?;
    for i in 0..freq.n() {
        add_row(sink, freq, time_index, i, sigma, only_best);
    }
    Ok(())
}

/// Build a [`DirectedGraph`] from neighbour-selection frequencies.
///
/// # Arguments
/// * `freq` - Output of the bootstrap estimator
/// * `time_index` - Optional timestamps stored as node dates
/// * `sigma` - Minimum frequency for an edge, in [0, 1]
/// * `only_best` - Keep only each row's most frequent neighbour
pub fn to_graph(
    freq: &FrequencyMatrix,
    time_index: Option<&TimeIndex>,
    sigma: f64,
    only_best: bool,
) -> Result<DirectedGraph> {
    let mut graph = DirectedGraph::new();
    build_graph_into(&mut graph, freq, time_index, sigma, only_best)?;
    Ok(graph)
}
