//! End-to-end properties of the estimation pipeline.
//!
//! Covers frequency bounds, the zero diagonal, time causality, seed
//! determinism, the equivalence of grouped and plain distances on causal
//! pairs, worker-count invariance, and the evolving-graph replay.
//!
//! Run: cargo test --test network_properties

use proptest::prelude::*;
use textnet::bootstrap::{bootstrap_neighbors_seeded, BootstrapConfig, Selection};
use textnet::distance::{pairwise_distances, time_grouped_pairwise_distances, DistanceMode};
use textnet::evolving::evolving_graphs;
use textnet::features::FeatureMatrix;
use textnet::graph::to_graph;
use textnet::metric::Metric;
use textnet::network::bootstrap_network_seeded;
use textnet::time::{by_decade, by_year, TimeIndex};
use textnet::{Error, NetworkConfig};

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic pseudo-random features, strictly positive.
fn features(n: usize, d: usize, salt: f64) -> FeatureMatrix {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..d)
                .map(|j| 1.1 + ((i * d + j) as f64 * 0.7 + salt).sin())
                .collect()
        })
        .collect();
    FeatureMatrix::from_rows(&rows).unwrap()
}

fn years(n: usize) -> TimeIndex {
    let ys: Vec<i32> = (0..n).map(|i| 1900 + ((i * 7) % 23) as i32).collect();
    TimeIndex::from_years(&ys).unwrap()
}

fn config(metric: Metric, n_iter: usize) -> BootstrapConfig {
    BootstrapConfig {
        n_iter,
        sample_prop: 0.5,
        metric,
        ..BootstrapConfig::default()
    }
}

// ─── Frequency matrix properties ────────────────────────────────────────────

#[test]
fn frequencies_bounded_with_zero_diagonal() {
    init_logging();
    let x = features(12, 8, 0.3);
    let freq = bootstrap_neighbors_seeded(&x, None, &config(Metric::Cosine, 50), 1).unwrap();
    for i in 0..12 {
        assert_eq!(freq.get(i, i), 0.0);
        let row_sum: f64 = freq.row(i).iter().sum();
        assert!((row_sum - 1.0).abs() < 1e-9, "row {} sums to {}", i, row_sum);
        for j in 0..12 {
            let v = freq.get(i, j);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}

#[test]
fn frequencies_respect_time() {
    init_logging();
    let (x, ti) = (features(15, 10, 1.0), years(15));
    let freq = bootstrap_neighbors_seeded(&x, Some(&ti), &config(Metric::Euclidean, 40), 5).unwrap();
    for i in 0..15 {
        for j in 0..15 {
            if !ti.is_causal(i, j) {
                assert_eq!(freq.get(i, j), 0.0, "({}, {}) points forward in time", i, j);
            }
        }
    }
}

#[test]
fn earliest_item_has_zero_row() {
    let (x, ti) = (features(6, 6, 2.0), TimeIndex::from_years(&[1905, 1890, 1910, 1920, 1907, 1911]).unwrap());
    let freq = bootstrap_neighbors_seeded(&x, Some(&ti), &config(Metric::Cityblock, 20), 3).unwrap();
    assert!(freq.row(1).iter().all(|&v| v == 0.0));
    let row_sum: f64 = freq.row(0).iter().sum();
    assert!((row_sum - 1.0).abs() < 1e-9);
}

#[test]
fn all_minima_credits_at_least_nearest() {
    let x = FeatureMatrix::from_rows(&[
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 1.0],
        vec![5.0, 0.0, 5.0, 0.0],
    ])
    .unwrap();
    let cfg = BootstrapConfig {
        selection: Selection::all_minima(),
        ..config(Metric::Euclidean, 10)
    };
    let freq = bootstrap_neighbors_seeded(&x, None, &cfg, 0).unwrap();
    // identical rows are all minima of each other in every iteration
    assert_eq!(freq.get(0, 1), 1.0);
    assert_eq!(freq.get(0, 2), 1.0);
    assert_eq!(freq.get(0, 3), 0.0);
}

// ─── Determinism ────────────────────────────────────────────────────────────

#[test]
fn same_seed_same_frequencies() {
    let x = features(10, 12, 0.1);
    let cfg = config(Metric::Cosine, 30);
    let a = bootstrap_neighbors_seeded(&x, None, &cfg, 42).unwrap();
    let b = bootstrap_neighbors_seeded(&x, None, &cfg, 42).unwrap();
    assert_eq!(a, b);
}

#[test]
fn worker_count_does_not_change_result() {
    let (x, ti) = (features(17, 9, 0.5), years(17));
    let single = bootstrap_neighbors_seeded(&x, Some(&ti), &config(Metric::Euclidean, 25), 8).unwrap();
    for n_jobs in [2, 3, 16, 40] {
        let cfg = BootstrapConfig {
            n_jobs,
            ..config(Metric::Euclidean, 25)
        };
        let multi = bootstrap_neighbors_seeded(&x, Some(&ti), &cfg, 8).unwrap();
        assert_eq!(single, multi, "n_jobs = {}", n_jobs);
    }
}

#[test]
fn grouped_mode_matches_plain_mode() {
    let (x, ti) = (features(14, 10, 0.9), years(14));
    let plain = bootstrap_neighbors_seeded(&x, Some(&ti), &config(Metric::Cosine, 30), 11).unwrap();
    for groupby in [1, 5, 10] {
        let cfg = BootstrapConfig {
            mode: DistanceMode::Grouped { groupby },
            ..config(Metric::Cosine, 30)
        };
        let grouped = bootstrap_neighbors_seeded(&x, Some(&ti), &cfg, 11).unwrap();
        assert_eq!(plain, grouped, "groupby = {}", groupby);
    }
}

// ─── Distances ──────────────────────────────────────────────────────────────

#[test]
fn grouped_distances_agree_on_causal_pairs() {
    let (x, ti) = (features(11, 5, 0.2), years(11));
    let plain = pairwise_distances(&x, None, &Metric::Cityblock, 1).unwrap();
    let grouped = time_grouped_pairwise_distances(&x, &ti, &Metric::Cityblock, 5, 3).unwrap();
    let buckets = ti.year_buckets(5);
    for i in 0..11 {
        for j in 0..11 {
            if buckets[j] <= buckets[i] {
                assert!((plain[(i, j)] - grouped[(i, j)]).abs() < 1e-12);
            } else {
                assert_eq!(grouped[(i, j)], 0.0);
            }
        }
    }
}

#[test]
fn sparse_and_dense_distances_agree() {
    let dense = FeatureMatrix::from_rows(&[
        vec![0.0, 2.0, 0.0, 1.0],
        vec![3.0, 0.0, 0.0, 0.0],
        vec![0.0, 1.0, 4.0, 0.0],
    ])
    .unwrap();
    let sparse = FeatureMatrix::from_csr(
        (3, 4),
        vec![0, 2, 3, 5],
        vec![1, 3, 0, 1, 2],
        vec![2.0, 1.0, 3.0, 1.0, 4.0],
    )
    .unwrap();
    for metric in [Metric::Cosine, Metric::Euclidean, Metric::Cityblock] {
        let a = pairwise_distances(&dense, None, &metric, 1).unwrap();
        let b = pairwise_distances(&sparse, None, &metric, 2).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert!((a[(i, j)] - b[(i, j)]).abs() < 1e-12, "{} ({}, {})", metric, i, j);
            }
        }
    }
}

#[test]
fn sparse_input_rejects_dense_only_metric() {
    let sparse = FeatureMatrix::from_csr((2, 2), vec![0, 1, 2], vec![0, 1], vec![1.0, 1.0]).unwrap();
    let cfg = config(Metric::Correlation, 5);
    assert!(matches!(
        bootstrap_neighbors_seeded(&sparse, None, &cfg, 0),
        Err(Error::SparseUnsupported { .. })
    ));
}

// ─── Graphs ─────────────────────────────────────────────────────────────────

#[test]
fn graph_edges_respect_threshold_and_time() {
    let (x, ti) = (features(13, 8, 0.4), years(13));
    let freq = bootstrap_neighbors_seeded(&x, Some(&ti), &config(Metric::Cosine, 40), 2).unwrap();
    let g = to_graph(&freq, Some(&ti), 0.3, false).unwrap();
    assert_eq!(g.node_count(), 13);
    for (a, b) in g.edges() {
        assert_ne!(a, b);
        assert!(freq.get(a, b) >= 0.3);
        assert!(ti.is_causal(a, b));
    }
    let best = to_graph(&freq, Some(&ti), 0.3, true).unwrap();
    for (id, _) in best.nodes() {
        assert!(best.out_degree(id) <= 1);
    }
}

#[test]
fn evolving_graph_ends_at_full_graph() {
    let (x, ti) = (features(16, 8, 0.6), years(16));
    let freq = bootstrap_neighbors_seeded(&x, Some(&ti), &config(Metric::Cosine, 40), 4).unwrap();
    let full = to_graph(&freq, Some(&ti), 0.25, false).unwrap();

    for snaps in [
        evolving_graphs(&freq, &ti, by_year, 0.25).unwrap().collect::<Vec<_>>(),
        evolving_graphs(&freq, &ti, by_decade, 0.25).unwrap().collect::<Vec<_>>(),
    ] {
        let mut prev_edges = 0;
        for s in &snaps {
            assert!(s.graph.edge_count() >= prev_edges);
            assert_eq!(s.graph.edge_count(), prev_edges + s.delta.edges_added.len());
            prev_edges = s.graph.edge_count();
        }
        assert_eq!(snaps.last().map(|s| &s.graph), Some(&full));
    }
}

#[test]
fn network_from_json_config() {
    init_logging();
    let cfg = NetworkConfig::from_json(
        r#"{"n_iter": 30, "metric": "euclidean", "sigma": 0.4, "seed": 17, "n_jobs": 2}"#,
    )
    .unwrap();
    let (x, ti) = (features(9, 6, 0.8), years(9));
    let labels: Vec<String> = (0..9).map(|i| format!("text-{}", i)).collect();
    let a = bootstrap_network_seeded(&x, Some(labels.as_slice()), Some(&ti), &cfg).unwrap();
    let b = bootstrap_network_seeded(&x, Some(labels.as_slice()), Some(&ti), &cfg).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.graph, to_graph(&a.frequencies, Some(&ti), 0.4, false).unwrap());

    let err = bootstrap_network_seeded(&x, Some(&labels[..4]), Some(&ti), &cfg).unwrap_err();
    assert_eq!(err.to_string(), "Number of labels (4) should be equal to number of data points (9)");
}

// ─── Property-based ─────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_frequencies_in_unit_interval(
        n in 2usize..8,
        d in 1usize..6,
        salt in 0.0f64..10.0,
        seed in any::<u64>(),
        prop in 0.2f64..=1.0,
    ) {
        let x = features(n, d, salt);
        let cfg = BootstrapConfig { n_iter: 8, sample_prop: prop, ..BootstrapConfig::default() };
        prop_assume!((d as f64 * prop).floor() >= 1.0);
        let freq = bootstrap_neighbors_seeded(&x, None, &cfg, seed).unwrap();
        for i in 0..n {
            prop_assert_eq!(freq.get(i, i), 0.0);
            for j in 0..n {
                prop_assert!((0.0..=1.0).contains(&freq.get(i, j)));
            }
        }
    }

    #[test]
    fn prop_no_edge_to_future(
        ys in proptest::collection::vec(1800i32..1850, 3..9),
        seed in any::<u64>(),
    ) {
        let n = ys.len();
        let x = features(n, 5, 0.7);
        let ti = TimeIndex::from_years(&ys).unwrap();
        let cfg = config(Metric::Euclidean, 6);
        let freq = bootstrap_neighbors_seeded(&x, Some(&ti), &cfg, seed).unwrap();
        let g = to_graph(&freq, Some(&ti), 0.1, false).unwrap();
        for (a, b) in g.edges() {
            prop_assert!(ys[b] <= ys[a]);
        }
    }
}
