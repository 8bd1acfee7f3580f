//! Estimate a derivation network for a handful of dated story versions.
//!
//! Run: RUST_LOG=info cargo run --example story_network

use rand::prelude::*;
use textnet::evolving::evolving_graphs;
use textnet::progress::LogProgress;
use textnet::time::by_decade;
use textnet::{bootstrap_network, FeatureMatrix, NetworkConfig, TimeIndex};

/// Word counts over a shared vocabulary: three families of versions that
/// drift a little from their ancestor.
fn corpus() -> (Vec<String>, Vec<i32>, Vec<Vec<f64>>) {
    let base = [
        vec![5.0, 3.0, 0.0, 1.0, 0.0, 2.0, 0.0, 4.0, 1.0, 0.0, 0.0, 3.0],
        vec![0.0, 1.0, 6.0, 0.0, 3.0, 0.0, 2.0, 0.0, 0.0, 4.0, 1.0, 0.0],
        vec![1.0, 0.0, 0.0, 5.0, 0.0, 1.0, 4.0, 0.0, 3.0, 0.0, 2.0, 1.0],
    ];
    let mut labels = Vec::new();
    let mut years = Vec::new();
    let mut rows = Vec::new();
    for (family, ancestor) in base.iter().enumerate() {
        let mut current = ancestor.clone();
        for generation in 0..4 {
            labels.push(format!("tale-{}-{}", (b'A' + family as u8) as char, generation));
            years.push(1880 + 12 * generation as i32 + 3 * family as i32);
            rows.push(current.clone());
            let k = (generation * 5 + family) % current.len();
            current[k] += 1.0;
        }
    }
    (labels, years, rows)
}

fn main() -> textnet::Result<()> {
    env_logger::init();

    let (labels, years, rows) = corpus();
    let x = FeatureMatrix::from_rows(&rows)?;
    let ti = TimeIndex::from_years(&years)?;
    let config = NetworkConfig {
        n_iter: 200,
        sigma: 0.3,
        ..NetworkConfig::default()
    };

    let mut rng = StdRng::seed_from_u64(2024);
    let net = bootstrap_network(
        &x,
        Some(labels.as_slice()),
        Some(&ti),
        &config,
        &mut rng,
        LogProgress::new(config.n_iter),
    )?;

    println!("{} texts, {} edges", net.graph.node_count(), net.graph.edge_count());
    for (from, to) in net.graph.edges() {
        println!(
            "  {} ({}) <- {} ({})  freq {:.2}",
            labels[from],
            years[from],
            labels[to],
            years[to],
            net.frequencies.get(from, to)
        );
    }

    println!("\nby decade:");
    for snap in evolving_graphs(&net.frequencies, &ti, by_decade, config.sigma)? {
        println!(
            "  {}s: +{} texts, +{} edges, {} edges total",
            snap.key,
            snap.delta.nodes_added.len(),
            snap.delta.edges_added.len(),
            snap.graph.edge_count()
        );
    }
    Ok(())
}
