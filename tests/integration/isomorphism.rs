//! Isomorphism decisions through the handle facade.

#![allow(missing_docs)]

use std::sync::Once;

use dejavu_gi::config::ENV_ERROR_BOUND;
use dejavu_gi::{Dejavu, GraphHandle, Result, SearchConfig};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn graph(engine: &Dejavu, n: i64, edges: &[(i64, i64)]) -> Result<GraphHandle> {
    let g = engine.create(n)?;
    for &(a, b) in edges {
        engine.add_edge(g, a, b)?;
    }
    Ok(g)
}

fn petersen_edges() -> Vec<(i64, i64)> {
    let mut edges = Vec::new();
    for i in 0..5 {
        edges.push((i, (i + 1) % 5));
        edges.push((i, i + 5));
        edges.push((5 + i, 5 + (i + 2) % 5));
    }
    edges
}

/// Cubic graph on twelve vertices whose only automorphism is the identity.
fn frucht_edges() -> Vec<(i64, i64)> {
    let lcf = [-5, -2, -4, 2, 5, -2, 2, 5, -2, -5, 4, 2];
    let mut edges = Vec::new();
    for (i, step) in (0i64..).zip(lcf) {
        edges.push((i, (i + 1) % 12));
        let j = (i + step).rem_euclid(12);
        if i < j {
            edges.push((i, j));
        }
    }
    edges
}

/// Relabels vertices through `perm` and shuffles the edge order.
fn permuted(edges: &[(i64, i64)], perm: &[i64]) -> Vec<(i64, i64)> {
    let mut out: Vec<(i64, i64)> = edges
        .iter()
        .map(|&(a, b)| (perm[b as usize], perm[a as usize]))
        .collect();
    out.reverse();
    out
}

#[test]
fn cycle_and_path_are_not_isomorphic() -> Result<()> {
    init_tracing();
    let engine = Dejavu::new();
    let c4 = graph(&engine, 4, &[(0, 1), (1, 2), (2, 3), (3, 0)])?;
    let p4 = graph(&engine, 4, &[(0, 1), (1, 2), (2, 3)])?;
    assert!(!engine.are_isomorphic(c4, p4, 0.0)?);
    assert!(!engine.are_isomorphic(c4, p4, 0.1)?);
    Ok(())
}

#[test]
fn permuted_petersen_is_isomorphic() -> Result<()> {
    init_tracing();
    let engine = Dejavu::new();
    engine.set_seed(Some(2024));
    let edges = petersen_edges();
    let perm = [3, 7, 0, 9, 5, 1, 8, 2, 6, 4];
    let a = graph(&engine, 10, &edges)?;
    let b = graph(&engine, 10, &permuted(&edges, &perm))?;
    assert!(engine.are_isomorphic(a, b, 0.0)?);
    assert!(engine.are_isomorphic(a, b, 0.05)?);
    assert!(engine.are_isomorphic(b, a, 0.0)?);
    Ok(())
}

#[test]
fn permuted_rigid_graph_is_isomorphic_at_any_error_bound() -> Result<()> {
    init_tracing();
    let engine = Dejavu::new();
    let edges = frucht_edges();
    let perm = [7, 2, 11, 4, 0, 9, 5, 1, 10, 3, 8, 6];
    let a = graph(&engine, 12, &edges)?;
    let b = graph(&engine, 12, &permuted(&edges, &perm))?;
    for threads in [1, 2] {
        engine.set_threads(threads)?;
        for seed in 0..10 {
            engine.set_seed(Some(seed));
            for eps in [0.5, 1.0, 5.0] {
                assert!(engine.are_isomorphic(a, b, eps)?, "seed {seed} eps {eps}");
            }
        }
    }
    Ok(())
}

#[test]
fn configured_error_bound_applies_to_default_calls() -> Result<()> {
    init_tracing();
    let config = SearchConfig::default().apply_env_from(|key| {
        (key == ENV_ERROR_BOUND).then(|| "0.9".to_string())
    })?;
    let engine = Dejavu::from_config(&config)?;
    assert_eq!(engine.default_error_bound(), 0.9);

    let edges = frucht_edges();
    let a = graph(&engine, 12, &edges)?;
    let b = graph(&engine, 12, &permuted(&edges, &[3, 5, 7, 9, 11, 1, 0, 2, 4, 6, 8, 10]))?;
    for seed in 0..10 {
        engine.set_seed(Some(seed));
        assert!(engine.are_isomorphic_default(a, b)?);
    }
    let r = engine.discover_automorphisms_default(a)?;
    assert_eq!(engine.group_order_mantissa(r)?, 1.0);
    assert_eq!(engine.group_order_exponent(r)?, 0);

    let prism = graph(
        &engine,
        12,
        &(0..6)
            .flat_map(|i| [(i, (i + 1) % 6), (6 + i, 6 + (i + 1) % 6), (i, i + 6)])
            .collect::<Vec<_>>(),
    )?;
    assert!(!engine.are_isomorphic_default(a, prism)?);
    Ok(())
}

#[test]
fn parallel_decision_agrees() -> Result<()> {
    let engine = Dejavu::new();
    engine.set_threads(3)?;
    engine.set_seed(Some(5));
    let edges = petersen_edges();
    let a = graph(&engine, 10, &edges)?;
    let b = graph(&engine, 10, &permuted(&edges, &[9, 8, 7, 6, 5, 4, 3, 2, 1, 0]))?;
    assert!(engine.are_isomorphic(a, b, 0.0)?);
    assert!(engine.are_isomorphic(a, b, 0.05)?);

    let triangles = graph(&engine, 6, &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)])?;
    let hexagon = graph(&engine, 6, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0)])?;
    assert!(!engine.are_isomorphic(triangles, hexagon, 0.0)?);
    Ok(())
}

#[test]
fn labels_must_correspond() -> Result<()> {
    let engine = Dejavu::new();
    let edges = [(0, 1), (1, 2)];
    let a = graph(&engine, 3, &edges)?;
    let b = graph(&engine, 3, &edges)?;
    engine.set_label(a, 0, 3)?;
    engine.set_label(b, 1, 3)?;
    // The labelled vertex is an end in one path and the middle in the other.
    assert!(!engine.are_isomorphic(a, b, 0.0)?);
    engine.set_label(b, 1, 0)?;
    engine.set_label(b, 2, 3)?;
    assert!(engine.are_isomorphic(a, b, 0.0)?);
    Ok(())
}

#[test]
fn edge_labels_take_part_in_the_decision() -> Result<()> {
    let engine = Dejavu::new();
    let labeled = |labels: [i64; 3]| -> Result<GraphHandle> {
        let g = engine.create(3)?;
        for ((a, b), label) in [(0, 1), (1, 2), (2, 0)].into_iter().zip(labels) {
            engine.add_labeled_edge(g, a, b, label)?;
        }
        Ok(g)
    };
    let a = labeled([1, 1, 2])?;
    let b = labeled([2, 1, 1])?;
    let c = labeled([2, 2, 1])?;
    assert!(engine.are_isomorphic(a, b, 0.0)?);
    assert!(!engine.are_isomorphic(a, c, 0.0)?);
    Ok(())
}

#[test]
fn size_mismatch_is_not_isomorphic() -> Result<()> {
    let engine = Dejavu::new();
    let a = engine.create(3)?;
    let b = engine.create(4)?;
    assert!(!engine.are_isomorphic(a, b, 0.0)?);
    let empty = engine.create(0)?;
    assert!(engine.are_isomorphic(empty, empty, 0.0)?);
    Ok(())
}

#[test]
fn invalid_error_bound_is_rejected() -> Result<()> {
    let engine = Dejavu::new();
    let g = engine.create(2)?;
    assert!(engine.are_isomorphic(g, g, -0.5).is_err());
    assert!(engine.are_isomorphic(g, g, f64::INFINITY).is_err());
    Ok(())
}
