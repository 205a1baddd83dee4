//! Automorphism discovery end to end through the handle facade.

#![allow(missing_docs)]

use std::sync::Once;

use dejavu_gi::{Completion, Dejavu, GraphHandle, ResultHandle, Result};
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

fn order(engine: &Dejavu, r: ResultHandle) -> Result<f64> {
    let mantissa = engine.group_order_mantissa(r)?;
    let exponent = engine.group_order_exponent(r)?;
    Ok(mantissa * 2f64.powi(exponent))
}

/// Checks every generator against the edge list.
fn assert_generators_preserve(engine: &Dejavu, r: ResultHandle, n: usize, edges: &[(i64, i64)]) {
    let adjacent = |a: usize, b: usize| {
        edges
            .iter()
            .any(|&(x, y)| (x as usize, y as usize) == (a, b) || (y as usize, x as usize) == (a, b))
    };
    for g in 0..engine.generator_count(r).unwrap() {
        let image: Vec<usize> = (0..n)
            .map(|v| engine.generator_image(r, g as i64, v as i64).unwrap())
            .collect();
        let mut sorted = image.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..n).collect::<Vec<_>>(), "generator {g} is not a bijection");
        assert!(image.iter().enumerate().any(|(v, &w)| v != w), "identity listed");
        for &(a, b) in edges {
            assert!(
                adjacent(image[a as usize], image[b as usize]),
                "generator {g} breaks edge {a}-{b}"
            );
        }
    }
}

#[test]
fn two_triangles_have_order_72() -> Result<()> {
    init_tracing();
    let engine = Dejavu::new();
    let edges = [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)];
    let g = graph(&engine, 6, &edges)?;
    let r = engine.discover_automorphisms(g, 0.0)?;
    assert_eq!(order(&engine, r)?, 72.0);
    assert_eq!(engine.group_order_mantissa(r)?, 1.125);
    assert_eq!(engine.group_order_exponent(r)?, 6);
    assert_eq!(engine.result_completion(r)?, Completion::Complete);
    assert_generators_preserve(&engine, r, 6, &edges);
    Ok(())
}

#[test]
fn petersen_graph_has_order_120() -> Result<()> {
    init_tracing();
    let engine = Dejavu::new();
    let edges = petersen_edges();
    let g = graph(&engine, 10, &edges)?;
    let r = engine.discover_automorphisms(g, 0.0)?;
    assert_eq!(order(&engine, r)?, 120.0);
    assert_generators_preserve(&engine, r, 10, &edges);
    for i in 0..engine.base_size(r)? {
        assert!(engine.base_point(r, i as i64)? < 10);
    }
    Ok(())
}

#[test]
fn repeated_discovery_reports_the_same_order() -> Result<()> {
    let engine = Dejavu::new();
    let g = graph(&engine, 10, &petersen_edges())?;
    let first = engine.discover_automorphisms(g, 0.0)?;
    let second = engine.discover_automorphisms(g, 0.0)?;
    assert_ne!(first, second);
    assert_eq!(order(&engine, first)?, order(&engine, second)?);
    engine.delete_result(first)?;
    assert_eq!(order(&engine, second)?, 120.0);
    Ok(())
}

#[test]
fn worker_count_does_not_change_the_group() -> Result<()> {
    let engine = Dejavu::new();
    engine.set_threads(4)?;
    let g = graph(&engine, 10, &petersen_edges())?;
    let r = engine.discover_automorphisms(g, 0.0)?;
    assert_eq!(order(&engine, r)?, 120.0);
    Ok(())
}

#[test]
fn empty_graph_has_trivial_group() -> Result<()> {
    let engine = Dejavu::new();
    let g = engine.create(0)?;
    let r = engine.discover_automorphisms(g, 0.0)?;
    assert_eq!(order(&engine, r)?, 1.0);
    assert_eq!(engine.group_order_mantissa(r)?, 1.0);
    assert_eq!(engine.group_order_exponent(r)?, 0);
    assert_eq!(engine.base_size(r)?, 0);
    assert_eq!(engine.generator_count(r)?, 0);
    assert!(engine.base_point(r, 0).is_err());
    Ok(())
}

#[test]
fn vertex_labels_restrict_the_group() -> Result<()> {
    let engine = Dejavu::new();
    let g = graph(&engine, 4, &[(0, 1), (1, 2), (2, 3), (3, 0)])?;
    engine.set_label(g, 0, 1)?;
    let r = engine.discover_automorphisms(g, 0.0)?;
    // Only the reflection through vertex 0 survives.
    assert_eq!(order(&engine, r)?, 2.0);
    Ok(())
}

#[test]
fn edge_labels_restrict_the_group() -> Result<()> {
    let engine = Dejavu::new();
    let uniform = engine.create(3)?;
    for (a, b) in [(0, 1), (1, 2), (2, 0)] {
        engine.add_labeled_edge(uniform, a, b, 4)?;
    }
    let r = engine.discover_automorphisms(uniform, 0.0)?;
    assert_eq!(order(&engine, r)?, 6.0);

    for odd_label in [7, -2] {
        let mixed = engine.create(3)?;
        engine.add_labeled_edge(mixed, 0, 1, 5)?;
        engine.add_labeled_edge(mixed, 1, 2, 5)?;
        engine.add_labeled_edge(mixed, 0, 2, odd_label)?;
        let r = engine.discover_automorphisms(mixed, 0.0)?;
        assert_eq!(order(&engine, r)?, 2.0, "label {odd_label}");
    }
    Ok(())
}

#[test]
fn randomized_discovery_on_a_cycle() -> Result<()> {
    let engine = Dejavu::new();
    engine.set_seed(Some(7));
    let edges: Vec<(i64, i64)> = (0..8).map(|v| (v, (v + 1) % 8)).collect();
    let g = graph(&engine, 8, &edges)?;
    let r = engine.discover_automorphisms(g, 0.05)?;
    // Randomized mode never over-reports.
    let found = order(&engine, r)?;
    assert!(found <= 16.0);
    assert!(16.0 % found == 0.0);
    assert_generators_preserve(&engine, r, 8, &edges);
    Ok(())
}
