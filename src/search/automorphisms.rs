//! Automorphism group discovery.
//!
//! The first path of the search tree fixes a base `b_0, .., b_k` and a reference
//! leaf. Levels are processed deepest first: at level `i` every vertex `w` of the
//! target cell that is not yet known to share an orbit with `b_i` under the
//! stabilizer of `b_0, .., b_{i-1}` is tried by searching the subtree of `w` for a
//! leaf equivalent to the reference leaf. The group order is the product of the
//! orbit sizes of the base points in their stabilizers.

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::primitives::concurrency::{SearchContext, SearchStats};
use crate::search::group::{GroupOrder, Orbits, Permutation};
use crate::search::ir::{is_automorphism, search_exhaustive, search_random, Descent, Probe};
use crate::search::options::ErrorBound;
use crate::search::partition::Partition;
use crate::search::refine::Refiner;
use crate::search::{sub_seed, Completion};
use crate::storage::CompactGraph;
use crate::types::{DejavuError, Result};

/// Generators, base and order of an automorphism group.
#[derive(Clone, Debug)]
pub struct AutomorphismResult {
    /// Generators in discovery order. The identity is implied, never listed.
    pub generators: Vec<Permutation>,
    /// Base whose pointwise stabilizer is trivial.
    pub base: Vec<usize>,
    /// Group order; partial if the search was cancelled.
    pub order: GroupOrder,
    /// Whether the search ran to the end.
    pub completion: Completion,
    /// Work counters.
    pub stats: SearchStats,
}

impl AutomorphismResult {
    fn empty(completion: Completion, stats: SearchStats) -> Self {
        Self {
            generators: Vec::new(),
            base: Vec::new(),
            order: GroupOrder::one(),
            completion,
            stats,
        }
    }

    /// Mantissa of the group order.
    pub fn group_order_mantissa(&self) -> f64 {
        self.order.mantissa()
    }

    /// Exponent of the group order.
    pub fn group_order_exponent(&self) -> i32 {
        self.order.exponent()
    }
}

/// Computes generators of the color-preserving automorphism group of `graph`.
///
/// Cancellation is not an error: the result then holds the generators found so
/// far and [`Completion::Cancelled`].
pub fn discover(
    graph: &CompactGraph,
    colors: &[i64],
    error_bound: ErrorBound,
    ctx: &SearchContext,
) -> Result<AutomorphismResult> {
    let n = graph.vertex_count();
    if colors.len() != n {
        return Err(DejavuError::invalid(format!(
            "{} colors for {n} vertices",
            colors.len()
        )));
    }

    let started = Instant::now();
    let seed = ctx.base_seed();
    let stop = || ctx.is_cancelled();
    let accept = |perm: &Permutation| is_automorphism(graph, colors, perm);
    let mut stats = SearchStats::default();
    let mut refiner = Refiner::new(graph);

    let mut root = Partition::from_labels(colors);
    refiner.refine_all(&mut root, &mut stats);
    let first = Descent::first_path(&mut refiner, root, &stop, &mut stats);
    let Some(reference) = first else {
        warn!(vertices = n, "automorphism search cancelled before the first leaf");
        return Ok(AutomorphismResult::empty(Completion::Cancelled, stats));
    };

    let threads = ctx.threads();
    let mut generators: Vec<Permutation> = Vec::new();
    let mut order = GroupOrder::one();
    let mut completion = Completion::Complete;

    ctx.install(|| {
        'levels: for depth in (0..reference.levels.len()).rev() {
            let level = &reference.levels[depth];
            let mut orbits = Orbits::from_generators(n, &generators);
            let mut failed: Vec<usize> = Vec::new();
            let mut cell = level.before.cell(level.target).to_vec();
            cell.sort_unstable();
            let mut pending = cell.into_iter().filter(|&w| w != level.vertex);

            loop {
                let mut batch = Vec::with_capacity(threads);
                while batch.len() < threads {
                    let Some(w) = pending.next() else {
                        break;
                    };
                    let known = orbits.same(w, level.vertex)
                        || failed.iter().any(|&f| orbits.same(w, f));
                    if !known {
                        batch.push(w);
                    }
                }
                if batch.is_empty() {
                    break;
                }

                let outcomes: Vec<(Probe, SearchStats)> = if threads > 1 {
                    batch
                        .par_iter()
                        .map_init(
                            || Refiner::new(graph),
                            |r, &w| {
                                try_candidate(
                                    r,
                                    &reference,
                                    depth,
                                    w,
                                    error_bound,
                                    seed,
                                    &accept,
                                    &stop,
                                )
                            },
                        )
                        .collect()
                } else {
                    batch
                        .iter()
                        .map(|&w| {
                            try_candidate(
                                &mut refiner,
                                &reference,
                                depth,
                                w,
                                error_bound,
                                seed,
                                &accept,
                                &stop,
                            )
                        })
                        .collect()
                };

                for (&w, (probe, probe_stats)) in batch.iter().zip(outcomes) {
                    stats += probe_stats;
                    match probe {
                        Probe::Found(perm) => {
                            if !orbits.same(w, level.vertex) {
                                orbits.add_generator(&perm);
                                generators.push(perm);
                            }
                        }
                        Probe::Exhausted => failed.push(w),
                        Probe::Cancelled => completion = Completion::Cancelled,
                    }
                }
                if completion.is_cancelled() {
                    break 'levels;
                }
            }

            let orbit = orbits.orbit_size(level.vertex);
            order.multiply(orbit);
            trace!(
                depth,
                base_point = level.vertex,
                orbit,
                generators = generators.len(),
                "automorphisms.level"
            );
        }
    });

    if completion.is_cancelled() {
        warn!(
            generators = generators.len(),
            "automorphism search cancelled; returning partial group"
        );
    }
    debug!(
        vertices = n,
        generators = generators.len(),
        base_len = reference.levels.len(),
        order = order.value(),
        nodes = stats.nodes,
        leaves = stats.leaves,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "search.discover"
    );

    Ok(AutomorphismResult {
        generators,
        base: reference.base(),
        order,
        completion,
        stats,
    })
}

/// Looks for an automorphism mapping the level's base point to `w`.
#[allow(clippy::too_many_arguments)]
fn try_candidate(
    refiner: &mut Refiner<'_>,
    reference: &Descent,
    depth: usize,
    w: usize,
    error_bound: ErrorBound,
    seed: u64,
    accept: &impl Fn(&Permutation) -> bool,
    stop: &impl Fn() -> bool,
) -> (Probe, SearchStats) {
    let mut stats = SearchStats::default();
    let level = &reference.levels[depth];
    let mut node = level.before.clone();
    if refiner.individualize(&mut node, w, &mut stats) != level.invariant {
        return (Probe::Exhausted, stats);
    }
    if error_bound.is_exact() {
        let probe =
            search_exhaustive(refiner, reference, node, depth + 1, accept, stop, &mut stats);
        return (probe, stats);
    }

    let width = reference.levels[depth + 1..]
        .iter()
        .fold(1usize, |acc, l| acc.saturating_mul(l.target_len));
    let budget = error_bound.probe_budget(width);
    let mut rng = ChaCha8Rng::seed_from_u64(sub_seed(seed, ((depth as u64) << 32) ^ w as u64));
    for _ in 0..budget {
        match search_random(
            refiner,
            reference,
            node.clone(),
            depth + 1,
            &mut rng,
            accept,
            stop,
            &mut stats,
        ) {
            Probe::Exhausted => continue,
            found_or_cancelled => return (found_or_cancelled, stats),
        }
    }
    (Probe::Exhausted, stats)
}
