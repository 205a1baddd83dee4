//! Isomorphism decision between two colored graphs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::primitives::concurrency::{SearchContext, SearchStats};
use crate::search::group::Permutation;
use crate::search::ir::{is_isomorphism, search_exhaustive, search_random, Descent, Probe};
use crate::search::options::ErrorBound;
use crate::search::partition::Partition;
use crate::search::refine::Refiner;
use crate::search::sub_seed;
use crate::storage::CompactGraph;
use crate::types::{DejavuError, Result};

/// Answer of [`decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// An isomorphism was found and verified.
    Isomorphic,
    /// No isomorphism exists.
    NonIsomorphic,
    /// The search was cancelled before reaching an answer.
    Unknown,
}

/// Verdict plus the isomorphism that proves it, if any.
#[derive(Clone, Debug)]
pub struct IsomorphismOutcome {
    /// The answer.
    pub verdict: Verdict,
    /// Maps every vertex of the first graph to its image in the second.
    pub mapping: Option<Permutation>,
    /// Work counters.
    pub stats: SearchStats,
}

impl IsomorphismOutcome {
    fn negative(stats: SearchStats) -> Self {
        Self {
            verdict: Verdict::NonIsomorphic,
            mapping: None,
            stats,
        }
    }
}

/// Decides whether `(a, colors_a)` and `(b, colors_b)` are isomorphic.
///
/// `Isomorphic` is always backed by a verified mapping. A positive error bound
/// first tries a budget of random root-to-leaf walks sized by the bound; when
/// none of them lands on an isomorphism the search continues exhaustively, so
/// `NonIsomorphic` is exact in both modes.
pub fn decide(
    a: &CompactGraph,
    colors_a: &[i64],
    b: &CompactGraph,
    colors_b: &[i64],
    error_bound: ErrorBound,
    ctx: &SearchContext,
) -> Result<IsomorphismOutcome> {
    if colors_a.len() != a.vertex_count() || colors_b.len() != b.vertex_count() {
        return Err(DejavuError::invalid("coloring does not match vertex count"));
    }
    let started = Instant::now();
    let mut stats = SearchStats::default();
    if let Some(reason) = quick_reject(a, colors_a, b, colors_b) {
        trace!(reason, "isomorphism.reject");
        return Ok(IsomorphismOutcome::negative(stats));
    }

    let mut refiner_a = Refiner::new(a);
    let mut refiner_b = Refiner::new(b);
    let mut root_a = Partition::from_labels(colors_a);
    let mut root_b = Partition::from_labels(colors_b);
    let inv_a = refiner_a.refine_all(&mut root_a, &mut stats);
    let inv_b = refiner_b.refine_all(&mut root_b, &mut stats);
    if inv_a != inv_b {
        trace!(reason = "root invariant", "isomorphism.reject");
        return Ok(IsomorphismOutcome::negative(stats));
    }

    let stop = || ctx.is_cancelled();
    let first = Descent::first_path(&mut refiner_a, root_a, &stop, &mut stats);
    let Some(reference) = first else {
        return Ok(cancelled(stats));
    };

    let found = AtomicBool::new(false);
    let stop_workers = || ctx.is_cancelled() || found.load(Ordering::Acquire);
    let accept = |perm: &Permutation| is_isomorphism(a, colors_a, b, colors_b, perm);
    let threads = ctx.threads();
    let seed = ctx.base_seed();

    let probes: Vec<(Probe, SearchStats)> = ctx.install(|| {
        let finish = |probe: Probe, probe_stats: SearchStats| {
            if matches!(probe, Probe::Found(_)) {
                found.store(true, Ordering::Release);
            }
            (probe, probe_stats)
        };

        let exhaustive = |r: &mut Refiner<'_>| -> Vec<(Probe, SearchStats)> {
            if threads <= 1 || reference.levels.is_empty() {
                let mut s = SearchStats::default();
                let probe =
                    search_exhaustive(r, &reference, root_b.clone(), 0, &accept, &stop, &mut s);
                return vec![(probe, s)];
            }
            // Root branches of the second tree are spread over the workers.
            let Some(target) = reference.matches_target(0, &root_b) else {
                return Vec::new();
            };
            let expected = reference.levels[0].invariant;
            root_b
                .cell(target)
                .to_vec()
                .into_par_iter()
                .map_init(
                    || Refiner::new(b),
                    |r, u| {
                        let mut s = SearchStats::default();
                        let mut child = root_b.clone();
                        if r.individualize(&mut child, u, &mut s) != expected {
                            return (Probe::Exhausted, s);
                        }
                        let probe = search_exhaustive(
                            r,
                            &reference,
                            child,
                            1,
                            &accept,
                            &stop_workers,
                            &mut s,
                        );
                        finish(probe, s)
                    },
                )
                .collect()
        };

        if error_bound.is_exact() {
            return exhaustive(&mut refiner_b);
        }

        let width = reference
            .levels
            .iter()
            .fold(1usize, |acc, l| acc.saturating_mul(l.target_len));
        let budget = error_bound.probe_budget(width);
        let walk_at = |r: &mut Refiner<'_>, i: usize| {
            if stop_workers() {
                return (Probe::Cancelled, SearchStats::default());
            }
            let mut s = SearchStats::default();
            let mut rng = ChaCha8Rng::seed_from_u64(sub_seed(seed, i as u64));
            let probe = search_random(
                r,
                &reference,
                root_b.clone(),
                0,
                &mut rng,
                &accept,
                &stop_workers,
                &mut s,
            );
            finish(probe, s)
        };
        let mut walks: Vec<(Probe, SearchStats)> = if threads > 1 {
            (0..budget)
                .into_par_iter()
                .map_init(|| Refiner::new(b), walk_at)
                .collect()
        } else {
            let mut out = Vec::new();
            for i in 0..budget {
                let outcome = walk_at(&mut refiner_b, i);
                let done = !matches!(outcome.0, Probe::Exhausted);
                out.push(outcome);
                if done {
                    break;
                }
            }
            out
        };

        // A miss after the walk budget is settled exhaustively.
        if !found.load(Ordering::Acquire) && !ctx.is_cancelled() {
            trace!(walks = walks.len(), "isomorphism.fallback");
            walks.extend(exhaustive(&mut refiner_b));
        }
        walks
    });

    let mut mapping = None;
    let mut interrupted = false;
    for (probe, probe_stats) in probes {
        stats += probe_stats;
        match probe {
            Probe::Found(perm) => {
                if mapping.is_none() {
                    mapping = Some(perm);
                }
            }
            Probe::Cancelled => interrupted = true,
            Probe::Exhausted => {}
        }
    }

    let outcome = match mapping {
        Some(perm) => IsomorphismOutcome {
            verdict: Verdict::Isomorphic,
            mapping: Some(perm),
            stats,
        },
        None if interrupted && ctx.is_cancelled() => return Ok(cancelled(stats)),
        None => IsomorphismOutcome::negative(stats),
    };
    debug!(
        vertices = a.vertex_count(),
        verdict = ?outcome.verdict,
        exact = error_bound.is_exact(),
        nodes = outcome.stats.nodes,
        leaves = outcome.stats.leaves,
        probes = outcome.stats.probes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "search.decide"
    );
    Ok(outcome)
}

fn cancelled(stats: SearchStats) -> IsomorphismOutcome {
    warn!("isomorphism search cancelled");
    IsomorphismOutcome {
        verdict: Verdict::Unknown,
        mapping: None,
        stats,
    }
}

/// Cheap necessary conditions; returns the first one that fails.
fn quick_reject(
    a: &CompactGraph,
    colors_a: &[i64],
    b: &CompactGraph,
    colors_b: &[i64],
) -> Option<&'static str> {
    if a.vertex_count() != b.vertex_count() {
        return Some("vertex count");
    }
    if a.adjacency_len() != b.adjacency_len() {
        return Some("edge count");
    }
    let mut la = colors_a.to_vec();
    let mut lb = colors_b.to_vec();
    la.sort_unstable();
    lb.sort_unstable();
    if la != lb {
        return Some("label multiset");
    }
    let mut da = a.degrees().to_vec();
    let mut db = b.degrees().to_vec();
    da.sort_unstable();
    db.sort_unstable();
    if da != db {
        return Some("degree sequence");
    }
    None
}
