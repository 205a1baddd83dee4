//! Random root-to-leaf walks with invariants, used for isomorphism rejection.

use std::hash::Hasher;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};
use xxhash_rust::xxh64::Xxh64;

use crate::primitives::concurrency::{SearchContext, SearchStats};
use crate::search::ir::target_cell;
use crate::search::options::SampleOptions;
use crate::search::partition::Partition;
use crate::search::refine::{NodeInvariant, Refiner};
use crate::search::{sub_seed, Completion};
use crate::storage::CompactGraph;
use crate::types::{DejavuError, Result};

/// One sampled walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSample {
    /// Color of every vertex in the partition the walk ended in.
    pub vertex_to_color: Vec<usize>,
    /// Hash of the refinement invariants along the walk.
    pub invariant: i64,
    /// Individualized vertices in order, followed by greedy fill.
    pub base_points: Vec<usize>,
}

/// Deduplicated samples of one run.
#[derive(Clone, Debug, Default)]
pub struct PathSet {
    /// Samples in the order they were drawn.
    pub samples: Vec<PathSample>,
    /// Whether every requested walk ran.
    pub completion: Completion,
    /// Work counters.
    pub stats: SearchStats,
}

impl PathSet {
    /// Number of distinct samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no sample was kept.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Draws `opts.sample_count` random walks through the search tree of `graph`.
pub fn sample_paths(
    graph: &CompactGraph,
    colors: &[i64],
    opts: &SampleOptions,
    ctx: &SearchContext,
) -> Result<PathSet> {
    if colors.len() != graph.vertex_count() {
        return Err(DejavuError::invalid(format!(
            "{} colors for {} vertices",
            colors.len(),
            graph.vertex_count()
        )));
    }
    if opts.sample_count == 0 {
        return Ok(PathSet::default());
    }

    let started = Instant::now();
    let mut stats = SearchStats::default();
    let mut root = Partition::from_labels(colors);
    let root_invariant = Refiner::new(graph).refine_all(&mut root, &mut stats);
    let seed = ctx.base_seed();

    let walks: Vec<Option<(PathSample, SearchStats)>> = ctx.install(|| {
        let draw = |refiner: &mut Refiner<'_>, i: usize| {
            if ctx.is_cancelled() {
                return None;
            }
            let mut rng = ChaCha8Rng::seed_from_u64(sub_seed(seed, i as u64));
            Some(walk(refiner, &root, root_invariant, opts, &mut rng))
        };
        if ctx.threads() > 1 {
            (0..opts.sample_count)
                .into_par_iter()
                .map_init(|| Refiner::new(graph), draw)
                .collect()
        } else {
            let mut refiner = Refiner::new(graph);
            (0..opts.sample_count)
                .map(|i| draw(&mut refiner, i))
                .collect()
        }
    });

    let mut completion = Completion::Complete;
    let mut seen = FxHashSet::default();
    let mut samples = Vec::new();
    for outcome in walks {
        let Some((mut sample, walk_stats)) = outcome else {
            completion = Completion::Cancelled;
            continue;
        };
        stats += walk_stats;
        if !seen.insert((sample.base_points.clone(), sample.invariant)) {
            continue;
        }
        if opts.fill_paths {
            fill(&mut sample, opts);
        }
        samples.push(sample);
    }

    if completion == Completion::Cancelled {
        warn!(kept = samples.len(), "path sampling cancelled");
    }
    debug!(
        vertices = graph.vertex_count(),
        requested = opts.sample_count,
        kept = samples.len(),
        nodes = stats.nodes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "search.sample_paths"
    );
    Ok(PathSet {
        samples,
        completion,
        stats,
    })
}

fn walk<R: Rng>(
    refiner: &mut Refiner<'_>,
    root: &Partition,
    root_invariant: NodeInvariant,
    opts: &SampleOptions,
    rng: &mut R,
) -> (PathSample, SearchStats) {
    let mut stats = SearchStats {
        probes: 1,
        ..SearchStats::default()
    };
    let mut node = root.clone();
    let mut hasher = Xxh64::new(0);
    hasher.write_u64(root_invariant.trace);
    hasher.write_u64(root_invariant.cells as u64);

    let mut base_points = Vec::new();
    while base_points.len() < opts.max_path_length {
        let Some(target) = target_cell(&node, opts.forbidden_tail) else {
            break;
        };
        let allowed: Vec<usize> = node
            .cell(target)
            .iter()
            .copied()
            .filter(|&v| opts.allows(v))
            .collect();
        let v = allowed[rng.gen_range(0..allowed.len())];
        let inv = refiner.individualize(&mut node, v, &mut stats);
        hasher.write_u64(inv.trace);
        hasher.write_u64(inv.cells as u64);
        base_points.push(v);
    }

    let sample = PathSample {
        vertex_to_color: node.colors().to_vec(),
        invariant: hasher.finish() as i64,
        base_points,
    };
    (sample, stats)
}

/// Appends the smallest vertex of every unused color, in color order.
fn fill(sample: &mut PathSample, opts: &SampleOptions) {
    let n = sample.vertex_to_color.len();
    let mut used = vec![false; n];
    for &v in &sample.base_points {
        used[sample.vertex_to_color[v]] = true;
    }
    // Colors are cell starts, so the first vertex seen per color is the smallest.
    let mut representative = vec![usize::MAX; n];
    for v in 0..n {
        let c = sample.vertex_to_color[v];
        if representative[c] == usize::MAX {
            representative[c] = v;
        }
    }
    for c in 0..n {
        if sample.base_points.len() >= opts.max_path_length {
            break;
        }
        let rep = representative[c];
        if rep == usize::MAX || used[c] || !opts.allows(rep) {
            continue;
        }
        used[c] = true;
        sample.base_points.push(rep);
    }
}
