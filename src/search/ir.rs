//! Individualization-refinement tree walking.
//!
//! A node of the search tree is an equitable partition; its children are the
//! refinements obtained by individualizing each vertex of the node's target
//! cell. Leaves are discrete partitions, and two leaves with equal invariant
//! sequences are compared through the permutation that maps one onto the other.

use rand::Rng;
use tracing::trace;

use crate::primitives::concurrency::SearchStats;
use crate::search::group::Permutation;
use crate::search::partition::Partition;
use crate::search::refine::{NodeInvariant, Refiner};
use crate::storage::CompactGraph;

/// First largest non-singleton cell holding a vertex below `tail`.
pub fn target_cell(part: &Partition, tail: Option<usize>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for start in part.cell_starts() {
        let len = part.cell_len(start);
        if len < 2 || best.is_some_and(|(_, l)| l >= len) {
            continue;
        }
        let allowed = match tail {
            None => true,
            Some(t) => part.cell(start).iter().any(|&v| v < t),
        };
        if allowed {
            best = Some((start, len));
        }
    }
    best.map(|(start, _)| start)
}

/// One level of a recorded root-to-leaf path.
#[derive(Clone, Debug)]
pub(crate) struct Level {
    /// Partition before individualization.
    pub before: Partition,
    pub target: usize,
    pub target_len: usize,
    pub vertex: usize,
    /// Invariant after individualizing `vertex`.
    pub invariant: NodeInvariant,
}

/// Root-to-leaf path used as the reference leaf.
#[derive(Clone, Debug)]
pub(crate) struct Descent {
    pub levels: Vec<Level>,
    pub leaf: Partition,
}

impl Descent {
    /// Follows the first vertex of every target cell down to a leaf.
    ///
    /// Returns `None` if `stop` fires on the way.
    pub fn first_path(
        refiner: &mut Refiner<'_>,
        mut node: Partition,
        stop: &impl Fn() -> bool,
        stats: &mut SearchStats,
    ) -> Option<Self> {
        let mut levels = Vec::new();
        while let Some(target) = target_cell(&node, None) {
            if stop() {
                return None;
            }
            let before = node.clone();
            let vertex = node.cell(target)[0];
            let target_len = node.cell_len(target);
            let invariant = refiner.individualize(&mut node, vertex, stats);
            trace!(
                depth = levels.len(),
                vertex,
                target_len,
                cells = invariant.cells,
                "ir.descend"
            );
            levels.push(Level {
                before,
                target,
                target_len,
                vertex,
                invariant,
            });
        }
        Some(Self {
            levels,
            leaf: node,
        })
    }

    /// Base points of the path.
    pub fn base(&self) -> Vec<usize> {
        self.levels.iter().map(|l| l.vertex).collect()
    }

    pub(crate) fn matches_target(&self, depth: usize, node: &Partition) -> Option<usize> {
        let level = &self.levels[depth];
        let target = target_cell(node, None)?;
        (target == level.target && node.cell_len(target) == level.target_len).then_some(target)
    }
}

/// Maps the reference leaf onto `leaf` position by position.
pub(crate) fn leaf_map(reference: &Partition, leaf: &Partition) -> Permutation {
    let mut images = vec![0; reference.len()];
    for p in 0..reference.len() {
        images[reference.vertex_at(p)] = leaf.vertex_at(p);
    }
    Permutation::from_images_unchecked(images)
}

/// Checks that `perm` maps `(a, colors_a)` onto `(b, colors_b)`.
pub fn is_isomorphism(
    a: &CompactGraph,
    colors_a: &[i64],
    b: &CompactGraph,
    colors_b: &[i64],
    perm: &Permutation,
) -> bool {
    let n = a.vertex_count();
    if perm.len() != n || b.vertex_count() != n {
        return false;
    }
    let mut seen = vec![false; n];
    let mut mapped = Vec::new();
    let mut target = Vec::new();
    for v in 0..n {
        let w = perm.image(v);
        if w >= n || std::mem::replace(&mut seen[w], true) {
            return false;
        }
        if colors_a[v] != colors_b[w] || a.degree(v) != b.degree(w) {
            return false;
        }
        mapped.clear();
        mapped.extend(a.neighbors(v).iter().map(|&u| perm.image(u)));
        mapped.sort_unstable();
        target.clear();
        target.extend_from_slice(b.neighbors(w));
        target.sort_unstable();
        if mapped != target {
            return false;
        }
    }
    true
}

/// Checks that `perm` is a color-preserving automorphism of `graph`.
pub fn is_automorphism(graph: &CompactGraph, colors: &[i64], perm: &Permutation) -> bool {
    is_isomorphism(graph, colors, graph, colors, perm)
}

/// Result of searching a subtree for a leaf equivalent to the reference.
#[derive(Debug)]
pub(crate) enum Probe {
    Found(Permutation),
    Exhausted,
    Cancelled,
}

/// Depth-first search below `node`, pruning children whose invariant differs
/// from the reference path at the same depth.
///
/// `node` sits at `depth` (number of individualized vertices) and must already
/// match the reference invariant at that depth.
pub(crate) fn search_exhaustive(
    refiner: &mut Refiner<'_>,
    reference: &Descent,
    node: Partition,
    depth: usize,
    accept: &impl Fn(&Permutation) -> bool,
    stop: &impl Fn() -> bool,
    stats: &mut SearchStats,
) -> Probe {
    let mut stack = vec![(node, depth)];
    while let Some((node, depth)) = stack.pop() {
        if stop() {
            return Probe::Cancelled;
        }
        if depth == reference.levels.len() {
            if let Some(perm) = check_leaf(reference, &node, accept, stats) {
                return Probe::Found(perm);
            }
            continue;
        }
        let Some(target) = reference.matches_target(depth, &node) else {
            continue;
        };
        let expected = reference.levels[depth].invariant;
        let cell = node.cell(target).to_vec();
        for &u in cell.iter().rev() {
            let mut child = node.clone();
            if refiner.individualize(&mut child, u, stats) == expected {
                stack.push((child, depth + 1));
            }
        }
    }
    Probe::Exhausted
}

/// One random root-to-leaf walk below `node`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn search_random<R: Rng>(
    refiner: &mut Refiner<'_>,
    reference: &Descent,
    mut node: Partition,
    mut depth: usize,
    rng: &mut R,
    accept: &impl Fn(&Permutation) -> bool,
    stop: &impl Fn() -> bool,
    stats: &mut SearchStats,
) -> Probe {
    stats.probes += 1;
    while depth < reference.levels.len() {
        if stop() {
            return Probe::Cancelled;
        }
        let Some(target) = reference.matches_target(depth, &node) else {
            return Probe::Exhausted;
        };
        let cell = node.cell(target);
        let u = cell[rng.gen_range(0..cell.len())];
        if refiner.individualize(&mut node, u, stats) != reference.levels[depth].invariant {
            return Probe::Exhausted;
        }
        depth += 1;
    }
    match check_leaf(reference, &node, accept, stats) {
        Some(perm) => Probe::Found(perm),
        None => Probe::Exhausted,
    }
}

fn check_leaf(
    reference: &Descent,
    leaf: &Partition,
    accept: &impl Fn(&Permutation) -> bool,
    stats: &mut SearchStats,
) -> Option<Permutation> {
    if !leaf.is_discrete() {
        return None;
    }
    stats.leaves += 1;
    let perm = leaf_map(&reference.leaf, leaf);
    accept(&perm).then_some(perm)
}
