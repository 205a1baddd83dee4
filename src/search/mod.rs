//! Individualization-refinement search: automorphism groups, isomorphism
//! tests and path sampling.
//!
//! Every entry point borrows an immutable [`CompactGraph`](crate::storage::CompactGraph)
//! plus its initial coloring and a [`SearchContext`](crate::primitives::concurrency::SearchContext).
//! Results are freshly allocated per call and never reference the graph.

/// Automorphism group discovery.
pub mod automorphisms;
/// Isomorphism decision.
pub mod isomorphism;
/// Search-tree walking shared by the searches.
pub mod ir;
/// Path and invariant sampling.
pub mod paths;

mod group;
mod options;
mod partition;
mod refine;

pub use automorphisms::{discover, AutomorphismResult};
pub use group::{GroupOrder, Orbits, Permutation};
pub use ir::{is_automorphism, is_isomorphism};
pub use isomorphism::{decide, IsomorphismOutcome, Verdict};
pub use options::{ErrorBound, SampleOptions, MAX_PROBES};
pub use partition::Partition;
pub use paths::{sample_paths, PathSample, PathSet};
pub use refine::{NodeInvariant, Refiner};

/// How a search call ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Completion {
    /// The search ran to the end.
    #[default]
    Complete,
    /// The cancellation token fired; the result is partial but valid.
    Cancelled,
}

impl Completion {
    /// Returns `true` for [`Completion::Cancelled`].
    pub fn is_cancelled(self) -> bool {
        self == Completion::Cancelled
    }
}

/// Derives the seed of work item `index` from a call's base seed.
pub(crate) fn sub_seed(base: u64, index: u64) -> u64 {
    base ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
