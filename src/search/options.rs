use crate::types::{DejavuError, Result};

/// Largest number of random probes spent on a single candidate.
pub const MAX_PROBES: usize = 1 << 16;

/// Tolerated probability of missing a symmetry.
///
/// Zero selects the exhaustive search; any positive value switches to random
/// probing with a budget derived from the bound. The isomorphism test only uses
/// the budget as a first pass and settles misses exhaustively.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErrorBound(f64);

impl ErrorBound {
    /// Validates `eps`: it must be finite and non-negative.
    pub fn new(eps: f64) -> Result<Self> {
        if !eps.is_finite() || eps < 0.0 {
            return Err(DejavuError::invalid(format!(
                "error bound must be a finite value >= 0, got {eps}"
            )));
        }
        Ok(Self(eps))
    }

    /// The exhaustive, deterministic setting.
    pub fn exact() -> Self {
        Self(0.0)
    }

    /// The raw probability.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Returns `true` when the search must be exhaustive.
    pub fn is_exact(self) -> bool {
        self.0 == 0.0
    }

    /// Probes needed so a target hit with probability `1/branching` per probe
    /// is missed with probability at most the bound.
    pub fn probe_budget(self, branching: usize) -> usize {
        if self.is_exact() {
            return MAX_PROBES;
        }
        if branching <= 1 || self.0 >= 1.0 {
            return 1;
        }
        let miss = 1.0 - 1.0 / branching as f64;
        let probes = (self.0.ln() / miss.ln()).ceil();
        if probes.is_nan() || probes < 1.0 {
            1
        } else if probes >= MAX_PROBES as f64 {
            MAX_PROBES
        } else {
            probes as usize
        }
    }
}

/// Parameters of one path-sampling run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleOptions {
    /// Longest base-point sequence, fill included.
    pub max_path_length: usize,
    /// Number of random walks.
    pub sample_count: usize,
    /// Pad short walks with representatives of unused colors.
    pub fill_paths: bool,
    /// Vertices at or above this id are never individualized nor used as fill.
    pub forbidden_tail: Option<usize>,
}

impl SampleOptions {
    /// Validates caller-supplied sizes. A non-positive `sample_count` yields an
    /// empty run; a negative `max_path_length` is an error.
    pub fn new(max_path_length: i64, sample_count: i64, fill_paths: bool) -> Result<Self> {
        let max_path_length = usize::try_from(max_path_length).map_err(|_| {
            DejavuError::invalid(format!("negative max path length {max_path_length}"))
        })?;
        Ok(Self {
            max_path_length,
            sample_count: usize::try_from(sample_count).unwrap_or(0),
            fill_paths,
            forbidden_tail: None,
        })
    }

    /// Sets the forbidden tail.
    pub fn forbidden_tail(mut self, tail: Option<usize>) -> Self {
        self.forbidden_tail = tail;
        self
    }

    pub(crate) fn allows(&self, v: usize) -> bool {
        self.forbidden_tail.map_or(true, |tail| v < tail)
    }
}
