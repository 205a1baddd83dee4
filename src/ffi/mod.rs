#![forbid(unsafe_code)]

//! Handle-based facade shared by language bindings.
//!
//! Bindings see graphs, path sets and automorphism results only through
//! integer-packable handles. Every call validates its arguments up front and
//! reports failures as [`DejavuError`]; searches run without holding the table
//! lock, so [`Dejavu::cancel`] and unrelated handles stay usable meanwhile.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::{SearchConfig, DEFAULT_MAX_PATH_LENGTH};
use crate::primitives::concurrency::{CancelToken, SearchContext, Watchdog};
use crate::search::{
    self, AutomorphismResult, Completion, ErrorBound, PathSample, PathSet, SampleOptions, Verdict,
};
use crate::storage::{
    GraphHandle, GraphStore, HandleTable, PathSetHandle, PathSetKind, ResultHandle, ResultKind,
};
use crate::types::{checked_index, DejavuError, Result};

#[derive(Default)]
struct Tables {
    graphs: GraphStore,
    paths: HandleTable<PathSetKind, PathSet>,
    results: HandleTable<ResultKind, AutomorphismResult>,
}

#[derive(Clone, Copy, Debug)]
struct Settings {
    error_bound: ErrorBound,
    seed: Option<u64>,
    timeout: Option<Duration>,
    max_path_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            error_bound: ErrorBound::exact(),
            seed: None,
            timeout: None,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

/// Shared engine handle used by language bindings.
///
/// Owns every graph, path set and automorphism result created through it, plus
/// the worker count and the cancellation token read by each search call.
pub struct Dejavu {
    tables: Mutex<Tables>,
    settings: Mutex<Settings>,
    threads: AtomicUsize,
    cancel: CancelToken,
}

impl Default for Dejavu {
    fn default() -> Self {
        Self::new()
    }
}

impl Dejavu {
    /// Creates an engine with one worker, an exact error bound, no seed and no
    /// timeout.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            settings: Mutex::new(Settings::default()),
            threads: AtomicUsize::new(1),
            cancel: CancelToken::new(),
        }
    }

    /// Creates an engine from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns [`DejavuError::Config`] if the settings are out of range.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let error_bound = config.error_bound()?;
        let engine = Self::new();
        engine.set_threads(config.threads as i64)?;
        {
            let mut settings = engine.settings.lock();
            settings.error_bound = error_bound;
            settings.seed = config.seed;
            settings.timeout = config.timeout();
            settings.max_path_length = config.default_max_path_length;
        }
        info!(
            threads = config.threads,
            error_bound = error_bound.value(),
            seed = ?config.seed,
            timeout_ms = ?config.timeout_ms,
            "dejavu engine configured"
        );
        Ok(engine)
    }

    // ---- graph lifecycle ----

    /// Allocates a graph with `vertex_count` vertices labelled `0`.
    pub fn create(&self, vertex_count: i64) -> Result<GraphHandle> {
        self.tables.lock().graphs.create(vertex_count)
    }

    /// Frees a graph.
    pub fn delete(&self, graph: GraphHandle) -> Result<()> {
        self.tables.lock().graphs.delete(graph)
    }

    /// Adds an undirected edge (or an arc for directed-DIMACS graphs).
    pub fn add_edge(&self, graph: GraphHandle, v1: i64, v2: i64) -> Result<()> {
        self.tables.lock().graphs.add_edge(graph, v1, v2)
    }

    /// Adds an edge carrying `label`.
    ///
    /// # Errors
    ///
    /// [`DejavuError::InvalidState`] if the graph already holds plain edges.
    pub fn add_labeled_edge(&self, graph: GraphHandle, v1: i64, v2: i64, label: i64) -> Result<()> {
        self.tables
            .lock()
            .graphs
            .add_labeled_edge(graph, v1, v2, label)
    }

    /// Sets the color label of `vertex`.
    pub fn set_label(&self, graph: GraphHandle, vertex: i64, label: i64) -> Result<()> {
        self.tables.lock().graphs.set_label(graph, vertex, label)
    }

    /// Switches the mirrored-arc interpretation on or off.
    pub fn set_directed(&self, graph: GraphHandle, directed: bool) -> Result<()> {
        self.tables.lock().graphs.set_directed_dimacs(graph, directed)
    }

    /// Exports the graph as DIMACS text.
    ///
    /// # Errors
    ///
    /// [`DejavuError::Unsupported`] for edge-labeled graphs, [`DejavuError::Io`]
    /// if the file cannot be written.
    pub fn write_dimacs(&self, graph: GraphHandle, path: impl AsRef<Path>) -> Result<()> {
        self.tables.lock().graphs.write_dimacs(graph, path.as_ref())
    }

    /// Imports a DIMACS file as a new graph.
    pub fn read_dimacs(&self, path: impl AsRef<Path>) -> Result<GraphHandle> {
        self.tables.lock().graphs.read_dimacs(path.as_ref())
    }

    // ---- path sampling ----

    /// Samples `count` random walks of at most `max_len` base points.
    ///
    /// For edge-labeled graphs no base point is ever a subdivision vertex.
    pub fn sample_paths(
        &self,
        graph: GraphHandle,
        max_len: i64,
        count: i64,
        fill: bool,
    ) -> Result<PathSetHandle> {
        let built = self.tables.lock().graphs.build(graph)?;
        let opts =
            SampleOptions::new(max_len, count, fill)?.forbidden_tail(built.forbidden_tail());
        let set = self.guarded(None, |ctx| {
            search::sample_paths(&built.graph, &built.colors, &opts, ctx)
        })?;
        self.tables.lock().paths.insert(set)
    }

    /// Path length bindings pass when their caller gives none.
    pub fn default_max_path_length(&self) -> usize {
        self.settings.lock().max_path_length
    }

    /// Number of distinct samples.
    pub fn path_count(&self, paths: PathSetHandle) -> Result<usize> {
        Ok(self.tables.lock().paths.get(paths)?.len())
    }

    /// Number of base points of sample `i`.
    pub fn path_size(&self, paths: PathSetHandle, i: i64) -> Result<usize> {
        self.with_sample(paths, i, |s| Ok(s.base_points.len()))
    }

    /// Invariant of sample `i`.
    pub fn path_invariant(&self, paths: PathSetHandle, i: i64) -> Result<i64> {
        self.with_sample(paths, i, |s| Ok(s.invariant))
    }

    /// Base point `pos` of sample `i`.
    pub fn path_point(&self, paths: PathSetHandle, i: i64, pos: i64) -> Result<usize> {
        self.with_sample(paths, i, |s| {
            let pos = checked_index(pos, s.base_points.len(), "path position")?;
            Ok(s.base_points[pos])
        })
    }

    /// Color of vertex `v` at the end of sample `i`.
    pub fn path_vertex_color(&self, paths: PathSetHandle, i: i64, v: i64) -> Result<usize> {
        self.with_sample(paths, i, |s| {
            let v = checked_index(v, s.vertex_to_color.len(), "vertex")?;
            Ok(s.vertex_to_color[v])
        })
    }

    /// Whether sampling ran to the end.
    pub fn path_completion(&self, paths: PathSetHandle) -> Result<Completion> {
        Ok(self.tables.lock().paths.get(paths)?.completion)
    }

    /// Frees a path set.
    pub fn delete_paths(&self, paths: PathSetHandle) -> Result<()> {
        self.tables.lock().paths.remove(paths).map(drop)
    }

    // ---- automorphisms ----

    /// Computes generators, base and order of the graph's automorphism group.
    ///
    /// A cancelled search still yields a result handle; check
    /// [`Dejavu::result_completion`].
    pub fn discover_automorphisms(&self, graph: GraphHandle, error_bound: f64) -> Result<ResultHandle> {
        self.discover_with(graph, ErrorBound::new(error_bound)?)
    }

    /// [`Dejavu::discover_automorphisms`] under the engine's default error bound.
    pub fn discover_automorphisms_default(&self, graph: GraphHandle) -> Result<ResultHandle> {
        let error_bound = self.settings.lock().error_bound;
        self.discover_with(graph, error_bound)
    }

    fn discover_with(&self, graph: GraphHandle, error_bound: ErrorBound) -> Result<ResultHandle> {
        let built = self.tables.lock().graphs.build(graph)?;
        let result = self.guarded(None, |ctx| {
            search::discover(&built.graph, &built.colors, error_bound, ctx)
        })?;
        self.tables.lock().results.insert(result)
    }

    /// Number of base points.
    pub fn base_size(&self, result: ResultHandle) -> Result<usize> {
        Ok(self.tables.lock().results.get(result)?.base.len())
    }

    /// Base point `i`.
    pub fn base_point(&self, result: ResultHandle, i: i64) -> Result<usize> {
        let tables = self.tables.lock();
        let base = &tables.results.get(result)?.base;
        Ok(base[checked_index(i, base.len(), "base position")?])
    }

    /// Mantissa of the group order, in `[1, 2)`.
    pub fn group_order_mantissa(&self, result: ResultHandle) -> Result<f64> {
        Ok(self.tables.lock().results.get(result)?.group_order_mantissa())
    }

    /// Power-of-two exponent of the group order.
    pub fn group_order_exponent(&self, result: ResultHandle) -> Result<i32> {
        Ok(self.tables.lock().results.get(result)?.group_order_exponent())
    }

    /// Number of generators.
    pub fn generator_count(&self, result: ResultHandle) -> Result<usize> {
        Ok(self.tables.lock().results.get(result)?.generators.len())
    }

    /// Image of vertex `v` under generator `g`.
    pub fn generator_image(&self, result: ResultHandle, g: i64, v: i64) -> Result<usize> {
        let tables = self.tables.lock();
        let generators = &tables.results.get(result)?.generators;
        let perm = &generators[checked_index(g, generators.len(), "generator")?];
        Ok(perm.image(checked_index(v, perm.len(), "vertex")?))
    }

    /// Whether discovery ran to the end.
    pub fn result_completion(&self, result: ResultHandle) -> Result<Completion> {
        Ok(self.tables.lock().results.get(result)?.completion)
    }

    /// Frees an automorphism result.
    pub fn delete_result(&self, result: ResultHandle) -> Result<()> {
        self.tables.lock().results.remove(result).map(drop)
    }

    // ---- isomorphism ----

    /// Decides whether two graphs are isomorphic.
    ///
    /// Both answers are exact. A positive `error_bound` only sizes the random
    /// first pass that runs before the exhaustive search.
    ///
    /// # Errors
    ///
    /// [`DejavuError::Cancelled`] if the search was cancelled before an answer.
    pub fn are_isomorphic(&self, a: GraphHandle, b: GraphHandle, error_bound: f64) -> Result<bool> {
        self.decide_with(a, b, ErrorBound::new(error_bound)?)
    }

    /// [`Dejavu::are_isomorphic`] under the engine's default error bound.
    pub fn are_isomorphic_default(&self, a: GraphHandle, b: GraphHandle) -> Result<bool> {
        let error_bound = self.settings.lock().error_bound;
        self.decide_with(a, b, error_bound)
    }

    fn decide_with(&self, a: GraphHandle, b: GraphHandle, error_bound: ErrorBound) -> Result<bool> {
        let (built_a, built_b) = {
            let tables = self.tables.lock();
            (tables.graphs.build(a)?, tables.graphs.build(b)?)
        };
        let outcome = self.guarded(None, |ctx| {
            search::decide(
                &built_a.graph,
                &built_a.colors,
                &built_b.graph,
                &built_b.colors,
                error_bound,
                ctx,
            )
        })?;
        match outcome.verdict {
            Verdict::Isomorphic => Ok(true),
            Verdict::NonIsomorphic => Ok(false),
            Verdict::Unknown => Err(DejavuError::Cancelled),
        }
    }

    // ---- process settings ----

    /// Sets the worker count read by every later search call.
    pub fn set_threads(&self, threads: i64) -> Result<()> {
        let threads = usize::try_from(threads)
            .ok()
            .filter(|&t| t > 0)
            .ok_or_else(|| DejavuError::invalid(format!("worker count {threads} must be >= 1")))?;
        self.threads.store(threads, Ordering::Release);
        debug!(threads, "dejavu.set_threads");
        Ok(())
    }

    /// Current worker count.
    pub fn threads(&self) -> usize {
        self.threads.load(Ordering::Acquire)
    }

    /// Sets the error bound used by the `_default` search calls.
    pub fn set_error_bound(&self, error_bound: f64) -> Result<()> {
        let error_bound = ErrorBound::new(error_bound)?;
        self.settings.lock().error_bound = error_bound;
        debug!(error_bound = error_bound.value(), "dejavu.set_error_bound");
        Ok(())
    }

    /// Error bound used by the `_default` search calls.
    pub fn default_error_bound(&self) -> f64 {
        self.settings.lock().error_bound.value()
    }

    /// Fixes (or clears) the random seed for later searches.
    pub fn set_seed(&self, seed: Option<u64>) {
        self.settings.lock().seed = seed;
    }

    /// Requests cancellation of the running search calls.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clears a cancellation request. Required before the next search.
    pub fn reset_cancel(&self) {
        self.cancel.reset();
    }

    /// The shared token, for timers living outside the engine.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs `op` with a watchdog that cancels searches after `timeout`.
    pub fn with_timeout<T>(&self, timeout: Duration, op: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.guarded(Some(timeout), |_| op(self))
    }

    fn context(&self) -> Result<SearchContext> {
        let seed = self.settings.lock().seed;
        Ok(SearchContext::new()
            .with_threads(self.threads())?
            .with_cancel(self.cancel.clone())
            .with_seed(seed))
    }

    /// Runs `op` under the explicit or configured timeout. A watchdog that
    /// fired resets the token afterwards so later calls start clean.
    fn guarded<T>(
        &self,
        timeout: Option<Duration>,
        op: impl FnOnce(&SearchContext) -> Result<T>,
    ) -> Result<T> {
        let ctx = self.context()?;
        let timeout = timeout.or(self.settings.lock().timeout);
        let watchdog = match timeout {
            Some(limit) => Some(Watchdog::arm(self.cancel.clone(), limit)?),
            None => None,
        };
        let started = Instant::now();
        let out = op(&ctx);
        if let Some(watchdog) = watchdog {
            if watchdog.disarm() {
                debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "watchdog fired; clearing cancellation"
                );
                self.cancel.reset();
            }
        }
        out
    }

    fn with_sample<T>(
        &self,
        paths: PathSetHandle,
        i: i64,
        read: impl FnOnce(&PathSample) -> Result<T>,
    ) -> Result<T> {
        let tables = self.tables.lock();
        let set = tables.paths.get(paths)?;
        let i = checked_index(i, set.len(), "sample")?;
        read(&set.samples[i])
    }
}
