//! Graph automorphism groups, isomorphism tests and invariant sampling by
//! individualization-refinement.
//!
//! Graphs are described through a [`storage::GraphStore`] (or the handle facade
//! [`ffi::Dejavu`]), frozen into a [`storage::CompactGraph`], and handed to the
//! searches in [`search`]. Labeled edges are turned into subdivision vertices
//! before any search sees the graph.

#![warn(missing_docs)]

/// Search settings loaded from TOML and the environment.
pub mod config;
/// Handle-based facade for language bindings.
pub mod ffi;
pub mod primitives;
pub mod search;
pub mod storage;
pub mod types;

pub use config::SearchConfig;
pub use ffi::Dejavu;
pub use primitives::concurrency::{CancelToken, SearchContext, SearchStats, Watchdog};
pub use search::{AutomorphismResult, Completion, ErrorBound, Verdict};
pub use storage::{GraphHandle, PathSetHandle, ResultHandle};
pub use types::{DejavuError, Result};
