//! Graph descriptors, their handle table and the compact adjacency form.
//!
//! Descriptors are mutable and addressed by handles; searches only ever see
//! the immutable [`CompactGraph`] produced by [`build`].

/// DIMACS import and export.
pub mod dimacs;

mod adjacency;
mod descriptor;
mod graph;
mod handles;

/// Compact adjacency and the builder that subdivides labeled edges.
pub use adjacency::{build, subdivide, BuiltGraph, CompactGraph};

/// Mutable graph description.
pub use descriptor::GraphDescriptor;

/// Handle-addressed descriptor store.
pub use graph::GraphStore;

/// Generation-checked handles and tables.
pub use handles::{
    GraphHandle, GraphKind, Handle, HandleKind, HandleTable, PathSetHandle, PathSetKind,
    RawHandle, ResultHandle, ResultKind,
};
