use std::path::Path;

use tracing::trace;

use crate::storage::adjacency::{build, BuiltGraph};
use crate::storage::descriptor::GraphDescriptor;
use crate::storage::dimacs;
use crate::storage::handles::{GraphHandle, GraphKind, HandleTable};
use crate::types::Result;

/// Owner of every graph descriptor, keyed by generation-checked handles.
#[derive(Default)]
pub struct GraphStore {
    graphs: HandleTable<GraphKind, GraphDescriptor>,
}

impl GraphStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live descriptors.
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Returns `true` if no descriptor is live.
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Allocates a descriptor with `vertex_count` vertices labelled `0`.
    pub fn create(&mut self, vertex_count: i64) -> Result<GraphHandle> {
        let desc = GraphDescriptor::with_signed_size(vertex_count)?;
        let handle = self.graphs.insert(desc)?;
        trace!(?handle, vertex_count, "graph.create");
        Ok(handle)
    }

    /// Stores an existing descriptor.
    pub fn insert(&mut self, desc: GraphDescriptor) -> Result<GraphHandle> {
        self.graphs.insert(desc)
    }

    /// Frees the descriptor. Later uses of `handle` fail with `InvalidHandle`.
    pub fn delete(&mut self, handle: GraphHandle) -> Result<()> {
        self.graphs.remove(handle)?;
        trace!(?handle, "graph.delete");
        Ok(())
    }

    /// Read access to a descriptor.
    pub fn descriptor(&self, handle: GraphHandle) -> Result<&GraphDescriptor> {
        self.graphs.get(handle)
    }

    /// See [`GraphDescriptor::add_edge`].
    pub fn add_edge(&mut self, handle: GraphHandle, v1: i64, v2: i64) -> Result<()> {
        self.graphs.get_mut(handle)?.add_edge(v1, v2)
    }

    /// See [`GraphDescriptor::add_labeled_edge`].
    pub fn add_labeled_edge(
        &mut self,
        handle: GraphHandle,
        v1: i64,
        v2: i64,
        label: i64,
    ) -> Result<()> {
        self.graphs.get_mut(handle)?.add_labeled_edge(v1, v2, label)
    }

    /// See [`GraphDescriptor::set_label`].
    pub fn set_label(&mut self, handle: GraphHandle, vertex: i64, label: i64) -> Result<()> {
        self.graphs.get_mut(handle)?.set_label(vertex, label)
    }

    /// See [`GraphDescriptor::set_directed_dimacs`].
    pub fn set_directed_dimacs(&mut self, handle: GraphHandle, directed: bool) -> Result<()> {
        self.graphs.get_mut(handle)?.set_directed_dimacs(directed);
        Ok(())
    }

    /// Exports the descriptor as DIMACS text.
    pub fn write_dimacs(&self, handle: GraphHandle, path: &Path) -> Result<()> {
        dimacs::write_dimacs(self.graphs.get(handle)?, path)
    }

    /// Imports a DIMACS file as a new descriptor.
    pub fn read_dimacs(&mut self, path: &Path) -> Result<GraphHandle> {
        let desc = dimacs::read_dimacs(path)?;
        self.graphs.insert(desc)
    }

    /// Builds the searchable compact form, subdividing labeled edges.
    pub fn build(&self, handle: GraphHandle) -> Result<BuiltGraph> {
        build(self.graphs.get(handle)?)
    }
}
