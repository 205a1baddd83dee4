use crate::types::{checked_index, DejavuError, Result};

/// Mutable description of a vertex-colored, optionally edge-labeled graph.
///
/// Vertex ids are `0..vertex_count` in insertion order. Edges keep their
/// insertion order, which fixes edge ids and the neighbour order of the
/// compact graph built from the descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphDescriptor {
    labels: Vec<i64>,
    edges: Vec<(usize, usize)>,
    edge_labels: Vec<i64>,
    edge_labeled: bool,
    directed_dimacs: bool,
}

impl GraphDescriptor {
    /// Creates a descriptor with `vertex_count` vertices labelled `0` and no edges.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            labels: vec![0; vertex_count],
            edges: Vec::with_capacity(vertex_count),
            edge_labels: Vec::new(),
            edge_labeled: false,
            directed_dimacs: false,
        }
    }

    /// Creates a descriptor from a caller-supplied signed size.
    pub fn with_signed_size(vertex_count: i64) -> Result<Self> {
        let n = usize::try_from(vertex_count)
            .map_err(|_| DejavuError::invalid(format!("negative vertex count {vertex_count}")))?;
        Ok(Self::new(n))
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.labels.len()
    }

    /// Vertex labels indexed by vertex id.
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Edge labels parallel to [`GraphDescriptor::edges`]; empty unless edge-labeled.
    pub fn edge_labels(&self) -> &[i64] {
        &self.edge_labels
    }

    /// Whether any labeled edge was added.
    pub fn is_edge_labeled(&self) -> bool {
        self.edge_labeled
    }

    /// Whether each logical arc is stored as two mirrored entries.
    pub fn is_directed_dimacs(&self) -> bool {
        self.directed_dimacs
    }

    /// Adds an unlabeled edge.
    ///
    /// Undirected descriptors store the lower endpoint first. Duplicate edges
    /// are kept as given.
    pub fn add_edge(&mut self, v1: i64, v2: i64) -> Result<()> {
        if self.edge_labeled {
            return Err(DejavuError::InvalidState(
                "plain edges cannot be added to an edge-labeled graph",
            ));
        }
        let edge = self.checked_edge(v1, v2)?;
        self.edges.push(edge);
        Ok(())
    }

    /// Adds an edge carrying `label` and marks the descriptor edge-labeled.
    pub fn add_labeled_edge(&mut self, v1: i64, v2: i64, label: i64) -> Result<()> {
        if !self.edge_labeled && !self.edges.is_empty() {
            return Err(DejavuError::InvalidState(
                "labeled edges cannot be mixed with plain edges",
            ));
        }
        let edge = self.checked_edge(v1, v2)?;
        self.edge_labeled = true;
        self.edges.push(edge);
        self.edge_labels.push(label);
        debug_assert_eq!(self.edges.len(), self.edge_labels.len());
        Ok(())
    }

    /// Sets the color label of `vertex`.
    pub fn set_label(&mut self, vertex: i64, label: i64) -> Result<()> {
        let v = checked_index(vertex, self.labels.len(), "vertex")?;
        self.labels[v] = label;
        Ok(())
    }

    /// Switches between the undirected and the mirrored-arc interpretation.
    pub fn set_directed_dimacs(&mut self, directed: bool) {
        self.directed_dimacs = directed;
    }

    fn checked_edge(&self, v1: i64, v2: i64) -> Result<(usize, usize)> {
        let n = self.labels.len();
        let a = checked_index(v1, n, "vertex")?;
        let b = checked_index(v2, n, "vertex")?;
        if a == b {
            return Err(DejavuError::invalid(format!("self-loop on vertex {a}")));
        }
        if self.directed_dimacs || a < b {
            Ok((a, b))
        } else {
            Ok((b, a))
        }
    }

    pub(crate) fn push_subdivision_vertex(&mut self, label: i64) -> usize {
        self.labels.push(label);
        self.labels.len() - 1
    }

    pub(crate) fn push_edge_unchecked(&mut self, a: usize, b: usize) {
        debug_assert!(a != b && a < self.labels.len() && b < self.labels.len());
        self.edges.push(if a < b { (a, b) } else { (b, a) });
    }

    pub(crate) fn vertices_only(&self) -> Self {
        Self {
            labels: self.labels.clone(),
            edges: Vec::with_capacity(self.edges.len() * 2),
            edge_labels: Vec::new(),
            edge_labeled: false,
            directed_dimacs: false,
        }
    }
}
