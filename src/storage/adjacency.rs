use crate::storage::descriptor::GraphDescriptor;
use crate::types::{DejavuError, Result};

/// Immutable compressed-sparse-row adjacency.
///
/// Undirected graphs list every edge in both endpoints' neighbour ranges.
/// Directed-DIMACS graphs list only the arc `first -> second`, so a mirrored
/// pair of arcs yields one entry per endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactGraph {
    vertex_offsets: Vec<usize>,
    degrees: Vec<usize>,
    neighbors: Vec<usize>,
    edge_count: usize,
    max_degree: usize,
}

impl CompactGraph {
    /// Lays out the descriptor's edges in insertion order.
    pub fn from_descriptor(desc: &GraphDescriptor) -> Self {
        let n = desc.vertex_count();
        let directed = desc.is_directed_dimacs();

        let mut degrees = vec![0usize; n];
        for &(a, b) in desc.edges() {
            degrees[a] += 1;
            if !directed {
                degrees[b] += 1;
            }
        }

        let mut vertex_offsets = Vec::with_capacity(n + 1);
        let mut total = 0usize;
        let mut max_degree = 0usize;
        for &d in &degrees {
            vertex_offsets.push(total);
            total += d;
            max_degree = max_degree.max(d);
        }
        vertex_offsets.push(total);

        let mut cursor = vertex_offsets.clone();
        let mut neighbors = vec![0usize; total];
        for &(a, b) in desc.edges() {
            neighbors[cursor[a]] = b;
            cursor[a] += 1;
            if !directed {
                neighbors[cursor[b]] = a;
                cursor[b] += 1;
            }
        }

        let edge_count = if directed {
            desc.edges().len() / 2
        } else {
            desc.edges().len()
        };

        Self {
            vertex_offsets,
            degrees,
            neighbors,
            edge_count,
            max_degree,
        }
    }

    /// Builds an undirected graph from an edge list. Used by tests and tools.
    pub fn from_edges(vertex_count: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut desc = GraphDescriptor::new(vertex_count);
        for &(a, b) in edges {
            desc.add_edge(signed(a)?, signed(b)?)?;
        }
        Ok(Self::from_descriptor(&desc))
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.degrees.len()
    }

    /// Number of logical edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Total length of the neighbour array.
    pub fn adjacency_len(&self) -> usize {
        self.neighbors.len()
    }

    /// Largest vertex degree.
    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Degree of `v`.
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.degrees[v]
    }

    /// Per-vertex degrees.
    pub fn degrees(&self) -> &[usize] {
        &self.degrees
    }

    /// Start offset of each vertex's neighbour range, plus a trailing total.
    pub fn vertex_offsets(&self) -> &[usize] {
        &self.vertex_offsets
    }

    /// Neighbours of `v` in edge insertion order.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.neighbors[self.vertex_offsets[v]..self.vertex_offsets[v + 1]]
    }

    /// Returns `true` if `b` appears in the neighbour list of `a`.
    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).contains(&b)
    }
}

fn signed(v: usize) -> Result<i64> {
    i64::try_from(v).map_err(|_| DejavuError::invalid(format!("vertex {v} does not fit i64")))
}

/// Output of [`build`]: the searchable graph plus its initial coloring.
#[derive(Clone, Debug)]
pub struct BuiltGraph {
    /// Adjacency consumed by the search engine.
    pub graph: CompactGraph,
    /// Initial color of every vertex, subdivision vertices included.
    pub colors: Vec<i64>,
    /// Vertex count before subdivision. Vertices at or above this id are
    /// subdivision vertices and form the forbidden tail.
    pub original_vertex_count: usize,
    /// Whether the descriptor carried edge labels.
    pub edge_labeled: bool,
}

impl BuiltGraph {
    /// First vertex id that search must never individualize.
    pub fn forbidden_tail(&self) -> Option<usize> {
        self.edge_labeled.then_some(self.original_vertex_count)
    }
}

/// Builds the compact form of `desc`, subdividing labeled edges first.
pub fn build(desc: &GraphDescriptor) -> Result<BuiltGraph> {
    let original_vertex_count = desc.vertex_count();
    if !desc.is_edge_labeled() {
        return Ok(BuiltGraph {
            graph: CompactGraph::from_descriptor(desc),
            colors: desc.labels().to_vec(),
            original_vertex_count,
            edge_labeled: false,
        });
    }
    let subdivided = subdivide(desc)?;
    Ok(BuiltGraph {
        graph: CompactGraph::from_descriptor(&subdivided),
        colors: subdivided.labels().to_vec(),
        original_vertex_count,
        edge_labeled: true,
    })
}

/// Replaces every labeled edge `(a, b, L)` with a path `a - s - b` where `s`
/// is a fresh vertex colored `1 + max(vertex labels) + L`.
///
/// Negative edge labels are shifted so subdivision colors stay strictly above
/// every original vertex label. Directed-DIMACS descriptors contribute one
/// subdivision vertex per mirrored pair (the half with `first < second`).
pub fn subdivide(desc: &GraphDescriptor) -> Result<GraphDescriptor> {
    let max_label = desc.labels().iter().copied().max().unwrap_or(0);
    let min_edge_label = desc.edge_labels().iter().copied().min().unwrap_or(0);
    let shift = min_edge_label.min(0);
    let base = max_label
        .checked_add(1)
        .and_then(|v| v.checked_sub(shift))
        .ok_or_else(|| DejavuError::invalid("edge label offset overflows i64"))?;

    let mut out = desc.vertices_only();
    let directed = desc.is_directed_dimacs();
    for (&(a, b), &label) in desc.edges().iter().zip(desc.edge_labels()) {
        if directed && a > b {
            continue;
        }
        let color = base
            .checked_add(label)
            .ok_or_else(|| DejavuError::invalid(format!("edge label {label} overflows i64")))?;
        let s = out.push_subdivision_vertex(color);
        out.push_edge_unchecked(a, s);
        out.push_edge_unchecked(s, b);
    }
    Ok(out)
}
