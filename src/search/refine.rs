//! Color refinement to the coarsest equitable partition.

use std::collections::VecDeque;
use std::hash::Hasher;

use xxhash_rust::xxh64::Xxh64;

use crate::primitives::concurrency::SearchStats;
use crate::search::partition::Partition;
use crate::storage::CompactGraph;

/// Summary of one refinement, compared between search-tree nodes.
///
/// The trace only depends on colors, neighbour counts and cell sizes, never on
/// vertex ids, so nodes related by an isomorphism have equal invariants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeInvariant {
    /// Hash of the refinement trace.
    pub trace: u64,
    /// Number of cells after refinement.
    pub cells: usize,
}

/// Reusable refinement workspace bound to one graph.
///
/// Each worker owns its own refiner; the graph is only read.
pub struct Refiner<'g> {
    graph: &'g CompactGraph,
    count: Vec<usize>,
    touched: Vec<usize>,
    cell_touched: Vec<bool>,
    touched_cells: Vec<usize>,
    queue: VecDeque<usize>,
    in_queue: Vec<bool>,
    splitter: Vec<usize>,
}

impl<'g> Refiner<'g> {
    /// Allocates buffers sized to `graph`.
    pub fn new(graph: &'g CompactGraph) -> Self {
        let n = graph.vertex_count();
        Self {
            graph,
            count: vec![0; n],
            touched: Vec::new(),
            cell_touched: vec![false; n],
            touched_cells: Vec::new(),
            queue: VecDeque::new(),
            in_queue: vec![false; n],
            splitter: Vec::new(),
        }
    }

    /// The graph this refiner works on.
    pub fn graph(&self) -> &'g CompactGraph {
        self.graph
    }

    /// Refines the root partition, using every cell as a splitter.
    pub fn refine_all(&mut self, part: &mut Partition, stats: &mut SearchStats) -> NodeInvariant {
        let starts: Vec<usize> = part.cell_starts().collect();
        self.refine(part, &starts, stats)
    }

    /// Individualizes `v` and refines with the new singleton as splitter.
    pub fn individualize(
        &mut self,
        part: &mut Partition,
        v: usize,
        stats: &mut SearchStats,
    ) -> NodeInvariant {
        let singleton = part.individualize(v);
        self.refine(part, &[singleton], stats)
    }

    /// Splits cells by neighbour counts until the partition is equitable.
    ///
    /// `part` must already be equitable with respect to every cell that is not
    /// (a union of cells) in `splitters`.
    pub fn refine(
        &mut self,
        part: &mut Partition,
        splitters: &[usize],
        stats: &mut SearchStats,
    ) -> NodeInvariant {
        stats.nodes += 1;
        let mut hasher = Xxh64::new(0);
        for &s in splitters {
            if !self.in_queue[s] {
                self.in_queue[s] = true;
                self.queue.push_back(s);
            }
        }

        while let Some(s) = self.queue.pop_front() {
            self.in_queue[s] = false;
            if part.is_discrete() {
                continue;
            }
            hasher.write_u64(s as u64);

            self.splitter.clear();
            self.splitter.extend_from_slice(part.cell(s));
            for &u in &self.splitter {
                for &w in self.graph.neighbors(u) {
                    if self.count[w] == 0 {
                        self.touched.push(w);
                    }
                    self.count[w] += 1;
                }
            }

            for &w in &self.touched {
                let c = part.color[w];
                if !self.cell_touched[c] {
                    self.cell_touched[c] = true;
                    self.touched_cells.push(c);
                }
            }
            self.touched_cells.sort_unstable();

            for i in 0..self.touched_cells.len() {
                let c = self.touched_cells[i];
                self.cell_touched[c] = false;
                self.split_cell(part, c, &mut hasher, stats);
            }

            for &w in &self.touched {
                self.count[w] = 0;
            }
            self.touched.clear();
            self.touched_cells.clear();
        }

        hasher.write_u64(part.cells as u64);
        NodeInvariant {
            trace: hasher.finish(),
            cells: part.cells,
        }
    }

    fn split_cell(
        &mut self,
        part: &mut Partition,
        c: usize,
        hasher: &mut Xxh64,
        stats: &mut SearchStats,
    ) {
        let len = part.cell_len[c];
        let end = c + len;
        let count = &self.count;
        part.lab[c..end].sort_by_key(|&v| count[v]);

        // Fragment boundaries: runs of equal count.
        let mut fragments: Vec<(usize, usize)> = Vec::new();
        let mut start = c;
        for p in c + 1..=end {
            if p == end || count[part.lab[p]] != count[part.lab[start]] {
                fragments.push((start, p - start));
                hasher.write_u64(c as u64);
                hasher.write_u64(count[part.lab[start]] as u64);
                hasher.write_u64((p - start) as u64);
                start = p;
            }
        }
        if fragments.len() == 1 {
            return;
        }

        stats.color_cost += len as u64;
        for &(frag, frag_len) in &fragments {
            part.cell_len[frag] = frag_len;
            for p in frag..frag + frag_len {
                let v = part.lab[p];
                part.pos[v] = p;
                part.color[v] = frag;
            }
        }
        part.cells += fragments.len() - 1;

        let requeue_all = self.in_queue[c];
        let mut skip = usize::MAX;
        if !requeue_all {
            let mut best = 0;
            for &(frag, frag_len) in &fragments {
                if frag_len > best {
                    best = frag_len;
                    skip = frag;
                }
            }
        }
        for &(frag, _) in &fragments {
            if frag != skip && !self.in_queue[frag] {
                self.in_queue[frag] = true;
                self.queue.push_back(frag);
            }
        }
    }
}
