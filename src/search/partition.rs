//! Ordered colored partitions.
//!
//! Vertices are kept in one array (`lab`) in which every color class occupies a
//! contiguous range. A color is the index of the first position of its range,
//! so colors of different partitions of the same shape line up position by
//! position. Cells are only ever split.

/// Ordered partition of `0..n` into color cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    pub(crate) lab: Vec<usize>,
    pub(crate) pos: Vec<usize>,
    pub(crate) color: Vec<usize>,
    pub(crate) cell_len: Vec<usize>,
    pub(crate) cells: usize,
}

impl Partition {
    /// Groups vertices by label, cells ordered by increasing label value.
    pub fn from_labels(labels: &[i64]) -> Self {
        let n = labels.len();
        let mut lab: Vec<usize> = (0..n).collect();
        lab.sort_by_key(|&v| labels[v]);

        let mut pos = vec![0; n];
        let mut color = vec![0; n];
        let mut cell_len = vec![0; n];
        let mut cells = 0;
        let mut start = 0;
        for i in 0..n {
            let v = lab[i];
            pos[v] = i;
            if i > 0 && labels[v] != labels[lab[i - 1]] {
                cell_len[start] = i - start;
                start = i;
            }
            if i == start {
                cells += 1;
            }
            color[v] = start;
        }
        if n > 0 {
            cell_len[start] = n - start;
        }
        Self {
            lab,
            pos,
            color,
            cell_len,
            cells,
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.lab.len()
    }

    /// Returns `true` for the partition of the empty vertex set.
    pub fn is_empty(&self) -> bool {
        self.lab.is_empty()
    }

    /// Number of cells.
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Returns `true` when every cell is a singleton.
    pub fn is_discrete(&self) -> bool {
        self.cells == self.lab.len()
    }

    /// Color (cell start) of `v`.
    #[inline]
    pub fn color(&self, v: usize) -> usize {
        self.color[v]
    }

    /// Vertex to color map.
    pub fn colors(&self) -> &[usize] {
        &self.color
    }

    /// Length of the cell starting at `start`.
    #[inline]
    pub fn cell_len(&self, start: usize) -> usize {
        self.cell_len[start]
    }

    /// Vertices of the cell starting at `start`.
    pub fn cell(&self, start: usize) -> &[usize] {
        &self.lab[start..start + self.cell_len[start]]
    }

    /// Vertex at position `p`. On a discrete partition this is the vertex of color `p`.
    #[inline]
    pub fn vertex_at(&self, p: usize) -> usize {
        self.lab[p]
    }

    /// Start positions of all cells in increasing order.
    pub fn cell_starts(&self) -> CellStarts<'_> {
        CellStarts {
            partition: self,
            next: 0,
        }
    }

    /// Splits `v` off its cell as a new singleton placed at the end of the cell.
    ///
    /// Returns the singleton's color. A vertex that is already a singleton is
    /// left alone.
    pub fn individualize(&mut self, v: usize) -> usize {
        let c = self.color[v];
        let len = self.cell_len[c];
        if len == 1 {
            return c;
        }
        let last = c + len - 1;
        let other = self.lab[last];
        let p = self.pos[v];
        self.lab.swap(p, last);
        self.pos[other] = p;
        self.pos[v] = last;
        self.cell_len[c] = len - 1;
        self.cell_len[last] = 1;
        self.color[v] = last;
        self.cells += 1;
        last
    }
}

/// Iterator over cell start positions.
pub struct CellStarts<'a> {
    partition: &'a Partition,
    next: usize,
}

impl Iterator for CellStarts<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.partition.len() {
            return None;
        }
        let start = self.next;
        self.next += self.partition.cell_len[start];
        Some(start)
    }
}
