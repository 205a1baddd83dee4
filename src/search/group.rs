//! Permutations, orbit tracking and group-order bookkeeping.

/// Permutation of `0..n` given by the image of every point.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// The identity on `0..n`.
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// Wraps an image vector. Returns `None` if it is not a bijection.
    pub fn from_images(images: Vec<usize>) -> Option<Self> {
        let mut seen = vec![false; images.len()];
        for &img in &images {
            if img >= images.len() || std::mem::replace(&mut seen[img], true) {
                return None;
            }
        }
        Some(Self(images))
    }

    pub(crate) fn from_images_unchecked(images: Vec<usize>) -> Self {
        Self(images)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the permutation of the empty set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Image of `v`.
    #[inline]
    pub fn image(&self, v: usize) -> usize {
        self.0[v]
    }

    /// All images, indexed by point.
    pub fn images(&self) -> &[usize] {
        &self.0
    }

    /// Returns `true` if every point is fixed.
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(v, &img)| v == img)
    }

    /// Consumes the permutation, returning its images.
    pub fn into_images(self) -> Vec<usize> {
        self.0
    }
}

/// Group order as `mantissa * 2^exponent` with `mantissa` in `[1, 2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupOrder {
    mantissa: f64,
    exponent: i32,
}

impl Default for GroupOrder {
    fn default() -> Self {
        Self::one()
    }
}

impl GroupOrder {
    /// Order of the trivial group.
    pub fn one() -> Self {
        Self {
            mantissa: 1.0,
            exponent: 0,
        }
    }

    /// Multiplies the order by `factor`. Factors 0 and 1 leave it unchanged.
    pub fn multiply(&mut self, factor: usize) {
        if factor <= 1 {
            return;
        }
        self.mantissa *= factor as f64;
        while self.mantissa >= 2.0 {
            self.mantissa /= 2.0;
            self.exponent += 1;
        }
    }

    /// Mantissa in `[1, 2)`.
    pub fn mantissa(&self) -> f64 {
        self.mantissa
    }

    /// Power-of-two exponent.
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// The order as a float; saturates to infinity for huge groups.
    pub fn value(&self) -> f64 {
        self.mantissa * 2f64.powi(self.exponent)
    }
}

/// Orbits of the group generated by a set of permutations (union-find).
#[derive(Clone, Debug)]
pub struct Orbits {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl Orbits {
    /// Every point in its own orbit.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Builds the orbits of `<generators>`.
    pub fn from_generators<'a>(
        n: usize,
        generators: impl IntoIterator<Item = &'a Permutation>,
    ) -> Self {
        let mut orbits = Self::new(n);
        for g in generators {
            orbits.add_generator(g);
        }
        orbits
    }

    /// Merges the orbits joined by `g`.
    pub fn add_generator(&mut self, g: &Permutation) {
        for (v, &img) in g.images().iter().enumerate() {
            self.union(v, img);
        }
    }

    /// Representative of the orbit of `v`.
    pub fn find(&mut self, mut v: usize) -> usize {
        while self.parent[v] != v {
            self.parent[v] = self.parent[self.parent[v]];
            v = self.parent[v];
        }
        v
    }

    /// Returns `true` if `a` and `b` lie in one orbit.
    pub fn same(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Size of the orbit of `v`.
    pub fn orbit_size(&mut self, v: usize) -> usize {
        let root = self.find(v);
        self.size[root]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}
