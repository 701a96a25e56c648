//! Partition atoms into connected fragments.
//!
//! Two atoms are bonded when their distance is strictly below the cluster threshold, and a
//! fragment is a connected component of that relation. Distances are compared squared.
use std::collections::HashMap;

use glam::{DVec3, I64Vec3};

/// Above this many atoms, candidate pairs are drawn from a cell list instead of all pairs.
pub const CELL_LIST_MIN_ATOMS: usize = 256;

/// A disjoint-set forest over the indices `0..len`, with union by rank and path halving.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Returns the representative of the set that holds `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x` is out of bounds.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            let grandparent = self.parent[self.parent[x]];
            self.parent[x] = grandparent;
            x = grandparent;
        }
        x
    }

    /// Merges the sets holding `a` and `b`. Returns `false` if they were already one set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    pub fn same(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

/// One connected component: the indices of its atoms, ascending.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fragment {
    members: Vec<usize>,
}

impl Fragment {
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The smallest atom index in this fragment, which orders fragments.
    pub fn first(&self) -> Option<usize> {
        self.members.first().copied()
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.members.binary_search(&idx).is_ok()
    }
}

/// Partition the atoms at `coords` into fragments, connecting every pair closer than
/// `threshold`.
///
/// Each atom ends up in exactly one fragment. Fragments are ordered by their smallest member,
/// and members are ascending within a fragment, so the result only depends on the input.
/// A negative or NaN threshold connects nothing.
///
/// Every pair of atoms is examined, which is quadratic in the number of atoms. For larger frames
/// the candidate pairs come from a cell list with cells as wide as the threshold; pairs in
/// non-adjacent cells cannot be bonded, so the partition is the same.
pub fn fragments(coords: &[DVec3], threshold: f64) -> Vec<Fragment> {
    let mut sets = DisjointSet::new(coords.len());
    let cutoff2 = threshold.max(0.0).powi(2);
    if coords.len() > CELL_LIST_MIN_ATOMS && threshold.is_finite() && threshold > 0.0 {
        link_cell_pairs(coords, threshold, cutoff2, &mut sets);
    } else {
        link_all_pairs(coords, cutoff2, &mut sets);
    }
    collect(&mut sets)
}

fn link_all_pairs(coords: &[DVec3], cutoff2: f64, sets: &mut DisjointSet) {
    for (i, a) in coords.iter().enumerate() {
        for (j, b) in coords.iter().enumerate().skip(i + 1) {
            if a.distance_squared(*b) < cutoff2 {
                sets.union(i, j);
            }
        }
    }
}

fn link_cell_pairs(coords: &[DVec3], threshold: f64, cutoff2: f64, sets: &mut DisjointSet) {
    let mut cells: HashMap<I64Vec3, Vec<usize>> = HashMap::new();
    for (idx, pos) in coords.iter().enumerate() {
        let cell = (*pos / threshold).floor().as_i64vec3();
        cells.entry(cell).or_default().push(idx);
    }

    for (cell, members) in &cells {
        for offset in neighbourhood() {
            let Some(others) = cells.get(&cell.wrapping_add(offset)) else {
                continue;
            };
            for &i in members {
                for &j in others {
                    if i < j && coords[i].distance_squared(coords[j]) < cutoff2 {
                        sets.union(i, j);
                    }
                }
            }
        }
    }
}

/// The offsets to a cell and its 26 neighbours.
fn neighbourhood() -> impl Iterator<Item = I64Vec3> {
    (-1..=1).flat_map(|z| (-1..=1).flat_map(move |y| (-1..=1).map(move |x| I64Vec3::new(x, y, z))))
}

fn collect(sets: &mut DisjointSet) -> Vec<Fragment> {
    // Maps a root to the position of its fragment in the output.
    let mut slots: Vec<Option<usize>> = vec![None; sets.len()];
    let mut fragments: Vec<Fragment> = Vec::new();
    for idx in 0..sets.len() {
        let root = sets.find(idx);
        let slot = match slots[root] {
            Some(slot) => slot,
            None => {
                fragments.push(Fragment::default());
                slots[root] = Some(fragments.len() - 1);
                fragments.len() - 1
            }
        };
        fragments[slot].members.push(idx);
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: f64, y: f64, z: f64) -> DVec3 {
        DVec3::new(x, y, z)
    }

    fn members(fragments: &[Fragment]) -> Vec<Vec<usize>> {
        fragments.iter().map(|f| f.members().to_vec()).collect()
    }

    /// A deterministic scatter of points in a cube of side `size`.
    fn scatter(n: usize, size: f64) -> Vec<DVec3> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 * size
        };
        (0..n).map(|_| pos(next(), next(), next())).collect()
    }

    mod disjoint_set {
        use super::*;

        #[test]
        fn singletons() {
            let mut sets = DisjointSet::new(4);
            assert_eq!(sets.len(), 4);
            for i in 0..4 {
                assert_eq!(sets.find(i), i);
            }
        }

        #[test]
        fn union_and_same() {
            let mut sets = DisjointSet::new(5);
            assert!(sets.union(0, 1));
            assert!(sets.union(3, 4));
            assert!(!sets.union(1, 0));
            assert!(sets.same(0, 1));
            assert!(!sets.same(1, 3));
            assert!(sets.union(1, 4));
            assert!(sets.same(0, 3));
            assert!(!sets.same(2, 0));
        }
    }

    #[test]
    fn empty() {
        assert!(fragments(&[], 2.0).is_empty());
    }

    #[test]
    fn hydrogen_molecule() {
        let coords = [pos(0.0, 0.0, 0.0), pos(0.0, 0.0, 1.0)];
        assert_eq!(members(&fragments(&coords, 2.0)), vec![vec![0, 1]]);
    }

    #[test]
    fn far_apart() {
        let coords = [pos(0.0, 0.0, 0.0), pos(0.0, 0.0, 10.0)];
        assert_eq!(members(&fragments(&coords, 2.0)), vec![vec![0], vec![1]]);
    }

    #[test]
    fn threshold_is_strict() {
        let on_boundary = [pos(0.0, 0.0, 0.0), pos(0.0, 0.0, 2.0)];
        assert_eq!(fragments(&on_boundary, 2.0).len(), 2);

        let inside = [pos(0.0, 0.0, 0.0), pos(0.0, 0.0, 2.0 - 1e-9)];
        assert_eq!(fragments(&inside, 2.0).len(), 1);
    }

    #[test]
    fn transitive() {
        // 0-1 and 1-2 are bonded, 0-2 is not.
        let coords = [pos(0.0, 0.0, 0.0), pos(1.5, 0.0, 0.0), pos(3.0, 0.0, 0.0)];
        assert!(coords[0].distance(coords[2]) >= 2.0);
        assert_eq!(members(&fragments(&coords, 2.0)), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn ordered_by_smallest_member() {
        let coords = [
            pos(10.0, 0.0, 0.0), // 0, with 3
            pos(0.0, 0.0, 0.0),  // 1, with 2
            pos(0.5, 0.0, 0.0),  // 2
            pos(10.5, 0.0, 0.0), // 3
            pos(50.0, 0.0, 0.0), // 4, alone
        ];
        let frags = fragments(&coords, 2.0);
        assert_eq!(members(&frags), vec![vec![0, 3], vec![1, 2], vec![4]]);
        assert_eq!(frags[1].first(), Some(1));
        assert!(frags[0].contains(3));
        assert!(!frags[0].contains(1));
    }

    #[test]
    fn degenerate_thresholds() {
        let coords = [pos(0.0, 0.0, 0.0), pos(0.0, 0.0, 0.0)];
        assert_eq!(fragments(&coords, 0.0).len(), 2);
        assert_eq!(fragments(&coords, -3.0).len(), 2);
        assert_eq!(fragments(&coords, f64::NAN).len(), 2);
    }

    #[test]
    fn partition() {
        let coords = scatter(120, 12.0);
        let frags = fragments(&coords, 1.5);
        let mut seen = vec![false; coords.len()];
        for fragment in &frags {
            assert!(!fragment.is_empty());
            for &idx in fragment.members() {
                assert!(!seen[idx], "atom {idx} is in two fragments");
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&s| s), "every atom is in a fragment");
    }

    #[test]
    fn components_are_closed() {
        // No bonded pair may straddle two fragments.
        let coords = scatter(100, 10.0);
        let frags = fragments(&coords, 1.5);
        let mut owner = vec![0; coords.len()];
        for (f, fragment) in frags.iter().enumerate() {
            for &idx in fragment.members() {
                owner[idx] = f;
            }
        }
        for i in 0..coords.len() {
            for j in i + 1..coords.len() {
                if coords[i].distance_squared(coords[j]) < 1.5 * 1.5 {
                    assert_eq!(owner[i], owner[j]);
                }
            }
        }
    }

    #[test]
    fn cell_list_matches_all_pairs() {
        for (n, size, threshold) in [(400, 20.0, 2.0), (600, 8.0, 1.0), (1000, 40.0, 3.5)] {
            let coords = scatter(n, size);
            // Shift into negative coordinates as well, to cross cell boundaries at zero.
            let coords: Vec<_> = coords.iter().map(|&c| c - size / 2.0).collect();
            assert!(coords.len() > CELL_LIST_MIN_ATOMS);

            let mut sets = DisjointSet::new(coords.len());
            link_all_pairs(&coords, threshold * threshold, &mut sets);
            let expected = collect(&mut sets);

            assert_eq!(fragments(&coords, threshold), expected);
        }
    }

    #[test]
    fn deterministic() {
        let coords = scatter(300, 15.0);
        assert_eq!(fragments(&coords, 2.0), fragments(&coords, 2.0));
    }
}
