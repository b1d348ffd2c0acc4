//! Union-Find (disjoint set) data structure.
//!
//! Used by the clustering engine to grow density-connected regions: every
//! pair of samples that passes the exact epsilon-adjacency test is unioned,
//! and the resulting components are the candidate clusters.
//!
//! Implements path compression and union by rank.

use std::collections::HashMap;
use std::hash::Hash;

/// A generic Union-Find over hashable, clonable keys.
#[derive(Debug, Default)]
pub struct UnionFind<T: Eq + Hash + Clone> {
    parent: HashMap<T, T>,
    rank: HashMap<T, u32>,
}

impl<T: Eq + Hash + Clone> UnionFind<T> {
    /// Create an empty structure.
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
            rank: HashMap::new(),
        }
    }

    /// Register an element as its own singleton set. No-op if already known.
    pub fn make_set(&mut self, item: T) {
        if !self.parent.contains_key(&item) {
            self.parent.insert(item.clone(), item.clone());
            self.rank.insert(item, 0);
        }
    }

    /// Find the representative of the set containing `item`, compressing the
    /// path along the way. Registers the item if unknown.
    pub fn find(&mut self, item: &T) -> T {
        if !self.parent.contains_key(item) {
            self.make_set(item.clone());
            return item.clone();
        }

        // Walk to the root, then point every node on the path at it.
        let mut root = item.clone();
        while self.parent[&root] != root {
            root = self.parent[&root].clone();
        }

        let mut current = item.clone();
        while current != root {
            let next = self.parent[&current].clone();
            self.parent.insert(current, root.clone());
            current = next;
        }

        root
    }

    /// Merge the sets containing `a` and `b`.
    pub fn union(&mut self, a: &T, b: &T) {
        let root_a = self.find(a);
        let root_b = self.find(b);

        if root_a == root_b {
            return;
        }

        let rank_a = self.rank[&root_a];
        let rank_b = self.rank[&root_b];

        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_b, root_a.clone());
            self.rank.insert(root_a, rank_a + 1);
        }
    }

    /// Whether `a` and `b` are in the same set.
    pub fn connected(&mut self, a: &T, b: &T) -> bool {
        self.find(a) == self.find(b)
    }

    /// Group all registered elements by their representative.
    pub fn groups(&mut self) -> Vec<Vec<T>> {
        let items: Vec<T> = self.parent.keys().cloned().collect();
        let mut by_root: HashMap<T, Vec<T>> = HashMap::new();

        for item in items {
            let root = self.find(&item);
            by_root.entry(root).or_default().push(item);
        }

        by_root.into_values().collect()
    }
}
