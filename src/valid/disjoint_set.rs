//! Disjoint-set (union-find) over type indices, used to track proven-equal
//! equivalence classes during structural type comparisons.

// Copyright 2020 Google Inc. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#[derive(Debug, Clone, Copy)]
struct Node {
    parent: u32,
    size: u32,
}

/// Union-find with union-by-size and path splitting.
#[derive(Debug, Default, Clone)]
pub struct DisjointSet {
    nodes: Vec<Node>,
}

impl DisjointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, size: u32) {
        self.nodes.clear();
        self.nodes.reserve(size as usize);
        for i in 0..size {
            self.nodes.push(Node { parent: i, size: 1 });
        }
    }

    pub fn is_valid(&self, x: u32) -> bool {
        (x as usize) < self.nodes.len()
    }

    pub fn find(&mut self, mut x: u32) -> u32 {
        // Path splitting: point every visited node at its grandparent.
        while self.nodes[x as usize].parent != x {
            let next = self.nodes[x as usize].parent;
            self.nodes[x as usize].parent = self.nodes[next as usize].parent;
            x = next;
        }
        x
    }

    pub fn is_same_set(&mut self, x: u32, y: u32) -> bool {
        self.find(x) == self.find(y)
    }

    pub fn merge_sets(&mut self, x: u32, y: u32) {
        let mut xroot = self.find(x);
        let mut yroot = self.find(y);
        if xroot == yroot {
            return;
        }

        if self.nodes[xroot as usize].size < self.nodes[yroot as usize].size {
            std::mem::swap(&mut xroot, &mut yroot);
        }

        // Merge yroot into xroot.
        self.nodes[yroot as usize].parent = xroot;
        self.nodes[xroot as usize].size += self.nodes[yroot as usize].size;
    }
}

#[cfg(test)]
mod tests {
    use super::DisjointSet;

    #[test]
    fn singletons() {
        let mut set = DisjointSet::new();
        set.reset(4);
        for i in 0..4 {
            assert!(set.is_valid(i));
            assert_eq!(set.find(i), i);
        }
        assert!(!set.is_valid(4));
        assert!(!set.is_same_set(0, 1));
    }

    #[test]
    fn merging_is_transitive() {
        let mut set = DisjointSet::new();
        set.reset(6);
        set.merge_sets(0, 1);
        set.merge_sets(2, 3);
        assert!(set.is_same_set(0, 1));
        assert!(set.is_same_set(2, 3));
        assert!(!set.is_same_set(1, 2));

        set.merge_sets(1, 2);
        assert!(set.is_same_set(0, 3));
        assert!(!set.is_same_set(0, 5));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut set = DisjointSet::new();
        set.reset(3);
        set.merge_sets(0, 1);
        set.merge_sets(1, 0);
        set.merge_sets(0, 1);
        assert!(set.is_same_set(0, 1));
        assert!(!set.is_same_set(0, 2));
    }

    #[test]
    fn reset_clears_previous_state() {
        let mut set = DisjointSet::new();
        set.reset(2);
        set.merge_sets(0, 1);
        set.reset(2);
        assert!(!set.is_same_set(0, 1));
    }
}
