use std::collections::BTreeMap;

use crate::collision::contact::FixtureKey;
use crate::geometry::Aabb;
use crate::math::Vec2;

use super::{ray_hits_aabb, BroadPhase, Fattening};

const NULL: u32 = u32::MAX;

/// A node in the tree arena
#[derive(Debug, Clone)]
struct TreeNode {
    /// Fat box for leaves, union of children otherwise
    aabb: Aabb,
    /// Fixture stored in a leaf
    key: Option<FixtureKey>,
    parent: u32,
    child1: u32,
    child2: u32,
    /// Leaves have height 0
    height: i32,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL
    }
}

/// Dynamic AABB tree.
///
/// Nodes live in an arena addressed by `u32` handles with a free list.
/// Insertion picks the sibling with a branch-and-bound surface area search;
/// every ancestor touched by an insert or remove is refit and then rotated
/// when swapping a grandchild lowers the perimeter cost.
#[derive(Debug, Clone, Default)]
pub struct DynamicTree {
    nodes: Vec<TreeNode>,
    free_list: Vec<u32>,
    root: Option<u32>,
    leaves: BTreeMap<FixtureKey, u32>,
    fattening: Fattening,
}

impl DynamicTree {
    /// Creates a new empty tree
    pub fn new(fattening: Fattening) -> Self {
        Self {
            fattening,
            ..Self::default()
        }
    }

    /// Height of the tree, 0 for a single leaf
    pub fn height(&self) -> i32 {
        self.root.map_or(0, |root| self.nodes[root as usize].height)
    }

    fn node(&self, index: u32) -> &TreeNode {
        &self.nodes[index as usize]
    }

    fn node_mut(&mut self, index: u32) -> &mut TreeNode {
        &mut self.nodes[index as usize]
    }

    fn allocate_node(&mut self, node: TreeNode) -> u32 {
        if let Some(index) = self.free_list.pop() {
            self.nodes[index as usize] = node;
            index
        } else {
            let index = self.nodes.len() as u32;
            self.nodes.push(node);
            index
        }
    }

    fn free_node(&mut self, index: u32) {
        let node = self.node_mut(index);
        node.key = None;
        node.parent = NULL;
        node.child1 = NULL;
        node.child2 = NULL;
        node.height = -1;
        self.free_list.push(index);
    }

    fn insert_leaf(&mut self, leaf: u32) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.node_mut(leaf).parent = NULL;
            return;
        };

        let sibling = self.find_best_sibling(root, self.node(leaf).aabb);

        let old_parent = self.node(sibling).parent;
        let new_parent = self.allocate_node(TreeNode {
            aabb: self.node(leaf).aabb.union(self.node(sibling).aabb),
            key: None,
            parent: old_parent,
            child1: sibling,
            child2: leaf,
            height: self.node(sibling).height + 1,
        });
        self.node_mut(sibling).parent = new_parent;
        self.node_mut(leaf).parent = new_parent;

        if old_parent == NULL {
            self.root = Some(new_parent);
        } else {
            let parent = self.node_mut(old_parent);
            if parent.child1 == sibling {
                parent.child1 = new_parent;
            } else {
                parent.child2 = new_parent;
            }
        }

        self.fix_upwards(new_parent);
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }

        let parent = self.node(leaf).parent;
        let grandparent = self.node(parent).parent;
        let sibling = if self.node(parent).child1 == leaf {
            self.node(parent).child2
        } else {
            self.node(parent).child1
        };

        if grandparent == NULL {
            self.root = Some(sibling);
            self.node_mut(sibling).parent = NULL;
        } else {
            let node = self.node_mut(grandparent);
            if node.child1 == parent {
                node.child1 = sibling;
            } else {
                node.child2 = sibling;
            }
            self.node_mut(sibling).parent = grandparent;
        }
        self.free_node(parent);
        self.fix_upwards(grandparent);
    }

    /// Branch-and-bound search for the sibling that minimizes the total
    /// perimeter increase
    fn find_best_sibling(&self, root: u32, leaf_aabb: Aabb) -> u32 {
        let leaf_cost = leaf_aabb.perimeter();
        let mut best = root;
        let mut best_cost = leaf_aabb.union(self.node(root).aabb).perimeter();

        // (node, cost inherited from enlarging its ancestors)
        let mut stack = vec![(root, 0.0f32)];
        while let Some((index, inherited)) = stack.pop() {
            let node = self.node(index);
            let direct = leaf_aabb.union(node.aabb).perimeter();
            let cost = direct + inherited;
            if cost < best_cost {
                best = index;
                best_cost = cost;
            }

            if node.is_leaf() {
                continue;
            }
            let inherited = inherited + direct - node.aabb.perimeter();
            if leaf_cost + inherited < best_cost {
                stack.push((node.child1, inherited));
                stack.push((node.child2, inherited));
            }
        }
        best
    }

    /// Refits boxes and heights from `start` to the root, rotating each node
    fn fix_upwards(&mut self, start: u32) {
        let mut index = start;
        while index != NULL {
            let (child1, child2) = (self.node(index).child1, self.node(index).child2);
            let aabb = self.node(child1).aabb.union(self.node(child2).aabb);
            let height = 1 + self.node(child1).height.max(self.node(child2).height);
            let node = self.node_mut(index);
            node.aabb = aabb;
            node.height = height;

            self.rotate(index);
            index = self.node(index).parent;
        }
    }

    /// Swaps a child of `a` with a grandchild on the other side when that
    /// lowers the perimeter of the affected internal node.
    fn rotate(&mut self, a: u32) {
        if self.node(a).height < 2 {
            return;
        }
        let b = self.node(a).child1;
        let c = self.node(a).child2;

        if self.node(b).is_leaf() {
            // only c can be opened
            let (f, g) = (self.node(c).child1, self.node(c).child2);
            let cost_base = self.node(c).aabb.perimeter();
            let aabb_bg = self.node(b).aabb.union(self.node(g).aabb);
            let aabb_bf = self.node(b).aabb.union(self.node(f).aabb);
            let cost_bf = aabb_bg.perimeter();
            let cost_bg = aabb_bf.perimeter();
            if cost_base < cost_bf && cost_base < cost_bg {
                return;
            }
            if cost_bf < cost_bg {
                self.swap_into(a, b, c, f, g, aabb_bg, true);
            } else {
                self.swap_into(a, b, c, g, f, aabb_bf, true);
            }
        } else if self.node(c).is_leaf() {
            let (d, e) = (self.node(b).child1, self.node(b).child2);
            let cost_base = self.node(b).aabb.perimeter();
            let aabb_ce = self.node(c).aabb.union(self.node(e).aabb);
            let aabb_cd = self.node(c).aabb.union(self.node(d).aabb);
            let cost_cd = aabb_ce.perimeter();
            let cost_ce = aabb_cd.perimeter();
            if cost_base < cost_cd && cost_base < cost_ce {
                return;
            }
            if cost_cd < cost_ce {
                self.swap_into(a, c, b, d, e, aabb_ce, false);
            } else {
                self.swap_into(a, c, b, e, d, aabb_cd, false);
            }
        } else {
            let (d, e) = (self.node(b).child1, self.node(b).child2);
            let (f, g) = (self.node(c).child1, self.node(c).child2);
            let area_b = self.node(b).aabb.perimeter();
            let area_c = self.node(c).aabb.perimeter();

            let aabb_bg = self.node(b).aabb.union(self.node(g).aabb);
            let aabb_bf = self.node(b).aabb.union(self.node(f).aabb);
            let aabb_ce = self.node(c).aabb.union(self.node(e).aabb);
            let aabb_cd = self.node(c).aabb.union(self.node(d).aabb);

            // candidate: (cost, child of a, cousin, cousin's sibling, new box, child is child1)
            let candidates = [
                (area_b + aabb_bg.perimeter(), b, c, f, g, aabb_bg, true),
                (area_b + aabb_bf.perimeter(), b, c, g, f, aabb_bf, true),
                (area_c + aabb_ce.perimeter(), c, b, d, e, aabb_ce, false),
                (area_c + aabb_cd.perimeter(), c, b, e, d, aabb_cd, false),
            ];
            let mut best_cost = area_b + area_c;
            let mut best = None;
            for candidate in candidates {
                if candidate.0 < best_cost {
                    best_cost = candidate.0;
                    best = Some(candidate);
                }
            }
            if let Some((_, child, other, cousin, kept, aabb, first)) = best {
                self.swap_into(a, child, other, cousin, kept, aabb, first);
            }
        }
    }

    /// Moves `child` (a child of `a`) down under `other`, taking the place of
    /// `cousin`, which moves up to be a child of `a`. `kept` stays under
    /// `other`, whose box becomes `aabb`.
    #[allow(clippy::too_many_arguments)]
    fn swap_into(&mut self, a: u32, child: u32, other: u32, cousin: u32, kept: u32, aabb: Aabb, child_is_first: bool) {
        if child_is_first {
            self.node_mut(a).child1 = cousin;
        } else {
            self.node_mut(a).child2 = cousin;
        }
        let other_node = self.node_mut(other);
        if other_node.child1 == cousin {
            other_node.child1 = child;
        } else {
            other_node.child2 = child;
        }
        self.node_mut(child).parent = other;
        self.node_mut(cousin).parent = a;

        let other_height = 1 + self.node(child).height.max(self.node(kept).height);
        let other_node = self.node_mut(other);
        other_node.aabb = aabb;
        other_node.height = other_height;
        let a_height = 1 + other_height.max(self.node(cousin).height);
        self.node_mut(a).height = a_height;
    }

    fn query_node(&self, aabb: Aabb, mut visit: impl FnMut(FixtureKey)) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if !node.aabb.intersects(aabb) {
                continue;
            }
            match node.key {
                Some(key) if node.is_leaf() => visit(key),
                _ => {
                    stack.push(node.child1);
                    stack.push(node.child2);
                }
            }
        }
    }

    #[cfg(test)]
    fn validate(&self) {
        let Some(root) = self.root else {
            assert!(self.leaves.is_empty());
            return;
        };
        assert_eq!(self.node(root).parent, NULL);
        let mut leaf_count = 0;
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if node.is_leaf() {
                assert_eq!(node.height, 0);
                leaf_count += 1;
                continue;
            }
            let (c1, c2) = (self.node(node.child1), self.node(node.child2));
            assert_eq!(c1.parent, index);
            assert_eq!(c2.parent, index);
            assert_eq!(node.height, 1 + c1.height.max(c2.height));
            assert!(node.aabb.contains_aabb(c1.aabb));
            assert!(node.aabb.contains_aabb(c2.aabb));
            stack.push(node.child1);
            stack.push(node.child2);
        }
        assert_eq!(leaf_count, self.leaves.len());
    }
}

impl BroadPhase for DynamicTree {
    fn insert(&mut self, key: FixtureKey, aabb: Aabb) {
        if self.contains(key) {
            self.remove(key);
        }
        let leaf = self.allocate_node(TreeNode {
            aabb: self.fattening.fatten(aabb, Vec2::ZERO),
            key: Some(key),
            parent: NULL,
            child1: NULL,
            child2: NULL,
            height: 0,
        });
        self.leaves.insert(key, leaf);
        self.insert_leaf(leaf);
    }

    fn remove(&mut self, key: FixtureKey) -> bool {
        let Some(leaf) = self.leaves.remove(&key) else {
            return false;
        };
        self.remove_leaf(leaf);
        self.free_node(leaf);
        true
    }

    fn update(&mut self, key: FixtureKey, aabb: Aabb, displacement: Vec2) -> bool {
        let Some(&leaf) = self.leaves.get(&key) else {
            self.insert(key, aabb);
            return true;
        };
        if self.node(leaf).aabb.contains_aabb(aabb) {
            return false;
        }
        self.remove_leaf(leaf);
        self.node_mut(leaf).aabb = self.fattening.fatten(aabb, displacement);
        self.insert_leaf(leaf);
        true
    }

    fn contains(&self, key: FixtureKey) -> bool {
        self.leaves.contains_key(&key)
    }

    fn fat_aabb(&self, key: FixtureKey) -> Option<Aabb> {
        self.leaves.get(&key).map(|&leaf| self.node(leaf).aabb)
    }

    fn query_pairs(&self) -> Vec<(FixtureKey, FixtureKey)> {
        let mut pairs = Vec::new();
        for (&key, &leaf) in &self.leaves {
            self.query_node(self.node(leaf).aabb, |other| {
                if key < other {
                    pairs.push((key, other));
                }
            });
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    fn query_aabb(&self, aabb: Aabb) -> Vec<FixtureKey> {
        let mut keys = Vec::new();
        self.query_node(aabb, |key| keys.push(key));
        keys.sort_unstable();
        keys
    }

    fn query_ray(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Vec<FixtureKey> {
        let mut keys = Vec::new();
        let Some(root) = self.root else {
            return keys;
        };
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if !ray_hits_aabb(node.aabb, origin, direction, max_distance) {
                continue;
            }
            match node.key {
                Some(key) if node.is_leaf() => keys.push(key),
                _ => {
                    stack.push(node.child1);
                    stack.push(node.child2);
                }
            }
        }
        keys.sort_unstable();
        keys
    }

    fn len(&self) -> usize {
        self.leaves.len()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.root = None;
        self.leaves.clear();
    }
}
