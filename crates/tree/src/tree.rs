//! Arena-allocated tree of [`TreeNode`]s.
//!
//! Every tree build allocates a fresh arena. Parent links are plain keys
//! into the same arena, so they never own anything and a whole tree can be
//! deep-copied with `clone()`.

use crate::NodeId;
use glam::Vec3;
use slotmap::SlotMap;
use smallvec::SmallVec;

slotmap::new_key_type! {
    /// Key of a node within one [`Tree`] arena.
    pub struct NodeKey;
}

/// A node of a radial tree.
#[derive(Clone, Debug)]
pub struct TreeNode {
    pub id: NodeId,
    /// Back reference to the parent (None for roots).
    pub parent: Option<NodeKey>,
    /// Children in source record order.
    pub children: SmallVec<[NodeKey; 4]>,
    /// Depth from the root, 0 for the root itself.
    pub level: usize,
    /// Circular layout parameter in `[0, 2π)`.
    pub angle: f32,
    /// Computed by the layout pass.
    pub position: Vec3,
    pub text: String,
}

impl TreeNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A single tree of a forest.
#[derive(Clone, Debug)]
pub struct Tree {
    root: NodeKey,
    nodes: SlotMap<NodeKey, TreeNode>,
}

impl Tree {
    /// Creates a tree containing only a root node.
    pub fn new(id: NodeId, text: impl Into<String>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(TreeNode {
            id,
            parent: None,
            children: SmallVec::new(),
            level: 0,
            angle: 0.0,
            position: Vec3::ZERO,
            text: text.into(),
        });
        Self { root, nodes }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn root_node(&self) -> &TreeNode {
        &self.nodes[self.root]
    }

    /// Appends a child under `parent`, keeping `level = parent.level + 1`.
    pub fn add_child(
        &mut self,
        parent: NodeKey,
        id: NodeId,
        text: impl Into<String>,
    ) -> Option<NodeKey> {
        let level = self.nodes.get(parent)?.level + 1;
        let key = self.nodes.insert(TreeNode {
            id,
            parent: Some(parent),
            children: SmallVec::new(),
            level,
            angle: 0.0,
            position: Vec3::ZERO,
            text: text.into(),
        });
        self.nodes[parent].children.push(key);
        Some(key)
    }

    pub fn get(&self, key: NodeKey) -> Option<&TreeNode> {
        self.nodes.get(key)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut TreeNode> {
        self.nodes.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has its root, so this is only true for a torn-down arena.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Keys in depth-first pre-order, children visited in source order.
    pub fn preorder(&self) -> Vec<NodeKey> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            order.push(key);
            if let Some(node) = self.nodes.get(key) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// Nodes in depth-first pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> + '_ {
        self.preorder().into_iter().map(move |key| &self.nodes[key])
    }

    /// Leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<NodeKey> {
        self.preorder()
            .into_iter()
            .filter(|key| self.nodes[*key].is_leaf())
            .collect()
    }

    pub fn find(&self, id: NodeId) -> Option<NodeKey> {
        self.nodes
            .iter()
            .find(|(_, node)| node.id == id)
            .map(|(key, _)| key)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    /// Dataset id of a node's parent.
    pub fn parent_id(&self, key: NodeKey) -> Option<NodeId> {
        let parent = self.nodes.get(key)?.parent?;
        self.nodes.get(parent).map(|p| p.id)
    }

    pub fn max_level(&self) -> usize {
        self.nodes.values().map(|n| n.level).max().unwrap_or(0)
    }

    /// Number of nodes at each level, indexed by level.
    pub fn level_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_level() + 1];
        for node in self.nodes.values() {
            counts[node.level] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        // 1 -> (2 -> (4, 5), 3)
        let mut tree = Tree::new(NodeId(1), "root");
        let root = tree.root();
        let a = tree.add_child(root, NodeId(2), "a").unwrap();
        tree.add_child(root, NodeId(3), "b").unwrap();
        tree.add_child(a, NodeId(4), "c").unwrap();
        tree.add_child(a, NodeId(5), "d").unwrap();
        tree
    }

    #[test]
    fn test_levels_follow_parents() {
        let tree = sample();
        for key in tree.preorder() {
            let node = tree.get(key).unwrap();
            match node.parent {
                None => assert_eq!(node.level, 0),
                Some(parent) => assert_eq!(node.level, tree.get(parent).unwrap().level + 1),
            }
        }
    }

    #[test]
    fn test_preorder_respects_child_order() {
        let tree = sample();
        let ids: Vec<u64> = tree.nodes().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![1, 2, 4, 5, 3]);

        let leaves: Vec<u64> = tree
            .leaves()
            .into_iter()
            .map(|k| tree.get(k).unwrap().id.0)
            .collect();
        assert_eq!(leaves, vec![4, 5, 3]);
    }

    #[test]
    fn test_parent_lookup_and_counts() {
        let tree = sample();
        let d = tree.find(NodeId(5)).unwrap();
        assert_eq!(tree.parent_id(d), Some(NodeId(2)));
        assert_eq!(tree.parent_id(tree.root()), None);
        assert_eq!(tree.level_counts(), vec![1, 2, 2]);
        assert_eq!(tree.max_level(), 2);
    }
}
