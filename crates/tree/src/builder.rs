//! Forest construction from flat records.
//!
//! [`build_forest`] turns parent-pointer records into trees, pruning at a
//! maximum depth. [`TreeBuilder`] wraps the whole pipeline (build, level
//! limits, layout, grid packing) and keeps the last result around so
//! repeated requests for the same options are cheap.

use crate::layout::{calculate_max_tree_radius, calculate_positions, grid_offsets};
use crate::{LayoutParams, LevelRadii, NodeId, NodeKey, Record, Tree};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Maximum number of nodes kept per level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelLimits(BTreeMap<usize, usize>);

impl LevelLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, level: usize, max: usize) -> Self {
        self.0.insert(level, max);
        self
    }

    pub fn set(&mut self, level: usize, max: usize) {
        self.0.insert(level, max);
    }

    pub fn limit(&self, level: usize) -> Option<usize> {
        self.0.get(&level).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds one tree per root record, pruning below `max_depth`.
///
/// Sibling order follows record order. Records whose parent id does not
/// exist are unreachable and silently left out. An id is placed at most
/// once across the forest, so duplicates and cyclic records are dropped.
/// A negative `max_depth` yields an empty forest.
pub fn build_forest(records: &[Record], max_depth: i32) -> Vec<Tree> {
    let Ok(max_depth) = usize::try_from(max_depth) else {
        return Vec::new();
    };

    let mut children_index: HashMap<NodeId, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (index, record) in records.iter().enumerate() {
        match record.parent_id {
            None => roots.push(index),
            Some(parent) => children_index.entry(parent).or_default().push(index),
        }
    }

    let mut placed: HashSet<NodeId> = HashSet::new();
    let forest: Vec<Tree> = roots
        .into_iter()
        .filter_map(|index| {
            let record = &records[index];
            if !placed.insert(record.id) {
                log::debug!("skipping duplicate root {}", record.id);
                return None;
            }
            let mut tree = Tree::new(record.id, record.text.clone());
            let root = tree.root();
            let mut context = AttachContext {
                records,
                children_index: &children_index,
                max_depth,
                placed: &mut placed,
            };
            attach_children(&mut tree, root, record.id, 0, &mut context);
            Some(tree)
        })
        .collect();

    log::debug!(
        "built forest of {} trees ({} nodes) from {} records at max depth {max_depth}",
        forest.len(),
        forest.iter().map(Tree::len).sum::<usize>(),
        records.len()
    );
    forest
}

struct AttachContext<'a> {
    records: &'a [Record],
    children_index: &'a HashMap<NodeId, Vec<usize>>,
    max_depth: usize,
    /// Ids already in the forest.
    placed: &'a mut HashSet<NodeId>,
}

/// Depth-first attachment. Ids that were already placed are skipped.
fn attach_children(
    tree: &mut Tree,
    parent_key: NodeKey,
    parent_id: NodeId,
    parent_level: usize,
    context: &mut AttachContext<'_>,
) {
    let level = parent_level + 1;
    if level > context.max_depth {
        return;
    }
    let records = context.records;
    let children_index = context.children_index;
    let Some(children) = children_index.get(&parent_id) else {
        return;
    };
    for &index in children {
        let record = &records[index];
        if !context.placed.insert(record.id) {
            log::debug!("skipping repeated id {} under {parent_id}", record.id);
            continue;
        }
        if let Some(key) = tree.add_child(parent_key, record.id, record.text.clone()) {
            attach_children(tree, key, record.id, level, context);
        }
    }
}

/// Copies `tree`, keeping at most `limits.limit(level)` nodes per level.
///
/// Counters are per level and shared across branches. A node that finds
/// its level full is dropped together with its whole subtree. The root is
/// always kept.
pub fn filter_by_level_limits(tree: &Tree, limits: &LevelLimits) -> Tree {
    let root = tree.root_node();
    let mut filtered = Tree::new(root.id, root.text.clone());
    let filtered_root = filtered.root();
    if let Some(node) = filtered.get_mut(filtered_root) {
        node.angle = root.angle;
        node.position = root.position;
    }

    let mut counts: HashMap<usize, usize> = HashMap::new();
    counts.insert(0, 1);
    copy_limited(tree, tree.root(), &mut filtered, filtered_root, limits, &mut counts);
    filtered
}

fn copy_limited(
    source: &Tree,
    source_key: NodeKey,
    target: &mut Tree,
    target_key: NodeKey,
    limits: &LevelLimits,
    counts: &mut HashMap<usize, usize>,
) {
    let Some(node) = source.get(source_key) else {
        return;
    };
    for &child_key in &node.children {
        let Some(child) = source.get(child_key) else {
            continue;
        };
        let count = counts.entry(child.level).or_insert(0);
        if limits.limit(child.level).is_some_and(|max| *count >= max) {
            continue;
        }
        *count += 1;

        if let Some(new_key) = target.add_child(target_key, child.id, child.text.clone()) {
            if let Some(copy) = target.get_mut(new_key) {
                copy.angle = child.angle;
                copy.position = child.position;
            }
            copy_limited(source, child_key, target, new_key, limits, counts);
        }
    }
}

/// Everything that shapes a built forest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub max_depth: i32,
    pub level_limits: LevelLimits,
    pub layout: LayoutParams,
    /// Extra spacing between neighbouring trees in the grid.
    pub tree_gap: f32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            level_limits: LevelLimits::default(),
            layout: LayoutParams::default(),
            tree_gap: 400.0,
        }
    }
}

/// A tree with its layout results.
#[derive(Clone, Debug)]
pub struct LaidOutTree {
    pub tree: Tree,
    pub level_radii: LevelRadii,
    /// Outer bound used for grid packing.
    pub outer_radius: f32,
    /// Grid cell center; the root sits here.
    pub offset: Vec3,
}

/// Lays out every tree and packs the forest on a grid.
pub fn layout_forest(
    mut forest: Vec<Tree>,
    params: &LayoutParams,
    tree_gap: f32,
) -> Vec<LaidOutTree> {
    let outer_radii: Vec<f32> = forest
        .iter_mut()
        .map(|tree| calculate_max_tree_radius(tree, params))
        .collect();
    let offsets = grid_offsets(&outer_radii, tree_gap);

    forest
        .into_iter()
        .zip(outer_radii)
        .zip(offsets)
        .map(|((mut tree, outer_radius), offset)| {
            let level_radii = calculate_positions(&mut tree, params, offset);
            LaidOutTree {
                tree,
                level_radii,
                outer_radius,
                offset,
            }
        })
        .collect()
}

/// Builds laid-out forests and caches the most recent one.
///
/// The cache is keyed by the complete [`BuildOptions`], so any change of
/// `max_depth` invalidates it. Callers get deep copies they can mutate
/// freely. The cache does not watch the records: call
/// [`clear_cache`](Self::clear_cache) when the dataset changes.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    cache: Option<(BuildOptions, Vec<LaidOutTree>)>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&mut self, records: &[Record], options: &BuildOptions) -> Vec<LaidOutTree> {
        if let Some((cached_options, forest)) = &self.cache {
            if cached_options == options {
                log::trace!("tree cache hit for max depth {}", options.max_depth);
                return forest.clone();
            }
        }

        let mut forest = build_forest(records, options.max_depth);
        if !options.level_limits.is_empty() {
            forest = forest
                .iter()
                .map(|tree| filter_by_level_limits(tree, &options.level_limits))
                .collect();
        }
        let laid_out = layout_forest(forest, &options.layout, options.tree_gap);

        self.cache = Some((options.clone(), laid_out.clone()));
        laid_out
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Number of trees currently held by the cache.
    pub fn cached_tree_count(&self) -> usize {
        self.cache.as_ref().map(|(_, forest)| forest.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    /// Two roots; the first has five categories with two titles each and
    /// one title with a sequel.
    fn records() -> Vec<Record> {
        let mut records = vec![Record::root(1, "Movies"), Record::root(2, "Series")];
        let mut next = 100;
        for category in 10..15 {
            records.push(Record::child(category, 1, format!("category {category}")));
            for _ in 0..2 {
                records.push(Record::child(next, category, format!("title {next}")));
                next += 1;
            }
        }
        records.push(Record::child(500, 100, "sequel"));
        records.push(Record::child(20, 2, "season"));
        records
    }

    fn signature(forest: &[Tree]) -> BTreeSet<(u64, usize, Option<u64>)> {
        forest
            .iter()
            .flat_map(|tree| {
                tree.preorder().into_iter().map(move |key| {
                    let node = tree.get(key).unwrap();
                    (node.id.0, node.level, tree.parent_id(key).map(|p| p.0))
                })
            })
            .collect()
    }

    #[test]
    fn test_build_forest_shape() {
        let forest = build_forest(&records(), 3);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].root_node().id, NodeId(1));
        assert_eq!(forest[0].level_counts(), vec![1, 5, 10, 1]);
        assert_eq!(forest[1].len(), 2);
    }

    #[test]
    fn test_build_forest_deterministic() {
        let first = build_forest(&records(), 3);
        let second = build_forest(&records(), 3);
        assert_eq!(signature(&first), signature(&second));

        let order = |forest: &[Tree]| -> Vec<u64> {
            forest.iter().flat_map(|t| t.nodes().map(|n| n.id.0).collect::<Vec<_>>()).collect()
        };
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn test_depth_pruning() {
        let forest = build_forest(&records(), 1);
        for tree in &forest {
            for node in tree.nodes() {
                assert!(node.level <= 1);
                if node.level == 1 {
                    assert!(node.children.is_empty(), "boundary node {} has children", node.id);
                }
            }
        }
        assert_eq!(forest[0].len(), 6);
    }

    #[test]
    fn test_negative_depth_is_empty() {
        assert!(build_forest(&records(), -1).is_empty());
        let roots_only = build_forest(&records(), 0);
        assert!(roots_only.iter().all(|t| t.len() == 1));
    }

    #[test]
    fn test_dangling_parent_excluded() {
        let mut data = records();
        data.push(Record::child(900, 4242, "orphan"));
        data.push(Record::child(901, 900, "orphan child"));

        let forest = build_forest(&data, 5);
        assert!(forest.iter().all(|t| !t.contains(NodeId(900)) && !t.contains(NodeId(901))));
    }

    #[test]
    fn test_cycle_excluded() {
        // The last record reuses the root id underneath node 2.
        let data = vec![
            Record::root(1, "root"),
            Record::child(2, 1, "a"),
            Record::child(1, 2, "loop"),
        ];
        let forest = build_forest(&data, 6);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].len(), 2);
        assert_eq!(forest[0].max_level(), 1);
        let root = forest[0].root_node();
        assert_eq!((root.id, root.level), (NodeId(1), 0));
    }

    #[test]
    fn test_duplicate_ids_placed_once() {
        let data = vec![
            Record::root(1, "root"),
            Record::child(2, 1, "a"),
            Record::child(3, 1, "b"),
            Record::child(2, 3, "a again"),
            Record::root(1, "root again"),
        ];
        let forest = build_forest(&data, 4);
        assert_eq!(forest.len(), 1);
        let ids: Vec<u64> = forest[0].nodes().map(|n| n.id.as_u64()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert_eq!(forest[0].len(), 3);
    }

    #[test]
    fn test_level_limits_drop_whole_subtrees() {
        let forest = build_forest(&records(), 3);
        let limits = LevelLimits::new().with_limit(1, 2);
        let filtered = filter_by_level_limits(&forest[0], &limits);

        assert_eq!(filtered.level_counts()[1], 2);
        for kept in [10, 11] {
            assert!(filtered.contains(NodeId(kept)));
        }
        for dropped in [12, 13, 14] {
            assert!(!filtered.contains(NodeId(dropped)));
        }
        // Two categories with two titles each plus the sequel under title 100.
        assert_eq!(filtered.len(), 1 + 2 + 4 + 1);
        for title in [104, 105, 106, 107, 108, 109] {
            assert!(!filtered.contains(NodeId(title)));
        }
    }

    #[test]
    fn test_level_limits_shared_across_branches() {
        let forest = build_forest(&records(), 3);
        let limits = LevelLimits::new().with_limit(2, 3);
        let filtered = filter_by_level_limits(&forest[0], &limits);

        // Depth-first: both titles of category 10, then the first of 11.
        assert_eq!(filtered.level_counts(), vec![1, 5, 3, 1]);
        assert!(filtered.contains(NodeId(102)));
        assert!(!filtered.contains(NodeId(103)));
    }

    #[test]
    fn test_builder_cache_returns_independent_copies() {
        let data = records();
        let options = BuildOptions::default();
        let mut builder = TreeBuilder::new();

        let mut first = builder.build(&data, &options);
        assert_eq!(builder.cached_tree_count(), 2);

        let root = first[0].tree.root();
        first[0].tree.get_mut(root).unwrap().position = Vec3::splat(999.0);

        let second = builder.build(&data, &options);
        assert_ne!(second[0].tree.root_node().position, Vec3::splat(999.0));
        assert_eq!(second[0].tree.root_node().position, second[0].offset);

        builder.clear_cache();
        assert_eq!(builder.cached_tree_count(), 0);
    }

    #[test]
    fn test_builder_rebuilds_on_depth_change() {
        let data = records();
        let mut builder = TreeBuilder::new();
        let deep = builder.build(&data, &BuildOptions::default());
        let shallow = builder.build(
            &data,
            &BuildOptions {
                max_depth: 1,
                ..Default::default()
            },
        );
        assert!(deep[0].tree.len() > shallow[0].tree.len());
        assert_eq!(shallow[0].level_radii.len(), 2);
    }

    #[test]
    fn test_forest_trees_do_not_overlap() {
        let forest = layout_forest(build_forest(&records(), 3), &LayoutParams::default(), 0.0);
        let (a, b) = (&forest[0], &forest[1]);
        assert!(a.offset.distance(b.offset) >= a.outer_radius + b.outer_radius);
    }

    #[test]
    fn test_level_limits_serde() {
        let limits: LevelLimits = serde_json::from_str(r#"{"1": 2, "2": 10}"#).unwrap();
        assert_eq!(limits.limit(1), Some(2));
        assert_eq!(limits.limit(2), Some(10));
        assert_eq!(limits.limit(3), None);
    }
}
