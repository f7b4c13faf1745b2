use std::fmt;

use generational_arena::{Arena, Index};
use itertools::Itertools;
use tracing::instrument;

use crate::domain::error::{DomainError, TreeResult};
use crate::domain::{ClusterRef, EventRef, ObjectId};

/// Data payload for tree nodes: one subclone of the tumor.
#[derive(Debug, Clone, Default)]
pub struct Subclone {
    /// Persistent identifier, 0 while unassigned
    pub id: ObjectId,
    /// Prevalence of this node in the sample (not cumulative)
    pub fraction: f64,
    /// Mutations acquired exactly at this node
    pub clusters: Vec<ClusterRef>,
}

impl Subclone {
    pub fn new(id: ObjectId, fraction: f64) -> Self {
        Self {
            id,
            fraction,
            clusters: Vec::new(),
        }
    }

    pub fn with_cluster(mut self, cluster: ClusterRef) -> Self {
        self.clusters.push(cluster);
        self
    }

    pub fn add_event_cluster(&mut self, cluster: ClusterRef) {
        self.clusters.push(cluster);
    }

    /// Events of all clusters attached here, in cluster order.
    pub fn events(&self) -> impl Iterator<Item = &EventRef> {
        self.clusters.iter().flat_map(|c| c.members().iter())
    }
}

impl fmt::Display for Subclone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({:.2})", self.id, self.fraction)?;
        if !self.clusters.is_empty() {
            write!(f, " [{}]", self.events().join(", "))?;
        }
        Ok(())
    }
}

/// Tree node in the arena-based subclone hierarchy.
#[derive(Debug)]
pub struct TreeNode {
    /// Subclone data for this node
    pub data: Subclone,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena
    pub children: Vec<Index>,
}

/// Arena-based subclone tree.
///
/// The arena owns every node; parents and children refer to each other by
/// generational index, so a node never owns its parent. Clusters and events
/// are shared by reference count and may appear in several trees.
#[derive(Debug)]
pub struct SubcloneTree {
    arena: Arena<TreeNode>,
    root: Option<Index>,
}

impl Default for SubcloneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SubcloneTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Tree holding a single root subclone.
    pub fn with_root(data: Subclone) -> (Self, Index) {
        let mut tree = Self::new();
        let node = TreeNode {
            data,
            parent: None,
            children: Vec::new(),
        };
        let root = tree.arena.insert(node);
        tree.root = Some(root);
        (tree, root)
    }

    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: Subclone, parent: Option<Index>) -> TreeResult<Index> {
        match parent {
            Some(parent_idx) if !self.arena.contains(parent_idx) => {
                return Err(DomainError::NodeNotFound);
            }
            None if self.root.is_some() => return Err(DomainError::MultipleRoots(data.id)),
            _ => {}
        }

        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        Ok(node_idx)
    }

    /// Attach `data` as the last child of `parent`.
    pub fn add_child(&mut self, parent: Index, data: Subclone) -> TreeResult<Index> {
        self.insert_node(data, Some(parent))
    }

    #[instrument(level = "trace", skip(self, cluster))]
    pub fn add_event_cluster(&mut self, idx: Index, cluster: ClusterRef) -> TreeResult<()> {
        let node = self.arena.get_mut(idx).ok_or(DomainError::NodeNotFound)?;
        node.data.add_event_cluster(cluster);
        Ok(())
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn subclone(&self, idx: Index) -> Option<&Subclone> {
        self.arena.get(idx).map(|node| &node.data)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn parent(&self, idx: Index) -> Option<Index> {
        self.arena.get(idx).and_then(|node| node.parent)
    }

    pub fn children(&self, idx: Index) -> &[Index] {
        self.arena
            .get(idx)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// First node in pre-order carrying `id`.
    pub fn find_by_id(&self, id: ObjectId) -> Option<Index> {
        self.iter().find(|(_, node)| node.data.id == id).map(|(idx, _)| idx)
    }

    /// Path from the root down to `idx`, both inclusive.
    pub fn lineage(&self, idx: Index) -> Vec<Index> {
        let mut path = Vec::new();
        let mut current = Some(idx);
        while let Some(node_idx) = current {
            match self.arena.get(node_idx) {
                Some(node) => {
                    path.push(node_idx);
                    current = node.parent;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Events acquired on the path from the root to `idx`, root first.
    ///
    /// A root without clusters contributes nothing, so the list of the trunk
    /// is empty.
    #[instrument(level = "trace", skip(self))]
    pub fn path_event_list(&self, idx: Index) -> Vec<EventRef> {
        self.lineage(idx)
            .into_iter()
            .filter_map(|node_idx| self.subclone(node_idx))
            .flat_map(|data| data.events().cloned())
            .collect()
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Collects all leaf nodes (nodes with no children), left to right.
    pub fn leaf_nodes(&self) -> Vec<Index> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(idx, _)| idx)
            .collect()
    }
}

pub struct TreeIterator<'a> {
    tree: &'a SubcloneTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a SubcloneTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a SubcloneTree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a SubcloneTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push((root, false));
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
