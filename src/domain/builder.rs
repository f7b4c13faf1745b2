//! Tree builder for assembling subclone hierarchies from flat records.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, instrument};

use crate::domain::arena::{Subclone, SubcloneTree};
use crate::domain::error::{DomainError, TreeResult};
use crate::domain::{EventCluster, ObjectId};

/// One subclone as delivered by a loader: its own data plus a parent link.
#[derive(Debug, Clone, Default)]
pub struct SubcloneSpec {
    pub id: ObjectId,
    /// None for the root
    pub parent_id: Option<ObjectId>,
    pub fraction: f64,
    pub clusters: Vec<EventCluster>,
}

impl SubcloneSpec {
    pub fn new(id: ObjectId, parent_id: Option<ObjectId>, fraction: f64) -> Self {
        Self {
            id,
            parent_id,
            fraction,
            clusters: Vec::new(),
        }
    }

    pub fn with_cluster(mut self, cluster: EventCluster) -> Self {
        self.clusters.push(cluster);
        self
    }
}

/// Constructs a [`SubcloneTree`] from subclone specs linked by parent id.
///
/// Children keep the order in which their specs were added. Every cluster is
/// stamped with the id of the subclone it is attached to.
pub struct TreeBuilder {
    relationship_cache: HashMap<ObjectId, Vec<ObjectId>>,
    specs: HashMap<ObjectId, SubcloneSpec>,
    order: Vec<ObjectId>,
    visited_ids: HashSet<ObjectId>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            relationship_cache: HashMap::new(),
            specs: HashMap::new(),
            order: Vec::new(),
            visited_ids: HashSet::new(),
        }
    }

    /// Register one subclone.
    pub fn add(&mut self, spec: SubcloneSpec) -> TreeResult<&mut Self> {
        if !(0.0..=1.0).contains(&spec.fraction) {
            return Err(DomainError::InvalidFraction {
                id: spec.id,
                fraction: spec.fraction,
            });
        }
        if self.specs.contains_key(&spec.id) {
            return Err(DomainError::DuplicateSubclone(spec.id));
        }

        if let Some(parent) = spec.parent_id {
            self.relationship_cache.entry(parent).or_default().push(spec.id);
        }
        self.order.push(spec.id);
        self.specs.insert(spec.id, spec);
        Ok(self)
    }

    /// Build the tree, consuming the registered specs.
    ///
    /// The builder is empty afterwards, whether or not the build succeeded.
    #[instrument(level = "debug", skip(self))]
    pub fn build(&mut self) -> TreeResult<SubcloneTree> {
        let result = self.assemble();
        self.reset();
        result
    }

    fn assemble(&mut self) -> TreeResult<SubcloneTree> {
        self.check_parents()?;
        let root = self.find_root_node()?;

        let mut tree = SubcloneTree::new();
        let mut stack = vec![(root, None)];

        while let Some((current_id, parent_idx)) = stack.pop() {
            // Cycle detection
            if !self.visited_ids.insert(current_id) {
                return Err(DomainError::CycleDetected(current_id));
            }

            let spec = self
                .specs
                .remove(&current_id)
                .ok_or(DomainError::CycleDetected(current_id))?;
            let current_idx = tree.insert_node(Self::stamp(spec), parent_idx)?;

            // Reverse so the first registered child is built first
            if let Some(children) = self.relationship_cache.get(&current_id) {
                for &child in children.iter().rev() {
                    stack.push((child, Some(current_idx)));
                }
            }
        }

        // Anything left over hangs off a cycle that never reaches the root
        if let Some(orphan) = self.order.iter().find(|id| !self.visited_ids.contains(*id)) {
            return Err(DomainError::CycleDetected(*orphan));
        }

        debug!("built subclone tree with {} nodes", tree.len());
        Ok(tree)
    }

    fn reset(&mut self) {
        self.relationship_cache.clear();
        self.specs.clear();
        self.order.clear();
        self.visited_ids.clear();
    }

    fn check_parents(&self) -> TreeResult<()> {
        for id in &self.order {
            if let Some(spec) = self.specs.get(id) {
                if let Some(parent) = spec.parent_id {
                    if !self.specs.contains_key(&parent) {
                        return Err(DomainError::ParentNotFound { child: *id, parent });
                    }
                }
            }
        }
        Ok(())
    }

    fn find_root_node(&self) -> TreeResult<ObjectId> {
        let mut roots = self
            .order
            .iter()
            .filter(|id| self.specs.get(*id).is_some_and(|spec| spec.parent_id.is_none()));

        match (roots.next(), roots.next()) {
            (Some(root), None) => Ok(*root),
            (Some(_), Some(second)) => Err(DomainError::MultipleRoots(*second)),
            // Every subclone has a parent, so the links must loop
            (None, _) => match self.order.first() {
                Some(id) => Err(DomainError::CycleDetected(*id)),
                None => Err(DomainError::MissingRoot(0)),
            },
        }
    }

    fn stamp(spec: SubcloneSpec) -> Subclone {
        let mut subclone = Subclone::new(spec.id, spec.fraction);
        for mut cluster in spec.clusters {
            cluster.set_subclone_id(spec.id);
            subclone.add_event_cluster(Rc::new(cluster));
        }
        subclone
    }
}
