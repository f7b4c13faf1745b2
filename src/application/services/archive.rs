//! Archive service
//!
//! Saves whole subclone trees into an [`ObjectStore`] and rebuilds them.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use generational_arena::Index;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, SaveResultExt};
use crate::domain::{
    DomainError, EventCluster, EventRef, ObjectId, SomaticEvent, SubcloneSpec, SubcloneTree,
    TreeBuilder,
};
use crate::infrastructure::store::{ClusterRecord, EventRecord, Record, SubcloneRecord, Table};
use crate::infrastructure::traits::ObjectStore;

/// Outcome of writing one tree, before its ids go back into the tree.
struct SavedTree {
    root_id: ObjectId,
    ids: Vec<(Index, ObjectId)>,
    events: usize,
}

/// Service for persisting subclone trees.
pub struct ArchiveService {
    store: Arc<dyn ObjectStore>,
}

impl ArchiveService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Create all tables. Safe to call repeatedly.
    pub fn create_schema(&self) -> ApplicationResult<()> {
        for table in Table::ALL {
            self.store.create_schema(table)?;
        }
        Ok(())
    }

    /// Save every node of `tree`, root first, and return the root's id.
    ///
    /// Nodes with id 0 get fresh ids, which are written back into the tree
    /// once the save has committed. Nodes that already have an id overwrite
    /// their stored row and replace its clusters; stored descendants that are
    /// no longer part of the tree are deleted, and so are events no cluster
    /// refers to any more. An event shared by several clusters is stored once.
    ///
    /// The save runs in one store transaction: on failure the store and the
    /// tree are left as they were.
    #[instrument(level = "debug", skip_all)]
    pub fn save_tree(&self, tree: &mut SubcloneTree) -> ApplicationResult<ObjectId> {
        self.store.begin().save_context("tree", 0)?;
        let saved = match self.write_tree(tree) {
            Ok(saved) => saved,
            Err(e) => {
                if let Err(rollback) = self.store.rollback() {
                    warn!("rollback after failed save: {}", rollback);
                }
                return Err(e);
            }
        };
        self.store.commit().save_context("tree", saved.root_id)?;

        for (idx, id) in &saved.ids {
            if let Some(node) = tree.get_node_mut(*idx) {
                node.data.id = *id;
            }
        }
        info!(
            "saved tree {} with {} subclones and {} events",
            saved.root_id,
            saved.ids.len(),
            saved.events
        );
        Ok(saved.root_id)
    }

    fn write_tree(&self, tree: &SubcloneTree) -> ApplicationResult<SavedTree> {
        let root = tree.root().ok_or(DomainError::MissingRoot(tree.len()))?;
        let previous: Vec<ObjectId> = tree
            .iter()
            .map(|(_, node)| node.data.id)
            .filter(|id| *id != 0)
            .collect();
        let stored = self.stored_subtrees(&previous)?;

        let mut assigned: HashMap<Index, ObjectId> = HashMap::new();
        let mut ids = Vec::with_capacity(tree.len());
        let mut event_ids: HashMap<*const SomaticEvent, ObjectId> = HashMap::new();
        let mut released = BTreeSet::new();

        for (idx, node) in tree.iter() {
            let parent_id = node.parent.and_then(|p| assigned.get(&p).copied());
            let previous_id = node.data.id;

            let record = SubcloneRecord {
                fraction: node.data.fraction,
                parent_id,
            };
            let id = self
                .store
                .save(previous_id, Record::Subclone(record))
                .save_context("subclone", previous_id)?;
            if previous_id != 0 {
                self.drop_clusters(id, &mut released)?;
            }

            for cluster in &node.data.clusters {
                self.save_cluster(cluster, id, &mut event_ids)?;
            }

            assigned.insert(idx, id);
            ids.push((idx, id));
        }

        let kept: HashSet<ObjectId> = assigned.values().copied().collect();
        for stale in stored.into_iter().filter(|id| !kept.contains(id)) {
            self.drop_clusters(stale, &mut released)?;
            self.store
                .remove(Table::Subclones, stale)
                .save_context("subclone", stale)?;
            debug!("removed stale subclone {}", stale);
        }
        self.remove_orphans(released)?;

        let root_id = assigned.get(&root).copied().ok_or(DomainError::NodeNotFound)?;
        Ok(SavedTree {
            root_id,
            ids,
            events: event_ids.len(),
        })
    }

    /// Ids of every stored subclone at or below the given ones.
    fn stored_subtrees(&self, tops: &[ObjectId]) -> ApplicationResult<BTreeSet<ObjectId>> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<ObjectId> = tops.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            queue.extend(self.store.children_of(Table::Subclones, id)?);
        }
        Ok(seen)
    }

    fn save_cluster(
        &self,
        cluster: &EventCluster,
        subclone_id: ObjectId,
        event_ids: &mut HashMap<*const SomaticEvent, ObjectId>,
    ) -> ApplicationResult<ObjectId> {
        let mut ids = Vec::with_capacity(cluster.len());
        for event in cluster.members() {
            let key = Rc::as_ptr(event);
            let id = match event_ids.get(&key) {
                Some(id) => *id,
                None => {
                    let id = self
                        .store
                        .save(0, Record::Event(EventRecord::from(&**event)))
                        .save_context("event", 0)?;
                    event_ids.insert(key, id);
                    id
                }
            };
            ids.push(id);
        }

        let record = ClusterRecord {
            cell_fraction: cluster.cell_fraction(),
            subclone_id,
            event_ids: ids,
        };
        self.store
            .save(0, Record::Cluster(record))
            .save_context("cluster", 0)
    }

    /// Remove the clusters of a subclone, collecting the events they listed.
    fn drop_clusters(
        &self,
        subclone_id: ObjectId,
        released: &mut BTreeSet<ObjectId>,
    ) -> ApplicationResult<()> {
        for cluster_id in self.store.children_of(Table::Clusters, subclone_id)? {
            released.extend(self.store.children_of(Table::Events, cluster_id)?);
            self.store
                .remove(Table::Clusters, cluster_id)
                .save_context("cluster", cluster_id)?;
        }
        Ok(())
    }

    /// Remove released events that no remaining cluster lists.
    fn remove_orphans(&self, released: BTreeSet<ObjectId>) -> ApplicationResult<()> {
        if released.is_empty() {
            return Ok(());
        }

        let mut listed = HashSet::new();
        for cluster_id in self.store.ids(Table::Clusters)? {
            listed.extend(self.store.children_of(Table::Events, cluster_id)?);
        }
        let mut removed = 0;
        for id in released.into_iter().filter(|id| !listed.contains(id)) {
            if self.store.remove(Table::Events, id).save_context("event", id)? {
                removed += 1;
            }
        }
        debug!("removed {} orphaned events", removed);
        Ok(())
    }

    /// Rebuild the tree rooted at `root_id`.
    ///
    /// Events referenced by several clusters are loaded once and shared.
    /// Fails without returning a partial tree if any row is missing.
    #[instrument(level = "debug", skip(self))]
    pub fn load_tree(&self, root_id: ObjectId) -> ApplicationResult<SubcloneTree> {
        let mut builder = TreeBuilder::new();
        let mut events: HashMap<ObjectId, EventRef> = HashMap::new();
        let mut queue = VecDeque::from([(root_id, None)]);

        while let Some((id, parent_id)) = queue.pop_front() {
            let record = self.load_subclone(id)?;
            let mut spec = SubcloneSpec::new(id, parent_id, record.fraction);
            for cluster_id in self.store.children_of(Table::Clusters, id)? {
                spec = spec.with_cluster(self.load_cluster(cluster_id, &mut events)?);
            }
            builder.add(spec)?;

            for child in self.store.children_of(Table::Subclones, id)? {
                queue.push_back((child, Some(id)));
            }
        }

        let tree = builder.build()?;
        info!(
            "loaded tree {} with {} subclones and {} events",
            root_id,
            tree.len(),
            events.len()
        );
        Ok(tree)
    }

    fn load_subclone(&self, id: ObjectId) -> ApplicationResult<SubcloneRecord> {
        match self.store.load(Table::Subclones, id)? {
            Some(Record::Subclone(record)) => Ok(record),
            _ => Err(ApplicationError::NotFound {
                kind: "subclone",
                id,
            }),
        }
    }

    fn load_cluster(
        &self,
        id: ObjectId,
        events: &mut HashMap<ObjectId, EventRef>,
    ) -> ApplicationResult<EventCluster> {
        let record = match self.store.load(Table::Clusters, id)? {
            Some(Record::Cluster(record)) => record,
            _ => return Err(ApplicationError::NotFound { kind: "cluster", id }),
        };

        let mut cluster = EventCluster::new();
        for event_id in record.event_ids {
            let event = match events.get(&event_id) {
                Some(event) => Rc::clone(event),
                None => {
                    let event = Rc::new(self.load_event(event_id)?);
                    events.insert(event_id, Rc::clone(&event));
                    event
                }
            };
            cluster.add_event(event, false);
        }
        cluster.set_cell_fraction(record.cell_fraction);
        debug!("loaded cluster {} with {} events", id, cluster.len());
        Ok(cluster)
    }

    fn load_event(&self, id: ObjectId) -> ApplicationResult<SomaticEvent> {
        match self.store.load(Table::Events, id)? {
            Some(Record::Event(record)) => Ok(record.to_event()),
            _ => Err(ApplicationError::NotFound { kind: "event", id }),
        }
    }
}
