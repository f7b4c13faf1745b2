//! Event clusters: groups of somatic events sharing one cell fraction.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::domain::{EventRef, ObjectId};

/// Shared handle to a cluster attached to one or more subclones.
pub type ClusterRef = Rc<EventCluster>;

/// Somatic events inferred to co-exist in the same subclone.
///
/// Clustering groups events with (likely) the same cell frequency, assuming
/// events at the same frequency arose in the same population of cells.
/// Clusters order by cell fraction only.
#[derive(Debug, Clone, Default)]
pub struct EventCluster {
    members: Vec<EventRef>,
    cell_fraction: f64,
    subclone_id: ObjectId,
}

impl EventCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster whose fraction is the mean of `events`.
    pub fn from_events(events: impl IntoIterator<Item = EventRef>) -> Self {
        let mut cluster = Self::new();
        for event in events {
            cluster.add_event(event, false);
        }
        cluster.update_fraction();
        cluster
    }

    pub fn members(&self) -> &[EventRef] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn cell_fraction(&self) -> f64 {
        self.cell_fraction
    }

    pub fn set_cell_fraction(&mut self, fraction: f64) {
        self.cell_fraction = fraction;
    }

    /// Append a member; with `update_fraction` the cell fraction becomes the
    /// mean frequency over all members.
    pub fn add_event(&mut self, event: EventRef, update_fraction: bool) {
        self.members.push(event);
        if update_fraction {
            self.update_fraction();
        }
    }

    /// Owning subclone id, 0 while unassigned.
    pub fn subclone_id(&self) -> ObjectId {
        self.subclone_id
    }

    pub fn set_subclone_id(&mut self, id: ObjectId) {
        self.subclone_id = id;
    }

    fn update_fraction(&mut self) {
        if self.members.is_empty() {
            return;
        }
        let total: f64 = self.members.iter().map(|e| e.frequency()).sum();
        self.cell_fraction = total / self.members.len() as f64;
    }
}

impl PartialEq for EventCluster {
    fn eq(&self, other: &Self) -> bool {
        self.cell_fraction == other.cell_fraction
    }
}

impl PartialOrd for EventCluster {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.cell_fraction.partial_cmp(&other.cell_fraction)
    }
}

/// Sort clusters by descending prevalence, NaN fractions last.
pub fn sort_by_prevalence(clusters: &mut [ClusterRef]) {
    clusters.sort_by(|a, b| {
        b.cell_fraction()
            .partial_cmp(&a.cell_fraction())
            .unwrap_or_else(|| a.cell_fraction().is_nan().cmp(&b.cell_fraction().is_nan()))
    });
}
