//! Flat, serializable rows of the three object tables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{EventKind, GenomicLocation, GenomicRange, ObjectId, SomaticEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Events,
    Clusters,
    Subclones,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Events, Table::Clusters, Table::Subclones];
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Events => "events",
            Table::Clusters => "clusters",
            Table::Subclones => "subclones",
        };
        write!(f, "{}", name)
    }
}

/// A somatic event; SNVs are stored with length 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub kind: EventKind,
    pub chrom: i32,
    pub position: u64,
    pub length: u64,
    pub frequency: f64,
}

impl From<&SomaticEvent> for EventRecord {
    fn from(event: &SomaticEvent) -> Self {
        let range = event.range();
        Self {
            kind: event.kind(),
            chrom: range.chrom,
            position: range.position,
            length: range.length,
            frequency: event.frequency(),
        }
    }
}

impl EventRecord {
    pub fn to_event(&self) -> SomaticEvent {
        let range = GenomicRange::new(self.chrom, self.position, self.length);
        match self.kind {
            EventKind::CopyNumberVariant => SomaticEvent::cnv(range, self.frequency),
            EventKind::LossOfHeterozygosity => SomaticEvent::loh(range, self.frequency),
            EventKind::SingleNucleotideVariant => {
                SomaticEvent::snv(GenomicLocation::new(self.chrom, self.position), self.frequency)
            }
        }
    }
}

/// A cluster row; its events are listed by id, in member order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub cell_fraction: f64,
    pub subclone_id: ObjectId,
    #[serde(default)]
    pub event_ids: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcloneRecord {
    pub fraction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjectId>,
}

/// Any row of the store, tagged by its table.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Event(EventRecord),
    Cluster(ClusterRecord),
    Subclone(SubcloneRecord),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::Event(_) => Table::Events,
            Record::Cluster(_) => Table::Clusters,
            Record::Subclone(_) => Table::Subclones,
        }
    }
}
