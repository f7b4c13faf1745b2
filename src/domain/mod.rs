//! Domain layer: subclone trees, somatic events and their comparison
//!
//! This layer is independent of external concerns (no I/O, no config loading).

pub mod arena;
pub mod builder;
pub mod cluster;
pub mod error;
pub mod event;
pub mod event_set;
pub mod location;
pub mod merge;

/// Persistent identifier of a stored object; 0 means unassigned.
pub type ObjectId = i64;

pub use arena::{Subclone, SubcloneTree, TreeNode};
pub use builder::{SubcloneSpec, TreeBuilder};
pub use cluster::{sort_by_prevalence, ClusterRef, EventCluster};
pub use error::{DomainError, TreeResult};
pub use event::{EventKind, EventRef, GenomicRange, SomaticEvent, BOUNDARY_RESOLUTION};
pub use event_set::{contains, difference, fuzzy_comparable, fuzzy_contains, fuzzy_equivalent, size_ascending};
pub use location::GenomicLocation;
pub use merge::{tree_merge, Divergence, MatchedPair, MergeReport, Side, TreeMerger};
