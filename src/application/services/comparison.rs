//! Comparison service
//!
//! Compares stored subclone trees with the configured boundary resolution.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::ArchiveService;
use crate::application::ApplicationResult;
use crate::domain::{MergeReport, ObjectId, SubcloneTree, TreeMerger};
use crate::tree_traits::TreeNodeConvert;

pub struct ComparisonService {
    archive: Arc<ArchiveService>,
    merger: TreeMerger,
}

impl ComparisonService {
    pub fn new(archive: Arc<ArchiveService>, boundary_resolution: u64) -> Self {
        Self {
            archive,
            merger: TreeMerger::new(boundary_resolution),
        }
    }

    pub fn boundary_resolution(&self) -> u64 {
        self.merger.tolerance()
    }

    /// Load both trees and compare them.
    #[instrument(level = "debug", skip(self))]
    pub fn compare_stored(&self, left_id: ObjectId, right_id: ObjectId) -> ApplicationResult<MergeReport> {
        let left = self.archive.load_tree(left_id)?;
        let right = self.archive.load_tree(right_id)?;
        let report = self.compare(&left, &right);
        info!(
            "trees {} and {} are {}",
            left_id,
            right_id,
            if report.compatible { "compatible" } else { "incompatible" }
        );
        Ok(report)
    }

    pub fn compare(&self, left: &SubcloneTree, right: &SubcloneTree) -> MergeReport {
        debug!("left:\n{}", left.to_tree_string());
        debug!("right:\n{}", right.to_tree_string());
        self.merger.compare(left, right)
    }
}
