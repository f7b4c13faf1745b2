//! Reconstruction and fuzzy comparison of tumor subclone trees.
//!
//! A tumor is modelled as a rooted tree of subclones, each defined by the
//! somatic events (CNV, LOH, SNV) acquired on the way from the root. The
//! central question is whether two independently inferred trees describe the
//! same evolutionary history; see [`domain::TreeMerger`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use domain::{tree_merge, MergeReport, SubcloneTree, TreeMerger};
