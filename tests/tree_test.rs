//! Tests for the arena-based subclone tree

use std::rc::Rc;

use rstest::{fixture, rstest};

use clonemerge::domain::{
    DomainError, EventCluster, EventRef, GenomicRange, SomaticEvent, Subclone, SubcloneTree,
};
use clonemerge::tree_traits::TreeNodeConvert;

fn cnv(chrom: i32) -> EventRef {
    Rc::new(SomaticEvent::cnv(GenomicRange::new(chrom, 0, 1_000), 0.1))
}

/// 10 -> 11{a} -> (12{b}, 13{c})
#[fixture]
fn tumor() -> SubcloneTree {
    let (mut tree, p0) = SubcloneTree::with_root(Subclone::new(10, 0.1));
    let p1 = tree
        .add_child(p0, Subclone::new(11, 0.1).with_cluster(Rc::new(EventCluster::from_events([cnv(1)]))))
        .unwrap();
    tree.add_child(p1, Subclone::new(12, 0.1).with_cluster(Rc::new(EventCluster::from_events([cnv(2)]))))
        .unwrap();
    tree.add_child(p1, Subclone::new(13, 0.1).with_cluster(Rc::new(EventCluster::from_events([cnv(3)]))))
        .unwrap();
    tree
}

#[rstest]
fn given_sample_tumor_when_listing_path_events_then_grows_down_the_path(tumor: SubcloneTree) {
    // Arrange
    let p0 = tumor.root().unwrap();
    let p1 = tumor.children(p0)[0];
    let p2 = tumor.children(p1)[0];

    // Act / Assert
    assert!(tumor.path_event_list(p0).is_empty());
    assert_eq!(tumor.path_event_list(p1).len(), 1);
    assert_eq!(tumor.path_event_list(p2).len(), 2);
    assert!(tumor.children(p2).is_empty());
}

#[rstest]
fn given_chain_when_listing_path_events_then_root_events_come_first(tumor: SubcloneTree) {
    // Arrange
    let p1 = tumor.find_by_id(11).unwrap();
    let p3 = tumor.find_by_id(13).unwrap();

    // Act
    let parent_events = tumor.path_event_list(p1);
    let leaf_events = tumor.path_event_list(p3);

    // Assert: the parent's list is a prefix of the child's
    assert!(parent_events
        .iter()
        .zip(&leaf_events)
        .all(|(x, y)| Rc::ptr_eq(x, y)));
    assert_eq!(leaf_events[1].range().chrom, 3);
}

#[test]
fn given_node_with_several_clusters_when_listing_path_events_then_keeps_cluster_order() {
    // Arrange
    let (a, b, c) = (cnv(1), cnv(2), cnv(3));
    let first = Rc::new(EventCluster::from_events([a.clone(), b.clone()]));
    let second = Rc::new(EventCluster::from_events([c.clone()]));
    let (tree, root) = SubcloneTree::with_root(Subclone::new(1, 1.0).with_cluster(first).with_cluster(second));

    // Act
    let events = tree.path_event_list(root);

    // Assert
    assert_eq!(events.len(), 3);
    assert!(Rc::ptr_eq(&events[0], &a) && Rc::ptr_eq(&events[1], &b) && Rc::ptr_eq(&events[2], &c));
}

#[rstest]
fn given_sample_tumor_when_iterating_then_preorder_and_postorder(tumor: SubcloneTree) {
    let pre: Vec<i64> = tumor.iter().map(|(_, node)| node.data.id).collect();
    let post: Vec<i64> = tumor.iter_postorder().map(|(_, node)| node.data.id).collect();

    assert_eq!(pre, vec![10, 11, 12, 13]);
    assert_eq!(post, vec![12, 13, 11, 10]);
}

#[rstest]
fn given_sample_tumor_when_measuring_then_depth_and_leaves(tumor: SubcloneTree) {
    let leaves: Vec<i64> = tumor
        .leaf_nodes()
        .into_iter()
        .filter_map(|idx| tumor.subclone(idx).map(|data| data.id))
        .collect();

    assert_eq!(tumor.depth(), 3);
    assert_eq!(tumor.len(), 4);
    assert_eq!(leaves, vec![12, 13]);
}

#[rstest]
fn given_sample_tumor_when_walking_up_then_lineage_ends_at_node(tumor: SubcloneTree) {
    let leaf = tumor.find_by_id(12).unwrap();
    let lineage: Vec<i64> = tumor
        .lineage(leaf)
        .into_iter()
        .filter_map(|idx| tumor.subclone(idx).map(|data| data.id))
        .collect();

    assert_eq!(lineage, vec![10, 11, 12]);
    assert_eq!(tumor.parent(tumor.root().unwrap()), None);
}

#[test]
fn given_tree_with_root_when_inserting_second_root_then_errors() {
    // Arrange
    let (mut tree, _) = SubcloneTree::with_root(Subclone::new(1, 1.0));

    // Act
    let result = tree.insert_node(Subclone::new(2, 1.0), None);

    // Assert
    assert_eq!(result, Err(DomainError::MultipleRoots(2)));
}

#[test]
fn given_unknown_parent_when_inserting_then_errors() {
    // Arrange
    let (mut other, foreign) = SubcloneTree::with_root(Subclone::new(1, 1.0));
    other.add_child(foreign, Subclone::new(2, 0.5)).unwrap();
    let stale = other.children(foreign)[0];
    let (mut tree, _) = SubcloneTree::with_root(Subclone::new(1, 1.0));

    // Act
    let result = tree.add_child(stale, Subclone::new(3, 0.5));

    // Assert
    assert_eq!(result, Err(DomainError::NodeNotFound));
}

#[test]
fn given_empty_node_when_adding_cluster_later_then_events_appear() {
    // Arrange
    let (mut tree, root) = SubcloneTree::with_root(Subclone::new(1, 1.0));
    let child = tree.add_child(root, Subclone::new(2, 0.4)).unwrap();

    // Act
    tree.add_event_cluster(child, Rc::new(EventCluster::from_events([cnv(9)])))
        .unwrap();

    // Assert
    assert_eq!(tree.path_event_list(child).len(), 1);
    assert!(tree.path_event_list(root).is_empty());
}

#[rstest]
fn given_sample_tumor_when_rendering_then_one_line_per_subclone(tumor: SubcloneTree) {
    let rendered = tumor.to_tree_string().to_string();

    assert_eq!(rendered.lines().count(), 4);
    assert!(rendered.starts_with("#10 (0.10)"));
    assert!(rendered.contains("#12 (0.10) [cnv 2:0-1000]"));
}
