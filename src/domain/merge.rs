//! Fuzzy compatibility of two subclone trees.
//!
//! Each tree is reduced to its *anchors*. A node without clusters and with at
//! most one child is transparent; every other node is an anchor. The
//! effective root, reached by descending from the root through cluster-less
//! single-child nodes, is always an anchor.
//!
//! Two trees are compatible when the anchors of each one can be mapped onto
//! the anchors of the other so that:
//!
//! - every anchor lands on an anchor with a fuzzily comparable cumulative
//!   event set;
//! - a child anchor lands inside the subtree of its parent's image;
//! - a child shares its parent's image only while its events stay within that
//!   image along a straight chain (the other tree collapsed the chain into one
//!   node), or when the image is a leaf (the child extends past it).
//!
//! Feasibility of every (anchor, image) pair is memoized, so a comparison
//! costs a polynomial number of event set tests.

use std::fmt;

use generational_arena::Index;
use tracing::{debug, instrument, trace};

use crate::domain::arena::TreeNode;
use crate::domain::event_set::{fuzzy_comparable, fuzzy_contains, size_ascending};
use crate::domain::{EventRef, ObjectId, SubcloneTree, BOUNDARY_RESOLUTION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// A left anchor and the right anchor it was mapped onto.
///
/// `node` is None for the synthetic trunk of a rootless tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub left_id: ObjectId,
    pub right_id: ObjectId,
    pub left_node: Option<Index>,
    pub right_node: Option<Index>,
}

/// Why two trees were found incompatible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    /// No anchor of the other tree has a comparable event set.
    Unmatched {
        side: Side,
        subclone_id: ObjectId,
        node: Option<Index>,
    },
    /// Every anchor has candidates, but the anchors of `side` cannot be mapped
    /// onto the other tree without breaking its ancestry. Names the first
    /// anchor left without a place.
    NoConsistentAssignment {
        side: Side,
        subclone_id: ObjectId,
        node: Option<Index>,
    },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Divergence::Unmatched {
                side, subclone_id, ..
            } => write!(f, "{} subclone #{} has no counterpart", side, subclone_id),
            Divergence::NoConsistentAssignment {
                side, subclone_id, ..
            } => write!(
                f,
                "{} subclone #{} has no place consistent with its ancestry",
                side, subclone_id
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub compatible: bool,
    /// Image of every left anchor, in left pre-order. Empty unless compatible.
    pub pairs: Vec<MatchedPair>,
    pub divergence: Option<Divergence>,
}

impl MergeReport {
    fn compatible(pairs: Vec<MatchedPair>) -> Self {
        Self {
            compatible: true,
            pairs,
            divergence: None,
        }
    }

    fn diverged(divergence: Divergence) -> Self {
        debug!("trees diverge: {}", divergence);
        Self {
            compatible: false,
            pairs: Vec::new(),
            divergence: Some(divergence),
        }
    }
}

/// Decides whether two subclone trees describe the same evolutionary history.
#[derive(Debug, Clone, Copy)]
pub struct TreeMerger {
    tolerance: u64,
}

impl Default for TreeMerger {
    fn default() -> Self {
        Self::new(BOUNDARY_RESOLUTION)
    }
}

impl TreeMerger {
    pub fn new(tolerance: u64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> u64 {
        self.tolerance
    }

    pub fn is_compatible(&self, left: &SubcloneTree, right: &SubcloneTree) -> bool {
        self.compare(left, right).compatible
    }

    #[instrument(level = "debug", skip_all, fields(tolerance = self.tolerance))]
    pub fn compare(&self, left: &SubcloneTree, right: &SubcloneTree) -> MergeReport {
        let left_anchors = AnchorTree::collect(left);
        let right_anchors = AnchorTree::collect(right);
        debug!(
            "comparing {} left anchors with {} right anchors",
            left_anchors.len(),
            right_anchors.len()
        );

        if let Some(divergence) = self.find_unmatched(&left_anchors, &right_anchors) {
            return MergeReport::diverged(divergence);
        }

        let mut forward = Embedding::new(&left_anchors, &right_anchors, self.tolerance);
        let Some(root_image) = forward.embed_root() else {
            let stuck = forward.blame();
            return MergeReport::diverged(left_anchors.no_place(Side::Left, stuck));
        };

        let mut backward = Embedding::new(&right_anchors, &left_anchors, self.tolerance);
        if backward.embed_root().is_none() {
            let stuck = backward.blame();
            return MergeReport::diverged(right_anchors.no_place(Side::Right, stuck));
        }

        let pairs: Vec<MatchedPair> = forward
            .images(root_image)
            .into_iter()
            .map(|(n, m)| {
                let (l, r) = (&left_anchors.anchors[n], &right_anchors.anchors[m]);
                MatchedPair {
                    left_id: l.id,
                    right_id: r.id,
                    left_node: l.node,
                    right_node: r.node,
                }
            })
            .collect();
        debug!("trees are compatible with {} pairs", pairs.len());
        MergeReport::compatible(pairs)
    }

    fn find_unmatched(&self, left: &AnchorTree, right: &AnchorTree) -> Option<Divergence> {
        let sides = [(Side::Left, left, right), (Side::Right, right, left)];
        for (side, own, other) in sides {
            let lonely = own.anchors.iter().find(|anchor| {
                !other
                    .anchors
                    .iter()
                    .any(|candidate| fuzzy_comparable(&anchor.events, &candidate.events, self.tolerance))
            });
            if let Some(anchor) = lonely {
                return Some(Divergence::Unmatched {
                    side,
                    subclone_id: anchor.id,
                    node: anchor.node,
                });
            }
        }
        None
    }
}

/// Compare two trees at [`BOUNDARY_RESOLUTION`].
pub fn tree_merge(left: &SubcloneTree, right: &SubcloneTree) -> bool {
    TreeMerger::default().is_compatible(left, right)
}

#[derive(Debug)]
struct Anchor {
    node: Option<Index>,
    id: ObjectId,
    /// Cumulative events from the root down to this node
    events: Vec<EventRef>,
    /// Smallest event set first
    children: Vec<usize>,
    /// One past the last anchor of this subtree in pre-order
    end: usize,
}

/// The anchors of one tree in pre-order, linked by anchor ancestry.
#[derive(Debug)]
struct AnchorTree {
    anchors: Vec<Anchor>,
}

impl AnchorTree {
    fn collect(tree: &SubcloneTree) -> Self {
        let mut anchors = Self { anchors: Vec::new() };
        match tree.root() {
            Some(root) => {
                let top = Self::effective_root(tree, root);
                anchors.visit(tree, top, None, true);
            }
            // Rootless tree: a single empty trunk
            None => anchors.anchors.push(Anchor {
                node: None,
                id: 0,
                events: Vec::new(),
                children: Vec::new(),
                end: 1,
            }),
        }
        anchors.sort_children();
        anchors
    }

    fn effective_root(tree: &SubcloneTree, root: Index) -> Index {
        let mut current = root;
        while let Some(node) = tree.get_node(current) {
            match node.children.as_slice() {
                [only] if node.data.clusters.is_empty() => current = *only,
                _ => break,
            }
        }
        current
    }

    fn is_transparent(node: &TreeNode) -> bool {
        node.data.clusters.is_empty() && node.children.len() <= 1
    }

    fn visit(&mut self, tree: &SubcloneTree, idx: Index, parent: Option<usize>, required: bool) {
        let Some(node) = tree.get_node(idx) else {
            return;
        };

        if !required && Self::is_transparent(node) {
            for &child in &node.children {
                self.visit(tree, child, parent, false);
            }
            return;
        }

        let pos = self.anchors.len();
        self.anchors.push(Anchor {
            node: Some(idx),
            id: node.data.id,
            events: tree.path_event_list(idx),
            children: Vec::new(),
            end: pos + 1,
        });
        if let Some(p) = parent {
            self.anchors[p].children.push(pos);
        }
        for &child in &node.children {
            self.visit(tree, child, Some(pos), false);
        }
        self.anchors[pos].end = self.anchors.len();
    }

    fn sort_children(&mut self) {
        for pos in 0..self.anchors.len() {
            let mut children = std::mem::take(&mut self.anchors[pos].children);
            children.sort_by(|&a, &b| size_ascending(self.events(a), self.events(b)));
            self.anchors[pos].children = children;
        }
    }

    fn len(&self) -> usize {
        self.anchors.len()
    }

    fn events(&self, pos: usize) -> &[EventRef] {
        &self.anchors[pos].events
    }

    fn is_leaf(&self, pos: usize) -> bool {
        self.anchors[pos].children.is_empty()
    }

    /// `pos` lies strictly below `ancestor`.
    fn is_descendant(&self, ancestor: usize, pos: usize) -> bool {
        ancestor < pos && pos < self.anchors[ancestor].end
    }

    fn no_place(&self, side: Side, pos: usize) -> Divergence {
        let anchor = &self.anchors[pos];
        Divergence::NoConsistentAssignment {
            side,
            subclone_id: anchor.id,
            node: anchor.node,
        }
    }
}

/// Maps the anchors of `own` onto the anchors of `other`, preserving ancestry.
struct Embedding<'a> {
    own: &'a AnchorTree,
    other: &'a AnchorTree,
    /// `within[n][m]`: every event of own anchor `n` is matched in other anchor `m`
    within: Vec<Vec<bool>>,
    /// Comparable anchors of `other` per own anchor, best candidate first
    candidates: Vec<Vec<usize>>,
    /// Whether the subtree of own anchor `n` fits below other anchor `m`
    feasible: Vec<Option<bool>>,
}

impl<'a> Embedding<'a> {
    fn new(own: &'a AnchorTree, other: &'a AnchorTree, tolerance: u64) -> Self {
        let within: Vec<Vec<bool>> = (0..own.len())
            .map(|n| {
                (0..other.len())
                    .map(|m| fuzzy_contains(other.events(m), own.events(n), tolerance))
                    .collect()
            })
            .collect();

        let candidates = (0..own.len())
            .map(|n| {
                let size = own.events(n).len();
                let mut comparable: Vec<usize> = (0..other.len())
                    .filter(|&m| {
                        within[n][m] || fuzzy_contains(own.events(n), other.events(m), tolerance)
                    })
                    .collect();
                comparable.sort_by(|&a, &b| {
                    let (size_a, size_b) = (other.events(a).len(), other.events(b).len());
                    size_a
                        .abs_diff(size)
                        .cmp(&size_b.abs_diff(size))
                        .then(size_a.cmp(&size_b))
                        .then(a.cmp(&b))
                });
                comparable
            })
            .collect();

        Self {
            own,
            other,
            within,
            candidates,
            feasible: vec![None; own.len() * other.len()],
        }
    }

    /// Best image of the effective root under which the whole tree fits.
    fn embed_root(&mut self) -> Option<usize> {
        let candidates = self.candidates.first()?.clone();
        candidates.into_iter().find(|&m| self.fits(0, m))
    }

    fn fits(&mut self, n: usize, m: usize) -> bool {
        let key = n * self.other.len() + m;
        if let Some(known) = self.feasible[key] {
            return known;
        }

        let own = self.own;
        let result = own.anchors[n]
            .children
            .iter()
            .all(|&child| self.place(n, child, m).is_some());
        self.feasible[key] = Some(result);
        result
    }

    /// First allowed image of `child` under which its own subtree fits.
    fn place(&mut self, n: usize, child: usize, m: usize) -> Option<usize> {
        self.placements(n, child, m).into_iter().find(|&image| {
            trace!(
                "trying #{} -> #{}",
                self.own.anchors[child].id,
                self.other.anchors[image].id
            );
            self.fits(child, image)
        })
    }

    /// Images allowed for `child` of `n` while `n` is mapped onto `m`.
    fn placements(&self, n: usize, child: usize, m: usize) -> Vec<usize> {
        self.candidates[child]
            .iter()
            .copied()
            .filter(|&image| {
                if image == m {
                    self.shares_image(n, child, m)
                } else {
                    self.other.is_descendant(m, image)
                }
            })
            .collect()
    }

    fn shares_image(&self, n: usize, child: usize, m: usize) -> bool {
        if self.within[child][m] {
            // The other tree collapsed this chain into `m`
            self.own.anchors[n].children.len() == 1
        } else {
            // Only a leaf may be extended
            self.other.is_leaf(m)
        }
    }

    /// Image of every own anchor, in own pre-order. The root must fit `root_image`.
    fn images(&mut self, root_image: usize) -> Vec<(usize, usize)> {
        let own = self.own;
        let mut pairs = vec![(0, root_image)];
        let mut next = 0;
        while next < pairs.len() {
            let (n, m) = pairs[next];
            for &child in &own.anchors[n].children {
                if let Some(image) = self.place(n, child, m) {
                    pairs.push((child, image));
                }
            }
            next += 1;
        }
        pairs.sort_unstable_by_key(|&(n, _)| n);
        pairs
    }

    /// The first own anchor left without a place, following the best
    /// candidates down from the root.
    fn blame(&mut self) -> usize {
        let Some(&first) = self.candidates.first().and_then(|c| c.first()) else {
            return 0;
        };
        let own = self.own;
        let (mut n, mut m) = (0, first);
        'descend: loop {
            for &child in &own.anchors[n].children {
                if self.place(n, child, m).is_some() {
                    continue;
                }
                match self.placements(n, child, m).first() {
                    Some(&image) => {
                        (n, m) = (child, image);
                        continue 'descend;
                    }
                    None => return child,
                }
            }
            return n;
        }
    }
}
