use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::SubcloneTree;

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

// One line per subclone: id, fraction and the events acquired there
impl TreeNodeConvert for SubcloneTree {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(tree: &SubcloneTree, node_idx: Index) -> Tree<String> {
            let label = tree
                .subclone(node_idx)
                .map(|data| data.to_string())
                .unwrap_or_default();
            let leaves: Vec<_> = tree
                .children(node_idx)
                .iter()
                .map(|&child| build_tree(tree, child))
                .collect();
            Tree::new(label).with_leaves(leaves)
        }

        match self.root() {
            Some(root_idx) => build_tree(self, root_idx),
            None => Tree::new("Empty tree".to_string()),
        }
    }
}
