//! Structural verification of an on-disk tree.
//!
//! [`BPlusTree::check`] walks every node reachable from the root and
//! verifies:
//! - leaves: `refs.len() == keys.len()`, keys ascending, at most `order` keys
//! - internal nodes: `children.len() == keys.len() + 1`, 1..=order keys
//! - every key lies within the bounds set by the separators above it
//! - all leaves sit at the same depth
//! - `parent` fields point at the node that lists the child
//! - the sibling chain visits the leaves in tree order, `prev`/`next` agree,
//!   and keys never decrease across a link

use std::collections::HashSet;

use crate::common::{Error, PageId, Result};
use crate::index::btree::node::{Key, Node};
use crate::index::btree::BPlusTree;

/// Summary returned by a successful [`BPlusTree::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeReport {
    /// Edges from the root to any leaf.
    pub height: usize,
    /// Nodes reachable from the root.
    pub nodes: usize,
    pub leaves: usize,
    /// Total `(key, ref)` pairs across all leaves.
    pub entries: usize,
    /// Keys held by the root.
    pub root_keys: usize,
}

/// Inclusive key bounds inherited from ancestors.
///
/// Keys equal to a separator may appear on its left (duplicates that
/// straddled a leaf split), so both bounds are inclusive.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    low: Option<Key>,
    high: Option<Key>,
}

impl Bounds {
    fn contains(&self, key: Key) -> bool {
        self.low.map_or(true, |low| key >= low) && self.high.map_or(true, |high| key <= high)
    }
}

struct Walker<'a> {
    tree: &'a BPlusTree,
    next_id: PageId,
    visited: HashSet<PageId>,
    leaves: Vec<Node>,
    leaf_depth: Option<usize>,
    report: TreeReport,
}

impl BPlusTree {
    /// Verify every structural invariant of the tree.
    ///
    /// # Errors
    /// Returns `Error::Corruption` describing the first violation found, or
    /// the I/O / decode error that stopped the walk.
    pub fn check(&self) -> Result<TreeReport> {
        let header = self.header()?;
        let mut walker = Walker {
            tree: self,
            next_id: header.next_id,
            visited: HashSet::new(),
            leaves: Vec::new(),
            leaf_depth: None,
            report: TreeReport::default(),
        };

        let root = self.load_node(header.root_id)?;
        if root.parent.is_valid() {
            return Err(Error::corruption(format!(
                "root {} has parent {}",
                root.id.0, root.parent.0
            )));
        }
        walker.report.root_keys = root.len();

        let unbounded = Bounds {
            low: None,
            high: None,
        };
        walker.visit(root, 0, unbounded, true)?;
        walker.check_chain()?;

        walker.report.height = walker.leaf_depth.unwrap_or(0);
        walker.report.leaves = walker.leaves.len();
        Ok(walker.report)
    }
}

impl Walker<'_> {
    fn visit(&mut self, node: Node, depth: usize, bounds: Bounds, is_root: bool) -> Result<()> {
        if node.id >= self.next_id {
            return Err(Error::corruption(format!(
                "node {} is not below nextId {}",
                node.id.0, self.next_id.0
            )));
        }
        if !self.visited.insert(node.id) {
            return Err(Error::corruption(format!("node {} reached twice", node.id.0)));
        }
        self.report.nodes += 1;

        let order = self.tree.order();
        if node.keys.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::corruption(format!(
                "node {} keys are not ascending: {:?}",
                node.id.0, node.keys
            )));
        }
        if node.len() > order {
            return Err(Error::corruption(format!(
                "node {} holds {} keys, order is {}",
                node.id.0,
                node.len(),
                order
            )));
        }
        if let Some(&bad) = node.keys.iter().find(|&&k| !bounds.contains(k)) {
            return Err(Error::corruption(format!(
                "node {} key {} outside separator bounds {:?}",
                node.id.0, bad, bounds
            )));
        }

        if node.is_leaf {
            return self.visit_leaf(node, depth, is_root);
        }

        if node.is_empty() || node.children.len() != node.len() + 1 {
            return Err(Error::corruption(format!(
                "internal node {} has {} keys and {} children",
                node.id.0,
                node.len(),
                node.children.len()
            )));
        }

        for (slot, &child_id) in node.children.iter().enumerate() {
            let child = self.tree.load_node(child_id)?;
            if child.parent != node.id {
                return Err(Error::corruption(format!(
                    "node {} lists child {} whose parent is {}",
                    node.id.0, child_id.0, child.parent
                )));
            }
            let child_bounds = Bounds {
                low: if slot == 0 {
                    bounds.low
                } else {
                    Some(node.keys[slot - 1])
                },
                high: node.keys.get(slot).copied().or(bounds.high),
            };
            self.visit(child, depth + 1, child_bounds, false)?;
        }
        Ok(())
    }

    fn visit_leaf(&mut self, leaf: Node, depth: usize, is_root: bool) -> Result<()> {
        if leaf.refs.len() != leaf.keys.len() {
            return Err(Error::corruption(format!(
                "leaf {} has {} keys and {} refs",
                leaf.id.0,
                leaf.keys.len(),
                leaf.refs.len()
            )));
        }
        if leaf.is_empty() && !is_root {
            return Err(Error::corruption(format!("non-root leaf {} is empty", leaf.id.0)));
        }

        match self.leaf_depth {
            None => self.leaf_depth = Some(depth),
            Some(expected) if expected != depth => {
                return Err(Error::corruption(format!(
                    "leaf {} at depth {}, expected {}",
                    leaf.id.0, depth, expected
                )));
            }
            Some(_) => {}
        }

        self.report.entries += leaf.len();
        self.leaves.push(leaf);
        Ok(())
    }

    /// The leaves in tree order must form exactly the sibling chain.
    fn check_chain(&self) -> Result<()> {
        let (Some(first), Some(last)) = (self.leaves.first(), self.leaves.last()) else {
            return Ok(());
        };
        if first.prev.is_valid() {
            return Err(Error::corruption(format!(
                "leftmost leaf {} has prev {}",
                first.id.0, first.prev
            )));
        }
        if last.next.is_valid() {
            return Err(Error::corruption(format!(
                "rightmost leaf {} has next {}",
                last.id.0, last.next
            )));
        }

        for pair in self.leaves.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            if left.next != right.id || right.prev != left.id {
                return Err(Error::corruption(format!(
                    "sibling link broken between leaves {} and {}",
                    left.id.0, right.id.0
                )));
            }
            if let (Some(&tail), Some(&head)) = (left.keys.last(), right.keys.first()) {
                if head < tail {
                    return Err(Error::corruption(format!(
                        "leaf {} starts at {} below {} ending leaf {}",
                        right.id.0, head, tail, left.id.0
                    )));
                }
            }
        }
        Ok(())
    }
}
