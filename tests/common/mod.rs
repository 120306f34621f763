//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

use flatindex::{BPlusTree, IndexConfig, Key, Node, PageId};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber once; filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("flatindex=warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

/// A fresh tree in a temporary directory, without fsync.
pub fn create_tree(order: usize) -> (BPlusTree, TempDir) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.idx");
    let config = IndexConfig::new(order).with_durable_writes(false);
    (BPlusTree::open(&path, config).unwrap(), dir)
}

/// Insert every key with its position in `keys` as the reference.
pub fn insert_all(tree: &mut BPlusTree, keys: &[Key]) {
    for (i, &key) in keys.iter().enumerate() {
        tree.insert(key, i as i64).unwrap();
    }
}

/// Every node reachable from the root, with its depth.
pub fn collect_nodes(tree: &BPlusTree) -> Vec<(usize, Node)> {
    let mut out = Vec::new();
    let mut stack = vec![(0, tree.root_id().unwrap())];
    while let Some((depth, id)) = stack.pop() {
        let node = tree.load_node(id).unwrap();
        for &child in node.children.iter().rev() {
            stack.push((depth + 1, child));
        }
        out.push((depth, node));
    }
    out
}

/// Leaves in sibling-chain order, starting from the leftmost leaf.
pub fn leaf_chain(tree: &BPlusTree) -> Vec<Node> {
    let mut node = tree.load_node(tree.root_id().unwrap()).unwrap();
    while !node.is_leaf {
        node = tree.load_node(node.children[0]).unwrap();
    }

    let mut leaves = vec![node];
    while let Some(next) = leaves.last().and_then(|leaf| leaf.next.get()) {
        leaves.push(tree.load_node(next).unwrap());
    }
    leaves
}

pub fn page(id: u32) -> PageId {
    PageId::new(id)
}
