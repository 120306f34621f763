//! B+Tree engine - descent, leaf mutation and split propagation.
//!
//! The engine keeps no tree state in memory between calls. Every operation
//! re-reads the header page for `rootId`/`nextId`, loads the nodes it needs
//! as local values, and writes back any node it changed before returning.
//! An insert stages its changed nodes and header, encodes all of them, and
//! only then writes, so an oversized record aborts it with the file intact.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::Ordering;

use tracing::debug;

use crate::common::config::{IndexConfig, INITIAL_ROOT_ID, LEGEND_PAGE_ID};
use crate::common::{Error, PageId, Result};
use crate::index::btree::node::{route, Key, Node, RecordRef};
use crate::index::btree::stats::TreeStats;
use crate::storage::page::{TreeHeader, LEGEND};
use crate::storage::PageStore;

/// One internal node visited on the way down, and the child slot taken.
#[derive(Debug, Clone, Copy)]
struct PathEntry {
    page_id: PageId,
    slot: usize,
}

/// Result of splitting a node: `promoted` separates `left` from `right`.
#[derive(Debug, Clone, Copy)]
struct Split {
    left: PageId,
    promoted: Key,
    right: PageId,
}

/// A disk-backed B+Tree mapping integer keys to record references.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │ BPlusTree                                    │
/// │   insert / search / height / entries / check │
/// ├──────────────────────────────────────────────┤
/// │ Node codec            TreeHeader (page 0)    │
/// ├──────────────────────────────────────────────┤
/// │ PageStore: fixed-width pages, id = index     │
/// └──────────────────────────────────────────────┘
/// ```
///
/// # Concurrency
/// `insert` takes `&mut self`: one writer at a time. Lookups take `&self`.
///
/// # Example
/// ```no_run
/// use flatindex::BPlusTree;
///
/// let mut tree = BPlusTree::open_with_order("harvest.idx", 3).unwrap();
/// tree.insert(1990, 17).unwrap();
/// tree.insert(1990, 42).unwrap();
/// assert_eq!(tree.search(1990).unwrap(), vec![17, 42]);
/// ```
pub struct BPlusTree {
    store: PageStore,
    order: usize,
    stats: TreeStats,
}

impl BPlusTree {
    /// Open an index file, initializing it if it is absent or empty.
    ///
    /// A new file gets the header in page 0, the legend in page 1 and an
    /// empty root leaf in page 2.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` if `config.order` is below the minimum
    /// - `Error::MalformedRecord` if an existing file's header is corrupt or
    ///   its length does not match the page size of this order
    pub fn open<P: AsRef<Path>>(path: P, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let store = PageStore::open_or_create(path, &config)?;
        let tree = Self {
            store,
            order: config.order,
            stats: TreeStats::new(),
        };

        if tree.store.page_count() == 0 {
            tree.bootstrap()?;
        } else {
            tree.header()?;
        }
        Ok(tree)
    }

    /// Open with the given order and default options.
    pub fn open_with_order<P: AsRef<Path>>(path: P, order: usize) -> Result<Self> {
        Self::open(path, IndexConfig::new(order))
    }

    fn bootstrap(&self) -> Result<()> {
        TreeHeader::initial().save(&self.store)?;
        self.store.write_page(LEGEND_PAGE_ID, LEGEND)?;
        self.store_node(&Node::new_leaf(INITIAL_ROOT_ID))?;
        debug!(order = self.order, "initialized empty tree");
        Ok(())
    }

    // ========================================================================
    // Public API: accessors
    // ========================================================================

    /// Maximum keys per node.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Size of each page in bytes.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.store.page_size()
    }

    /// Number of pages in the file, including header and legend.
    pub fn page_count(&self) -> u32 {
        self.store.page_count()
    }

    /// I/O and split counters.
    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    /// Read the header page.
    pub fn header(&self) -> Result<TreeHeader> {
        self.stats.record_read();
        TreeHeader::load(&self.store)
    }

    /// Current root page id, read from the header.
    pub fn root_id(&self) -> Result<PageId> {
        Ok(self.header()?.root_id)
    }

    /// Load the node stored at `page_id`.
    ///
    /// # Errors
    /// - `Error::NodeNotFound` if the page is not allocated
    /// - `Error::MalformedRecord` if it is the header/legend page or corrupt
    pub fn load_node(&self, page_id: PageId) -> Result<Node> {
        if page_id < INITIAL_ROOT_ID {
            return Err(Error::malformed(format!(
                "page {} is reserved and holds no node",
                page_id.0
            )));
        }
        let record = self.store.read_page(page_id)?;
        self.stats.record_read();
        Node::decode(&record, page_id)
    }

    // ========================================================================
    // Public API: search and height
    // ========================================================================

    /// All references stored under `key`, in leaf-chain order.
    ///
    /// Duplicates of one key can end up on both sides of a leaf split, while
    /// descent routes a key equal to a separator to the right. The lookup
    /// therefore steps back along `prev` while the preceding leaf ends with
    /// `key`, then scans forward until a greater key or the end of the chain.
    pub fn search(&self, key: Key) -> Result<Vec<RecordRef>> {
        let limit = self.store.page_count();
        let mut leaf = self.descend(key, &mut Vec::new())?;

        let mut hops = 0;
        while leaf.keys.first().map_or(true, |&first| first >= key) {
            let Some(prev_id) = leaf.prev.get() else {
                break;
            };
            let prev = self.load_node(prev_id)?;
            if prev.keys.last() != Some(&key) {
                break;
            }
            leaf = prev;
            hops += 1;
            guard_steps(hops, limit, "prev chain")?;
        }

        let mut found = Vec::new();
        let mut hops = 0;
        loop {
            for (&k, &r) in leaf.keys.iter().zip(&leaf.refs) {
                if k > key {
                    return Ok(found);
                }
                if k == key {
                    found.push(r);
                }
            }
            match leaf.next.get() {
                Some(next_id) => leaf = self.load_node(next_id)?,
                None => return Ok(found),
            }
            hops += 1;
            guard_steps(hops, limit, "next chain")?;
        }
    }

    /// Number of edges from the root to a leaf; 0 when the root is a leaf.
    pub fn height(&self) -> Result<usize> {
        Ok(self.leftmost_path()?.0)
    }

    /// Every `(key, ref)` pair, walking the leaf chain from the leftmost leaf.
    pub fn entries(&self) -> Result<Vec<(Key, RecordRef)>> {
        let limit = self.store.page_count();
        let (_, mut leaf) = self.leftmost_path()?;
        let mut out = Vec::new();
        let mut hops = 0;
        loop {
            out.extend(leaf.keys.iter().copied().zip(leaf.refs.iter().copied()));
            match leaf.next.get() {
                Some(next_id) => leaf = self.load_node(next_id)?,
                None => return Ok(out),
            }
            hops += 1;
            guard_steps(hops, limit, "next chain")?;
        }
    }

    /// Depth of the leftmost leaf and the leaf itself.
    pub(crate) fn leftmost_path(&self) -> Result<(usize, Node)> {
        let limit = self.store.page_count();
        let mut node = self.load_node(self.root_id()?)?;
        let mut depth = 0;
        while !node.is_leaf {
            let child = *node.children.first().ok_or_else(|| {
                Error::corruption(format!("internal node {} has no children", node.id.0))
            })?;
            node = self.load_node(child)?;
            depth += 1;
            guard_steps(depth, limit, "descent")?;
        }
        Ok((depth, node))
    }

    // ========================================================================
    // Public API: insert
    // ========================================================================

    /// Insert one `(key, ref)` pair.
    ///
    /// The pair is placed after any entries with an equal key. A leaf that
    /// exceeds `order` keys is split, and splits propagate up the descent
    /// path, creating a new root when the path is exhausted.
    ///
    /// Every node the insert touches is staged and encoded before the first
    /// page write, so a record that does not fit (`LineTooLong`) leaves the
    /// file untouched.
    ///
    /// # Errors
    /// An I/O error while writing leaves the file as far as the failing
    /// write got; there is no rollback.
    pub fn insert(&mut self, key: Key, record_ref: RecordRef) -> Result<()> {
        let mut path = Vec::new();
        let mut leaf = self.descend(key, &mut path)?;

        let pos = route(&leaf.keys, key);
        leaf.keys.insert(pos, key);
        leaf.refs.insert(pos, record_ref);

        let mut staged = StagedWrites::new(self.header()?);
        if leaf.len() <= self.order {
            staged.put(leaf);
            return self.commit(staged);
        }

        let mut split = self.split_leaf(&mut staged, leaf)?;
        while let Some(entry) = path.pop() {
            let mut parent = self.load_staged(&staged, entry.page_id)?;
            parent.keys.insert(entry.slot, split.promoted);
            parent.children.insert(entry.slot + 1, split.right);

            if parent.len() <= self.order {
                staged.put(parent);
                return self.commit(staged);
            }
            split = self.split_internal(&mut staged, parent)?;
        }
        self.grow_root(&mut staged, split)?;
        self.commit(staged)
    }

    /// Walk from the root to the leaf covering `key`, recording the path.
    fn descend(&self, key: Key, path: &mut Vec<PathEntry>) -> Result<Node> {
        let limit = self.store.page_count();
        let mut node = self.load_node(self.root_id()?)?;
        while !node.is_leaf {
            let slot = node.child_slot(key);
            let child = *node.children.get(slot).ok_or_else(|| {
                Error::corruption(format!(
                    "internal node {} has no child at slot {}",
                    node.id.0, slot
                ))
            })?;
            path.push(PathEntry {
                page_id: node.id,
                slot,
            });
            guard_steps(path.len(), limit, "descent")?;
            node = self.load_node(child)?;
        }
        Ok(node)
    }

    /// Split an overflowing leaf; the upper half moves to a new page.
    fn split_leaf(&self, staged: &mut StagedWrites, mut leaf: Node) -> Result<Split> {
        let mid = leaf.len().div_ceil(2);
        let right_id = staged.allocate_id();

        let mut right = Node::new_leaf(right_id);
        right.keys = leaf.keys.split_off(mid);
        right.refs = leaf.refs.split_off(mid);
        right.parent = leaf.parent;
        right.prev = leaf.id;
        right.next = leaf.next;
        leaf.next = right_id;

        if let Some(follower_id) = right.next.get() {
            let mut follower = self.load_staged(staged, follower_id)?;
            follower.prev = right_id;
            staged.put(follower);
        }

        let promoted = right.keys[0];
        staged.leaf_splits += 1;
        debug!(
            left = leaf.id.0,
            right = right_id.0,
            promoted,
            "split leaf"
        );
        let split = Split {
            left: leaf.id,
            promoted,
            right: right_id,
        };
        staged.put(leaf);
        staged.put(right);
        Ok(split)
    }

    /// Split an overflowing internal node; the median key moves up and is
    /// kept in neither half.
    fn split_internal(&self, staged: &mut StagedWrites, mut node: Node) -> Result<Split> {
        let mid = node.len() / 2;
        let right_id = staged.allocate_id();

        let right_keys = node.keys.split_off(mid + 1);
        let promoted = node.keys.pop().ok_or_else(|| {
            Error::corruption(format!("internal node {} split with no keys", node.id.0))
        })?;
        let right_children = node.children.split_off(mid + 1);

        let mut right = Node::new_internal(right_id, right_keys, right_children);
        right.parent = node.parent;

        for &child in &right.children {
            self.set_parent(staged, child, right_id)?;
        }

        staged.internal_splits += 1;
        debug!(
            left = node.id.0,
            right = right_id.0,
            promoted,
            moved_children = right.children.len(),
            "split internal node"
        );
        let split = Split {
            left: node.id,
            promoted,
            right: right_id,
        };
        staged.put(node);
        staged.put(right);
        Ok(split)
    }

    /// Put a new root above a split that reached the top of the tree.
    fn grow_root(&self, staged: &mut StagedWrites, split: Split) -> Result<()> {
        let root_id = staged.allocate_id();
        let root = Node::new_internal(root_id, vec![split.promoted], vec![split.left, split.right]);
        staged.put(root);
        self.set_parent(staged, split.left, root_id)?;
        self.set_parent(staged, split.right, root_id)?;

        staged.header.root_id = root_id;
        staged.root_split = true;
        debug!(root = root_id.0, promoted = split.promoted, "grew new root");
        Ok(())
    }

    // ========================================================================
    // Internal: page helpers
    // ========================================================================

    fn store_node(&self, node: &Node) -> Result<()> {
        let record = node.encode(self.store.page_size())?;
        self.store.write_page(node.id, &record)?;
        self.stats.record_write();
        Ok(())
    }

    /// A node as the current insert sees it: staged if touched, else on disk.
    fn load_staged(&self, staged: &StagedWrites, page_id: PageId) -> Result<Node> {
        match staged.nodes.get(&page_id) {
            Some(node) => Ok(node.clone()),
            None => self.load_node(page_id),
        }
    }

    fn set_parent(&self, staged: &mut StagedWrites, page_id: PageId, parent: PageId) -> Result<()> {
        let mut node = self.load_staged(staged, page_id)?;
        node.parent = parent;
        staged.put(node);
        Ok(())
    }

    /// Encode every staged node, then write them in id order and persist
    /// the header last.
    ///
    /// Fresh ids are handed out above the old `nextId`, so writing in
    /// ascending order appends them in sequence.
    fn commit(&self, staged: StagedWrites) -> Result<()> {
        let page_size = self.store.page_size();
        let records = staged
            .nodes
            .values()
            .map(|node| -> Result<(PageId, String)> {
                Ok((node.id, node.encode(page_size)?))
            })
            .collect::<Result<Vec<_>>>()?;

        for (page_id, record) in &records {
            self.store.write_page(*page_id, record)?;
            self.stats.record_write();
        }
        if staged.header != staged.original_header {
            self.save_header(&staged.header)?;
        }

        self.stats
            .leaf_splits
            .fetch_add(staged.leaf_splits, Ordering::Relaxed);
        self.stats
            .internal_splits
            .fetch_add(staged.internal_splits, Ordering::Relaxed);
        if staged.root_split {
            self.stats.root_splits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn save_header(&self, header: &TreeHeader) -> Result<()> {
        header.save(&self.store)?;
        self.stats.record_write();
        Ok(())
    }
}

/// Nodes and header changes of one insert, held back until every record
/// is known to fit in its page.
#[derive(Debug)]
struct StagedWrites {
    original_header: TreeHeader,
    header: TreeHeader,
    nodes: BTreeMap<PageId, Node>,
    leaf_splits: u64,
    internal_splits: u64,
    root_split: bool,
}

impl StagedWrites {
    fn new(header: TreeHeader) -> Self {
        Self {
            original_header: header,
            header,
            nodes: BTreeMap::new(),
            leaf_splits: 0,
            internal_splits: 0,
            root_split: false,
        }
    }

    fn put(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Hand out `nextId`; persisted with the rest of the insert.
    fn allocate_id(&mut self) -> PageId {
        let id = self.header.next_id;
        self.header.next_id = PageId::new(id.0 + 1);
        id
    }
}

/// Fail instead of looping forever when a chain or descent revisits pages.
fn guard_steps(steps: usize, page_count: u32, what: &str) -> Result<()> {
    if steps > page_count as usize {
        return Err(Error::corruption(format!(
            "{} longer than the {} pages in the file",
            what, page_count
        )));
    }
    Ok(())
}
