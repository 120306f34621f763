//! Tests for the on-disk file format and reopening.

mod common;

use common::{create_tree, init_tracing, insert_all, page};
use flatindex::{BPlusTree, Error, IndexConfig, PageStore, TreeHeader};
use tempfile::tempdir;

fn config(order: usize) -> IndexConfig {
    IndexConfig::new(order).with_durable_writes(false)
}

#[test]
fn test_fresh_file_layout() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("fresh.idx");

    drop(BPlusTree::open(&path, config(3)).unwrap());

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert_eq!(line.len(), 73);
        assert!(line.ends_with('\n'));
    }
    assert_eq!(lines[0].trim_end(), "nextId:3;rootId:2");
    assert_eq!(lines[1].trim_end(), "id;leaf;keys;parent;children;prev;next;refs");
    assert_eq!(lines[2].trim_end(), "2;1;;-;-;-;-;");
}

#[test]
fn test_file_after_split() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("split.idx");

    {
        let mut tree = BPlusTree::open(&path, config(3)).unwrap();
        insert_all(&mut tree, &[1990, 1988, 1989, 2000]);
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let records: Vec<&str> = text.lines().map(str::trim_end).collect();
    assert_eq!(
        records,
        vec![
            "nextId:5;rootId:4",
            "id;leaf;keys;parent;children;prev;next;refs",
            "2;1;1988,1989;4;-;-;3;1,2",
            "3;1;1990,2000;4;-;2;-;0,3",
            "4;0;1990;-;2,3;-;-;",
        ]
    );
}

#[test]
fn test_reopen_and_continue() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("reopen.idx");

    {
        let mut tree = BPlusTree::open(&path, config(3)).unwrap();
        for key in 0..25 {
            tree.insert(key % 7, key).unwrap();
        }
    }

    {
        let mut tree = BPlusTree::open(&path, config(3)).unwrap();
        assert_eq!(tree.search(3).unwrap(), vec![3, 10, 17, 24]);
        for key in 25..40 {
            tree.insert(key % 7, key).unwrap();
        }
    }

    let tree = BPlusTree::open(&path, config(3)).unwrap();
    let report = tree.check().unwrap();
    assert_eq!(report.entries, 40);
    assert_eq!(tree.search(0).unwrap(), vec![0, 7, 14, 21, 28, 35]);
}

#[test]
fn test_empty_file_is_initialized() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.idx");
    std::fs::File::create(&path).unwrap();

    let tree = BPlusTree::open(&path, config(3)).unwrap();
    assert_eq!(tree.header().unwrap(), TreeHeader::initial());
    assert_eq!(tree.height().unwrap(), 0);
}

#[test]
fn test_reopen_with_other_order_fails() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("order.idx");
    drop(BPlusTree::open(&path, config(3)).unwrap());

    assert!(matches!(
        BPlusTree::open(&path, config(5)),
        Err(Error::MalformedRecord(_))
    ));
}

#[test]
fn test_corrupt_header_detected() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("header.idx");
    drop(BPlusTree::open(&path, config(3)).unwrap());

    let store = PageStore::open(&path, &config(3)).unwrap();
    store.write_page(page(0), "garbage").unwrap();
    drop(store);

    assert!(matches!(
        BPlusTree::open(&path, config(3)),
        Err(Error::MalformedRecord(_))
    ));
}

#[test]
fn test_corrupt_node_surfaces_on_search() {
    let (mut tree, dir) = create_tree(3);
    insert_all(&mut tree, &[1, 2, 3, 4, 5]);
    let path = dir.path().join("test.idx");
    drop(tree);

    let store = PageStore::open(&path, &config(3)).unwrap();
    store.write_page(page(3), "3;1;4,5").unwrap();
    drop(store);

    let tree = BPlusTree::open(&path, config(3)).unwrap();
    assert!(matches!(tree.search(5), Err(Error::MalformedRecord(_))));
    // The left half is still readable.
    assert_eq!(tree.search(1).unwrap(), vec![0]);
}

#[test]
fn test_check_detects_broken_chain() {
    let (mut tree, dir) = create_tree(3);
    insert_all(&mut tree, &[1, 2, 3, 4]);
    let path = dir.path().join("test.idx");
    drop(tree);

    // Drop the left leaf's `next` link.
    let store = PageStore::open(&path, &config(3)).unwrap();
    store.write_page(page(2), "2;1;1,2;4;-;-;-;0,1").unwrap();
    drop(store);

    let tree = BPlusTree::open(&path, config(3)).unwrap();
    assert!(matches!(tree.check(), Err(Error::Corruption(_))));
}

#[test]
fn test_stored_id_is_not_trusted() {
    let (mut tree, dir) = create_tree(3);
    insert_all(&mut tree, &[1, 2, 3, 4]);
    let path = dir.path().join("test.idx");
    drop(tree);

    // Record claims to be node 99; its page position says 3.
    let store = PageStore::open(&path, &config(3)).unwrap();
    store.write_page(page(3), "99;1;3,4;4;-;2;-;2,3").unwrap();
    drop(store);

    let tree = BPlusTree::open(&path, config(3)).unwrap();
    assert_eq!(tree.load_node(page(3)).unwrap().id, page(3));
    assert_eq!(tree.search(4).unwrap(), vec![3]);
    tree.check().unwrap();
}
