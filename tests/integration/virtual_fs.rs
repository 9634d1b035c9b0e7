use super::support::{recorded, Fixture};
use cairn::error::FsError;
use cairn::index::{Index, IndexRecord};
use cairn::store::{ContentStore, StoreWriter};
use cairn::types::ContentHash;
use cairn::vfs::{AccessMode, ArchiveFs, FileKind, VfsOptions, VirtualTree, ROOT_INODE};
use proptest::prelude::*;
use std::collections::HashSet;

const HASH_X: &str = "0a4d55a8d778e5022fab701977c5d840bbc486d0";
const HASH_Y: &str = "f572d396fae9206628714fb2ce00f72e94f2258f";

fn hash(s: &str) -> ContentHash {
    s.parse().unwrap()
}

fn two_file_fs() -> ArchiveFs {
    let mut index = Index::new();
    index.push(IndexRecord::new(hash(HASH_X), 1_600_000_000, 10, "/a/x.txt"));
    index.push(IndexRecord::new(hash(HASH_Y), 1_600_000_100, 6, "/a/y.txt"));
    ArchiveFs::load(
        &index,
        ContentStore::new("/nonexistent"),
        VfsOptions { uid: 1000, gid: 100 },
    )
}

#[test]
fn two_files_under_one_directory() {
    let fs = two_file_fs();
    assert_eq!(fs.tree().len(), 4);

    let root = fs.attributes(ROOT_INODE);
    assert_eq!(root.kind, FileKind::Directory);
    assert_eq!(root.perm, 0o555);

    let a = fs.lookup(ROOT_INODE, "a").unwrap();
    assert_eq!(a.kind, FileKind::Directory);
    assert_eq!((a.uid, a.gid), (1000, 100));

    let x = fs.lookup(a.ino, "x.txt").unwrap();
    assert_eq!(x.kind, FileKind::RegularFile);
    assert_eq!(x.size, 10);
    assert_eq!(x.perm, 0o444);
    assert_eq!(x.nlink, 1);

    let y = fs.lookup(a.ino, "y.txt").unwrap();
    assert_eq!(y.size, 6);
    assert_ne!(x.ino, y.ino);

    assert!(fs.lookup(a.ino, "z.txt").unwrap().is_sentinel());
    assert!(fs.lookup(ROOT_INODE, "x.txt").unwrap().is_sentinel());
}

#[test]
fn readdir_resumes_from_offset() {
    let fs = two_file_fs();
    let a = fs.lookup(ROOT_INODE, "a").unwrap().ino;
    assert_eq!(fs.open_directory(a).unwrap(), a);

    // a reply buffer with room for one entry
    let mut first = Vec::new();
    fs.read_directory(a, 0, |name, _, next| {
        if !first.is_empty() {
            return false;
        }
        first.push((name.to_string(), next));
        true
    })
    .unwrap();
    assert_eq!(first, vec![("x.txt".to_string(), 1)]);

    let mut rest = Vec::new();
    fs.read_directory(a, first[0].1, |name, _, next| {
        rest.push((name.to_string(), next));
        true
    })
    .unwrap();
    assert_eq!(rest, vec![("y.txt".to_string(), 2)]);

    let mut past_end = 0;
    fs.read_directory(a, 2, |_, _, _| {
        past_end += 1;
        true
    })
    .unwrap();
    assert_eq!(past_end, 0);
}

#[test]
fn write_intent_is_denied_without_a_handle() {
    let fs = two_file_fs();
    let a = fs.lookup(ROOT_INODE, "a").unwrap().ino;
    let x = fs.lookup(a, "x.txt").unwrap().ino;
    for mode in [AccessMode::WriteOnly, AccessMode::ReadWrite] {
        let err = fs.open_file(x, mode).unwrap_err();
        assert!(matches!(err, FsError::AccessDenied));
        assert_eq!(err.errno(), libc::EACCES);
    }
    assert!(fs.handles().is_empty());
}

#[test]
fn read_returns_stored_bytes() {
    let fx = Fixture::new();
    let body = "0123456789abcdefghij";
    let path = fx.write("data/file.txt", body);
    fx.index();
    let index = fx.load_index();
    StoreWriter::new(ContentStore::new(fx.store()))
        .materialize(&index)
        .unwrap();

    let fs = ArchiveFs::load(&index, ContentStore::new(fx.store()), VfsOptions::default());
    let node = fs.tree().resolve(&recorded(&path)).unwrap();
    let fh = fs.open_file(node.inode, AccessMode::ReadOnly).unwrap();

    assert_eq!(fs.read(fh, 0, body.len()).unwrap(), body.as_bytes());
    assert_eq!(fs.read(fh, 5, 3).unwrap(), b"567");
    assert_eq!(fs.read(fh, 15, 100).unwrap(), b"fghij");
    assert!(fs.read(fh, 100, 10).unwrap().is_empty());
    assert_eq!(fs.read(fh, 15, usize::MAX).unwrap(), b"fghij");
    assert_eq!(fs.read(fh, 0, usize::MAX / 2).unwrap(), body.as_bytes());

    fs.release(fh).unwrap();
    assert!(matches!(fs.release(fh), Err(FsError::BadHandle(_))));
    assert!(matches!(fs.read(fh, 0, 1), Err(FsError::BadHandle(_))));
}

#[test]
fn identical_files_are_served_from_one_blob() {
    let fx = Fixture::new();
    let x = fx.write("a/x.txt", "0123456789");
    let y = fx.write("a/y.txt", "0123456789");
    fx.index();
    let index = fx.load_index();
    let store = ContentStore::new(fx.store());
    let report = StoreWriter::new(store.clone()).materialize(&index).unwrap();
    assert_eq!(report.hashes, 1);
    assert_eq!(report.copied, 1);

    let content_hash = index.records()[0].content_hash.clone();
    assert!(index.iter().all(|r| r.content_hash == content_hash));
    let blob = std::fs::read(store.blob_path(&content_hash)).unwrap();
    let shard = store.shard_dir(&content_hash);
    assert_eq!(std::fs::read_dir(&shard).unwrap().count(), 1);

    let fs = ArchiveFs::load(&index, store, VfsOptions::default());
    let x_node = fs.tree().resolve(&recorded(&x)).unwrap();
    let y_node = fs.tree().resolve(&recorded(&y)).unwrap();
    assert_ne!(x_node.inode, y_node.inode);
    assert_eq!(x_node.parent, y_node.parent);

    for inode in [x_node.inode, y_node.inode] {
        let attr = fs.attributes(inode);
        assert_eq!(attr.size, 10);
        let fh = fs.open_file(inode, AccessMode::ReadOnly).unwrap();
        assert_eq!(fs.read(fh, 0, attr.size as usize).unwrap(), blob);
        fs.release(fh).unwrap();
    }
    assert!(fs.handles().is_empty());
}

#[test]
fn later_record_for_same_path_wins() {
    let mut index = Index::new();
    index.push(IndexRecord::new(hash(HASH_X), 100, 10, "/f.txt"));
    index.push(IndexRecord::new(hash(HASH_Y), 200, 6, "/f.txt"));
    let tree = VirtualTree::from_index(&index);
    assert_eq!(tree.stats().replaced, 1);
    let node = tree.resolve("/f.txt").unwrap();
    assert_eq!(node.file().unwrap().content_hash, hash(HASH_Y));
    assert_eq!(tree.root().children().unwrap().len(), 1);
}

fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-c]{1,2}", 1..5).prop_map(|parts| format!("/{}", parts.join("/")))
}

proptest! {
    #[test]
    fn every_node_reaches_the_root(paths in prop::collection::vec(path_strategy(), 0..40)) {
        let mut index = Index::new();
        for (i, path) in paths.iter().enumerate() {
            index.push(IndexRecord::new(hash(HASH_X), i as i64, 1, path.clone()));
        }
        let tree = VirtualTree::from_index(&index);

        prop_assert_eq!(tree.root().inode, ROOT_INODE);
        prop_assert!(tree.root().parent.is_none());

        for node in tree.nodes() {
            let mut seen = HashSet::new();
            let mut current = node;
            while let Some(parent) = current.parent {
                prop_assert!(seen.insert(current.inode), "cycle at inode {}", current.inode);
                let parent_node = tree.get(parent).unwrap();
                prop_assert!(parent_node.is_dir());
                prop_assert!(parent_node.children().unwrap().contains(&current.inode));
                current = parent_node;
            }
            prop_assert_eq!(current.inode, ROOT_INODE);
        }

        for node in tree.nodes() {
            if let Some(children) = node.children() {
                let names: HashSet<&str> = children
                    .iter()
                    .map(|&c| tree.get(c).unwrap().name.as_str())
                    .collect();
                prop_assert_eq!(names.len(), children.len());
            }
        }
    }
}
