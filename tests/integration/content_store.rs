use super::support::Fixture;
use cairn::indexer::{index_directories, IndexerConfig};
use cairn::store::writer::materialize;
use cairn::store::{ContentStore, StoreWriter};
use std::fs;
use walkdir::WalkDir;

fn blob_count(store: &std::path::Path) -> usize {
    WalkDir::new(store)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

#[test]
fn duplicate_content_is_stored_once() {
    let fx = Fixture::new();
    fx.write("a/x.txt", "hello\n");
    fx.write("a/y.txt", "hello\n");
    fx.index();

    let writer = StoreWriter::new(ContentStore::new(fx.store()));
    let report = writer.materialize(&fx.load_index()).unwrap();
    assert_eq!(report.hashes, 1);
    assert_eq!(report.copied, 1);
    assert!(report.is_complete());
    assert_eq!(blob_count(&fx.store()), 1);

    let blob = fx
        .store()
        .join("f5/72/f572d396fae9206628714fb2ce00f72e94f2258f");
    assert_eq!(fs::read(blob).unwrap(), b"hello\n");
}

#[test]
fn rerun_copies_nothing() {
    let fx = Fixture::new();
    fx.write("one.txt", "1");
    fx.write("two.txt", "2");
    fx.index();
    let index = fx.load_index();
    let writer = StoreWriter::new(ContentStore::new(fx.store()));

    writer.materialize(&index).unwrap();
    let again = writer.materialize(&index).unwrap();
    assert_eq!(again.copied, 0);
    assert_eq!(again.already_stored, 2);
}

#[test]
fn changed_source_is_not_copied() {
    let fx = Fixture::new();
    let x = fx.write("x.txt", "original");
    fx.index();
    fs::write(&x, "rewritten, longer contents").unwrap();

    let writer = StoreWriter::new(ContentStore::new(fx.store()));
    let report = writer.materialize(&fx.load_index()).unwrap();
    assert_eq!(report.copied, 0);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(blob_count(&fx.store()), 0);
}

#[test]
fn blob_kept_after_source_deleted() {
    let fx = Fixture::new();
    let x = fx.write("x.txt", "keep me");
    fx.index();
    let index = fx.load_index();
    let writer = StoreWriter::new(ContentStore::new(fx.store()));
    writer.materialize(&index).unwrap();

    fs::remove_file(&x).unwrap();
    let report = writer.materialize(&index).unwrap();
    assert_eq!(report.already_stored, 1);
    assert!(report.is_complete());
}

#[test]
fn records_from_several_indexes_are_merged() {
    let fx = Fixture::new();
    fx.write("left/a.txt", "shared");
    fx.write("left/b.txt", "left only");
    fx.write("right/c.txt", "shared");
    fx.write("right/d.txt", "right only");
    let left_index = fx.temp.path().join("left_index");
    let right_index = fx.temp.path().join("right_index");
    index_directories(&[fx.source().join("left")], &left_index, IndexerConfig::default()).unwrap();
    index_directories(&[fx.source().join("right")], &right_index, IndexerConfig::default())
        .unwrap();

    let report = materialize(&[&left_index, &right_index], &fx.store()).unwrap();
    assert_eq!(report.hashes, 3);
    assert_eq!(report.copied, 3);
    assert!(report.is_complete());
    assert_eq!(blob_count(&fx.store()), 3);
}
