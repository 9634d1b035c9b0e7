use super::support::{recorded, Fixture};
use cairn::index::Index;
use cairn::indexer::{index_directories, IndexerConfig};
use filetime::{set_file_mtime, FileTime};
use std::collections::BTreeSet;
use std::fs;

fn record_set(index: &Index) -> BTreeSet<(String, String, i64, u64)> {
    index
        .iter()
        .map(|r| (r.path.clone(), r.content_hash.to_string(), r.mtime, r.size))
        .collect()
}

#[test]
fn second_run_over_unchanged_tree_hashes_nothing() {
    let fx = Fixture::new();
    fx.write("a/x.txt", "hello\n");
    fx.write("a/y.txt", "hello\n");
    fx.write("b/z.bin", "other");

    let first = fx.index();
    assert_eq!(first.stats.files_hashed, 3);
    assert_eq!(first.records_added, 3);
    assert!(first.commit.backup_path.is_none());
    let after_first = record_set(&fx.load_index());

    let second = fx.index();
    assert_eq!(second.stats.files_hashed, 0);
    assert_eq!(second.stats.files_skipped, 3);
    assert_eq!(second.records_added, 0);
    assert_eq!(second.records_loaded, 3);
    assert!(second.commit.backup_path.as_ref().unwrap().exists());
    assert_eq!(record_set(&fx.load_index()), after_first);
}

#[test]
fn identical_content_shares_a_hash() {
    let fx = Fixture::new();
    let x = fx.write("a/x.txt", "hello\n");
    let y = fx.write("a/y.txt", "hello\n");
    fx.index();

    let index = fx.load_index();
    let hash_of = |p: &str| {
        index
            .iter()
            .find(|r| r.path == p)
            .map(|r| r.content_hash.to_string())
            .unwrap()
    };
    assert_eq!(hash_of(&recorded(&x)), "f572d396fae9206628714fb2ce00f72e94f2258f");
    assert_eq!(hash_of(&recorded(&x)), hash_of(&recorded(&y)));
}

#[test]
fn modified_file_gets_a_new_record() {
    let fx = Fixture::new();
    let x = fx.write("x.txt", "one");
    set_file_mtime(&x, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    fx.index();

    fs::write(&x, "two").unwrap();
    set_file_mtime(&x, FileTime::from_unix_time(2_000_000, 0)).unwrap();
    let report = fx.index();
    assert_eq!(report.stats.files_hashed, 1);

    let index = fx.load_index();
    let mtimes: Vec<i64> = index.iter().map(|r| r.mtime).collect();
    assert_eq!(mtimes, vec![1_000_000, 2_000_000]);
}

#[test]
fn missing_directory_is_counted_not_fatal() {
    let fx = Fixture::new();
    fx.write("x.txt", "data");
    let report = index_directories(
        &[fx.source(), fx.temp.path().join("absent")],
        &fx.index_path(),
        IndexerConfig::default(),
    )
    .unwrap();
    assert_eq!(report.stats.dirs_errored, 1);
    assert_eq!(report.records_added, 1);
}

#[test]
fn paths_with_commas_survive_the_index() {
    let fx = Fixture::new();
    let odd = fx.write("a, b/\"quoted\".txt", "x");
    fx.index();
    let index = fx.load_index();
    assert_eq!(index.len(), 1);
    assert_eq!(index.records()[0].path, recorded(&odd));
}

#[cfg(unix)]
fn permissions_are_enforced() -> bool {
    !rustix::process::geteuid().is_root()
}

#[cfg(unix)]
#[test]
fn unreadable_directory_is_skipped_and_siblings_indexed() {
    use std::os::unix::fs::PermissionsExt;
    if !permissions_are_enforced() {
        return;
    }
    let fx = Fixture::new();
    fx.write("open/a.txt", "a");
    fx.write("locked/b.txt", "b");
    fx.write("z.txt", "z");
    let locked = fx.source().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let report = fx.index();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.stats.dirs_errored, 1);
    assert_eq!(report.records_added, 2);
    let paths: Vec<String> = fx.load_index().iter().map(|r| r.path.clone()).collect();
    assert!(paths.iter().any(|p| p.ends_with("open/a.txt")));
    assert!(paths.iter().any(|p| p.ends_with("z.txt")));
    assert!(!paths.iter().any(|p| p.ends_with("b.txt")));
}

#[cfg(unix)]
#[test]
fn unreadable_file_is_counted_and_run_continues() {
    use std::os::unix::fs::PermissionsExt;
    if !permissions_are_enforced() {
        return;
    }
    let fx = Fixture::new();
    let secret = fx.write("secret.txt", "hidden");
    fx.write("visible.txt", "shown");
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();

    let report = fx.index();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(report.stats.files_errored, 1);
    assert_eq!(report.stats.files_hashed, 1);
    assert_eq!(report.records_added, 1);
    assert_eq!(fx.load_index().len(), 1);
}
