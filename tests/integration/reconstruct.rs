use super::support::{recorded, Fixture};
use cairn::indexer::{index_directories, IndexerConfig};
use cairn::reconstruct::{reconstruct, PathFilter, Reconstructor, Translations};
use cairn::store::writer::materialize;
use cairn::store::{ContentStore, StoreWriter};
use std::fs;
use std::path::{Component, Path, PathBuf};

fn prepared() -> Fixture {
    let fx = Fixture::new();
    fx.write("docs/a.txt", "alpha");
    fx.write("docs/b.jpeg", "bravo");
    fx.write("music/c.mp3", "charlie");
    fx.index();
    StoreWriter::new(ContentStore::new(fx.store()))
        .materialize(&fx.load_index())
        .unwrap();
    fx
}

/// Where an absolute recorded path lands under `dest`
fn rooted(dest: &Path, recorded: &str) -> PathBuf {
    let mut out = dest.to_path_buf();
    for c in Path::new(recorded).components() {
        if let Component::Normal(part) = c {
            out.push(part);
        }
    }
    out
}

#[test]
fn links_resolve_to_original_content() {
    let fx = prepared();
    let dest = fx.temp.path().join("restore");
    let report = Reconstructor::new(ContentStore::new(fx.store()), &dest)
        .reconstruct(&fx.load_index());
    assert_eq!(report.links_created, 3);
    assert_eq!(report.errors, 0);

    let a = rooted(&dest, &recorded(&fx.source().join("docs/a.txt")));
    assert!(fs::symlink_metadata(&a).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&a).unwrap(), "alpha");
}

#[test]
fn second_run_creates_no_links() {
    let fx = prepared();
    let dest = fx.temp.path().join("restore");
    let reconstructor = Reconstructor::new(ContentStore::new(fx.store()), &dest);
    reconstructor.reconstruct(&fx.load_index());
    let again = reconstructor.reconstruct(&fx.load_index());
    assert_eq!(again.links_created, 0);
    assert_eq!(again.skipped_existing, 3);
}

#[test]
fn filter_and_translations_shape_the_tree() {
    let fx = prepared();
    let dest = fx.temp.path().join("restore");
    let source = recorded(&fx.source());
    let filter = PathFilter::new(&[format!("{}/docs/*", source)]).unwrap();
    let translations = Translations::from_pairs(&[
        (format!("^{}", regex::escape(&source)), "/photos".to_string()),
        ("\\.jpeg$".to_string(), ".jpg".to_string()),
    ])
    .unwrap();

    let report = Reconstructor::new(ContentStore::new(fx.store()), &dest)
        .with_filter(filter)
        .with_translations(translations)
        .reconstruct(&fx.load_index());
    assert_eq!(report.filtered_out, 1);
    assert_eq!(report.links_created, 2);
    assert_eq!(
        fs::read_to_string(dest.join("photos/docs/b.jpg")).unwrap(),
        "bravo"
    );
    assert!(dest.join("photos/docs/a.txt").exists());
    assert!(!dest.join("photos/music").exists());
}

#[test]
fn several_indexes_rebuild_one_tree() {
    let fx = Fixture::new();
    let a = fx.write("left/a.txt", "alpha");
    let b = fx.write("right/b.txt", "bravo");
    let left_index = fx.temp.path().join("left_index");
    let right_index = fx.temp.path().join("right_index");
    index_directories(&[fx.source().join("left")], &left_index, IndexerConfig::default()).unwrap();
    index_directories(&[fx.source().join("right")], &right_index, IndexerConfig::default())
        .unwrap();
    let indexes = [left_index, right_index];
    materialize(&indexes, &fx.store()).unwrap();

    let dest = fx.temp.path().join("restore");
    let translations = Translations::from_pairs(&[("\\.txt$", ".md")]).unwrap();
    let report = reconstruct(
        &indexes,
        &fx.store(),
        &dest,
        PathFilter::default(),
        translations,
    )
    .unwrap();
    assert_eq!(report.records_considered, 2);
    assert_eq!(report.links_created, 2);

    let a_link = rooted(&dest, &recorded(&a).replace(".txt", ".md"));
    let b_link = rooted(&dest, &recorded(&b).replace(".txt", ".md"));
    assert_eq!(fs::read_to_string(a_link).unwrap(), "alpha");
    assert_eq!(fs::read_to_string(b_link).unwrap(), "bravo");
}
