use cairn::index::Index;
use cairn::indexer::{index_directories, IndexReport, IndexerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch area with a source tree, an index path and a store root
pub struct Fixture {
    pub temp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn source(&self) -> PathBuf {
        self.temp.path().join("source")
    }

    pub fn index_path(&self) -> PathBuf {
        self.temp.path().join("file_index")
    }

    pub fn store(&self) -> PathBuf {
        self.temp.path().join("store")
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.source().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn index(&self) -> IndexReport {
        index_directories(&[self.source()], &self.index_path(), IndexerConfig::default()).unwrap()
    }

    pub fn load_index(&self) -> Index {
        Index::load(&self.index_path()).unwrap()
    }
}

/// Canonical string form of a path as the indexer records it
pub fn recorded(path: &Path) -> String {
    path.canonicalize().unwrap().to_str().unwrap().to_string()
}
