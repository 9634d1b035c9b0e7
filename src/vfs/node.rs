//! Virtual tree nodes and the inode arena.
//!
//! Nodes live in a flat arena indexed by `inode - 1`. A node holds its parent's
//! inode (non-owning) and a directory holds the ordered inodes of its children.
//! The tree is built once from an index and never changes afterwards.

use crate::index::{Index, IndexRecord};
use crate::types::{ContentHash, Inode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Inode of the root directory
pub const ROOT_INODE: Inode = 1;

/// File node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    pub content_hash: ContentHash,
    pub size: u64,
    pub mtime: i64,
}

/// Node payload
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Synthesized from path components; children in load order
    Directory { children: Vec<Inode> },
    /// Backed by one index record
    File(FileData),
}

/// Virtual tree node
#[derive(Debug, Clone)]
pub struct Node {
    pub inode: Inode,
    pub name: String,
    /// `None` only for the root
    pub parent: Option<Inode>,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn children(&self) -> Option<&[Inode]> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File(_) => None,
        }
    }

    pub fn file(&self) -> Option<&FileData> {
        match &self.kind {
            NodeKind::File(data) => Some(data),
            NodeKind::Directory { .. } => None,
        }
    }
}

/// Counters from building a tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub records: u64,
    pub files: u64,
    pub directories: u64,
    /// Records that superseded an earlier record for the same path
    pub replaced: u64,
    /// Records skipped because a file and a directory claim the same path
    pub conflicts: u64,
}

/// Immutable inode arena built from an index
#[derive(Debug, Clone)]
pub struct VirtualTree {
    nodes: Vec<Node>,
    dirs: HashMap<PathBuf, Inode>,
    files: HashMap<PathBuf, Inode>,
    stats: LoadStats,
}

impl Default for VirtualTree {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTree {
    /// Empty tree holding only the root directory
    pub fn new() -> Self {
        let root = Node {
            inode: ROOT_INODE,
            name: String::new(),
            parent: None,
            kind: NodeKind::Directory {
                children: Vec::new(),
            },
        };
        let mut dirs = HashMap::new();
        dirs.insert(PathBuf::new(), ROOT_INODE);
        Self {
            nodes: vec![root],
            dirs,
            files: HashMap::new(),
            stats: LoadStats {
                directories: 1,
                ..LoadStats::default()
            },
        }
    }

    /// Build the tree from every record of `index`, in order
    pub fn from_index(index: &Index) -> Self {
        let mut tree = Self::new();
        for record in index {
            tree.insert_record(record);
        }
        debug!(
            nodes = tree.len(),
            files = tree.stats.files,
            conflicts = tree.stats.conflicts,
            "Virtual tree loaded"
        );
        tree
    }

    /// Attach a record as a file node, creating parent directories as needed.
    ///
    /// Returns the file's inode, or `None` if the record was skipped.
    pub fn insert_record(&mut self, record: &IndexRecord) -> Option<Inode> {
        self.stats.records += 1;

        let Some(parts) = normalized_parts(&record.path) else {
            warn!(path = %record.path, "Unusable path in index, skipping");
            self.stats.conflicts += 1;
            return None;
        };
        let (name, dir_parts) = parts.split_last()?;
        let full: PathBuf = parts.iter().collect();

        if self.dirs.contains_key(&full) {
            warn!(path = %record.path, "File path is already a directory, skipping");
            self.stats.conflicts += 1;
            return None;
        }

        let data = FileData {
            content_hash: record.content_hash.clone(),
            size: record.size,
            mtime: record.mtime,
        };

        if let Some(&inode) = self.files.get(&full) {
            if let Some(node) = self.node_mut(inode) {
                node.kind = NodeKind::File(data);
            }
            self.stats.replaced += 1;
            return Some(inode);
        }

        let Some(parent) = self.ensure_dir(dir_parts) else {
            warn!(path = %record.path, "Parent path is a file, skipping");
            self.stats.conflicts += 1;
            return None;
        };
        let inode = self.push_node(parent, name.clone(), NodeKind::File(data));
        self.files.insert(full, inode);
        self.stats.files += 1;
        Some(inode)
    }

    // Walk `parts` from the root, creating missing directories; None if a file is in the way.
    fn ensure_dir(&mut self, parts: &[String]) -> Option<Inode> {
        let mut current = ROOT_INODE;
        let mut path = PathBuf::new();
        for part in parts {
            path.push(part);
            if let Some(&inode) = self.dirs.get(&path) {
                current = inode;
                continue;
            }
            if self.files.contains_key(&path) {
                return None;
            }
            let inode = self.push_node(
                current,
                part.clone(),
                NodeKind::Directory {
                    children: Vec::new(),
                },
            );
            self.dirs.insert(path.clone(), inode);
            self.stats.directories += 1;
            current = inode;
        }
        Some(current)
    }

    fn push_node(&mut self, parent: Inode, name: String, kind: NodeKind) -> Inode {
        let inode = self.nodes.len() as Inode + 1;
        self.nodes.push(Node {
            inode,
            name,
            parent: Some(parent),
            kind,
        });
        if let Some(NodeKind::Directory { children }) = self.node_mut(parent).map(|n| &mut n.kind) {
            children.push(inode);
        }
        inode
    }

    fn node_mut(&mut self, inode: Inode) -> Option<&mut Node> {
        let idx = usize::try_from(inode).ok()?.checked_sub(1)?;
        self.nodes.get_mut(idx)
    }

    pub fn get(&self, inode: Inode) -> Option<&Node> {
        let idx = usize::try_from(inode).ok()?.checked_sub(1)?;
        self.nodes.get(idx)
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Linear scan of `parent`'s children for `name`
    pub fn child_by_name(&self, parent: Inode, name: &str) -> Option<&Node> {
        self.get(parent)?
            .children()?
            .iter()
            .filter_map(|&child| self.get(child))
            .find(|node| node.name == name)
    }

    /// Resolve an absolute or relative path to a node
    pub fn resolve(&self, path: &str) -> Option<&Node> {
        let parts = normalized_parts(path).unwrap_or_default();
        let mut current = self.root();
        for part in &parts {
            current = self.child_by_name(current.inode, part)?;
        }
        Some(current)
    }

    /// Reassemble the path of a node from its parent chain
    pub fn path_of(&self, inode: Inode) -> Option<PathBuf> {
        let mut names = Vec::new();
        let mut current = self.get(inode)?;
        while let Some(parent) = current.parent {
            names.push(current.name.as_str());
            current = self.get(parent)?;
        }
        let mut path = PathBuf::from("/");
        path.extend(names.iter().rev());
        Some(path)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }
}

// Path components below the root; None for paths with `..` or no file name.
fn normalized_parts(path: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts)
}
