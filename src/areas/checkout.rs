//! Checkout engine
//!
//! Materializes the tree reachable from a commit onto the filesystem and
//! rebuilds the index. Unchanged files are detected by comparing the
//! index's recorded stat metadata against the file on disk, so a repeat
//! checkout touches nothing.

use crate::areas::index::Index;
use crate::areas::store::Store;
use crate::areas::workspace::Workspace;
use crate::artifacts::errors::CheckoutError;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::{GitObject, Object};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The blobs of a commit arranged by path
///
/// Internal nodes preserve the entry order of the underlying tree
/// objects; leaves carry everything needed to write one file.
#[derive(Debug, Clone)]
pub enum PathTree {
    Node(Vec<(String, PathTree)>),
    Leaf {
        mode: EntryMode,
        oid: ObjectId,
        blob: Blob,
    },
}

pub struct Checkout<'s> {
    store: &'s Store,
    workspace: Workspace,
    dot_git: Box<Path>,
}

impl<'s> Checkout<'s> {
    pub fn new(store: &'s Store) -> Self {
        Checkout {
            store,
            workspace: Workspace::new(store.root(), store.dot_git()),
            dot_git: store.dot_git().to_path_buf().into_boxed_path(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn schema_violation(oid: &ObjectId, expected: &'static str, object: &GitObject) -> anyhow::Error {
        CheckoutError::SchemaViolation {
            oid: oid.to_string(),
            expected,
            actual: object.object_type().as_str(),
        }
        .into()
    }

    fn read_tree(&self, oid: &ObjectId) -> Result<Tree> {
        let object = self.store.read_exn(oid)?;
        match object {
            GitObject::Tree(tree) => Ok(tree),
            other => Err(Self::schema_violation(oid, "tree", &other)),
        }
    }

    /// Load the blobs reachable from a commit
    ///
    /// Returns the total blob count and the path tree. Every `Dir` entry
    /// must resolve to a tree and every other entry to a blob; anything
    /// else is a schema violation.
    pub fn load_filesystem(&self, commit_oid: &ObjectId) -> Result<(usize, PathTree)> {
        let object = self.store.read_exn(commit_oid)?;
        let commit = match &object {
            GitObject::Commit(commit) => commit,
            other => return Err(Self::schema_violation(commit_oid, "commit", other)),
        };

        let tree = self.read_tree(commit.tree_oid())?;
        self.load_tree(&tree)
    }

    fn load_tree(&self, tree: &Tree) -> Result<(usize, PathTree)> {
        let mut children = Vec::with_capacity(tree.len());
        let mut count = 0;

        for record in tree.entries() {
            // tree names are raw bytes; they must be decodable to become
            // path components on this filesystem
            let name = std::str::from_utf8(&record.name)
                .with_context(|| format!("tree entry name {:?} is not valid UTF-8", record.name))?
                .to_owned();

            if record.mode.is_tree() {
                let subtree = self.read_tree(&record.oid)?;
                let (subcount, node) = self.load_tree(&subtree)?;
                count += subcount;
                children.push((name, node));
            } else {
                let object = self.store.read_exn(&record.oid)?;
                let blob = match object {
                    GitObject::Blob(blob) => blob,
                    other => return Err(Self::schema_violation(&record.oid, "blob", &other)),
                };
                count += 1;
                children.push((
                    name,
                    PathTree::Leaf {
                        mode: record.mode,
                        oid: record.oid.clone(),
                        blob,
                    },
                ));
            }
        }

        Ok((count, PathTree::Node(children)))
    }

    /// Visit every blob left to right, in tree-entry order
    ///
    /// The callback receives the 1-based position and the total count,
    /// the path relative to the root, and the leaf's mode, hash, and
    /// content.
    pub fn iter_blobs<F>(&self, filesystem: &(usize, PathTree), f: &mut F) -> Result<()>
    where
        F: FnMut((usize, usize), &Path, EntryMode, &ObjectId, &Blob) -> Result<()>,
    {
        let (total, root) = filesystem;
        let mut position = 0;
        let mut path = PathBuf::new();
        Self::walk(root, &mut path, &mut position, *total, f)
    }

    fn walk<F>(
        node: &PathTree,
        path: &mut PathBuf,
        position: &mut usize,
        total: usize,
        f: &mut F,
    ) -> Result<()>
    where
        F: FnMut((usize, usize), &Path, EntryMode, &ObjectId, &Blob) -> Result<()>,
    {
        match node {
            PathTree::Node(children) => {
                for (name, child) in children {
                    path.push(name);
                    Self::walk(child, path, position, total, f)?;
                    path.pop();
                }
                Ok(())
            }
            PathTree::Leaf { mode, oid, blob } => {
                *position += 1;
                f((*position, total), path.as_path(), *mode, oid, blob)
            }
        }
    }

    /// Reconcile one blob against the working tree and produce its index
    /// entry
    ///
    /// The file is (re)written when it is missing, its recorded hash
    /// differs, or its recorded stat metadata no longer matches the disk;
    /// otherwise it is left untouched. Failures skip the entry rather
    /// than abort the checkout.
    pub fn entry_of_file(
        &self,
        index: &Index,
        path: &Path,
        mode: EntryMode,
        oid: &ObjectId,
        blob: &Blob,
    ) -> Option<IndexEntry> {
        match self.reconcile_file(index, path, mode, oid, blob) {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "skipping checkout entry");
                None
            }
        }
    }

    fn reconcile_file(
        &self,
        index: &Index,
        path: &Path,
        mode: EntryMode,
        oid: &ObjectId,
        blob: &Blob,
    ) -> Result<IndexEntry> {
        let absolute = self.workspace.root().join(path);
        let exists = if mode.is_symlink() {
            absolute.symlink_metadata().is_ok()
        } else {
            absolute.exists()
        };

        if !exists {
            self.workspace.create_file(path, mode, blob)?;
        } else {
            let name = if mode.is_symlink() {
                path.to_path_buf()
            } else {
                // resolve through any symlinked ancestors before comparing
                let canonical = absolute
                    .canonicalize()
                    .with_context(|| format!("unable to resolve {}", path.display()))?;
                canonical
                    .strip_prefix(self.workspace.root())
                    .with_context(|| format!("{} escapes the work tree", path.display()))?
                    .to_path_buf()
            };

            let on_disk = self.workspace.stat_file(&name)?;
            let unchanged = index.entry_by_path(&name).is_some_and(|entry| {
                entry.oid == *oid && entry.stat_match(&on_disk) && entry.times_match(&on_disk)
            });
            if !unchanged {
                self.workspace.create_file(&name, mode, blob)?;
            }
        }

        let fresh = self.workspace.stat_file(path)?;
        IndexEntry::staged(path.to_path_buf(), oid.clone(), fresh)
    }

    /// Persist an index for the given head commit
    ///
    /// With an index in hand, just serialize it. Without one, load the
    /// commit's blobs, reconcile each against the working tree and the
    /// current index, and write the rebuilt index atomically.
    pub fn write_index(&self, index: Option<Index>, head: &ObjectId) -> Result<()> {
        if let Some(mut index) = index {
            return index.write_updates();
        }

        let mut current = Index::new(&self.dot_git);
        current.rehydrate()?;

        let filesystem = self.load_filesystem(head)?;
        let mut fresh = Index::new(&self.dot_git);
        self.iter_blobs(&filesystem, &mut |_, path, mode, oid, blob| {
            if let Some(entry) = self.entry_of_file(&current, path, mode, oid, blob) {
                fresh.add(entry);
            }
            Ok(())
        })?;

        fresh.write_updates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::FileMode;
    use crate::artifacts::objects::commit::{Author, Commit};
    use crate::artifacts::objects::tree::TreeRecord;
    use bytes::Bytes;
    use chrono::DateTime;

    fn author() -> Author {
        let timestamp = DateTime::parse_from_rfc3339("2024-03-01T12:00:00+00:00").unwrap();
        Author::new("Ada Lovelace".into(), "ada@example.com".into(), timestamp)
    }

    fn write_blob(store: &Store, content: &[u8]) -> ObjectId {
        store
            .write(&GitObject::Blob(Blob::new(Bytes::copy_from_slice(content))))
            .unwrap()
    }

    /// commit -> { a, dir/b(exec) }
    fn sample_commit(store: &Store) -> ObjectId {
        let blob_a = write_blob(store, b"alpha\n");
        let blob_b = write_blob(store, b"#!/bin/sh\n");

        let subtree = store
            .write(&GitObject::Tree(Tree::new(vec![TreeRecord::new(
                EntryMode::File(FileMode::Executable),
                "b".into(),
                blob_b,
            )])))
            .unwrap();
        let root = store
            .write(&GitObject::Tree(Tree::new(vec![
                TreeRecord::new(EntryMode::File(FileMode::Regular), "a".into(), blob_a),
                TreeRecord::new(EntryMode::Directory, "dir".into(), subtree),
            ])))
            .unwrap();

        store
            .write(&GitObject::Commit(Commit::new(
                root,
                vec![],
                author(),
                author(),
                "init\n".into(),
            )))
            .unwrap()
    }

    #[test]
    fn test_load_filesystem_counts_blobs() {
        let dir = assert_fs::TempDir::new().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let commit_oid = sample_commit(&store);

        let checkout = Checkout::new(&store);
        let (count, tree) = checkout.load_filesystem(&commit_oid).unwrap();

        pretty_assertions::assert_eq!(count, 2);
        let PathTree::Node(children) = &tree else {
            panic!("root must be a node")
        };
        pretty_assertions::assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_iter_blobs_order_and_positions() {
        let dir = assert_fs::TempDir::new().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let commit_oid = sample_commit(&store);

        let checkout = Checkout::new(&store);
        let filesystem = checkout.load_filesystem(&commit_oid).unwrap();

        let mut seen = Vec::new();
        checkout
            .iter_blobs(&filesystem, &mut |(i, total), path, _, _, _| {
                seen.push((i, total, path.to_path_buf()));
                Ok(())
            })
            .unwrap();

        pretty_assertions::assert_eq!(
            seen,
            vec![
                (1, 2, PathBuf::from("a")),
                (2, 2, PathBuf::from("dir/b")),
            ]
        );
    }

    #[test]
    fn test_dir_entry_resolving_to_blob_is_schema_violation() {
        let dir = assert_fs::TempDir::new().unwrap();
        let store = Store::new(dir.path()).unwrap();

        let blob = write_blob(&store, b"not a tree\n");
        let root = store
            .write(&GitObject::Tree(Tree::new(vec![TreeRecord::new(
                EntryMode::Directory,
                "dir".into(),
                blob,
            )])))
            .unwrap();
        let commit_oid = store
            .write(&GitObject::Commit(Commit::new(
                root,
                vec![],
                author(),
                author(),
                "broken\n".into(),
            )))
            .unwrap();

        let checkout = Checkout::new(&store);
        let err = checkout.load_filesystem(&commit_oid).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CheckoutError>(),
            Some(CheckoutError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_write_index_materializes_files() {
        let dir = assert_fs::TempDir::new().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let commit_oid = sample_commit(&store);

        let checkout = Checkout::new(&store);
        checkout.write_index(None, &commit_oid).unwrap();

        pretty_assertions::assert_eq!(
            std::fs::read(store.root().join("a")).unwrap(),
            b"alpha\n"
        );
        pretty_assertions::assert_eq!(
            std::fs::read(store.root().join("dir/b")).unwrap(),
            b"#!/bin/sh\n"
        );

        let mut index = Index::new(store.dot_git());
        index.rehydrate().unwrap();
        pretty_assertions::assert_eq!(index.len(), 2);
        pretty_assertions::assert_eq!(
            index.entry_by_path(Path::new("a")).unwrap().stage(),
            0
        );
    }

    #[test]
    fn test_repeat_checkout_leaves_files_untouched() {
        let dir = assert_fs::TempDir::new().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let commit_oid = sample_commit(&store);

        let checkout = Checkout::new(&store);
        checkout.write_index(None, &commit_oid).unwrap();
        let before = std::fs::metadata(store.root().join("a")).unwrap().modified().unwrap();

        checkout.write_index(None, &commit_oid).unwrap();
        let after = std::fs::metadata(store.root().join("a")).unwrap().modified().unwrap();

        pretty_assertions::assert_eq!(before, after);
    }
}
