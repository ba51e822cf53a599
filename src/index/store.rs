//! Document catalog: paths to stable doc-ids, with last-indexed mtimes.

use crate::index::types::DocId;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::SystemTime;

/// Catalog entry for one document.
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    pub doc_id: DocId,
    pub path: PathBuf,
    pub mtime: SystemTime,
}

#[derive(Default)]
struct StoreInner {
    by_path: AHashMap<PathBuf, DocumentMeta>,
    by_id: AHashMap<DocId, PathBuf>,
}

/// Thread-safe bidirectional map between file paths and doc-ids.
///
/// A path maps to at most one doc-id for the life of the process; ids are
/// never reused. The hot path for builders is `needs_indexing` followed by
/// `get_or_create`, which uses a double-checked read-then-write discipline so
/// racing workers on the same path agree on a single id.
pub struct DocumentStore {
    inner: RwLock<StoreInner>,
    next_id: AtomicI32,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            next_id: AtomicI32::new(1),
        }
    }

    /// Return the existing doc-id for `path`, or allocate the next id and
    /// record `(path, mtime)`. The second element is true when a new entry
    /// was created; concurrent callers for the same path observe at most one
    /// `true`.
    pub fn get_or_create(&self, path: &Path, mtime: SystemTime) -> (DocId, bool) {
        {
            let inner = self.inner.read();
            if let Some(meta) = inner.by_path.get(path) {
                return (meta.doc_id, false);
            }
        }

        let mut inner = self.inner.write();
        if let Some(meta) = inner.by_path.get(path) {
            return (meta.doc_id, false);
        }

        // Allocate only under the write lock so a lost race never burns an id.
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        inner.by_path.insert(
            path.to_path_buf(),
            DocumentMeta {
                doc_id: id,
                path: path.to_path_buf(),
                mtime,
            },
        );
        inner.by_id.insert(id, path.to_path_buf());

        (id, true)
    }

    /// True if `path` is unknown or `mtime` is strictly newer than the
    /// stored one.
    pub fn needs_indexing(&self, path: &Path, mtime: SystemTime) -> bool {
        let inner = self.inner.read();
        match inner.by_path.get(path) {
            Some(meta) => mtime > meta.mtime,
            None => true,
        }
    }

    /// Record the mtime of a successful upsert. No-op for unknown paths.
    pub fn update_mtime(&self, path: &Path, mtime: SystemTime) {
        let mut inner = self.inner.write();
        if let Some(meta) = inner.by_path.get_mut(path) {
            meta.mtime = mtime;
        }
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.inner.read().by_path.contains_key(path)
    }

    pub fn path_for(&self, doc_id: DocId) -> Option<PathBuf> {
        self.inner.read().by_id.get(&doc_id).cloned()
    }

    pub fn doc_id_for(&self, path: &Path) -> Option<DocId> {
        self.inner.read().by_path.get(path).map(|m| m.doc_id)
    }

    /// Snapshot of all catalog entries, in no particular order.
    pub fn list_all(&self) -> Vec<DocumentMeta> {
        self.inner.read().by_path.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn ids_start_at_one_and_are_stable() {
        let store = DocumentStore::new();
        let (a, created_a) = store.get_or_create(Path::new("/d/a.txt"), t(10));
        let (b, created_b) = store.get_or_create(Path::new("/d/b.txt"), t(10));
        assert_eq!((a, created_a), (1, true));
        assert_eq!((b, created_b), (2, true));

        let (a2, created) = store.get_or_create(Path::new("/d/a.txt"), t(99));
        assert_eq!((a2, created), (1, false));
        // A repeat get_or_create must not touch the stored mtime.
        assert!(!store.needs_indexing(Path::new("/d/a.txt"), t(10)));
    }

    #[test]
    fn needs_indexing_is_strict() {
        let store = DocumentStore::new();
        assert!(store.needs_indexing(Path::new("/d/a.txt"), t(5)));

        store.get_or_create(Path::new("/d/a.txt"), t(5));
        assert!(!store.needs_indexing(Path::new("/d/a.txt"), t(5)));
        assert!(!store.needs_indexing(Path::new("/d/a.txt"), t(4)));
        assert!(store.needs_indexing(Path::new("/d/a.txt"), t(6)));
    }

    #[test]
    fn update_mtime_ignores_unknown_paths() {
        let store = DocumentStore::new();
        store.update_mtime(Path::new("/nope"), t(1));
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);

        store.get_or_create(Path::new("/d/a.txt"), t(1));
        store.update_mtime(Path::new("/d/a.txt"), t(9));
        assert!(!store.needs_indexing(Path::new("/d/a.txt"), t(9)));
    }

    #[test]
    fn resolves_both_directions() {
        let store = DocumentStore::new();
        assert!(store.is_empty());

        let (id, _) = store.get_or_create(Path::new("/d/a.txt"), t(1));
        assert!(!store.is_empty());
        assert!(store.contains_path(Path::new("/d/a.txt")));
        assert!(!store.contains_path(Path::new("/other")));
        assert_eq!(store.path_for(id), Some(PathBuf::from("/d/a.txt")));
        assert_eq!(store.doc_id_for(Path::new("/d/a.txt")), Some(id));
        assert_eq!(store.path_for(999), None);
        assert_eq!(store.doc_id_for(Path::new("/other")), None);
    }

    #[test]
    fn concurrent_get_or_create_agrees_on_one_id() {
        use std::sync::Arc;

        let store = Arc::new(DocumentStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.get_or_create(Path::new("/shared.txt"), t(1))
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ids: Vec<_> = results.iter().map(|(id, _)| *id).collect();
        assert!(ids.iter().all(|&id| id == ids[0]));
        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);
        assert_eq!(store.len(), 1);
    }
}
