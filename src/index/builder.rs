//! The parallel index builder.
//!
//! A build pass scans the dataset, dispatches one task per file onto a
//! [`WorkerPool`](crate::pool::WorkerPool), and aggregates per-task counters
//! into a [`BuildResult`]. Because each file becomes exactly one task and
//! paths map 1:1 to doc-ids, at most one upsert per doc-id is ever in
//! flight - the serialization the index contract requires.

use crate::index::scanner::{FileInfo, FileScanner};
use crate::index::store::DocumentStore;
use crate::index::types::BuildResult;
use crate::index::ConcurrentInvertedIndex;
use crate::pool::WorkerPool;
use crate::utils::tokenizer::Tokenizer;
use ahash::AHashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Default)]
struct Counters {
    indexed: AtomicUsize,
    skipped: AtomicUsize,
    errors: AtomicUsize,
}

/// Orchestrates build passes over a shared index, store, and tokenizer.
/// The builder never owns them: it is constructed per service (or per
/// bench iteration) around `Arc` handles that outlive every build.
pub struct IndexBuilder {
    index: Arc<ConcurrentInvertedIndex>,
    store: Arc<DocumentStore>,
    tokenizer: Arc<Tokenizer>,
    scanner: FileScanner,
}

impl IndexBuilder {
    pub fn new(
        index: Arc<ConcurrentInvertedIndex>,
        store: Arc<DocumentStore>,
        tokenizer: Arc<Tokenizer>,
    ) -> Self {
        Self {
            index,
            store,
            tokenizer,
            scanner: FileScanner::default(),
        }
    }

    /// Full rebuild: every scanned file is (re)indexed.
    pub fn build_from_directory(&self, root: &Path, threads: usize) -> BuildResult {
        let files = self.scanner.scan(root);
        self.index_files(files, threads, false)
    }

    /// Incremental pass: files whose mtime is not strictly newer than the
    /// stored one are skipped. Files that disappeared from the dataset keep
    /// their stale postings until the process restarts.
    pub fn update_from_directory(&self, root: &Path, threads: usize) -> BuildResult {
        let files = self.scanner.scan(root);
        self.index_files(files, threads, true)
    }

    /// Index an explicit file list on `threads` workers.
    pub fn index_files(&self, files: Vec<FileInfo>, threads: usize, incremental: bool) -> BuildResult {
        let scanned_files = files.len();
        let started = Instant::now();

        let mut pool = WorkerPool::new(threads.max(1));
        let counters = Arc::new(Counters::default());

        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            let index = Arc::clone(&self.index);
            let store = Arc::clone(&self.store);
            let tokenizer = Arc::clone(&self.tokenizer);
            let counters_for_closure = Arc::clone(&counters);

            match pool.submit(move || {
                index_one_file(&index, &store, &tokenizer, &file, incremental, &counters_for_closure);
            }) {
                Ok(handle) => handles.push(handle),
                // The builder never submits after shutdown, so this only
                // fires if the process is tearing down underneath us.
                Err(_) => {
                    counters.errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        for handle in handles {
            if handle.wait().is_err() {
                counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        pool.shutdown();

        let result = BuildResult {
            scanned_files,
            indexed_files: counters.indexed.load(Ordering::Relaxed),
            skipped_files: counters.skipped.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            scanned = result.scanned_files,
            indexed = result.indexed_files,
            skipped = result.skipped_files,
            errors = result.errors,
            elapsed_ms = result.elapsed_ms,
            incremental,
            "index build finished"
        );

        result
    }
}

fn index_one_file(
    index: &ConcurrentInvertedIndex,
    store: &DocumentStore,
    tokenizer: &Tokenizer,
    file: &FileInfo,
    incremental: bool,
    counters: &Counters,
) {
    if incremental && !store.needs_indexing(&file.path, file.mtime) {
        counters.skipped.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let bytes = match std::fs::read(&file.path) {
        Ok(b) => b,
        Err(err) => {
            debug!(path = %file.path.display(), %err, "failed to read file");
            counters.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let tokens = tokenizer.tokenize(&bytes);
    let tf = term_frequencies(tokens);

    let (doc_id, _created) = store.get_or_create(&file.path, file.mtime);
    index.upsert_document(doc_id, tf);
    store.update_mtime(&file.path, file.mtime);

    counters.indexed.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn term_frequencies(tokens: Vec<String>) -> AHashMap<String, i32> {
    let mut tf = AHashMap::with_capacity(tokens.len() / 2 + 16);
    for token in tokens {
        *tf.entry(token).or_insert(0) += 1;
    }
    tf
}
