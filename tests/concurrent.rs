//! Concurrency tests: readers racing a writer, and a parallel build
//! validated against the document store.

use ahash::AHashMap;
use memidx::index::{ConcurrentInvertedIndex, DocumentStore, IndexBuilder};
use memidx::utils::tokenizer::Tokenizer;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[test]
fn searches_never_see_duplicate_doc_ids_during_upserts() {
    let index = Arc::new(ConcurrentInvertedIndex::new());
    let stop = Arc::new(AtomicBool::new(false));

    // One writer continuously replacing documents that all share a term.
    let writer = {
        let index = Arc::clone(&index);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let mut round = 1i32;
            while !stop.load(Ordering::Relaxed) {
                for doc_id in 1..=32 {
                    let mut tf = AHashMap::new();
                    tf.insert("shared".to_string(), (round % 7) + 1);
                    tf.insert(format!("round{round}"), 1);
                    index.upsert_document(doc_id, tf);
                }
                round += 1;
            }
        })
    };

    let searchers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let query = vec!["shared".to_string()];
                let mut iterations = 0u32;
                while !stop.load(Ordering::Relaxed) {
                    let results = index.search(&query, 0);
                    let mut seen = HashSet::new();
                    for r in &results {
                        assert!(seen.insert(r.doc_id), "duplicate doc {} in one result list", r.doc_id);
                    }
                    iterations += 1;
                }
                iterations
            })
        })
        .collect();

    std::thread::sleep(std::time::Duration::from_millis(300));
    stop.store(true, Ordering::Relaxed);

    writer.join().unwrap();
    for searcher in searchers {
        assert!(searcher.join().unwrap() > 0);
    }
}

#[test]
fn parallel_build_indexes_every_file_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let file_count = 200;
    for i in 0..file_count {
        fs::write(
            dir.path().join(format!("doc{i:03}.txt")),
            format!("corpus file number {i} with some shared vocabulary"),
        )
        .unwrap();
    }

    let index = Arc::new(ConcurrentInvertedIndex::new());
    let store = Arc::new(DocumentStore::new());
    let builder = IndexBuilder::new(
        Arc::clone(&index),
        Arc::clone(&store),
        Arc::new(Tokenizer::default()),
    );

    let result = builder.build_from_directory(dir.path(), 8);
    assert_eq!(result.scanned_files, file_count);
    assert_eq!(result.indexed_files, file_count);
    assert_eq!(result.errors, 0);

    let stats = index.stats();
    assert_eq!(stats.documents, result.indexed_files);
    assert_eq!(store.len(), file_count);

    // Every document scores exactly once for a term all files share.
    let hits = index.search(&["corpus".to_string()], 0);
    assert_eq!(hits.len(), file_count);
    let ids: HashSet<_> = hits.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids.len(), file_count);
}

#[test]
fn concurrent_builds_of_disjoint_directories_coexist() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    for i in 0..40 {
        fs::write(dir_a.path().join(format!("a{i}.txt")), format!("alpha {i}")).unwrap();
        fs::write(dir_b.path().join(format!("b{i}.txt")), format!("beta {i}")).unwrap();
    }

    let index = Arc::new(ConcurrentInvertedIndex::new());
    let store = Arc::new(DocumentStore::new());
    let tokenizer = Arc::new(Tokenizer::default());

    // Two builders over one shared index, each owning a disjoint file set,
    // so the one-upsert-per-doc contract still holds.
    let handles: Vec<_> = [dir_a.path().to_path_buf(), dir_b.path().to_path_buf()]
        .into_iter()
        .map(|root| {
            let builder = IndexBuilder::new(
                Arc::clone(&index),
                Arc::clone(&store),
                Arc::clone(&tokenizer),
            );
            std::thread::spawn(move || builder.build_from_directory(&root, 4))
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert_eq!(result.indexed_files, 40);
        assert_eq!(result.errors, 0);
    }

    let stats = index.stats();
    assert_eq!(stats.documents, 80);
    assert_eq!(index.search(&["alpha".to_string()], 0).len(), 40);
    assert_eq!(index.search(&["beta".to_string()], 0).len(), 40);
}
