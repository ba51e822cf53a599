use serde::{Deserialize, Serialize};

/// Unique identifier for a document. Assigned monotonically from 1 at first
/// sight of a path and stable for the life of the process.
pub type DocId = i32;

/// One entry in a term's posting list: the term appeared `freq` times in
/// document `doc_id`. `freq` is always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub freq: i32,
}

/// A term together with its full posting list, as returned by
/// [`ConcurrentInvertedIndex::snapshot`](crate::index::ConcurrentInvertedIndex::snapshot).
/// Posting order within a term is not contractual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPostings {
    pub term: String,
    pub postings: Vec<Posting>,
}

/// A ranked search hit. Score is the sum of per-term frequencies across the
/// query terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f64,
}

/// Aggregate index counters. Collected shard by shard, so not a globally
/// consistent snapshot while writers are active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Documents tracked in the forward index.
    pub documents: usize,
    /// Unique terms across all shards.
    pub terms: usize,
    /// Total postings across all terms.
    pub postings: usize,
}

/// Outcome of one build pass, aggregated across worker tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    /// Files yielded by the scanner.
    pub scanned_files: usize,
    /// Files read, tokenized, and upserted.
    pub indexed_files: usize,
    /// Files skipped by the incremental mtime check.
    pub skipped_files: usize,
    /// Files that failed to read or whose task failed.
    pub errors: usize,
    /// Wall clock from task dispatch through task drain.
    pub elapsed_ms: u64,
}
