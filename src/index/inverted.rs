//! The concurrent inverted index.
//!
//! Term postings are partitioned across a fixed number of shards, each
//! behind its own reader/writer lock, so builder workers writing many terms
//! across many documents contend per shard instead of on one global lock.
//! A forward index (doc-id to its exact posting set) backs clean replacement
//! on upsert and removal.
//!
//! Lock ordering rule: never hold a shard lock while acquiring another shard
//! lock or the forward lock. The forward lock may be taken before any shard
//! lock, never while one is held. Every method here copies what it needs out
//! of one lock before taking the next.

use crate::index::types::{DocId, IndexStats, Posting, SearchResult, TermPostings};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::cmp::Ordering;

const DEFAULT_SHARDS: usize = 64;

#[derive(Default)]
struct Shard {
    map: RwLock<AHashMap<String, Vec<Posting>>>,
}

/// Sharded term -> postings map with a forward-index companion.
///
/// All operations take `&self`; sharing happens through `Arc`. Concurrent
/// upserts for *different* doc-ids are safe. Two in-flight upserts for the
/// *same* doc-id are not serialized here and may interleave - callers must
/// keep at most one upsert per doc-id in flight (the builder does, by
/// issuing one task per file).
pub struct ConcurrentInvertedIndex {
    shards: Vec<Shard>,
    forward: RwLock<AHashMap<DocId, Vec<(String, i32)>>>,
    hasher: ahash::RandomState,
}

impl ConcurrentInvertedIndex {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Shard::default()).collect(),
            forward: RwLock::new(AHashMap::new()),
            hasher: ahash::RandomState::new(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, term: &str) -> usize {
        (self.hasher.hash_one(term) % self.shards.len() as u64) as usize
    }

    fn forward_copy(&self, doc_id: DocId) -> Vec<(String, i32)> {
        self.forward.read().get(&doc_id).cloned().unwrap_or_default()
    }

    /// Strip every posting of `doc_id` named by `terms`, one shard at a time.
    fn remove_postings(&self, doc_id: DocId, terms: &[(String, i32)]) {
        let mut by_shard: AHashMap<usize, Vec<&str>> = AHashMap::new();
        for (term, _) in terms {
            by_shard.entry(self.shard_for(term)).or_default().push(term);
        }

        for (sid, shard_terms) in by_shard {
            let mut map = self.shards[sid].map.write();
            for term in shard_terms {
                let Some(postings) = map.get_mut(term) else {
                    continue;
                };
                postings.retain(|p| p.doc_id != doc_id);
                if postings.is_empty() {
                    map.remove(term);
                }
            }
        }
    }

    /// Replace all postings for `doc_id` with the given term frequencies.
    /// Entries with `freq <= 0` are dropped; an effectively empty map is
    /// equivalent to [`remove_document`](Self::remove_document).
    ///
    /// A concurrent reader can observe the document partially applied (old
    /// postings gone, new ones not all in) - acceptable, since scores are
    /// additive and the dip is transient. At quiescence the forward and
    /// inverted views agree exactly.
    pub fn upsert_document(&self, doc_id: DocId, term_freq: AHashMap<String, i32>) {
        // 1) Copy the old forward entry out; holding the forward lock across
        //    shard locking would violate the lock order.
        let old_terms = self.forward_copy(doc_id);

        // 2) Remove the old postings shard by shard.
        if !old_terms.is_empty() {
            self.remove_postings(doc_id, &old_terms);
        }

        let new_entry: Vec<(String, i32)> = term_freq
            .into_iter()
            .filter(|&(_, freq)| freq > 0)
            .collect();

        // 3) Install the new forward entry. An empty set leaves no entry so
        //    the document count reflects only documents with postings.
        {
            let mut forward = self.forward.write();
            if new_entry.is_empty() {
                forward.remove(&doc_id);
            } else {
                forward.insert(doc_id, new_entry.clone());
            }
        }

        if new_entry.is_empty() {
            return;
        }

        // 4) Insert the new postings, again grouped per shard so each shard
        //    lock is taken once.
        let mut by_shard: AHashMap<usize, Vec<(String, i32)>> = AHashMap::new();
        for (term, freq) in new_entry {
            by_shard
                .entry(self.shard_for(&term))
                .or_default()
                .push((term, freq));
        }

        for (sid, updates) in by_shard {
            let mut map = self.shards[sid].map.write();
            for (term, freq) in updates {
                map.entry(term).or_default().push(Posting { doc_id, freq });
            }
        }
    }

    /// Drop every posting referring to `doc_id` and its forward entry.
    /// No-op for unknown ids.
    pub fn remove_document(&self, doc_id: DocId) {
        let terms = self.forward_copy(doc_id);
        if !terms.is_empty() {
            self.remove_postings(doc_id, &terms);
        }
        self.forward.write().remove(&doc_id);
    }

    /// Score every document touched by the query terms and return the top
    /// `top_k` results (`top_k == 0` means no limit), sorted by score
    /// descending with ascending doc-id as the tie break.
    ///
    /// Score is the plain sum of per-term frequencies; repeating a term in
    /// the query counts it again, which doubles as naive boosting.
    pub fn search(&self, query_terms: &[String], top_k: usize) -> Vec<SearchResult> {
        let mut scores: AHashMap<DocId, f64> = AHashMap::new();

        for term in query_terms {
            if term.is_empty() {
                continue;
            }
            let map = self.shards[self.shard_for(term)].map.read();
            let Some(postings) = map.get(term) else {
                continue;
            };
            for p in postings {
                *scores.entry(p.doc_id).or_insert(0.0) += f64::from(p.freq);
            }
        }

        let mut results: Vec<SearchResult> = scores
            .into_iter()
            .map(|(doc_id, score)| SearchResult { doc_id, score })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });

        if top_k > 0 {
            results.truncate(top_k);
        }
        results
    }

    /// Deep copy of every term's postings. Shards are visited one at a time,
    /// so the snapshot is coherent per shard but not across shards while a
    /// writer is active. Intended for diagnostics and fingerprinting, not
    /// serving.
    pub fn snapshot(&self) -> Vec<TermPostings> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let map = shard.map.read();
            out.extend(map.iter().map(|(term, postings)| TermPostings {
                term: term.clone(),
                postings: postings.clone(),
            }));
        }
        out
    }

    /// Counters over the forward map and every shard. Same per-shard
    /// consistency caveat as [`snapshot`](Self::snapshot).
    pub fn stats(&self) -> IndexStats {
        let documents = self.forward.read().len();

        let mut terms = 0;
        let mut postings = 0;
        for shard in &self.shards {
            let map = shard.map.read();
            terms += map.len();
            postings += map.values().map(Vec::len).sum::<usize>();
        }

        IndexStats {
            documents,
            terms,
            postings,
        }
    }
}

impl Default for ConcurrentInvertedIndex {
    fn default() -> Self {
        Self::new()
    }
}
