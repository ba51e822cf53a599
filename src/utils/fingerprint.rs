//! Deterministic index fingerprinting.
//!
//! Hashes every `(term, path, freq)` triple in a canonical order so two
//! indices built from the same dataset compare equal regardless of worker
//! count or shard layout. Doc-ids are translated to paths first: ids depend
//! on task completion order, paths do not.

use crate::index::{ConcurrentInvertedIndex, DocId, DocumentStore};
use ahash::AHashMap;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn add_str(hash: u64, s: &str) -> u64 {
    // 0-byte separator keeps ("ab","c") distinct from ("a","bc").
    fnv1a(fnv1a(hash, s.as_bytes()), &[0])
}

fn add_freq(hash: u64, freq: i32) -> u64 {
    fnv1a(fnv1a(hash, &i64::from(freq).to_le_bytes()), &[0])
}

/// Compute the fingerprint of an index against its document store.
///
/// Only meaningful at quiescence: snapshotting while a build is running
/// hashes whatever intermediate state the shards expose.
pub fn index_signature(index: &ConcurrentInvertedIndex, store: &DocumentStore) -> u64 {
    let id_to_path: AHashMap<DocId, String> = store
        .list_all()
        .into_iter()
        .map(|meta| (meta.doc_id, meta.path.to_string_lossy().into_owned()))
        .collect();

    let mut snapshot = index.snapshot();
    snapshot.sort_by(|a, b| a.term.cmp(&b.term));

    let mut hash = FNV_OFFSET;
    for tp in &snapshot {
        hash = add_str(hash, &tp.term);

        let mut by_path: Vec<(String, i32)> = tp
            .postings
            .iter()
            .map(|p| {
                let path = id_to_path
                    .get(&p.doc_id)
                    .cloned()
                    .unwrap_or_else(|| format!("<missing:{}>", p.doc_id));
                (path, p.freq)
            })
            .collect();
        by_path.sort();

        for (path, freq) in by_path {
            hash = add_str(hash, &path);
            hash = add_freq(hash, freq);
        }
    }

    hash
}
