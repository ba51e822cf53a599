//! Load-test and verification harness.
//!
//! Three modes, mirroring how the service is exercised in practice:
//!
//! - `search`: hammer a running server's `/search` endpoint from N client
//!   threads and report throughput and latency percentiles.
//! - `build`: rebuild a dataset from scratch once per worker count and emit
//!   a CSV of the build counters for scaling plots.
//! - `verify`: assert that the index fingerprint is identical across worker
//!   counts, i.e. that parallel builds are deterministic.

use crate::client::ApiClient;
use crate::index::{ConcurrentInvertedIndex, DocumentStore, IndexBuilder};
use crate::utils::fingerprint::index_signature;
use crate::utils::tokenizer::Tokenizer;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SearchLoadConfig {
    pub host: String,
    pub port: u16,
    pub clients: usize,
    pub duration_s: u64,
    pub q: String,
    pub topk: usize,
    pub csv: Option<PathBuf>,
}

/// Run the search load: `clients` threads issue `/search` requests in a
/// closed loop for `duration_s` seconds.
pub fn run_search_load(cfg: &SearchLoadConfig) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let ok_reqs = Arc::new(AtomicU64::new(0));
    let fail_reqs = Arc::new(AtomicU64::new(0));
    let latencies_ms: Arc<Mutex<Vec<u64>>> =
        Arc::new(Mutex::new(Vec::with_capacity(cfg.clients * 128)));

    let mut workers = Vec::with_capacity(cfg.clients);
    for _ in 0..cfg.clients {
        let stop = Arc::clone(&stop);
        let ok_reqs = Arc::clone(&ok_reqs);
        let fail_reqs = Arc::clone(&fail_reqs);
        let latencies_ms = Arc::clone(&latencies_ms);
        let host = cfg.host.clone();
        let port = cfg.port;
        let q = cfg.q.clone();
        let topk = cfg.topk;

        workers.push(std::thread::spawn(move || {
            let Ok(client) = ApiClient::new(&host, port) else {
                fail_reqs.fetch_add(1, Ordering::Relaxed);
                return;
            };
            while !stop.load(Ordering::Relaxed) {
                let started = Instant::now();
                let outcome = client.search(&q, Some(topk));
                let elapsed_ms = started.elapsed().as_millis() as u64;

                latencies_ms.lock().push(elapsed_ms);
                match outcome {
                    Ok(_) => ok_reqs.fetch_add(1, Ordering::Relaxed),
                    Err(_) => fail_reqs.fetch_add(1, Ordering::Relaxed),
                };
            }
        }));
    }

    std::thread::sleep(Duration::from_secs(cfg.duration_s));
    stop.store(true, Ordering::Relaxed);
    for worker in workers {
        let _ = worker.join();
    }

    let ok = ok_reqs.load(Ordering::Relaxed);
    let fail = fail_reqs.load(Ordering::Relaxed);
    let total = ok + fail;
    let rps = total as f64 / cfg.duration_s.max(1) as f64;

    let mut lat = latencies_ms.lock().clone();
    lat.sort_unstable();
    let pct = |p: f64| percentile(&lat, p);

    let report = format!(
        "mode=search clients={} duration_s={} total={} ok={} fail={} rps={:.1} p50_ms={} p95_ms={} p99_ms={}",
        cfg.clients,
        cfg.duration_s,
        total,
        ok,
        fail,
        rps,
        pct(0.50),
        pct(0.95),
        pct(0.99),
    );

    if let Some(csv_path) = &cfg.csv {
        let mut csv = String::from("clients,duration_s,total,ok,fail,rps,p50_ms,p95_ms,p99_ms\n");
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{:.1},{},{},{}",
            cfg.clients,
            cfg.duration_s,
            total,
            ok,
            fail,
            rps,
            pct(0.50),
            pct(0.95),
            pct(0.99)
        );
        std::fs::write(csv_path, csv)
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
    }
    println!("{report}");

    Ok(())
}

/// Build the dataset from scratch once per worker count and emit the build
/// counters as CSV (to `csv`, or stdout when absent).
pub fn run_build_matrix(dataset: &Path, threads_list: &[usize], csv: Option<&Path>) -> Result<()> {
    let mut out = String::from("threads,scanned,indexed,skipped,errors,elapsed_ms\n");

    for &threads in threads_list {
        let (builder, _index, _store) = fresh_engine();
        let result = builder.build_from_directory(dataset, threads);
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            threads,
            result.scanned_files,
            result.indexed_files,
            result.skipped_files,
            result.errors,
            result.elapsed_ms
        );
    }

    match csv {
        Some(path) => std::fs::write(path, out)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{out}"),
    }

    Ok(())
}

/// Build once with one worker as the reference, then once per listed worker
/// count, comparing index fingerprints. Returns true when every count
/// matched the reference.
pub fn run_verify(dataset: &Path, threads_list: &[usize]) -> bool {
    let (builder, index, store) = fresh_engine();
    builder.build_from_directory(dataset, 1);
    let reference = index_signature(&index, &store);

    let mut all_ok = true;
    for &threads in threads_list {
        let threads = threads.max(1);

        let (builder, index, store) = fresh_engine();
        builder.build_from_directory(dataset, threads);
        let signature = index_signature(&index, &store);

        let ok = signature == reference;
        println!(
            "verify threads={} {}",
            threads,
            if ok { "ok" } else { "mismatch" }
        );
        all_ok &= ok;
    }

    all_ok
}

/// Parse a comma-separated worker-count list like `"1,2,4,8"`, dropping
/// anything non-positive or unparseable.
pub fn parse_threads_list(list: &str) -> Vec<usize> {
    list.split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .collect()
}

fn fresh_engine() -> (IndexBuilder, Arc<ConcurrentInvertedIndex>, Arc<DocumentStore>) {
    let index = Arc::new(ConcurrentInvertedIndex::new());
    let store = Arc::new(DocumentStore::new());
    let tokenizer = Arc::new(Tokenizer::default());
    let builder = IndexBuilder::new(Arc::clone(&index), Arc::clone(&store), tokenizer);
    (builder, index, store)
}

fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_threads_lists_leniently() {
        assert_eq!(parse_threads_list("1,2,4,8"), vec![1, 2, 4, 8]);
        assert_eq!(parse_threads_list(" 2 , x, 0, 4 "), vec![2, 4]);
        assert!(parse_threads_list("").is_empty());
    }

    #[test]
    fn percentiles_of_sorted_latencies() {
        let lat: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&lat, 0.50), 50);
        assert_eq!(percentile(&lat, 0.99), 99);
        assert_eq!(percentile(&[], 0.5), 0);
    }

    #[test]
    fn verify_passes_on_a_real_corpus() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            fs::write(
                dir.path().join(format!("doc{i:02}.txt")),
                format!("common term plus unique{i} filler text {i}"),
            )
            .unwrap();
        }

        assert!(run_verify(dir.path(), &[2, 4]));
    }
}
