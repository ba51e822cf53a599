//! Background build jobs.
//!
//! At most one build runs at a time, guarded by a compare-and-set on the
//! running flag. The job itself is a detached thread; its outcome lands in a
//! mutex-protected last-result record that `/status` reads.

use crate::index::types::BuildResult;
use crate::server::SearchService;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Record of one finished (or failed) build.
#[derive(Debug, Clone)]
pub struct LastBuild {
    pub incremental: bool,
    pub dataset: String,
    pub threads: usize,
    pub result: Option<BuildResult>,
    pub error: Option<String>,
}

impl LastBuild {
    pub fn mode(&self) -> &'static str {
        if self.incremental {
            "update"
        } else {
            "build"
        }
    }
}

/// Shared build-job state: a running flag plus the last outcome.
#[derive(Default)]
pub struct BuildJob {
    running: AtomicBool,
    last: Mutex<Option<LastBuild>>,
}

impl BuildJob {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the running flag. Exactly one of any set of concurrent callers
    /// gets `true`.
    fn try_claim(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish(&self, outcome: LastBuild) {
        *self.last.lock() = Some(outcome);
        self.running.store(false, Ordering::Release);
    }

    pub fn last(&self) -> Option<LastBuild> {
        self.last.lock().clone()
    }
}

/// Start a build in the background. Returns false (and does nothing) if a
/// build is already running. The response to the caller only signals
/// acceptance; the result is retrievable via `/status` once the job ends.
pub fn spawn_build(
    service: &Arc<SearchService>,
    dataset: String,
    threads: usize,
    incremental: bool,
) -> bool {
    if !service.job.try_claim() {
        return false;
    }

    let service = Arc::clone(service);
    std::thread::Builder::new()
        .name("build-job".to_string())
        .spawn(move || {
            let mode = if incremental { "update" } else { "build" };
            info!(mode, dataset = %dataset, threads, "build job started");

            let root = std::path::PathBuf::from(&dataset);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                if incremental {
                    service.builder().update_from_directory(&root, threads)
                } else {
                    service.builder().build_from_directory(&root, threads)
                }
            }));

            let last = match outcome {
                Ok(result) => {
                    info!(mode, "build job finished");
                    LastBuild {
                        incremental,
                        dataset,
                        threads,
                        result: Some(result),
                        error: None,
                    }
                }
                Err(_) => {
                    error!(mode, "build job panicked");
                    LastBuild {
                        incremental,
                        dataset,
                        threads,
                        result: None,
                        error: Some("build_panicked".to_string()),
                    }
                }
            };

            service.job.finish(last);
            // The index changed; cached query results are stale now.
            service.invalidate_query_cache();
        })
        .expect("failed to spawn build job thread");

    true
}
