//! Periodic incremental rebuilds.
//!
//! A single detached thread ticks once per second and, when the configured
//! interval has elapsed, kicks off an incremental build - provided the
//! scheduler is enabled, a dataset is configured, and no build is already
//! running. Interval and enabled-state changes from `POST /scheduler` take
//! effect at the next tick.

use crate::server::{jobs, SearchService};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal the loop to exit and wait for it. Only effective between
    /// builds: a build already started by the scheduler keeps running.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawn the scheduler thread for a service.
pub fn spawn(service: Arc<SearchService>) -> SchedulerHandle {
    let stop = Arc::new(AtomicBool::new(false));

    let thread = {
        let stop = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("rebuild-scheduler".to_string())
            .spawn(move || run_loop(&service, &stop))
            .expect("failed to spawn scheduler thread")
    };

    SchedulerHandle {
        stop,
        thread: Some(thread),
    }
}

fn run_loop(service: &Arc<SearchService>, stop: &AtomicBool) {
    let mut last_fire = Instant::now();

    loop {
        std::thread::sleep(Duration::from_secs(1));
        if stop.load(Ordering::Acquire) {
            break;
        }
        if !service.scheduler_enabled() {
            continue;
        }

        let interval = Duration::from_secs(service.scheduler_interval_s().max(1));
        if last_fire.elapsed() < interval {
            continue;
        }
        last_fire = Instant::now();

        let dataset = service.dataset_path();
        if dataset.is_empty() || service.job.is_running() {
            continue;
        }

        debug!(dataset = %dataset, "scheduler triggering incremental rebuild");
        jobs::spawn_build(service, dataset, service.build_threads(), true);
    }
}
