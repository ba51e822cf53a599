//! HTTP service layer.
//!
//! Wraps the engine in a JSON API: ranked search, index/build status,
//! fire-and-forget build jobs, and the periodic rebuild scheduler. All
//! engine calls are synchronous; handlers stay cheap (a build request only
//! flips a flag and spawns a thread) so running them on the async runtime
//! is fine.

pub mod jobs;
pub mod protocol;
pub mod scheduler;

use crate::index::{ConcurrentInvertedIndex, DocumentStore, IndexBuilder};
use crate::utils::tokenizer::Tokenizer;
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lru::LruCache;
use parking_lot::Mutex;
use self::jobs::BuildJob;
use self::protocol::{
    BuildAccepted, BuildRequest, ErrorBody, LastBuildStatus, SchedulerRequest, SchedulerResponse,
    SearchHit, SearchParams, SearchResponse, StatusResponse,
};
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Cached entries per server; cleared whenever a build job completes.
const QUERY_CACHE_SIZE: usize = 128;

#[derive(Clone)]
struct CachedSearch {
    terms: Vec<String>,
    results: Vec<SearchHit>,
}

/// The engine plus the mutable serving state: build defaults, the running
/// build job, scheduler settings, and a small query cache.
pub struct SearchService {
    index: Arc<ConcurrentInvertedIndex>,
    store: Arc<DocumentStore>,
    tokenizer: Arc<Tokenizer>,
    builder: IndexBuilder,
    pub job: BuildJob,
    dataset_path: Mutex<String>,
    build_threads: AtomicUsize,
    scheduler_enabled: AtomicBool,
    scheduler_interval_s: AtomicU64,
    query_cache: Mutex<LruCache<String, CachedSearch>>,
}

impl SearchService {
    pub fn new(
        tokenizer: Tokenizer,
        dataset_path: String,
        build_threads: usize,
        scheduler_enabled: bool,
        scheduler_interval_s: u64,
    ) -> Self {
        let index = Arc::new(ConcurrentInvertedIndex::new());
        let store = Arc::new(DocumentStore::new());
        let tokenizer = Arc::new(tokenizer);
        let builder = IndexBuilder::new(
            Arc::clone(&index),
            Arc::clone(&store),
            Arc::clone(&tokenizer),
        );

        Self {
            index,
            store,
            tokenizer,
            builder,
            job: BuildJob::default(),
            dataset_path: Mutex::new(dataset_path),
            build_threads: AtomicUsize::new(build_threads.max(1)),
            scheduler_enabled: AtomicBool::new(scheduler_enabled),
            scheduler_interval_s: AtomicU64::new(scheduler_interval_s.max(1)),
            query_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(QUERY_CACHE_SIZE).unwrap(),
            )),
        }
    }

    pub fn index(&self) -> &ConcurrentInvertedIndex {
        &self.index
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn builder(&self) -> &IndexBuilder {
        &self.builder
    }

    pub fn dataset_path(&self) -> String {
        self.dataset_path.lock().clone()
    }

    pub fn set_dataset_path(&self, path: String) {
        *self.dataset_path.lock() = path;
    }

    pub fn build_threads(&self) -> usize {
        self.build_threads.load(Ordering::Relaxed)
    }

    pub fn set_build_threads(&self, threads: usize) {
        self.build_threads.store(threads.max(1), Ordering::Relaxed);
    }

    pub fn scheduler_enabled(&self) -> bool {
        self.scheduler_enabled.load(Ordering::Relaxed)
    }

    pub fn set_scheduler_enabled(&self, enabled: bool) {
        self.scheduler_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn scheduler_interval_s(&self) -> u64 {
        self.scheduler_interval_s.load(Ordering::Relaxed)
    }

    pub fn set_scheduler_interval_s(&self, interval_s: u64) {
        if interval_s > 0 {
            self.scheduler_interval_s.store(interval_s, Ordering::Relaxed);
        }
    }

    pub fn invalidate_query_cache(&self) {
        self.query_cache.lock().clear();
    }

    /// Tokenize, search, resolve paths. Results are cached per `(topk, q)`
    /// until the next build completes.
    pub fn search(&self, q: &str, topk: usize) -> SearchResponse {
        let started = Instant::now();
        let cache_key = format!("{topk}|{q}");

        if let Some(hit) = self.query_cache.lock().get(&cache_key).cloned() {
            return SearchResponse {
                ok: true,
                q: q.to_string(),
                terms: hit.terms,
                t_ms: started.elapsed().as_millis() as u64,
                cached: true,
                results: hit.results,
            };
        }

        let terms = self.tokenizer.tokenize(q.as_bytes());
        let results: Vec<SearchHit> = self
            .index
            .search(&terms, topk)
            .into_iter()
            .map(|r| SearchHit {
                doc_id: r.doc_id,
                score: r.score,
                path: self
                    .store
                    .path_for(r.doc_id)
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
            .collect();

        self.query_cache.lock().put(
            cache_key,
            CachedSearch {
                terms: terms.clone(),
                results: results.clone(),
            },
        );

        SearchResponse {
            ok: true,
            q: q.to_string(),
            terms,
            t_ms: started.elapsed().as_millis() as u64,
            cached: false,
            results,
        }
    }

    pub fn status(&self) -> StatusResponse {
        let last = match self.job.last() {
            Some(last) => LastBuildStatus {
                mode: Some(last.mode().to_string()),
                dataset: Some(last.dataset.clone()),
                threads: last.threads,
                result: last.result,
                error: last.error,
            },
            None => LastBuildStatus::default(),
        };

        StatusResponse {
            ok: true,
            building: self.job.is_running(),
            dataset_path: self.dataset_path(),
            build_threads: self.build_threads(),
            scheduler_enabled: self.scheduler_enabled(),
            scheduler_interval_s: self.scheduler_interval_s(),
            index: self.index.stats(),
            last,
        }
    }
}

/// Assemble the router. Kept separate from `run_blocking` so tests can
/// drive the app without a socket.
pub fn build_app(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/status", get(status_handler).fallback(method_not_allowed))
        .route("/search", get(search_handler).fallback(method_not_allowed))
        .route("/build", post(build_handler).fallback(method_not_allowed))
        .route(
            "/scheduler",
            post(scheduler_handler).fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(service)
}

/// Bind and serve until the process exits.
pub fn run_blocking(service: Arc<SearchService>, host: &str, port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "server listening");
        axum::serve(listener, build_app(service))
            .await
            .context("server terminated")
    })
}

async fn status_handler(State(service): State<Arc<SearchService>>) -> Json<StatusResponse> {
    Json(service.status())
}

async fn search_handler(
    State(service): State<Arc<SearchService>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    Json(service.search(&params.q, params.topk))
}

async fn build_handler(
    State(service): State<Arc<SearchService>>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_json(rejection),
    };

    let dataset = req
        .dataset_path
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| service.dataset_path());
    if dataset.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("dataset_path_required")),
        )
            .into_response();
    }

    let threads = match req.threads {
        Some(t) if t > 0 => t as usize,
        Some(_) => 1,
        None => service.build_threads(),
    };
    let incremental = req.incremental.unwrap_or(true);

    // Accepted values become the new defaults, visible in /status and used
    // by the scheduler.
    service.set_dataset_path(dataset.clone());
    service.set_build_threads(threads);

    if !jobs::spawn_build(&service, dataset.clone(), threads, incremental) {
        return Json(json!({"ok": true, "status": "already_running"})).into_response();
    }

    Json(BuildAccepted {
        ok: true,
        status: "started",
        mode: if incremental { "update" } else { "build" },
        dataset_path: dataset,
        threads,
    })
    .into_response()
}

async fn scheduler_handler(
    State(service): State<Arc<SearchService>>,
    payload: Result<Json<SchedulerRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_json(rejection),
    };

    if let Some(enabled) = req.enabled {
        service.set_scheduler_enabled(enabled);
    }
    if let Some(interval_s) = req.interval_s {
        if interval_s > 0 {
            service.set_scheduler_interval_s(interval_s as u64);
        }
    }

    Json(SchedulerResponse {
        ok: true,
        enabled: service.scheduler_enabled(),
        interval_s: service.scheduler_interval_s(),
    })
    .into_response()
}

fn bad_json(rejection: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody::with_details("bad_json", rejection.body_text())),
    )
        .into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("not_found"))).into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::new("method_not_allowed")),
    )
        .into_response()
}
