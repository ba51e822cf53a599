//! Request and response shapes for the HTTP surface.

use crate::index::types::{BuildResult, DocId, IndexStats};
use serde::{Deserialize, Serialize};

fn default_topk() -> usize {
    20
}

/// Query string of `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    /// Maximum results; 0 means no limit.
    #[serde(default = "default_topk")]
    pub topk: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub ok: bool,
    pub q: String,
    pub terms: Vec<String>,
    pub t_ms: u64,
    pub cached: bool,
    pub results: Vec<SearchHit>,
}

/// Body of `POST /build`. Absent fields fall back to the server's current
/// defaults.
#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub dataset_path: Option<String>,
    #[serde(default)]
    pub threads: Option<i64>,
    #[serde(default)]
    pub incremental: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct BuildAccepted {
    pub ok: bool,
    pub status: &'static str,
    pub mode: &'static str,
    pub dataset_path: String,
    pub threads: usize,
}

/// Body of `POST /scheduler`. Absent fields leave the current setting.
#[derive(Debug, Deserialize)]
pub struct SchedulerRequest {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub interval_s: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SchedulerResponse {
    pub ok: bool,
    pub enabled: bool,
    pub interval_s: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub building: bool,
    pub dataset_path: String,
    pub build_threads: usize,
    pub scheduler_enabled: bool,
    pub scheduler_interval_s: u64,
    pub index: IndexStats,
    pub last: LastBuildStatus,
}

/// Outcome of the most recent build job; all-null before the first one
/// finishes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LastBuildStatus {
    pub mode: Option<String>,
    pub dataset: Option<String>,
    pub threads: usize,
    pub result: Option<BuildResult>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: &'static str) -> Self {
        Self {
            ok: false,
            error,
            details: None,
        }
    }

    pub fn with_details(error: &'static str, details: String) -> Self {
        Self {
            ok: false,
            error,
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_params_defaults() {
        let params: SearchParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.q, "");
        assert_eq!(params.topk, 20);
    }

    #[test]
    fn build_request_accepts_partial_bodies() {
        let req: BuildRequest = serde_json::from_str(r#"{"threads": 8}"#).unwrap();
        assert_eq!(req.dataset_path, None);
        assert_eq!(req.threads, Some(8));
        assert_eq!(req.incremental, None);
    }

    #[test]
    fn error_body_omits_absent_details() {
        let json = serde_json::to_string(&ErrorBody::new("not_found")).unwrap();
        assert_eq!(json, r#"{"ok":false,"error":"not_found"}"#);
    }

    #[test]
    fn last_build_status_serializes_nulls_before_first_build() {
        let json = serde_json::to_value(LastBuildStatus::default()).unwrap();
        assert!(json["mode"].is_null());
        assert!(json["result"].is_null());
        assert_eq!(json["threads"], 0);
    }
}
