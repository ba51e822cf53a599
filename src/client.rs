//! Blocking HTTP client for a running memidx server.
//!
//! Thin wrapper used by the CLI subcommands and the load-test harness; it
//! returns raw response bodies so callers can print the server's JSON
//! verbatim.

use anyhow::{Context, Result};
use serde_json::json;
use std::time::Duration;

pub struct ApiClient {
    base: String,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            base: format!("http://{host}:{port}"),
            http,
        })
    }

    pub fn status(&self) -> Result<String> {
        let resp = self
            .http
            .get(format!("{}/status", self.base))
            .send()
            .context("status request failed")?;
        resp.text().context("failed to read status response")
    }

    pub fn search(&self, q: &str, topk: Option<usize>) -> Result<String> {
        let mut params = vec![("q".to_string(), q.to_string())];
        if let Some(topk) = topk {
            params.push(("topk".to_string(), topk.to_string()));
        }

        let resp = self
            .http
            .get(format!("{}/search", self.base))
            .query(&params)
            .send()
            .context("search request failed")?;
        resp.text().context("failed to read search response")
    }

    pub fn build(&self, dataset: &str, threads: usize, incremental: bool) -> Result<String> {
        let body = json!({
            "dataset_path": dataset,
            "threads": threads,
            "incremental": incremental,
        });

        let resp = self
            .http
            .post(format!("{}/build", self.base))
            .json(&body)
            .send()
            .context("build request failed")?;
        resp.text().context("failed to read build response")
    }

    pub fn scheduler(&self, enabled: Option<bool>, interval_s: Option<u64>) -> Result<String> {
        let mut body = serde_json::Map::new();
        if let Some(enabled) = enabled {
            body.insert("enabled".to_string(), json!(enabled));
        }
        if let Some(interval_s) = interval_s {
            body.insert("interval_s".to_string(), json!(interval_s));
        }

        let resp = self
            .http
            .post(format!("{}/scheduler", self.base))
            .json(&body)
            .send()
            .context("scheduler request failed")?;
        resp.text().context("failed to read scheduler response")
    }
}
