//! `.env`-style configuration.
//!
//! Reads `KEY=VALUE` lines; `#` starts a comment, values may be wrapped in
//! single or double quotes. Process environment variables override file
//! values, which override the defaults the caller passes to the getters.

use ahash::AHashMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct Config {
    values: AHashMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `KEY=VALUE` pairs from a file. Returns false (leaving the config
    /// unchanged) if the file cannot be read; a missing config file is a
    /// normal condition, not an error.
    pub fn load_file(&mut self, path: &Path) -> bool {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(_) => return false,
        };

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!(line, "ignoring malformed config line");
                continue;
            };
            self.set(key.trim(), unquote(value.trim()));
        }

        true
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn has(&self, key: &str) -> bool {
        std::env::var(key).is_ok() || self.values.contains_key(key)
    }

    /// Env override first, then file value, then `None`.
    pub fn get_opt(&self, key: &str) -> Option<String> {
        if let Ok(env) = std::env::var(key) {
            return Some(env);
        }
        self.values.get(key).cloned()
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get_opt(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        self.get_opt(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_u16(&self, key: &str, default: u16) -> u16 {
        self.get_opt(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.get_opt(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_opt(key) {
            Some(v) => parse_bool(&v).unwrap_or(default),
            None => default,
        }
    }
}

/// Lenient bool parsing shared with the HTTP layer's query handling.
pub fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
