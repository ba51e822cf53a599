//! # memidx - In-Memory Text Search Service
//!
//! memidx ingests a directory tree of plain-text documents, builds a sharded
//! inverted index of normalized terms entirely in memory, and answers ranked
//! keyword queries while incremental rebuilds run in the background.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - The engine: sharded inverted index, document catalog,
//!   directory scanner, and the parallel index builder
//! - [`pool`] - Bounded worker pool over a closeable task queue
//! - [`server`] - HTTP service exposing search, status, and build control
//! - [`client`] - Blocking HTTP client backing the CLI subcommands
//! - [`bench`] - Load-test and build-verification harness
//! - [`utils`] - Tokenizer, config loading, index fingerprinting
//!
//! ## Quick Start
//!
//! ```ignore
//! use memidx::index::{ConcurrentInvertedIndex, DocumentStore, IndexBuilder};
//! use memidx::utils::tokenizer::Tokenizer;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let index = Arc::new(ConcurrentInvertedIndex::new());
//! let store = Arc::new(DocumentStore::new());
//! let tokenizer = Arc::new(Tokenizer::default());
//!
//! let builder = IndexBuilder::new(index.clone(), store.clone(), tokenizer.clone());
//! let result = builder.build_from_directory(Path::new("/data/corpus"), 8);
//! println!("indexed {} files", result.indexed_files);
//!
//! let terms = tokenizer.tokenize(b"hello world");
//! for hit in index.search(&terms, 10) {
//!     println!("{:?} score={}", store.path_for(hit.doc_id), hit.score);
//! }
//! ```
//!
//! Scoring is the sum of per-term frequencies: a deliberate baseline with no
//! length normalization. There is no on-disk index format; the index lives
//! for the process and is rebuilt from the dataset directory on demand or on
//! the periodic scheduler.

pub mod bench;
pub mod client;
pub mod index;
pub mod pool;
pub mod server;
pub mod utils;
