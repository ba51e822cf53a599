pub mod config;
pub mod fingerprint;
pub mod tokenizer;

pub use config::Config;
pub use fingerprint::index_signature;
pub use tokenizer::{Tokenizer, TokenizerConfig};
