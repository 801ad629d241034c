//! Preset management: catalog fetch, TriLaw gating, cache hydration.
//!
//! The catalog is read-only and remote; the cache is a simple key-value
//! collaborator. `initialize` is the one suspension point in the whole
//! engine: awaited once at session start, single-flight, and skipped
//! entirely when the cache is already warm.

pub mod cache;
pub mod catalog;
pub mod manager;

pub use cache::{MemoryCache, PresetCache};
pub use catalog::{AudioProfileParams, BuiltinCatalog, Preset, PresetCatalog, TriLaw, VisualParams};
pub use manager::{LoadOutcome, PresetManager};

/// Result type for preset operations.
pub type PresetResult<T> = Result<T, PresetError>;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("catalog fetch failed: {0}")]
    Catalog(String),

    #[error("cache access failed: {0}")]
    Cache(String),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
