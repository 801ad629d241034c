//! Key-value cache seam toward the external storage collaborator.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::Preset;
use crate::PresetResult;

/// Table name presets are cached under.
pub const PRESET_TABLE: &str = "presets";

/// Simple key-value persistence seam. Records are stored individually so a
/// partial failure never corrupts the rest of the set.
#[async_trait]
pub trait PresetCache: Send + Sync {
    async fn get_all(&self, table: &str) -> PresetResult<Vec<Preset>>;
    async fn store(&self, table: &str, preset: &Preset) -> PresetResult<()>;
}

/// In-memory cache used by tests and standalone demos; the production
/// collaborator persists to whatever store the host application owns.
#[derive(Debug, Default)]
pub struct MemoryCache {
    tables: RwLock<HashMap<String, HashMap<String, Preset>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate, for warm-cache scenarios.
    pub async fn seed(&self, table: &str, presets: &[Preset]) {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();
        for preset in presets {
            entries.insert(preset.id.clone(), preset.clone());
        }
    }
}

#[async_trait]
impl PresetCache for MemoryCache {
    async fn get_all(&self, table: &str) -> PresetResult<Vec<Preset>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn store(&self, table: &str, preset: &Preset) -> PresetResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(preset.id.clone(), preset.clone());
        Ok(())
    }
}
